//! Backend API access
//!
//! - [`client`] - bearer-token HTTP client with 401 classification
//! - [`backend`] - typed profile and notes endpoints
//! - [`error`] - request error taxonomy

pub mod backend;
pub mod client;
pub mod error;

pub use backend::BackendApi;
pub use client::AuthenticatedHttpClient;
pub use error::ApiError;

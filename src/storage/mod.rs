//! Client-side storage
//!
//! - [`token_store`] - durable access/refresh token storage
//! - [`state_store`] - transient OAuth `state` storage

pub mod state_store;
pub mod token_store;

pub use state_store::{OAuthStateStore, OAUTH_STATE_KEY};
pub use token_store::{FileTokenStore, MemoryTokenStore, StorageError, TokenKind, TokenStore};

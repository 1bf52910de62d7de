#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the notekeep client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod api;
pub mod app;
pub mod handlers;
pub mod home;
pub mod models;
pub mod oauth;
pub mod router;
pub mod session;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use api::{ApiError, AuthenticatedHttpClient, BackendApi};
pub use app::{NotekeepClient, SetupError};
pub use home::{ActionOutcome, HomeView};
pub use models::{Session, TokenPair};
pub use oauth::{LoginFlow, OAuthRedirectHandler};
pub use router::{Route, Router};
pub use session::{SessionController, SessionState};
pub use settings::ClientSettings;
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};

//! OAuth client flows
//!
//! - [`login`] - starting Google and test-provider logins
//! - [`redirect`] - consuming the provider redirect into a session

pub mod login;
pub mod redirect;

pub use login::{LoginError, LoginFlow};
pub use redirect::{
    CallbackError, OAuthCallbackResult, OAuthRedirectHandler, RedirectOutcome,
    AUTH_FAILURE_MESSAGE,
};

//! OAuth redirect handling
//!
//! Turns the query string of the provider redirect into a stored session.
//! The validation steps mirror a callback validator: each required parameter
//! is extracted on its own so failures name the missing piece, and nothing is
//! written until both tokens are known to be present.

use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::models::TokenPair;
use crate::router::Route;
use crate::session::{SessionController, TeardownReason};
use crate::storage::OAuthStateStore;
use crate::utils::logging::LoggingHelper;

/// Message shown when the redirect did not produce a session
pub const AUTH_FAILURE_MESSAGE: &str = "Failed to retrieve authentication tokens.";

/// Parameters carried by the redirect URL
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OAuthCallbackResult {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl OAuthCallbackResult {
    /// Parse a raw query string (without the leading `?`)
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut result = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "access_token" => result.access_token = Some(value.into_owned()),
                "refresh_token" => result.refresh_token = Some(value.into_owned()),
                _ => {}
            }
        }
        result
    }

    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// Whether the parameters look like a redirect result at all
    #[must_use]
    pub fn carries_tokens(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }
}

/// Why a redirect was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("access_token missing from redirect")]
    MissingAccessToken,
    #[error("refresh_token missing from redirect")]
    MissingRefreshToken,
    #[error("tokens could not be stored: {0}")]
    Storage(String),
}

/// Result of handling one redirect navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOutcome {
    /// Where the client goes next
    pub route: Route,
    /// Visible failure message, `None` on success
    pub failure: Option<String>,
    /// Internal reason for the failure
    pub error: Option<CallbackError>,
}

impl RedirectOutcome {
    fn success() -> Self {
        Self {
            route: Route::Home,
            failure: None,
            error: None,
        }
    }

    fn failure(error: CallbackError) -> Self {
        Self {
            route: Route::Login,
            failure: Some(AUTH_FAILURE_MESSAGE.to_string()),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Consumes OAuth redirects and establishes the session
#[derive(Debug, Clone)]
pub struct OAuthRedirectHandler {
    session: Arc<SessionController>,
    states: Arc<OAuthStateStore>,
}

impl OAuthRedirectHandler {
    #[must_use]
    pub fn new(session: Arc<SessionController>, states: Arc<OAuthStateStore>) -> Self {
        Self { session, states }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Handle a redirect given as a full URL
    #[must_use]
    pub fn handle_url(&self, url: &Url) -> RedirectOutcome {
        self.handle(&OAuthCallbackResult::from_url(url))
    }

    /// Handle a redirect given as its query string
    #[must_use]
    pub fn handle_query(&self, query: &str) -> RedirectOutcome {
        self.handle(&OAuthCallbackResult::from_query(query))
    }

    /// Validate the parameters, persist both tokens and pick the next route
    ///
    /// Tokens are persisted before the outcome is returned, so route
    /// evaluation that follows sees the new state. A rejected redirect writes
    /// no new tokens and clears any session that was already stored. There is
    /// no retry; the user starts a new login.
    #[must_use]
    pub fn handle(&self, callback: &OAuthCallbackResult) -> RedirectOutcome {
        let tokens = match Self::validate_and_extract(callback) {
            Ok(tokens) => tokens,
            Err(e) => {
                LoggingHelper::log_callback_failure(&e);
                // A failed login never leaves an older session behind
                if self.session.is_authenticated() {
                    if let Err(storage) = self.session.teardown(TeardownReason::RejectedRedirect) {
                        return RedirectOutcome::failure(CallbackError::Storage(
                            storage.to_string(),
                        ));
                    }
                }
                return RedirectOutcome::failure(e);
            }
        };

        // The state is kept from login start but not compared here
        if self.states.peek().is_some() {
            LoggingHelper::log_unverified_state();
        }

        match self.session.establish(&tokens) {
            Ok(_) => RedirectOutcome::success(),
            Err(e) => {
                let error = CallbackError::Storage(e.to_string());
                LoggingHelper::log_callback_failure(&error);
                RedirectOutcome::failure(error)
            }
        }
    }

    /// Extract both tokens or fail without side effects
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or empty parameter.
    pub fn validate_and_extract(callback: &OAuthCallbackResult) -> Result<TokenPair, CallbackError> {
        let access_token = Self::extract_access_token(callback)?;
        let refresh_token = Self::extract_refresh_token(callback)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn extract_access_token(callback: &OAuthCallbackResult) -> Result<String, CallbackError> {
        callback
            .access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(ToString::to_string)
            .ok_or(CallbackError::MissingAccessToken)
    }

    fn extract_refresh_token(callback: &OAuthCallbackResult) -> Result<String, CallbackError> {
        callback
            .refresh_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(ToString::to_string)
            .ok_or(CallbackError::MissingRefreshToken)
    }
}

//! Transient storage for the OAuth `state` correlation value
//!
//! Lives only as long as the process, like browser session storage. The value
//! is written before the user is sent to the identity provider.

use std::sync::{Mutex, PoisonError};

/// Key under which the pending state is kept
pub const OAUTH_STATE_KEY: &str = "oauth_state";

#[derive(Debug, Default)]
pub struct OAuthStateStore {
    pending: Mutex<Option<String>>,
}

impl OAuthStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the state issued for the login in progress
    pub fn put(&self, state: &str) {
        log::debug!("Stored {OAUTH_STATE_KEY} for pending login");
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.to_string());
    }

    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

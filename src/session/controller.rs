//! Session Controller - authentication state backed by the token store
//!
//! The controller is the single mutation surface for authentication state. It
//! owns the in-memory flag, derives it from the [`TokenStore`] at startup, and
//! re-derives it under the same lock right after every token write or clear,
//! so the flag and the stored access token never disagree once a transition
//! returns.
//!
//! ## Transitions
//!
//! - `Unauthenticated -> Authenticated`: [`SessionController::establish`],
//!   called by the OAuth redirect handler with both tokens.
//! - `Authenticated -> Unauthenticated`: [`SessionController::logout`],
//!   [`SessionController::account_deleted`] and [`SessionController::expire`].
//!
//! Subscribers receive every state change through a `watch` channel.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::models::{Session, TokenPair};
use crate::storage::{StorageError, TokenKind, TokenStore};
use crate::utils::logging::LoggingHelper;

/// Authentication state of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

impl SessionState {
    fn from_store(store: &dyn TokenStore) -> Self {
        if store.has_access_token() {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The user logged out
    Logout,
    /// The user deleted their account
    AccountDeleted,
    /// The backend answered 401
    Unauthorized,
    /// A login redirect arrived without a usable token pair
    RejectedRedirect,
}

pub struct SessionController {
    store: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
    changes: watch::Sender<SessionState>,
}

impl SessionController {
    /// Create a controller whose initial state reflects the stored access token
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let initial = SessionState::from_store(store.as_ref());
        LoggingHelper::log_session_restored(initial);
        let (changes, _) = watch::channel(initial);

        Self {
            store,
            state: Mutex::new(initial),
            changes,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Receive state changes as they happen
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.changes.subscribe()
    }

    /// Current access token, read from storage on every call
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.store
            .get(TokenKind::Access)
            .filter(|token| !token.is_empty())
    }

    /// Snapshot of the stored tokens and the derived flag
    #[must_use]
    pub fn snapshot(&self) -> Session {
        let _guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Session::new(
            self.store.get(TokenKind::Access),
            self.store.get(TokenKind::Refresh),
        )
    }

    /// Persist a freshly obtained token pair and become authenticated
    ///
    /// Re-establishing with the same pair is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokens cannot be persisted; the state is then
    /// re-derived from whatever the store holds.
    pub fn establish(&self, tokens: &TokenPair) -> Result<SessionState, StorageError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let written = self
            .store
            .set_pair(&tokens.access_token, &tokens.refresh_token);
        let next = self.resync(&mut state);

        match written {
            Ok(()) => {
                LoggingHelper::log_login_success();
                Ok(next)
            }
            Err(e) => {
                LoggingHelper::log_storage_failure("write", &e);
                Err(e)
            }
        }
    }

    /// Explicit logout
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be cleared.
    pub fn logout(&self) -> Result<(), StorageError> {
        self.teardown(TeardownReason::Logout)
    }

    /// Teardown after the account was deleted on the backend
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be cleared.
    pub fn account_deleted(&self) -> Result<(), StorageError> {
        self.teardown(TeardownReason::AccountDeleted)
    }

    /// Teardown after the backend rejected the access token
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be cleared.
    pub fn expire(&self) -> Result<(), StorageError> {
        self.teardown(TeardownReason::Unauthorized)
    }

    /// Clear the stored tokens and flip to `Unauthenticated` under one lock
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be cleared. The state still
    /// follows the store, so a failed clear leaves the session authenticated.
    pub fn teardown(&self, reason: TeardownReason) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let cleared = self.store.clear();
        self.resync(&mut state);

        match cleared {
            Ok(()) => {
                LoggingHelper::log_session_teardown(reason);
                Ok(())
            }
            Err(e) => {
                LoggingHelper::log_storage_failure("clear", &e);
                Err(e)
            }
        }
    }

    fn resync(&self, state: &mut SessionState) -> SessionState {
        let next = SessionState::from_store(self.store.as_ref());
        if *state != next {
            *state = next;
            self.changes.send_replace(next);
        }
        next
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;

    fn controller_with(access: Option<&str>, refresh: Option<&str>) -> SessionController {
        SessionController::new(Arc::new(MemoryTokenStore::with_tokens(access, refresh)))
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    /// Store whose writes always fail
    struct BrokenStore(MemoryTokenStore);

    impl TokenStore for BrokenStore {
        fn get(&self, kind: TokenKind) -> Option<String> {
            self.0.get(kind)
        }

        fn set(&self, _kind: TokenKind, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: "broken".into(),
                source: std::io::Error::other("read-only"),
            })
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.set(TokenKind::Access, "")
        }
    }

    #[test]
    fn test_initial_state_follows_stored_access_token() {
        assert_eq!(
            controller_with(Some("abc"), None).state(),
            SessionState::Authenticated
        );
        assert_eq!(
            controller_with(None, Some("def")).state(),
            SessionState::Unauthenticated
        );
        assert_eq!(
            controller_with(None, None).state(),
            SessionState::Unauthenticated
        );
    }

    #[test]
    fn test_establish_persists_both_tokens() {
        let controller = controller_with(None, None);

        let state = controller.establish(&pair("abc", "def")).unwrap();

        assert_eq!(state, SessionState::Authenticated);
        let session = controller.snapshot();
        assert_eq!(session.access_token.as_deref(), Some("abc"));
        assert_eq!(session.refresh_token.as_deref(), Some("def"));
        assert!(session.is_authenticated);
    }

    #[test]
    fn test_establish_twice_is_idempotent() {
        let controller = controller_with(None, None);
        controller.establish(&pair("abc", "def")).unwrap();
        let first = controller.snapshot();

        controller.establish(&pair("abc", "def")).unwrap();

        assert_eq!(controller.snapshot(), first);
        assert!(controller.is_authenticated());
    }

    #[test]
    fn test_every_teardown_clears_tokens() {
        for reason in [
            TeardownReason::Logout,
            TeardownReason::AccountDeleted,
            TeardownReason::Unauthorized,
        ] {
            let controller = controller_with(Some("abc"), Some("def"));
            controller.teardown(reason).unwrap();

            assert_eq!(controller.state(), SessionState::Unauthenticated);
            assert_eq!(controller.snapshot(), Session::default());
        }
    }

    #[test]
    fn test_logout_when_already_signed_out() {
        let controller = controller_with(None, None);
        controller.logout().unwrap();
        assert_eq!(controller.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let controller = controller_with(None, None);
        let mut changes = controller.subscribe();
        assert_eq!(*changes.borrow_and_update(), SessionState::Unauthenticated);

        controller.establish(&pair("abc", "def")).unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), SessionState::Authenticated);

        controller.expire().unwrap();
        assert_eq!(*changes.borrow_and_update(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_failed_clear_keeps_state_in_step_with_store() {
        let controller = SessionController::new(Arc::new(BrokenStore(
            MemoryTokenStore::with_tokens(Some("abc"), Some("def")),
        )));

        assert!(controller.logout().is_err());
        // Tokens are still stored, so the session must still read as authenticated
        assert!(controller.is_authenticated());
        assert_eq!(controller.access_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_failed_write_stays_unauthenticated() {
        let controller = SessionController::new(Arc::new(BrokenStore(MemoryTokenStore::new())));

        assert!(controller.establish(&pair("abc", "def")).is_err());
        assert_eq!(controller.state(), SessionState::Unauthenticated);
    }
}

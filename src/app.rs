//! Wiring of the client from settings
//!
//! Every component that reads or writes tokens shares one
//! [`SessionController`], which in turn owns the only [`TokenStore`].

use std::sync::Arc;

use crate::api::{ApiError, AuthenticatedHttpClient, BackendApi};
use crate::home::HomeView;
use crate::oauth::{LoginError, LoginFlow, OAuthRedirectHandler};
use crate::router::Router;
use crate::session::SessionController;
use crate::settings::ClientSettings;
use crate::storage::{FileTokenStore, OAuthStateStore, StorageError, TokenStore};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("token store: {0}")]
    Storage(#[from] StorageError),
    #[error("backend client: {0}")]
    Api(#[from] ApiError),
    #[error("login flow: {0}")]
    Login(#[from] LoginError),
}

/// Fully wired client
#[derive(Debug, Clone)]
pub struct NotekeepClient {
    pub session: Arc<SessionController>,
    pub redirects: Arc<OAuthRedirectHandler>,
    pub login: LoginFlow,
    pub api: BackendApi,
    pub router: Router,
}

impl NotekeepClient {
    /// Build the client with the file token store from `settings`
    ///
    /// # Errors
    ///
    /// Returns an error if the token file is unreadable or the backend URL
    /// is invalid.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, SetupError> {
        let path = settings.token_path();
        log::debug!("Using token store at {}", path.display());
        let store = FileTokenStore::open(path)?;
        Self::with_store(&settings.application.backend_url, Arc::new(store))
    }

    /// Build the client around an existing token store
    ///
    /// # Errors
    ///
    /// Returns an error if `backend_url` is invalid.
    pub fn with_store(
        backend_url: &str,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, SetupError> {
        let session = Arc::new(SessionController::new(store));
        let states = Arc::new(OAuthStateStore::new());
        let redirects = OAuthRedirectHandler::new(session.clone(), states.clone());
        let login = LoginFlow::new(backend_url, states, redirects.clone())?;
        let client = AuthenticatedHttpClient::new(backend_url, session.clone())?;

        Ok(Self {
            router: Router::new(session.clone()),
            redirects: Arc::new(redirects),
            api: BackendApi::new(client),
            login,
            session,
        })
    }

    /// A fresh main view over this client's backend
    #[must_use]
    pub fn home(&self) -> HomeView {
        HomeView::new(self.api.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Route;
    use crate::storage::MemoryTokenStore;

    #[test]
    fn test_components_share_one_session() {
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("abc"), Some("def")));
        let client = NotekeepClient::with_store("http://localhost:8000", store).unwrap();

        assert!(Arc::ptr_eq(&client.session, client.api.client().session()));
        assert!(Arc::ptr_eq(&client.session, client.redirects.session()));
        assert_eq!(client.router.landing(), Route::Home);

        client.session.logout().unwrap();
        assert_eq!(client.router.landing(), Route::Login);
    }

    #[test]
    fn test_invalid_backend_url_is_rejected() {
        let store = Arc::new(MemoryTokenStore::new());
        let result = NotekeepClient::with_store("not a url", store);
        assert!(matches!(result, Err(SetupError::Login(LoginError::InvalidUrl(_)))));
    }
}

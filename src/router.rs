//! Route selection from session state
//!
//! Signed out, the client knows the login page and the OAuth redirect
//! target; any other path goes back to login. Signed in, only the home view
//! exists and every path lands there.

use std::sync::Arc;

use crate::session::{SessionController, SessionState};

pub const LOGIN_PATH: &str = "/";
pub const AUTH_SUCCESS_PATH: &str = "/auth-success";
pub const HOME_PATH: &str = "/home";

/// Views of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    /// OAuth redirect target
    AuthSuccess,
    /// Main view: profile and notes
    Home,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::AuthSuccess => AUTH_SUCCESS_PATH,
            Self::Home => HOME_PATH,
        }
    }
}

/// Result of resolving a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the route for the requested path
    Render(Route),
    /// The path is not available in this state; go to the route instead
    Redirect(Route),
}

impl Navigation {
    /// Route that ends up on screen
    #[must_use]
    pub const fn route(self) -> Route {
        match self {
            Self::Render(route) | Self::Redirect(route) => route,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    session: Arc<SessionController>,
}

impl Router {
    #[must_use]
    pub fn new(session: Arc<SessionController>) -> Self {
        Self { session }
    }

    /// Resolve `path` (query string allowed) against the current state
    #[must_use]
    pub fn resolve(&self, path: &str) -> Navigation {
        Self::resolve_for(self.session.state(), path)
    }

    /// Where the client lands with no particular path in mind
    #[must_use]
    pub fn landing(&self) -> Route {
        self.resolve(LOGIN_PATH).route()
    }

    /// Pure routing table
    #[must_use]
    pub fn resolve_for(state: SessionState, path: &str) -> Navigation {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => LOGIN_PATH,
            trimmed => trimmed,
        };

        match state {
            SessionState::Unauthenticated => match path {
                LOGIN_PATH => Navigation::Render(Route::Login),
                AUTH_SUCCESS_PATH => Navigation::Render(Route::AuthSuccess),
                _ => Navigation::Redirect(Route::Login),
            },
            SessionState::Authenticated => match path {
                HOME_PATH => Navigation::Render(Route::Home),
                _ => Navigation::Redirect(Route::Home),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;

    #[test]
    fn test_signed_out_routes() {
        let state = SessionState::Unauthenticated;
        assert_eq!(Router::resolve_for(state, "/"), Navigation::Render(Route::Login));
        assert_eq!(
            Router::resolve_for(state, "/auth-success?access_token=abc&refresh_token=def"),
            Navigation::Render(Route::AuthSuccess)
        );
        assert_eq!(
            Router::resolve_for(state, "/home"),
            Navigation::Redirect(Route::Login)
        );
        assert_eq!(
            Router::resolve_for(state, "/anything/else"),
            Navigation::Redirect(Route::Login)
        );
    }

    #[test]
    fn test_signed_in_routes() {
        let state = SessionState::Authenticated;
        assert_eq!(Router::resolve_for(state, "/home"), Navigation::Render(Route::Home));
        assert_eq!(Router::resolve_for(state, "/home/"), Navigation::Render(Route::Home));
        assert_eq!(Router::resolve_for(state, "/"), Navigation::Redirect(Route::Home));
        // The redirect target is not reachable once signed in
        assert_eq!(
            Router::resolve_for(state, "/auth-success?access_token=x"),
            Navigation::Redirect(Route::Home)
        );
    }

    #[test]
    fn test_landing_follows_session() {
        let session = Arc::new(SessionController::new(Arc::new(
            MemoryTokenStore::with_tokens(Some("abc"), Some("def")),
        )));
        let router = Router::new(session.clone());
        assert_eq!(router.landing(), Route::Home);

        session.logout().unwrap();
        assert_eq!(router.landing(), Route::Login);
    }
}

// Local OAuth redirect listener
use actix_web::dev::ServerHandle;
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpResponse, HttpServer};
use log::debug;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::oauth::{OAuthRedirectHandler, RedirectOutcome};
use crate::settings::CallbackSettings;
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;

/// Channel the listener reports each handled redirect on
pub type OutcomeSender = mpsc::UnboundedSender<RedirectOutcome>;

/// Handle one redirect navigation from the identity provider
pub async fn auth_success(
    req: HttpRequest,
    handler: web::Data<OAuthRedirectHandler>,
    outcomes: web::Data<OutcomeSender>,
) -> HttpResponse {
    debug!("OAuth redirect received on {}", req.path());

    let outcome = handler.handle_query(req.query_string());
    let response = match &outcome.failure {
        None => ResponseBuilder::login_complete(),
        Some(message) => ResponseBuilder::login_failed(message),
    };

    if outcomes.send(outcome).is_err() {
        debug!("No one is waiting for the redirect outcome");
    }
    response
}

async fn not_found() -> HttpResponse {
    ResponseBuilder::not_found()
}

/// One-shot HTTP listener for the OAuth redirect
pub struct CallbackServer {
    handle: ServerHandle,
    outcomes: mpsc::UnboundedReceiver<RedirectOutcome>,
    local_addr: SocketAddr,
    path: String,
}

impl CallbackServer {
    /// Bind the listener and start serving in the background
    ///
    /// Port 0 picks a free port; see [`CallbackServer::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub fn start(
        settings: &CallbackSettings,
        handler: Arc<OAuthRedirectHandler>,
    ) -> std::io::Result<Self> {
        let (sender, outcomes) = mpsc::unbounded_channel();
        let path = settings.path.clone();
        let route_path = path.clone();
        let handler = web::Data::from(handler);

        let server = HttpServer::new(move || {
            App::new()
                .app_data(handler.clone())
                .app_data(web::Data::new(sender.clone()))
                .wrap(Logger::default())
                .route(&route_path, web::get().to(auth_success))
                .default_service(web::to(not_found))
        })
        .workers(1)
        .bind((settings.host.as_str(), settings.port))?;

        let local_addr = server
            .addrs()
            .first()
            .copied()
            .ok_or_else(|| std::io::Error::other("callback listener has no address"))?;

        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let this = Self {
            handle,
            outcomes,
            local_addr,
            path,
        };
        LoggingHelper::log_callback_listener(&this.redirect_url());
        Ok(this)
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL the backend should redirect to
    #[must_use]
    pub fn redirect_url(&self) -> String {
        format!("http://{}{}", self.local_addr, self.path)
    }

    /// Wait for the next redirect, then shut the listener down
    pub async fn wait(mut self) -> Option<RedirectOutcome> {
        let outcome = self.outcomes.recv().await;
        self.handle.stop(true).await;
        outcome
    }

    /// Stop without waiting for a redirect
    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Route;
    use crate::session::SessionController;
    use crate::storage::{MemoryTokenStore, OAuthStateStore, TokenKind, TokenStore};
    use actix_web::{http::StatusCode, test};

    fn redirect_handler(store: Arc<MemoryTokenStore>) -> OAuthRedirectHandler {
        let session = Arc::new(SessionController::new(store));
        OAuthRedirectHandler::new(session, Arc::new(OAuthStateStore::new()))
    }

    #[actix_web::test]
    async fn test_handler_stores_tokens_and_reports_outcome() {
        let store = Arc::new(MemoryTokenStore::new());
        let (sender, mut outcomes) = mpsc::unbounded_channel::<RedirectOutcome>();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(redirect_handler(store.clone())))
                .app_data(web::Data::new(sender))
                .route("/auth-success", web::get().to(auth_success)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/auth-success?access_token=abc&refresh_token=def")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("abc"));
        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.route, Route::Home);
    }

    #[actix_web::test]
    async fn test_handler_rejects_incomplete_redirect() {
        let store = Arc::new(MemoryTokenStore::new());
        let (sender, mut outcomes) = mpsc::unbounded_channel::<RedirectOutcome>();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(redirect_handler(store.clone())))
                .app_data(web::Data::new(sender))
                .route("/auth-success", web::get().to(auth_success)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/auth-success?access_token=abc")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.get(TokenKind::Access), None);
        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.route, Route::Login);
        assert!(outcome.failure.is_some());
    }

    #[actix_web::test]
    async fn test_listener_receives_one_redirect() {
        let store = Arc::new(MemoryTokenStore::new());
        let settings = CallbackSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            path: "/auth-success".to_string(),
        };
        let server = CallbackServer::start(&settings, Arc::new(redirect_handler(store.clone())))
            .unwrap();
        let url = format!("{}?access_token=abc&refresh_token=def", server.redirect_url());

        let response = reqwest::get(&url).await.unwrap();
        assert!(response.status().is_success());

        let outcome = server.wait().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("def"));
    }
}

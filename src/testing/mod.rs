//! In-process notes backend for tests
//!
//! [`MockBackend`] serves the backend routes the client calls on a free
//! local port. It issues bearer tokens through the test provider, checks
//! them on every protected route and records each `Authorization` header it
//! sees, so tests can assert on what the client actually sent.

use actix_web::dev::ServerHandle;
use actix_web::http::header::{AUTHORIZATION, LOCATION};
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{NewNote, Note, TokenPair, User};

pub const TEST_USER_NAME: &str = "Test User";
pub const TEST_USER_EMAIL: &str = "test@example.com";
/// Where the test provider sends the browser after login
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug)]
struct BackendState {
    user: Option<User>,
    valid_tokens: HashSet<String>,
    issued: u32,
    authorization_headers: Vec<Option<String>>,
    fail_next: Option<u16>,
    delay: Option<Duration>,
    app_base_url: String,
}

impl BackendState {
    fn new() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            user: Some(User {
                id: Uuid::new_v4(),
                name: TEST_USER_NAME.to_string(),
                email: TEST_USER_EMAIL.to_string(),
                created_date: now.clone(),
                last_login_date: now,
                notes: Vec::new(),
            }),
            valid_tokens: HashSet::new(),
            issued: 0,
            authorization_headers: Vec::new(),
            fail_next: None,
            delay: None,
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
        }
    }

    fn issue(&mut self) -> TokenPair {
        self.issued += 1;
        let pair = TokenPair {
            access_token: format!("access-{}", self.issued),
            refresh_token: format!("refresh-{}", self.issued),
        };
        self.valid_tokens.insert(pair.access_token.clone());
        pair
    }

    /// Record the header, then apply injected failures and the token check
    fn authorize(&mut self, req: &HttpRequest) -> Result<(), HttpResponse> {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        self.authorization_headers.push(header.clone());

        if let Some(status) = self.fail_next.take() {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return Err(detail(status, "Injected failure"));
        }

        let token = header
            .as_deref()
            .and_then(|value| value.strip_prefix("Bearer "));
        match token {
            Some(token) if self.valid_tokens.contains(token) => Ok(()),
            _ => Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
        }
    }
}

type Shared = web::Data<Mutex<BackendState>>;

fn lock(state: &Mutex<BackendState>) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn detail(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "detail": message }))
}

async fn pause(state: &Mutex<BackendState>) {
    let delay = lock(state).delay;
    if let Some(delay) = delay {
        actix_web::rt::time::sleep(delay).await;
    }
}

async fn login_google() -> HttpResponse {
    let state = Uuid::new_v4().to_string();
    HttpResponse::Ok().json(json!({
        "authorization_url": format!(
            "https://accounts.google.com/o/oauth2/v2/auth?response_type=code&state={state}"
        ),
        "state": state,
    }))
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

async fn test_callback(state: Shared, query: web::Query<CallbackQuery>) -> HttpResponse {
    if query.code.as_deref() != Some(crate::oauth::login::TEST_PROVIDER_CODE) {
        return detail(StatusCode::BAD_REQUEST, "Invalid authorization code");
    }

    let mut state = lock(&state);
    let pair = state.issue();
    let mut location = match url::Url::parse(&state.app_base_url) {
        Ok(url) => url,
        Err(_) => return detail(StatusCode::INTERNAL_SERVER_ERROR, "Bad redirect base"),
    };
    location.set_path("/auth-success");
    location
        .query_pairs_mut()
        .append_pair("access_token", &pair.access_token)
        .append_pair("refresh_token", &pair.refresh_token);

    HttpResponse::TemporaryRedirect()
        .insert_header((LOCATION, location.as_str()))
        .finish()
}

async fn me(req: HttpRequest, state: Shared) -> HttpResponse {
    pause(&state).await;
    let mut state = lock(&state);
    if let Err(response) = state.authorize(&req) {
        return response;
    }
    match &state.user {
        Some(user) => HttpResponse::Ok().json(user),
        None => detail(StatusCode::NOT_FOUND, "User not found"),
    }
}

#[derive(Deserialize)]
struct NameQuery {
    new_name: String,
}

async fn update_name(req: HttpRequest, state: Shared, query: web::Query<NameQuery>) -> HttpResponse {
    pause(&state).await;
    let mut state = lock(&state);
    if let Err(response) = state.authorize(&req) {
        return response;
    }
    match state.user.as_mut() {
        Some(user) => {
            user.name.clone_from(&query.new_name);
            HttpResponse::Ok().json(&*user)
        }
        None => detail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn add_note(req: HttpRequest, state: Shared, body: web::Json<NewNote>) -> HttpResponse {
    pause(&state).await;
    let mut state = lock(&state);
    if let Err(response) = state.authorize(&req) {
        return response;
    }
    match state.user.as_mut() {
        Some(user) => {
            let note = Note {
                id: Uuid::new_v4(),
                content: body.into_inner().content,
            };
            user.notes.push(note.clone());
            HttpResponse::Ok().json(note)
        }
        None => detail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn delete_note(req: HttpRequest, state: Shared, id: web::Path<Uuid>) -> HttpResponse {
    pause(&state).await;
    let mut state = lock(&state);
    if let Err(response) = state.authorize(&req) {
        return response;
    }
    let id = id.into_inner();
    let Some(user) = state.user.as_mut() else {
        return detail(StatusCode::NOT_FOUND, "User not found");
    };
    let before = user.notes.len();
    user.notes.retain(|note| note.id != id);
    if user.notes.len() == before {
        return detail(StatusCode::NOT_FOUND, "Note not found");
    }
    HttpResponse::NoContent().finish()
}

async fn delete_account(req: HttpRequest, state: Shared) -> HttpResponse {
    pause(&state).await;
    let mut state = lock(&state);
    if let Err(response) = state.authorize(&req) {
        return response;
    }
    state.user = None;
    state.valid_tokens.clear();
    HttpResponse::Ok().json(json!({ "message": "User account deleted successfully" }))
}

/// Running mock backend; stops when [`MockBackend::stop`] is awaited
pub struct MockBackend {
    handle: ServerHandle,
    addr: SocketAddr,
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    /// Start the backend on a free local port
    ///
    /// Must be called from within an actix runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub fn start() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(BackendState::new()));
        let data = web::Data::from(state.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/users/login/google", web::get().to(login_google))
                .route("/users/auth/test/callback", web::get().to(test_callback))
                .route("/users/me", web::get().to(me))
                .route("/users/me", web::delete().to(delete_account))
                .route("/users/me/name", web::put().to(update_name))
                .route("/users/me/notes", web::post().to(add_note))
                .route("/users/me/notes/{id}", web::delete().to(delete_note))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server
            .addrs()
            .first()
            .copied()
            .ok_or_else(|| std::io::Error::other("mock backend has no address"))?;
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Ok(Self {
            handle,
            addr,
            state,
        })
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        lock(&self.state)
    }

    /// Issue a valid token pair without going through the login flow
    #[must_use]
    pub fn issue_tokens(&self) -> TokenPair {
        self.state().issue()
    }

    /// Invalidate every issued access token
    pub fn revoke_all(&self) {
        self.state().valid_tokens.clear();
    }

    /// Answer the next protected request with `status`
    pub fn fail_next(&self, status: u16) {
        self.state().fail_next = Some(status);
    }

    /// Hold every protected request for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// Base URL the test provider redirects to
    pub fn set_app_base_url(&self, url: &str) {
        self.state().app_base_url = url.to_string();
    }

    /// `Authorization` headers of every protected request, in order
    #[must_use]
    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.state().authorization_headers.clone()
    }

    #[must_use]
    pub fn notes(&self) -> Vec<Note> {
        self.state()
            .user
            .as_ref()
            .map(|user| user.notes.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn user_name(&self) -> Option<String> {
        self.state().user.as_ref().map(|user| user.name.clone())
    }

    #[must_use]
    pub fn account_exists(&self) -> bool {
        self.state().user.is_some()
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

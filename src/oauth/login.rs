//! Login initiation for the Google and test identity providers

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::sync::Arc;
use url::Url;

use super::redirect::{OAuthCallbackResult, OAuthRedirectHandler, RedirectOutcome};
use crate::models::{ErrorBody, OAuthLoginResponse};
use crate::storage::OAuthStateStore;

pub const GOOGLE_LOGIN_PATH: &str = "/users/login/google";
pub const TEST_CALLBACK_PATH: &str = "/users/auth/test/callback";
/// Authorization code the test provider accepts
pub const TEST_PROVIDER_CODE: &str = "test-code";

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("could not reach the backend: {0}")]
    Network(#[from] reqwest::Error),
    #[error("login was rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid login response: {0}")]
    InvalidResponse(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Starts logins against the backend
///
/// These requests are unauthenticated and go through their own client: the
/// test-provider client stops following redirects as soon as one carries the
/// token parameters, so the final hop to the client's success page is handed
/// to the redirect handler instead of being fetched.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    http: Client,
    backend_url: Url,
    states: Arc<OAuthStateStore>,
    redirects: OAuthRedirectHandler,
}

impl LoginFlow {
    /// # Errors
    ///
    /// Returns an error if `backend_url` is invalid or the HTTP client cannot
    /// be built.
    pub fn new(
        backend_url: &str,
        states: Arc<OAuthStateStore>,
        redirects: OAuthRedirectHandler,
    ) -> Result<Self, LoginError> {
        let http = Client::builder()
            .redirect(Policy::custom(|attempt| {
                if OAuthCallbackResult::from_url(attempt.url()).carries_tokens() {
                    attempt.stop()
                } else if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else {
                    attempt.follow()
                }
            }))
            .build()?;

        Ok(Self {
            http,
            backend_url: Url::parse(backend_url)?,
            states,
            redirects,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LoginError> {
        let joined = format!(
            "{}/{}",
            self.backend_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    /// Ask the backend for a Google authorization URL
    ///
    /// The returned `state` is stored before the URL is handed back, so it
    /// exists by the time the user reaches the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable, rejects the request or
    /// answers with an unusable body.
    pub async fn start_google(&self) -> Result<Url, LoginError> {
        let response = self.http.get(self.endpoint(GOOGLE_LOGIN_PATH)?).send().await?;
        let response = ensure_success(response).await?;
        let login: OAuthLoginResponse = response
            .json()
            .await
            .map_err(|e| LoginError::InvalidResponse(e.to_string()))?;

        let authorization_url = Url::parse(&login.authorization_url)
            .map_err(|e| LoginError::InvalidResponse(format!("authorization_url: {e}")))?;
        self.states.put(&login.state);
        log::info!("🔍 Google authorization URL issued by backend");
        Ok(authorization_url)
    }

    /// Log in through the test provider
    ///
    /// The backend answers the callback with a redirect to the client's
    /// success URL; that URL goes to the redirect handler exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or rejects the code.
    pub async fn test_login(&self) -> Result<RedirectOutcome, LoginError> {
        let mut url = self.endpoint(TEST_CALLBACK_PATH)?;
        url.query_pairs_mut().append_pair("code", TEST_PROVIDER_CODE);

        let response = self.http.get(url).send().await?;
        let final_url = if response.status().is_redirection() {
            redirect_target(&response)?
        } else {
            ensure_success(response).await?.url().clone()
        };

        log::debug!("Test provider redirected to {}", final_url.path());
        Ok(self.redirects.handle_url(&final_url))
    }
}

/// Resolve the `Location` of a redirect response the client stopped at
fn redirect_target(response: &Response) -> Result<Url, LoginError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| LoginError::InvalidResponse("redirect without Location".to_string()))?;
    Ok(response.url().join(location)?)
}

async fn ensure_success(response: Response) -> Result<Response, LoginError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Login failed").to_string());
    log::error!("Login request failed with status {status}: {message}");
    Err(LoginError::Rejected {
        status: status.as_u16(),
        message,
    })
}

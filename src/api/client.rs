//! HTTP client that attaches the session's bearer token to backend requests
//!
//! The access token is read from the token store on every request, never
//! cached here. A 401 answer tears the session down before the caller sees
//! [`ApiError::Unauthorized`]; the request is not retried.

use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use super::error::ApiError;
use crate::models::ErrorBody;
use crate::session::SessionController;
use crate::utils::logging::LoggingHelper;

const CLIENT_USER_AGENT: &str = concat!("notekeep/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    http: Client,
    base_url: Url,
    session: Arc<SessionController>,
}

impl AuthenticatedHttpClient {
    /// Create a client for the backend at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn new(base_url: &str, session: Arc<SessionController>) -> Result<Self, ApiError> {
        Self::with_client(Client::new(), base_url, session)
    }

    /// Create a client reusing an existing `reqwest::Client`
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn with_client(
        http: Client,
        base_url: &str,
        session: Arc<SessionController>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            session,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a backend-relative path against the base URL
    ///
    /// The base URL's own path is kept, so `http://host/api` + `/users/me`
    /// gives `http://host/api/users/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    /// GET `path` and decode the JSON body
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedHttpClient::execute`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?;
        self.execute(Method::GET, path, request).await
    }

    /// PUT `path` with query parameters and no body
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedHttpClient::execute`].
    pub async fn put_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::PUT, path)?.query(query);
        self.execute(Method::PUT, path, request).await
    }

    /// POST a JSON body to `path`
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedHttpClient::execute`].
    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path)?.json(body);
        self.execute(Method::POST, path, request).await
    }

    /// DELETE `path` and decode the JSON body
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedHttpClient::execute`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::DELETE, path)?;
        self.execute(Method::DELETE, path, request).await
    }

    /// DELETE `path`, ignoring whatever body comes back
    ///
    /// # Errors
    ///
    /// See [`AuthenticatedHttpClient::execute`].
    pub async fn delete_discarding(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path)?;
        self.send(Method::DELETE, path, request).await.map(drop)
    }

    /// Build a request carrying the current bearer token
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not form a valid URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        let token = self.session.access_token();
        LoggingHelper::log_request(&method, path, token.is_some());

        let mut builder = self
            .http
            .request(method, url)
            .header(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send a request and decode a JSON success body
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] on 401, after the session was torn down
    /// - [`ApiError::RequestFailed`] on any other status >= 400
    /// - [`ApiError::Network`] when no response arrives
    /// - [`ApiError::Decode`] when the success body has the wrong shape
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, request).await?;
        let bytes = response.bytes().await.map_err(ApiError::Network)?;
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                LoggingHelper::log_network_error(&method, path, &e);
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Teardown failures are logged by the controller; the caller still
            // has to treat the session as gone.
            let _ = self.session.expire();
            return Err(ApiError::Unauthorized);
        }

        if status.is_client_error() || status.is_server_error() {
            let message = failure_message(status, response).await;
            LoggingHelper::log_request_failed(&method, path, status.as_u16(), &message);
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

/// Best-effort message for a failed response: the backend's `detail`, the raw
/// body, or the canonical reason phrase
async fn failure_message(status: StatusCode, response: Response) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };

    let Ok(text) = response.text().await else {
        return fallback();
    };

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        if let Some(message) = body.message() {
            return message;
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Debug for AuthenticatedHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedHttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

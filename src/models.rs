//! Data shared between the session layer and the backend API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Client view of the current session
///
/// `is_authenticated` is derived: it is true iff an access token is present.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
}

impl Session {
    #[must_use]
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        let is_authenticated = access_token.as_deref().is_some_and(|t| !t.is_empty());
        Self {
            access_token,
            refresh_token,
            is_authenticated,
        }
    }
}

// Tokens never reach logs through Debug
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// Access and refresh token pair obtained from a completed login
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair { <redacted> }")
    }
}

/// Response of `GET /users/login/google`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthLoginResponse {
    pub authorization_url: String,
    pub state: String,
}

/// A single note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
}

/// Body of `POST /users/me/notes`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewNote {
    pub content: String,
}

/// Profile of the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_date: String,
    pub last_login_date: String,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl User {
    /// Registration time, when the backend sent a parseable timestamp
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_backend_timestamp(&self.created_date)
    }

    #[must_use]
    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        parse_backend_timestamp(&self.last_login_date)
    }
}

/// Response of `DELETE /users/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteAccountResponse {
    pub message: String,
}

/// Error body returned by the backend (`{"detail": ...}`)
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Human-readable detail, if the body carried one
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Parse timestamps as the backend emits them: RFC 3339, or naive UTC
fn parse_backend_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_derives_authenticated_flag() {
        assert!(Session::new(Some("abc".into()), None).is_authenticated);
        assert!(!Session::new(None, Some("def".into())).is_authenticated);
        assert!(!Session::new(Some(String::new()), Some("def".into())).is_authenticated);
    }

    #[test]
    fn test_debug_output_redacts_tokens() {
        let session = Session::new(Some("secret-access".into()), Some("secret-refresh".into()));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));

        let pair = TokenPair {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
        };
        assert!(!format!("{pair:?}").contains("secret"));
    }

    #[test]
    fn test_user_deserializes_without_notes() {
        let json = r#"{
            "id": "5f0c8a4e-2b1d-4f7e-9a53-0d6c1b2e3f40",
            "name": "Test User",
            "email": "test@example.com",
            "created_date": "2024-03-01T10:15:30.123456",
            "last_login_date": "2024-03-02T08:00:00+00:00"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.notes.is_empty());
        assert!(user.created_at().is_some());
        assert!(user.last_login_at().is_some());
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Not found"}"#).unwrap();
        assert_eq!(body.message(), Some("Not found".to_string()));

        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": [{"msg": "too short"}]}"#).unwrap();
        assert!(body.message().unwrap().contains("too short"));

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.message(), None);
    }
}

//! Error taxonomy for backend calls
//!
//! Only [`ApiError::Unauthorized`] is a session event. Everything else stays
//! with the caller that issued the request.

/// Failure of a backend request
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered 401; the session has been torn down
    #[error("session is no longer valid")]
    Unauthorized,

    /// Any other 4xx/5xx answer
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// No response was received
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A success response whose body did not match the expected shape
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The backend URL or request path could not form a valid URL
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether this error ended the session
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unauthorized_is_a_session_event() {
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::RequestFailed {
            status: 403,
            message: "forbidden".into()
        }
        .is_unauthorized());
        assert!(!ApiError::Decode("bad".into()).is_unauthorized());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), Some(401));
        assert_eq!(
            ApiError::RequestFailed {
                status: 500,
                message: String::new()
            }
            .status(),
            Some(500)
        );
        assert_eq!(ApiError::Decode(String::new()).status(), None);
    }
}

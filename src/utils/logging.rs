// Centralized logging for session lifecycle events. Token values are never logged.
use log::{debug, error, info, warn};

use crate::session::{SessionState, TeardownReason};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the state restored from storage at startup
    pub fn log_session_restored(state: SessionState) {
        match state {
            SessionState::Authenticated => info!("🔑 Restored session from stored access token"),
            SessionState::Unauthenticated => info!("🔒 No stored access token, starting signed out"),
        }
    }

    /// Log a completed login
    pub fn log_login_success() {
        info!("✅ Stored tokens from OAuth redirect, session is authenticated");
        // Refresh tokens are kept for later use; nothing exchanges them yet.
        debug!("Refresh token persisted; no refresh flow is configured");
    }

    /// Log a session teardown
    pub fn log_session_teardown(reason: TeardownReason) {
        match reason {
            TeardownReason::Logout => info!("👋 Logged out, tokens cleared"),
            TeardownReason::AccountDeleted => info!("🗑️  Account deleted, tokens cleared"),
            TeardownReason::Unauthorized => {
                warn!("⚠️  Backend rejected the access token, tokens cleared");
            }
            TeardownReason::RejectedRedirect => {
                warn!("⚠️  Login redirect was incomplete, previous tokens cleared");
            }
        }
    }

    /// Log a failed attempt to clear or write tokens
    pub fn log_storage_failure(operation: &str, err: &dyn std::error::Error) {
        error!("Token store {operation} failed: {err}");
    }

    /// Log a redirect that did not carry a usable token pair
    pub fn log_callback_failure(reason: &dyn std::fmt::Display) {
        error!("OAuth redirect rejected: {reason}");
    }

    /// Log that a stored OAuth state went unchecked on callback
    pub fn log_unverified_state() {
        warn!("OAuth state was stored for this login but is not verified on callback");
    }

    /// Log an outgoing backend request
    pub fn log_request(method: &reqwest::Method, path: &str, has_token: bool) {
        debug!(
            "➡️  {method} {path} (bearer token: {})",
            if has_token { "present" } else { "missing" }
        );
    }

    /// Log a backend failure that is not a session event
    pub fn log_request_failed(method: &reqwest::Method, path: &str, status: u16, message: &str) {
        warn!("{method} {path} failed with status {status}: {message}");
    }

    /// Log a request that never got a response
    pub fn log_network_error(method: &reqwest::Method, path: &str, err: &reqwest::Error) {
        error!("{method} {path} did not complete: {err}");
    }

    /// Log the callback listener address
    pub fn log_callback_listener(url: &str) {
        info!("🎧 Waiting for OAuth redirect on {url}");
    }
}

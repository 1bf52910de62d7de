//! Session Management Module
//!
//! - [`controller`] - authentication state machine backed by the token store

pub mod controller;

pub use controller::{SessionController, SessionState, TeardownReason};

// HTTP handlers served by the client itself
pub mod callback;

pub use callback::{auth_success, CallbackServer, OutcomeSender};

pub mod in_flight;
pub mod logging;
pub mod responses;

pub use in_flight::{InFlight, InFlightGuard};

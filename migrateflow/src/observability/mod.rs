//! Observability utilities.

mod logging;
mod summary;

pub use logging::init_logging;
pub use summary::{PhaseReport, PhaseTimer};

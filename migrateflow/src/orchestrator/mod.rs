//! Phase orchestration.
//!
//! This module provides:
//! - The [`Manager`] that drives discovery, connector checks, prepare and commit
//! - Ordered, optionally concurrent, per-unit execution
//! - Optional on-disk staging of prepared payloads

mod checker;
mod committer;
mod manager;
mod phase;
mod prepared;
mod preparer;
mod staging;


pub use manager::Manager;
pub use staging::StagingArea;

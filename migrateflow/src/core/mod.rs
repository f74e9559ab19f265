//! Core types for the migration protocol.
//!
//! This module contains:
//! - Units of migration work and their payloads
//! - The connector contract and readiness checks
//! - Phase and run-state enums
//! - Run identity

mod connector;
mod identity;
mod state;
mod unit;

pub use connector::{Connector, ConnectorCheck, ConnectorKind};
pub use identity::RunIdentity;
pub use state::{Phase, RunState};
pub use unit::{Payload, Unit};

//! Phase and run-state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phase of the migration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Instantiating pipelines from registered providers.
    Discover,
    /// Probing every pipeline connector for readiness.
    CheckConnectors,
    /// Dry-validating and transforming units.
    Prepare,
    /// Writing prepared units to their destination.
    Commit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discover => write!(f, "discover"),
            Self::CheckConnectors => write!(f, "check_connectors"),
            Self::Prepare => write!(f, "prepare"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Where one orchestrator invocation stands.
///
/// The orchestrator only moves between states when the caller invokes a
/// phase; it never advances on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Nothing has run yet.
    Idle,
    /// Pipelines were discovered.
    Discovered,
    /// Connectors were checked.
    ConnectorsChecked,
    /// Units were prepared.
    Prepared,
    /// Prepared units were committed (possibly partially).
    Committed,
    /// Commit was skipped because of dry-run.
    Skipped,
    /// A phase stopped early because of stop-on-error or a staging fault.
    Aborted,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Discovered => write!(f, "discovered"),
            Self::ConnectorsChecked => write!(f, "connectors_checked"),
            Self::Prepared => write!(f, "prepared"),
            Self::Committed => write!(f, "committed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl RunState {
    /// Returns true if no further phase is expected.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Skipped | Self::Aborted)
    }
}

//! Per-phase summaries.

use crate::core::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// Measures one phase call.
#[derive(Debug)]
pub struct PhaseTimer {
    run_id: Uuid,
    phase: Phase,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl PhaseTimer {
    /// Starts timing a phase.
    #[must_use]
    pub fn start(run_id: Uuid, phase: Phase) -> Self {
        Self {
            run_id,
            phase,
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer and returns an empty report for the phase.
    #[must_use]
    pub fn finish(self, pipelines: usize) -> PhaseReport {
        PhaseReport {
            run_id: self.run_id,
            phase: self.phase,
            started_at: self.started_at,
            duration_ms: self.elapsed_ms(),
            pipelines,
            units_attempted: 0,
            units_succeeded: 0,
            units_failed: 0,
            warnings: 0,
            aborted: false,
            skipped: false,
        }
    }
}

/// Summary of one phase call.
///
/// For the connector check, "units" are connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// The run this phase belongs to.
    pub run_id: Uuid,
    /// The phase.
    pub phase: Phase,
    /// When the phase started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Number of pipelines handed to the phase.
    pub pipelines: usize,
    /// Units attempted. A failed read from a unit stream counts as one.
    pub units_attempted: usize,
    /// Units that succeeded.
    pub units_succeeded: usize,
    /// Errors collected.
    pub units_failed: usize,
    /// Warnings collected.
    pub warnings: usize,
    /// Whether the phase stopped early.
    pub aborted: bool,
    /// Whether the phase was skipped (dry-run commit).
    pub skipped: bool,
}

impl PhaseReport {
    /// Returns the fraction of attempted units that succeeded.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.units_attempted == 0 {
            return 0.0;
        }
        self.units_succeeded as f64 / self.units_attempted as f64
    }

    /// Returns true if some units succeeded and some failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.units_succeeded > 0 && self.units_failed > 0
    }

    /// Emits the report as a structured tracing event.
    pub fn emit(&self) {
        tracing::info!(
            run_id = %self.run_id,
            phase = %self.phase,
            duration_ms = self.duration_ms,
            pipelines = self.pipelines,
            units_attempted = self.units_attempted,
            units_succeeded = self.units_succeeded,
            units_failed = self.units_failed,
            warnings = self.warnings,
            aborted = self.aborted,
            skipped = self.skipped,
            "Phase finished"
        );
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("phase".to_string(), serde_json::json!(self.phase.to_string()));
        map.insert("started_at".to_string(), serde_json::json!(self.started_at.to_rfc3339()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map.insert("pipelines".to_string(), serde_json::json!(self.pipelines));
        map.insert("units_attempted".to_string(), serde_json::json!(self.units_attempted));
        map.insert("units_succeeded".to_string(), serde_json::json!(self.units_succeeded));
        map.insert("units_failed".to_string(), serde_json::json!(self.units_failed));
        map.insert("success_rate".to_string(), serde_json::json!(self.success_rate()));
        map.insert("warnings".to_string(), serde_json::json!(self.warnings));
        map.insert("aborted".to_string(), serde_json::json!(self.aborted));
        map.insert("skipped".to_string(), serde_json::json!(self.skipped));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_finish() {
        let run_id = Uuid::new_v4();
        let report = PhaseTimer::start(run_id, Phase::Prepare).finish(3);

        assert_eq!(report.run_id, run_id);
        assert_eq!(report.phase, Phase::Prepare);
        assert_eq!(report.pipelines, 3);
        assert!(report.duration_ms >= 0.0);
        assert!(!report.aborted);
    }

    #[test]
    fn test_success_rate_and_partial() {
        let mut report = PhaseTimer::start(Uuid::new_v4(), Phase::Commit).finish(1);
        assert!(report.success_rate().abs() < f64::EPSILON);

        report.units_attempted = 4;
        report.units_succeeded = 3;
        report.units_failed = 1;

        assert!((report.success_rate() - 0.75).abs() < 0.001);
        assert!(report.is_partial());
        report.emit();
    }

    #[test]
    fn test_to_dict() {
        let report = PhaseTimer::start(Uuid::new_v4(), Phase::Commit).finish(2);
        let dict = report.to_dict();
        assert_eq!(dict.get("phase").unwrap(), "commit");
        assert_eq!(dict.get("pipelines").unwrap(), 2);
    }
}

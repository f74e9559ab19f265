//! Per-phase context handed to pipeline code.

use crate::core::Phase;
use crate::events::OutputSink;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Context for one pipeline during one phase.
///
/// Gives pipeline code read access to the run flags, a way to raise
/// non-fatal warnings, and the output sink.
pub struct PhaseContext {
    run_id: Uuid,
    phase: Phase,
    pipeline: String,
    debug: bool,
    dry_run: bool,
    sink: Arc<dyn OutputSink>,
    warnings: Mutex<Vec<String>>,
}

impl PhaseContext {
    /// Creates a new phase context.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        phase: Phase,
        pipeline: impl Into<String>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            run_id,
            phase,
            pipeline: pipeline.into(),
            debug: false,
            dry_run: false,
            sink,
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Sets the debug flag.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns true in debug mode.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Returns true in dry-run mode.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Raises a non-fatal warning for the current phase.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(
            pipeline = %self.pipeline,
            phase = %self.phase,
            warning = %message,
            "Pipeline warning"
        );
        self.warnings.lock().push(message);
    }

    /// Writes a line to the output sink.
    pub fn output(&self, line: &str) {
        self.sink.write_line(line);
    }

    /// Writes a line to the output sink only in debug mode.
    pub fn debug_output(&self, line: &str) {
        if self.debug {
            self.sink.write_line(line);
        }
    }

    /// Returns the warnings raised so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Drains the warnings raised so far.
    pub(crate) fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

impl std::fmt::Debug for PhaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseContext")
            .field("run_id", &self.run_id)
            .field("phase", &self.phase)
            .field("pipeline", &self.pipeline)
            .field("debug", &self.debug)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingSink;

    fn context(sink: Arc<CollectingSink>, debug: bool) -> PhaseContext {
        PhaseContext::new(Uuid::new_v4(), Phase::Prepare, "UsersPipeline", sink).with_debug(debug)
    }

    #[test]
    fn test_warnings_are_collected_and_drained() {
        let ctx = context(Arc::new(CollectingSink::new()), false);
        ctx.warn("duplicate email, keeping newest");
        ctx.warn("unknown locale");

        assert_eq!(ctx.warnings().len(), 2);
        assert_eq!(ctx.take_warnings().len(), 2);
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_debug_output_only_in_debug_mode() {
        let sink = Arc::new(CollectingSink::new());
        let quiet = context(sink.clone(), false);
        quiet.debug_output("hidden");
        quiet.output("shown");
        assert_eq!(sink.lines(), vec!["shown"]);

        let verbose = context(sink.clone(), true);
        verbose.debug_output("visible");
        assert_eq!(sink.len(), 2);
    }
}

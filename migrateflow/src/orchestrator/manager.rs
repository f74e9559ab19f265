//! The migration manager.

use super::checker::check_pipeline;
use super::committer::commit_pipeline;
use super::phase::{run_pipelines, PhaseEnv, PipelineOutcome};
use super::preparer::prepare_pipeline;
use super::prepared::PreparedStore;
use super::staging::StagingArea;
use crate::config::{RunConfig, StagingMode};
use crate::core::{Phase, RunIdentity, RunState};
use crate::discovery::PipelineRegistry;
use crate::errors::{DiscoveryError, MigrationError, PipelineError};
use crate::events::{default_sink, OutputSink};
use crate::observability::{PhaseReport, PhaseTimer};
use crate::pipeline::{Pipeline, PipelineFilter};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Orchestrates discovery, connector checks, prepare and commit.
///
/// One manager serves one invocation. It owns the collected errors and
/// warnings plus the prepared state between prepare and commit. Phases are
/// caller driven: after each call the caller inspects the outcome and
/// decides whether to run the next phase.
///
/// Warnings are phase-scoped. Every phase call clears the warning list
/// before running, so [`Manager::warnings`] always holds the warnings of
/// the most recent phase only.
///
/// # Example
///
/// ```rust,ignore
/// let mut manager = Manager::new(RunConfig::default());
/// let pipelines = manager.discover_pipelines(&registry);
/// manager.check_connectors(&pipelines).await;
/// manager.prepare(&pipelines).await?;
/// if manager.prepare_errors().is_empty() {
///     manager.commit(&pipelines).await?;
/// }
/// ```
pub struct Manager {
    config: RunConfig,
    identity: RunIdentity,
    sink: Arc<dyn OutputSink>,
    state: RunState,
    warnings: Vec<String>,
    discovery_errors: Vec<DiscoveryError>,
    prepare_errors: Vec<PipelineError>,
    commit_errors: Vec<PipelineError>,
    prepared: PreparedStore,
    staging: Option<StagingArea>,
    last_report: Option<PhaseReport>,
}

impl Manager {
    /// Creates a manager that discards sink output.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            identity: RunIdentity::new(),
            sink: default_sink(),
            state: RunState::Idle,
            warnings: Vec::new(),
            discovery_errors: Vec::new(),
            prepare_errors: Vec::new(),
            commit_errors: Vec::new(),
            prepared: PreparedStore::default(),
            staging: None,
            last_report: None,
        }
    }

    /// Sets the output sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the run identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns the run ID.
    pub fn run_id(&self) -> Uuid {
        self.identity.run_id
    }

    /// Returns the run identity.
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns where the invocation stands.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the warnings of the most recent phase.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Returns the pipelines that failed to instantiate during discovery.
    pub fn discovery_errors(&self) -> &[DiscoveryError] {
        &self.discovery_errors
    }

    /// Returns the errors collected by the last prepare.
    pub fn prepare_errors(&self) -> &[PipelineError] {
        &self.prepare_errors
    }

    /// Returns the errors collected by the last commit.
    pub fn commit_errors(&self) -> &[PipelineError] {
        &self.commit_errors
    }

    /// Returns the summary of the most recent phase.
    pub fn last_report(&self) -> Option<&PhaseReport> {
        self.last_report.as_ref()
    }

    /// Returns the source ids prepared for a pipeline, in preparation order.
    pub fn prepared_source_ids(&self, pipeline: &str) -> Vec<String> {
        self.prepared.source_ids(pipeline)
    }

    /// Returns the number of prepared units across all pipelines.
    pub fn prepared_count(&self) -> usize {
        self.prepared.total()
    }

    /// Returns the staging directory, if disk staging is active.
    pub fn staging_dir(&self) -> Option<&std::path::Path> {
        self.staging.as_ref().map(StagingArea::path)
    }

    /// Returns true if commit will be skipped.
    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    /// Returns true if per-unit progress is written to the sink.
    pub fn is_debug(&self) -> bool {
        self.config.debug
    }

    /// Returns true if a phase stops at its first unit failure.
    pub fn is_stop_on_error(&self) -> bool {
        self.config.stop_on_error
    }

    /// Sets dry-run mode.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.config.dry_run = dry_run;
    }

    /// Sets debug mode.
    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    /// Sets stop-on-error mode.
    pub fn set_stop_on_error(&mut self, stop_on_error: bool) {
        self.config.stop_on_error = stop_on_error;
    }

    /// Instantiates one pipeline per registered factory.
    ///
    /// Factories that fail are skipped and reported as warnings of this
    /// phase; the full errors stay available from
    /// [`Manager::discovery_errors`].
    pub fn discover_pipelines(&mut self, registry: &PipelineRegistry) -> Vec<Arc<dyn Pipeline>> {
        let _span = info_span!("phase", run_id = %self.identity.run_id, phase = %Phase::Discover)
            .entered();
        let timer = PhaseTimer::start(self.identity.run_id, Phase::Discover);
        self.warnings.clear();

        let discovered = registry.discover();
        self.warnings
            .extend(discovered.errors.iter().map(ToString::to_string));
        self.discovery_errors = discovered.errors;

        let mut report = timer.finish(discovered.pipelines.len());
        report.units_succeeded = discovered.pipelines.len();
        report.units_failed = self.discovery_errors.len();
        report.units_attempted = report.units_succeeded + report.units_failed;
        report.warnings = self.warnings.len();

        info!(
            pipelines = discovered.pipelines.len(),
            failed = self.discovery_errors.len(),
            "Discovered pipelines"
        );
        self.state = RunState::Discovered;
        self.finish_phase(report);
        discovered.pipelines
    }

    /// Discovers pipelines and keeps those matching `filter`.
    pub fn discover_filtered(
        &mut self,
        registry: &PipelineRegistry,
        filter: &PipelineFilter,
    ) -> Vec<Arc<dyn Pipeline>> {
        let pipelines = self.discover_pipelines(registry);
        let kept = filter.apply(&pipelines);
        if kept.len() != pipelines.len() {
            info!(kept = kept.len(), total = pipelines.len(), "Filtered pipelines");
        }
        kept
    }

    /// Checks every connector of every pipeline.
    ///
    /// Each connector that isn't ready yields exactly one warning. This
    /// phase never produces errors.
    pub async fn check_connectors(&mut self, pipelines: &[Arc<dyn Pipeline>]) {
        let timer = PhaseTimer::start(self.identity.run_id, Phase::CheckConnectors);
        self.warnings.clear();

        let span = self.phase_span(Phase::CheckConnectors);
        let outcomes = {
            let env = self.env();
            let env = &env;
            run_pipelines(pipelines, self.config.parallel_pipelines, move |p| {
                check_pipeline(p, env)
            })
            .instrument(span)
            .await
        };

        let mut report = timer.finish(pipelines.len());
        let fault = self.absorb(Phase::CheckConnectors, outcomes, &mut report);
        debug_assert!(fault.is_none(), "connector checks never fault");
        self.state = RunState::ConnectorsChecked;
        self.finish_phase(report);
    }

    /// Prepares every unit of every pipeline.
    ///
    /// Clears prepare errors, warnings and previously prepared state first.
    /// Per-unit failures are collected in [`Manager::prepare_errors`]; the
    /// returned `Err` is reserved for staging faults and for pipeline lists
    /// holding two pipelines with the same name, since prepared state is
    /// keyed by name.
    pub async fn prepare(&mut self, pipelines: &[Arc<dyn Pipeline>]) -> Result<(), MigrationError> {
        self.config.validate()?;
        ensure_unique_names(pipelines)?;
        let timer = PhaseTimer::start(self.identity.run_id, Phase::Prepare);
        self.prepare_errors.clear();
        self.warnings.clear();
        self.prepared.clear();
        self.open_staging().await?;

        let span = self.phase_span(Phase::Prepare);
        let outcomes = {
            let env = self.env();
            let env = &env;
            run_pipelines(pipelines, self.config.parallel_pipelines, move |p| {
                prepare_pipeline(p, env)
            })
            .instrument(span)
            .await
        };

        let mut report = timer.finish(pipelines.len());
        let fault = self.absorb(Phase::Prepare, outcomes, &mut report);
        self.state = if report.aborted {
            RunState::Aborted
        } else {
            RunState::Prepared
        };
        self.finish_phase(report);
        fault.map_or(Ok(()), Err)
    }

    /// Commits every prepared unit.
    ///
    /// In dry-run mode nothing is committed and the state becomes
    /// [`RunState::Skipped`]. Commit doesn't require an error-free prepare:
    /// it commits whatever was prepared.
    pub async fn commit(&mut self, pipelines: &[Arc<dyn Pipeline>]) -> Result<(), MigrationError> {
        self.config.validate()?;
        ensure_unique_names(pipelines)?;
        let timer = PhaseTimer::start(self.identity.run_id, Phase::Commit);
        self.commit_errors.clear();
        self.warnings.clear();

        if self.config.dry_run {
            let pending = self.prepared.total();
            info!(run_id = %self.identity.run_id, pending, "Dry-run: skipping commit");
            self.sink.write_line(&format!(
                "Dry-run: skipping commit of {pending} prepared unit(s)"
            ));
            let mut report = timer.finish(pipelines.len());
            report.skipped = true;
            self.state = RunState::Skipped;
            self.finish_phase(report);
            return Ok(());
        }

        let span = self.phase_span(Phase::Commit);
        let outcomes = {
            let env = self.env();
            let env = &env;
            let prepared = &self.prepared;
            run_pipelines(pipelines, self.config.parallel_pipelines, move |p| {
                commit_pipeline(p, prepared.entries(p.name()), env)
            })
            .instrument(span)
            .await
        };

        let mut report = timer.finish(pipelines.len());
        let fault = self.absorb(Phase::Commit, outcomes, &mut report);
        self.state = if report.aborted {
            RunState::Aborted
        } else {
            RunState::Committed
        };
        self.finish_phase(report);
        fault.map_or(Ok(()), Err)
    }

    /// Starts over: clears all collected state, removes the staging
    /// directory and assigns a fresh run ID.
    pub fn reset(&mut self) {
        self.warnings.clear();
        self.discovery_errors.clear();
        self.prepare_errors.clear();
        self.commit_errors.clear();
        self.prepared.clear();
        self.staging = None;
        self.last_report = None;
        self.identity = RunIdentity::new();
        self.state = RunState::Idle;
    }

    fn env(&self) -> PhaseEnv<'_> {
        PhaseEnv {
            config: &self.config,
            run_id: self.identity.run_id,
            sink: &self.sink,
            staging: self.staging.as_ref(),
        }
    }

    fn phase_span(&self, phase: Phase) -> tracing::Span {
        info_span!("phase", run_id = %self.identity.run_id, phase = %phase)
    }

    async fn open_staging(&mut self) -> Result<(), MigrationError> {
        match &self.config.staging {
            StagingMode::Memory => {
                self.staging = None;
                Ok(())
            }
            StagingMode::Disk { base_dir } => {
                if let Some(area) = &self.staging {
                    if area.path().parent() == Some(base_dir.as_path()) {
                        return area.clear().await;
                    }
                }
                self.staging = Some(StagingArea::create(base_dir).await?);
                Ok(())
            }
        }
    }

    /// Folds per-pipeline outcomes into the manager, in pipeline order.
    /// Returns the first orchestrator fault, if any.
    fn absorb(
        &mut self,
        phase: Phase,
        outcomes: Vec<PipelineOutcome>,
        report: &mut PhaseReport,
    ) -> Option<MigrationError> {
        let mut fault = None;

        for outcome in outcomes {
            report.units_attempted += outcome.attempted;
            report.units_succeeded += outcome.succeeded;
            report.units_failed += match phase {
                Phase::CheckConnectors => outcome.attempted.saturating_sub(outcome.succeeded),
                _ => outcome.errors.len(),
            };
            report.aborted |= outcome.aborted;

            self.warnings.extend(outcome.warnings);
            match phase {
                Phase::Prepare => self.prepare_errors.extend(outcome.errors),
                Phase::Commit => self.commit_errors.extend(outcome.errors),
                Phase::Discover | Phase::CheckConnectors => {}
            }
            if !outcome.prepared.is_empty() {
                self.prepared.extend(outcome.pipeline, outcome.prepared);
            }
            if fault.is_none() {
                fault = outcome.fault;
            }
        }

        report.warnings = self.warnings.len();
        fault
    }

    fn finish_phase(&mut self, report: PhaseReport) {
        report.emit();
        self.last_report = Some(report);
    }
}

fn ensure_unique_names(pipelines: &[Arc<dyn Pipeline>]) -> Result<(), MigrationError> {
    let mut seen = HashSet::with_capacity(pipelines.len());
    for pipeline in pipelines {
        if !seen.insert(pipeline.name()) {
            return Err(MigrationError::Config(format!(
                "pipeline name '{}' appears more than once",
                pipeline.name()
            )));
        }
    }
    Ok(())
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("run_id", &self.identity.run_id)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("warnings", &self.warnings.len())
            .field("prepare_errors", &self.prepare_errors.len())
            .field("commit_errors", &self.commit_errors.len())
            .field("prepared", &self.prepared.total())
            .finish_non_exhaustive()
    }
}

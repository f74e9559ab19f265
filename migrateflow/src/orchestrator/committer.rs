//! Commit phase: write prepared units to their destination.

use super::phase::{drive_ordered, PhaseEnv, PipelineOutcome, UnitOutcome};
use super::prepared::PreparedEntry;
use crate::core::Phase;
use crate::errors::{ErrorPhase, PipelineError};
use crate::pipeline::Pipeline;
use futures::stream;
use tracing::{debug, warn};

/// Commits the prepared units of one pipeline, in preparation order.
///
/// Each unit receives the payload produced by prepare; the source is not
/// queried again. A failed unit doesn't roll back the others: partial
/// commit is reported as such.
pub(crate) async fn commit_pipeline<'e>(
    pipeline: &dyn Pipeline,
    entries: &'e [PreparedEntry],
    env: &PhaseEnv<'_>,
) -> PipelineOutcome {
    let name = pipeline.name();
    let ctx = env.context(Phase::Commit, name);
    let mut outcome = PipelineOutcome::new(name);
    let stop_on_error = env.config.stop_on_error;

    ctx.output(&format!("Committing {name}"));

    let ctx_ref = &ctx;
    let start = move |entry: &'e PreparedEntry| async move {
        let unit = match entry.load().await {
            Ok(unit) => unit,
            Err(fault) => return UnitOutcome::Fault(fault),
        };
        match pipeline.commit(&unit, ctx_ref).await {
            Ok(()) => UnitOutcome::Done(unit.source_id),
            Err(error) => UnitOutcome::Failed {
                source_id: Some(unit.source_id),
                error,
            },
        }
    };

    let handle = |result: UnitOutcome<String>| match result {
        UnitOutcome::Done(source_id) => {
            outcome.attempted += 1;
            outcome.succeeded += 1;
            debug!(source_id = %source_id, "Unit committed");
            ctx.debug_output(&format!("  ok    {source_id}"));
            false
        }
        UnitOutcome::Failed { source_id, error } => {
            outcome.attempted += 1;
            let error = PipelineError::from_anyhow(ErrorPhase::Commit, name, source_id, &error);
            warn!(
                source_id = error.source_id.as_deref().unwrap_or_default(),
                error = %error.message,
                "Unit failed to commit"
            );
            ctx.debug_output(&format!(
                "  FAIL  {}: {}",
                error.source_id.as_deref().unwrap_or_default(),
                error.message
            ));
            outcome.errors.push(error);
            if stop_on_error {
                outcome.aborted = true;
            }
            stop_on_error
        }
        UnitOutcome::Fault(fault) => {
            outcome.record_fault(fault);
            true
        }
    };

    drive_ordered(
        stream::iter(entries),
        env.config.unit_concurrency,
        start,
        handle,
    )
    .await;

    outcome.warnings.extend(ctx.take_warnings());
    ctx.output(&format!(
        "Committed {name}: {} ok, {} failed",
        outcome.succeeded,
        outcome.errors.len()
    ));
    outcome
}

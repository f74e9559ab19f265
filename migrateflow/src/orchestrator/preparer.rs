//! Prepare phase: dry-validate and transform every unit.

use super::phase::{drive_ordered, PhaseEnv, PipelineOutcome, UnitOutcome};
use super::prepared::PreparedEntry;
use crate::core::{Phase, Unit};
use crate::errors::{ErrorPhase, PipelineError};
use crate::pipeline::Pipeline;
use futures::StreamExt;
use tracing::{debug, warn};

/// Prepares every unit of one pipeline, in unit order.
///
/// Units are streamed from the pipeline rather than materialized up front.
/// Successful units are kept for commit; failures are collected. With
/// stop-on-error no unit is started after the first failure.
pub(crate) async fn prepare_pipeline(pipeline: &dyn Pipeline, env: &PhaseEnv<'_>) -> PipelineOutcome {
    let name = pipeline.name();
    let ctx = env.context(Phase::Prepare, name);
    let mut outcome = PipelineOutcome::new(name);
    let stop_on_error = env.config.stop_on_error;

    ctx.output(&format!("Preparing {name}"));

    let ctx_ref = &ctx;
    let staging = env.staging;
    let start = move |(index, item): (usize, anyhow::Result<Unit>)| async move {
        let unit = match item {
            Ok(unit) => unit,
            Err(error) => {
                return UnitOutcome::Failed {
                    source_id: None,
                    error,
                }
            }
        };

        match pipeline.prepare(&unit, ctx_ref).await {
            Ok(payload) => {
                let prepared = Unit::new(unit.source_id, payload);
                match PreparedEntry::keep(prepared, name, index, staging).await {
                    Ok(entry) => UnitOutcome::Done(entry),
                    Err(fault) => UnitOutcome::Fault(fault),
                }
            }
            Err(error) => UnitOutcome::Failed {
                source_id: Some(unit.source_id),
                error,
            },
        }
    };

    let handle = |result: UnitOutcome<PreparedEntry>| match result {
        UnitOutcome::Done(entry) => {
            outcome.attempted += 1;
            outcome.succeeded += 1;
            debug!(source_id = entry.source_id(), "Unit prepared");
            ctx.debug_output(&format!("  ok    {}", entry.source_id()));
            outcome.prepared.push(entry);
            false
        }
        UnitOutcome::Failed { source_id, error } => {
            outcome.attempted += 1;
            let error =
                PipelineError::from_anyhow(ErrorPhase::Prepare, name, source_id, &error);
            warn!(
                source_id = error.source_id.as_deref().unwrap_or_default(),
                error = %error.message,
                "Unit failed to prepare"
            );
            ctx.debug_output(&format!(
                "  FAIL  {}: {}",
                error.source_id.as_deref().unwrap_or("<source>"),
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
        pipeline.units().enumerate(),
        env.config.unit_concurrency,
        start,
        handle,
    )
    .await;

    outcome.warnings.extend(ctx.take_warnings());
    ctx.output(&format!(
        "Prepared {name}: {} ok, {} failed",
        outcome.succeeded,
        outcome.errors.len()
    ));
    outcome
}

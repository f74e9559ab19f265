//! Connector check phase.

use super::phase::{PhaseEnv, PipelineOutcome};
use crate::core::{ConnectorCheck, Phase};
use crate::pipeline::Pipeline;
use tracing::{debug, warn};

/// Probes every connector of one pipeline.
///
/// A connector that isn't ready yields exactly one warning. This phase has
/// no fatal outcome, so stop-on-error does not apply.
pub(crate) async fn check_pipeline(pipeline: &dyn Pipeline, env: &PhaseEnv<'_>) -> PipelineOutcome {
    let name = pipeline.name();
    let ctx = env.context(Phase::CheckConnectors, name);
    let mut outcome = PipelineOutcome::new(name);

    for connector in pipeline.connectors() {
        let check = ConnectorCheck::run(name, connector.as_ref()).await;
        outcome.attempted += 1;

        match check.warning() {
            None => {
                outcome.succeeded += 1;
                debug!(connector = %check.connector, kind = %check.kind, "Connector ready");
                ctx.debug_output(&format!("  {} connector '{}': ready", check.kind, check.connector));
            }
            Some(warning) => {
                warn!(
                    connector = %check.connector,
                    kind = %check.kind,
                    reason = check.failure.as_deref().unwrap_or_default(),
                    "Connector not ready"
                );
                ctx.debug_output(&format!(
                    "  {} connector '{}': NOT READY",
                    check.kind, check.connector
                ));
                outcome.warnings.push(warning);
            }
        }
    }

    outcome.warnings.extend(ctx.take_warnings());
    outcome
}

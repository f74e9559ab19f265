//! Shared machinery for running one phase over many pipelines.

use super::prepared::PreparedEntry;
use super::staging::StagingArea;
use crate::config::RunConfig;
use crate::core::Phase;
use crate::errors::{MigrationError, PipelineError};
use crate::events::OutputSink;
use crate::pipeline::{PhaseContext, Pipeline};
use futures::future::join_all;
use futures::stream::{FuturesOrdered, Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Read-only view of the orchestrator handed to phase workers.
pub(crate) struct PhaseEnv<'a> {
    pub config: &'a RunConfig,
    pub run_id: Uuid,
    pub sink: &'a Arc<dyn OutputSink>,
    pub staging: Option<&'a StagingArea>,
}

impl PhaseEnv<'_> {
    pub(crate) fn context(&self, phase: Phase, pipeline: &str) -> PhaseContext {
        PhaseContext::new(self.run_id, phase, pipeline, Arc::clone(self.sink))
            .with_debug(self.config.debug)
            .with_dry_run(self.config.dry_run)
    }
}

/// What one pipeline produced during one phase.
#[derive(Debug, Default)]
pub(crate) struct PipelineOutcome {
    pub pipeline: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub errors: Vec<PipelineError>,
    pub warnings: Vec<String>,
    pub prepared: Vec<PreparedEntry>,
    pub aborted: bool,
    pub fault: Option<MigrationError>,
}

impl PipelineOutcome {
    pub(crate) fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            ..Self::default()
        }
    }

    /// Records an orchestrator fault; only the first one is kept.
    pub(crate) fn record_fault(&mut self, fault: MigrationError) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
        self.aborted = true;
    }
}

/// Result of processing one unit.
pub(crate) enum UnitOutcome<T> {
    Done(T),
    Failed {
        source_id: Option<String>,
        error: anyhow::Error,
    },
    Fault(MigrationError),
}

/// Runs `start` over `items` with at most `concurrency` futures in flight,
/// handing results to `handle` in item order.
///
/// Once `handle` returns true no further item is started; futures already
/// in flight still run to completion and are handed to `handle`.
pub(crate) async fn drive_ordered<S, F, Fut, H>(items: S, concurrency: usize, mut start: F, mut handle: H)
where
    S: Stream + Unpin,
    F: FnMut(S::Item) -> Fut,
    Fut: Future,
    H: FnMut(Fut::Output) -> bool,
{
    let mut items = items.fuse();
    let mut in_flight = FuturesOrdered::new();
    let mut stopping = false;

    loop {
        while !stopping && in_flight.len() < concurrency.max(1) {
            match items.next().await {
                Some(item) => in_flight.push_back(start(item)),
                None => break,
            }
        }

        match in_flight.next().await {
            Some(output) => {
                if handle(output) {
                    stopping = true;
                }
            }
            None => break,
        }
    }
}

/// Runs one worker per pipeline and returns their outcomes in pipeline order.
///
/// Sequential runs stop after the first aborted pipeline. Parallel runs let
/// every pipeline finish on its own.
pub(crate) async fn run_pipelines<'a, F, Fut>(
    pipelines: &'a [Arc<dyn Pipeline>],
    parallel: bool,
    run: F,
) -> Vec<PipelineOutcome>
where
    F: Fn(&'a dyn Pipeline) -> Fut,
    Fut: Future<Output = PipelineOutcome>,
{
    let span_for = |p: &dyn Pipeline| tracing::info_span!("pipeline", name = %p.name());

    if parallel {
        return join_all(
            pipelines
                .iter()
                .map(|p| run(p.as_ref()).instrument(span_for(p.as_ref()))),
        )
        .await;
    }

    let mut outcomes = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        let outcome = run(pipeline.as_ref())
            .instrument(span_for(pipeline.as_ref()))
            .await;
        let stop = outcome.aborted;
        outcomes.push(outcome);
        if stop {
            break;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_drive_ordered_keeps_item_order() {
        let mut seen = Vec::new();
        drive_ordered(
            stream::iter(vec![30u64, 10, 20]),
            3,
            |delay| async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                delay
            },
            |value| {
                seen.push(value);
                false
            },
        )
        .await;

        assert_eq!(seen, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_drive_ordered_stops_starting_items() {
        let started = AtomicUsize::new(0);
        let mut handled = Vec::new();
        drive_ordered(
            stream::iter(1..=5),
            1,
            |n| {
                started.fetch_add(1, Ordering::SeqCst);
                async move { n }
            },
            |n| {
                handled.push(n);
                n == 2
            },
        )
        .await;

        assert_eq!(handled, vec![1, 2]);
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drive_ordered_drains_in_flight() {
        let mut handled = Vec::new();
        drive_ordered(
            stream::iter(1..=6),
            3,
            |n| async move { n },
            |n| {
                handled.push(n);
                n == 1
            },
        )
        .await;

        // Items 2 and 3 were already in flight when item 1 asked to stop.
        assert_eq!(handled, vec![1, 2, 3]);
    }
}

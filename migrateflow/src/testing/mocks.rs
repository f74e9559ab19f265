//! Mock pipelines, connectors and providers for testing.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::{Connector, ConnectorKind, Payload, Unit};
use crate::discovery::{PipelineProvider, PipelineRegistration};
use crate::pipeline::{PhaseContext, Pipeline};

/// A connector with a fixed readiness outcome.
#[derive(Debug)]
pub struct MockConnector {
    name: String,
    kind: ConnectorKind,
    failure: Option<String>,
    checks: AtomicUsize,
}

impl MockConnector {
    /// Creates a connector whose check succeeds.
    #[must_use]
    pub fn ready(name: impl Into<String>, kind: ConnectorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            failure: None,
            checks: AtomicUsize::new(0),
        }
    }

    /// Creates a connector whose check fails with `reason`.
    #[must_use]
    pub fn failing(name: impl Into<String>, kind: ConnectorKind, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::ready(name, kind)
        }
    }

    /// Returns how many times the connector was checked.
    #[must_use]
    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn check(&self) -> anyhow::Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}

/// A fake destination that records every committed unit.
#[derive(Debug, Default)]
pub struct RecordingDestination {
    writes: Mutex<Vec<Unit>>,
}

impl RecordingDestination {
    /// Creates an empty destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write.
    pub fn write(&self, unit: Unit) {
        self.writes.lock().push(unit);
    }

    /// Returns all recorded writes, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<Unit> {
        self.writes.lock().clone()
    }

    /// Returns the number of recorded writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Returns the source ids of recorded writes, in order.
    #[must_use]
    pub fn source_ids(&self) -> Vec<String> {
        self.writes
            .lock()
            .iter()
            .map(|u| u.source_id.clone())
            .collect()
    }
}

/// A scriptable pipeline that records every call.
///
/// Units carry `{"id": <source id>, "raw": true}` payloads. Prepare adds a
/// `"marker"` field when a marker is configured, so tests can tell prepared
/// payloads from raw ones.
#[derive(Debug)]
pub struct MockPipeline {
    name: String,
    source_ids: Vec<String>,
    source_error: Option<String>,
    connectors: Vec<Arc<dyn Connector>>,
    fail_prepare: HashSet<String>,
    fail_commit: HashSet<String>,
    prepare_warnings: Vec<String>,
    marker: Option<String>,
    destination: Arc<RecordingDestination>,
    source_reads: AtomicUsize,
    prepare_calls: Mutex<Vec<String>>,
    commit_calls: Mutex<Vec<String>>,
}

impl Default for MockPipeline {
    fn default() -> Self {
        Self::new("MockPipeline")
    }
}

impl MockPipeline {
    /// Creates a pipeline with no units.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_ids: Vec::new(),
            source_error: None,
            connectors: Vec::new(),
            fail_prepare: HashSet::new(),
            fail_commit: HashSet::new(),
            prepare_warnings: Vec::new(),
            marker: None,
            destination: Arc::new(RecordingDestination::new()),
            source_reads: AtomicUsize::new(0),
            prepare_calls: Mutex::new(Vec::new()),
            commit_calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the units' source ids.
    #[must_use]
    pub fn with_units<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Makes the unit stream yield an error after the last unit.
    #[must_use]
    pub fn with_source_error(mut self, message: impl Into<String>) -> Self {
        self.source_error = Some(message.into());
        self
    }

    /// Adds a connector.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    /// Makes prepare fail for the given source id.
    #[must_use]
    pub fn failing_prepare(mut self, source_id: impl Into<String>) -> Self {
        self.fail_prepare.insert(source_id.into());
        self
    }

    /// Makes commit fail for the given source id.
    #[must_use]
    pub fn failing_commit(mut self, source_id: impl Into<String>) -> Self {
        self.fail_commit.insert(source_id.into());
        self
    }

    /// Raises a warning on the first prepare call.
    #[must_use]
    pub fn with_prepare_warning(mut self, warning: impl Into<String>) -> Self {
        self.prepare_warnings.push(warning.into());
        self
    }

    /// Marks prepared payloads with the given value.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Uses a shared destination.
    #[must_use]
    pub fn with_destination(mut self, destination: Arc<RecordingDestination>) -> Self {
        self.destination = destination;
        self
    }

    /// Returns the destination.
    #[must_use]
    pub fn destination(&self) -> &Arc<RecordingDestination> {
        &self.destination
    }

    /// Returns how many times the unit stream was opened.
    #[must_use]
    pub fn source_reads(&self) -> usize {
        self.source_reads.load(Ordering::SeqCst)
    }

    /// Returns the source ids passed to prepare, in call order.
    #[must_use]
    pub fn prepare_calls(&self) -> Vec<String> {
        self.prepare_calls.lock().clone()
    }

    /// Returns the source ids passed to commit, in call order.
    #[must_use]
    pub fn commit_calls(&self) -> Vec<String> {
        self.commit_calls.lock().clone()
    }

    fn raw_unit(id: &str) -> Unit {
        Unit::new(id, serde_json::json!({"id": id, "raw": true}))
    }
}

#[async_trait]
impl Pipeline for MockPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn connectors(&self) -> Vec<Arc<dyn Connector>> {
        self.connectors.clone()
    }

    fn units(&self) -> BoxStream<'_, anyhow::Result<Unit>> {
        self.source_reads.fetch_add(1, Ordering::SeqCst);
        let units = self.source_ids.iter().map(|id| Ok(Self::raw_unit(id)));
        let tail = self
            .source_error
            .iter()
            .map(|message| Err(anyhow!("{message}")));
        stream::iter(units.chain(tail).collect::<Vec<_>>()).boxed()
    }

    async fn prepare(&self, unit: &Unit, ctx: &PhaseContext) -> anyhow::Result<Payload> {
        let first_call = {
            let mut calls = self.prepare_calls.lock();
            calls.push(unit.source_id.clone());
            calls.len() == 1
        };
        if first_call {
            for warning in &self.prepare_warnings {
                ctx.warn(warning.clone());
            }
        }

        if self.fail_prepare.contains(&unit.source_id) {
            let cause = std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed row");
            return Err(cause).context(format!("invalid record {}", unit.source_id));
        }

        let mut payload = unit.payload.clone();
        if let Some(ref marker) = self.marker {
            payload["marker"] = serde_json::json!(marker);
        }
        Ok(payload)
    }

    async fn commit(&self, unit: &Unit, _ctx: &PhaseContext) -> anyhow::Result<()> {
        self.commit_calls.lock().push(unit.source_id.clone());

        if self.fail_commit.contains(&unit.source_id) {
            return Err(anyhow!("duplicate key")).context("destination rejected write");
        }

        self.destination.write(unit.clone());
        Ok(())
    }
}

/// A provider exposing mock pipelines by name.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    pipelines: Vec<String>,
    broken: Vec<String>,
}

impl MockProvider {
    /// Creates a provider whose pipelines all instantiate.
    #[must_use]
    pub fn new(name: impl Into<String>, pipelines: &[&str]) -> Self {
        Self {
            name: name.into(),
            pipelines: pipelines.iter().map(ToString::to_string).collect(),
            broken: Vec::new(),
        }
    }

    /// Adds a pipeline whose factory fails.
    #[must_use]
    pub fn with_broken(mut self, name: impl Into<String>) -> Self {
        self.broken.push(name.into());
        self
    }
}

impl PipelineProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn pipelines(&self) -> Vec<PipelineRegistration> {
        let working = self.pipelines.iter().map(|name| {
            let owned = name.clone();
            PipelineRegistration::new(name.clone(), move || {
                Ok(Arc::new(MockPipeline::new(owned.clone()).with_units(["1"])) as Arc<dyn Pipeline>)
            })
        });
        let broken = self.broken.iter().map(|name| {
            PipelineRegistration::new(name.clone(), || Err(anyhow!("missing credentials")))
        });
        working.chain(broken).collect()
    }
}

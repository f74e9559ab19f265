//! Testing utilities for migrateflow.
//!
//! This module provides:
//! - A scriptable mock pipeline with call counters
//! - Mock connectors with configurable readiness
//! - A recording destination that captures committed units
//! - A mock provider for discovery tests

mod mocks;

pub use mocks::{MockConnector, MockPipeline, MockProvider, RecordingDestination};

use crate::pipeline::Pipeline;
use std::sync::Arc;

/// Erases a list of mock pipelines into trait objects.
#[must_use]
pub fn as_pipelines(pipelines: &[Arc<MockPipeline>]) -> Vec<Arc<dyn Pipeline>> {
    pipelines
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Pipeline>)
        .collect()
}

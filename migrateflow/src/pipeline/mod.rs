//! The pipeline contract.
//!
//! This module provides:
//! - The [`Pipeline`] trait implemented by migration recipes
//! - The [`PhaseContext`] handed to pipeline code during a phase
//! - Include/exclude filtering by pipeline name

mod context;
mod filter;

pub use context::PhaseContext;
pub use filter::PipelineFilter;

use crate::core::{Connector, Payload, Unit};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt::Debug;
use std::sync::Arc;

/// A named migration recipe.
///
/// A pipeline owns its connectors and produces an ordered stream of units.
/// The orchestrator calls [`Pipeline::prepare`] on every unit during the
/// prepare phase and [`Pipeline::commit`] on every successfully prepared
/// unit during the commit phase, in the same order.
///
/// Any `Err` returned from pipeline code is collected as a per-unit error;
/// use `anyhow::Context` to give the operator a readable message on top of
/// the lower-level cause.
#[async_trait]
pub trait Pipeline: Send + Sync + Debug {
    /// Returns the stable display name of the pipeline.
    fn name(&self) -> &str;

    /// Returns the connectors owned by this pipeline.
    fn connectors(&self) -> Vec<Arc<dyn Connector>> {
        Vec::new()
    }

    /// Streams the units to migrate, in order.
    ///
    /// Called once per prepare pass. An `Err` item is reported as a prepare
    /// error without a source id.
    fn units(&self) -> BoxStream<'_, anyhow::Result<Unit>>;

    /// Dry-validates and transforms one unit without touching the
    /// destination. The returned payload is handed back to
    /// [`Pipeline::commit`].
    async fn prepare(&self, unit: &Unit, ctx: &PhaseContext) -> anyhow::Result<Payload>;

    /// Writes one prepared unit to the destination.
    ///
    /// `unit.payload` is the payload returned by [`Pipeline::prepare`].
    async fn commit(&self, unit: &Unit, ctx: &PhaseContext) -> anyhow::Result<()>;
}

//! Pipeline discovery.
//!
//! Extension modules implement [`PipelineProvider`] and hand back a list of
//! named pipeline factories. A [`PipelineRegistry`] merges providers in
//! registration order and instantiates one pipeline per factory on
//! [`PipelineRegistry::discover`]. New pipelines plug in without touching
//! the orchestrator.

mod registry;

pub use registry::{
    DiscoveryReport, PipelineFactory, PipelineProvider, PipelineRegistration, PipelineRegistry,
};

//! # Migrateflow
//!
//! Orchestration of data-migration pipelines under a staged commit protocol.
//!
//! A migration run moves records from a source system into a destination
//! in three caller-driven phases:
//!
//! - **Connector check**: every pipeline connector is probed; failures are warnings
//! - **Prepare**: every unit is dry-validated and transformed, errors are collected
//! - **Commit**: every successfully prepared unit is written, unless in dry-run
//!
//! Pipelines are contributed by extension providers through a
//! [`PipelineRegistry`](discovery::PipelineRegistry) and can be narrowed by
//! an include/exclude [`PipelineFilter`](pipeline::PipelineFilter).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use migrateflow::prelude::*;
//!
//! let registry = PipelineRegistry::new();
//! registry.register_provider(&MyProvider)?;
//!
//! let mut manager = Manager::new(RunConfig::from_env()?);
//! let pipelines = manager.discover_pipelines(&registry);
//!
//! manager.check_connectors(&pipelines).await;
//! manager.prepare(&pipelines).await?;
//! if manager.prepare_errors().is_empty() {
//!     manager.commit(&pipelines).await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod observability;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{RunConfig, StagingMode};
    pub use crate::core::{
        Connector, ConnectorCheck, ConnectorKind, Payload, Phase, RunIdentity, RunState, Unit,
    };
    pub use crate::discovery::{
        DiscoveryReport, PipelineProvider, PipelineRegistration, PipelineRegistry,
    };
    pub use crate::errors::{
        CommitError, DiscoveryError, ErrorCause, ErrorPhase, MigrationError, PipelineError,
        PrepareError, RegistryError,
    };
    pub use crate::events::{CollectingSink, LoggingSink, NoOpSink, OutputSink, WriterSink};
    pub use crate::observability::{init_logging, PhaseReport};
    pub use crate::orchestrator::Manager;
    pub use crate::pipeline::{PhaseContext, Pipeline, PipelineFilter};
}

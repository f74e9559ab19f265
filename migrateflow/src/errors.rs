//! Error types for the migrateflow orchestrator.
//!
//! Two families live here. [`MigrationError`] covers orchestrator-level
//! faults that abort a call (configuration, staging IO, registry conflicts).
//! [`PipelineError`] is the per-unit taxonomy collected during the prepare
//! and commit phases; it never escapes a phase as an `Err`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for orchestrator operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Run configuration could not be parsed or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or writing the staging area failed.
    #[error("Staging error at {}: {source}", path.display())]
    Staging {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A pipeline registration conflicted with an existing one.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The logging subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),
}

impl MigrationError {
    /// Creates a staging error for the given path.
    #[must_use]
    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while registering pipeline factories.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two registrations used the same pipeline name.
    #[error("Pipeline '{name}' from provider '{provider}' is already registered by '{existing}'")]
    Duplicate {
        /// The conflicting pipeline name.
        name: String,
        /// The provider attempting the registration.
        provider: String,
        /// The provider that registered the name first.
        existing: String,
    },
}

/// A pipeline factory failed to instantiate its pipeline.
///
/// Discovery keeps going after one of these; the failing type is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Failed to instantiate pipeline '{name}' from provider '{provider}': {message}")]
pub struct DiscoveryError {
    /// The registered pipeline name.
    pub name: String,
    /// The provider that registered it.
    pub provider: String,
    /// The failure message.
    pub message: String,
    /// The wrapped cause, if any.
    #[source]
    pub cause: Option<ErrorCause>,
}

impl DiscoveryError {
    /// Builds a discovery error from a factory failure.
    #[must_use]
    pub fn from_anyhow(
        name: impl Into<String>,
        provider: impl Into<String>,
        err: &anyhow::Error,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            message: err.to_string(),
            cause: ErrorCause::from_anyhow(err),
        }
    }
}

/// A lower-level error wrapped by a [`PipelineError`].
///
/// Causes form a chain through `source`, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    /// The cause message.
    pub message: String,
    /// The next cause down the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Box<ErrorCause>>,
}

impl ErrorCause {
    /// Creates a cause with no further source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps another cause beneath this one.
    #[must_use]
    pub fn with_source(mut self, source: ErrorCause) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Builds a chain from messages ordered outermost first.
    ///
    /// Returns `None` for an empty list.
    pub fn from_messages<I>(messages: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: DoubleEndedIterator,
    {
        messages.into_iter().rev().fold(None, |source, message| {
            Some(Self {
                message,
                source: source.map(Box::new),
            })
        })
    }

    /// Builds the cause chain of an `anyhow` error, skipping its outermost
    /// message (which becomes the owning error's message).
    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Option<Self> {
        let messages: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        Self::from_messages(messages)
    }

    /// Returns the innermost cause in the chain.
    #[must_use]
    pub fn root(&self) -> &ErrorCause {
        let mut current = self;
        while let Some(next) = current.source.as_deref() {
            current = next;
        }
        current
    }

    /// Returns the number of links in the chain, including this one.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.source.as_ref().map_or(0, |s| s.depth())
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

/// The phase a [`PipelineError`] was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    /// Raised while dry-validating/transforming a unit.
    Prepare,
    /// Raised while committing a prepared unit.
    Commit,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A per-unit failure collected during the prepare or commit phase.
///
/// Carries the pipeline name and the unit's source id so an operator can
/// locate the failing record without re-running. The source id is absent
/// only when the pipeline's unit stream itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "{phase} error in pipeline '{pipeline}' ({}): {message}",
    .source_id.as_deref().unwrap_or("no source id")
)]
pub struct PipelineError {
    /// The phase the error was raised in.
    pub phase: ErrorPhase,
    /// The display name of the failing pipeline.
    pub pipeline: String,
    /// The source id of the failing unit.
    pub source_id: Option<String>,
    /// Human readable message.
    pub message: String,
    /// The wrapped lower-level cause.
    #[source]
    pub cause: Option<ErrorCause>,
}

/// A unit failed dry-validation/transform.
pub type PrepareError = PipelineError;

/// A unit failed its committing operation.
pub type CommitError = PipelineError;

impl PipelineError {
    /// Creates a new error without a cause.
    #[must_use]
    pub fn new(
        phase: ErrorPhase,
        pipeline: impl Into<String>,
        source_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            pipeline: pipeline.into(),
            source_id,
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a prepare-phase error for a unit.
    #[must_use]
    pub fn prepare(
        pipeline: impl Into<String>,
        source_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorPhase::Prepare, pipeline, Some(source_id.into()), message)
    }

    /// Creates a commit-phase error for a unit.
    #[must_use]
    pub fn commit(
        pipeline: impl Into<String>,
        source_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorPhase::Commit, pipeline, Some(source_id.into()), message)
    }

    /// Downgrades an `anyhow` error from pipeline code into a collected
    /// error. The outermost context becomes the message; the rest of the
    /// chain becomes the cause.
    #[must_use]
    pub fn from_anyhow(
        phase: ErrorPhase,
        pipeline: impl Into<String>,
        source_id: Option<String>,
        err: &anyhow::Error,
    ) -> Self {
        Self {
            phase,
            pipeline: pipeline.into(),
            source_id,
            message: err.to_string(),
            cause: ErrorCause::from_anyhow(err),
        }
    }

    /// Sets the wrapped cause.
    #[must_use]
    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Returns the innermost cause, if any.
    #[must_use]
    pub fn root_cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref().map(ErrorCause::root)
    }

    /// Returns true if this error was raised during the prepare phase.
    #[must_use]
    pub fn is_prepare(&self) -> bool {
        self.phase == ErrorPhase::Prepare
    }

    /// Returns true if this error was raised during the commit phase.
    #[must_use]
    pub fn is_commit(&self) -> bool {
        self.phase == ErrorPhase::Commit
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("phase".to_string(), serde_json::json!(self.phase.to_string()));
        map.insert("pipeline".to_string(), serde_json::json!(self.pipeline));
        map.insert(
            "source_id".to_string(),
            self.source_id
                .as_ref()
                .map_or(serde_json::Value::Null, |id| serde_json::json!(id)),
        );
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref cause) = self.cause {
            let chain: Vec<&str> = std::iter::successors(Some(cause), |c| c.source.as_deref())
                .map(|c| c.message.as_str())
                .collect();
            map.insert("causes".to_string(), serde_json::json!(chain));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use pretty_assertions::assert_eq;

    fn failing_read() -> anyhow::Result<()> {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
        Err(io).context("reading row 42").context("invalid record")
    }

    #[test]
    fn test_cause_chain_from_anyhow() {
        let err = failing_read().unwrap_err();
        let pe = PipelineError::from_anyhow(
            ErrorPhase::Prepare,
            "UsersPipeline",
            Some("42".to_string()),
            &err,
        );

        assert_eq!(pe.message, "invalid record");
        let cause = pe.cause.as_ref().unwrap();
        assert_eq!(cause.message, "reading row 42");
        assert_eq!(cause.depth(), 2);
        assert_eq!(pe.root_cause().unwrap().message, "connection timed out");
    }

    #[test]
    fn test_no_cause_for_single_message() {
        let err = anyhow::anyhow!("bad email");
        let pe = PipelineError::from_anyhow(ErrorPhase::Commit, "p", None, &err);
        assert!(pe.cause.is_none());
        assert!(pe.root_cause().is_none());
    }

    #[test]
    fn test_display_includes_identity() {
        let err = PipelineError::prepare("UsersPipeline", "user-7", "missing email");
        assert_eq!(
            err.to_string(),
            "prepare error in pipeline 'UsersPipeline' (user-7): missing email"
        );

        let err = PipelineError::new(ErrorPhase::Commit, "p", None, "stream closed");
        assert!(err.to_string().contains("no source id"));
    }

    #[test]
    fn test_error_source_walks_cause() {
        let err = PipelineError::commit("p", "1", "write failed")
            .with_cause(ErrorCause::new("constraint violation").with_source(ErrorCause::new("dup key")));

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "constraint violation");
        assert_eq!(source.source().unwrap().to_string(), "dup key");
    }

    #[test]
    fn test_to_dict() {
        let err = PipelineError::commit("OrdersPipeline", "o-1", "write failed")
            .with_cause(ErrorCause::new("deadlock"));
        let dict = err.to_dict();

        assert_eq!(dict.get("phase").unwrap(), "commit");
        assert_eq!(dict.get("source_id").unwrap(), "o-1");
        assert_eq!(dict.get("causes").unwrap(), &serde_json::json!(["deadlock"]));
    }

    #[test]
    fn test_from_messages_empty() {
        assert!(ErrorCause::from_messages(Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_discovery_error_message() {
        let err = anyhow::anyhow!("missing credentials");
        let de = DiscoveryError::from_anyhow("LegacyPipeline", "crm", &err);
        assert!(de.to_string().contains("LegacyPipeline"));
        assert!(de.to_string().contains("missing credentials"));
    }

    #[test]
    fn test_error_phase_serialize() {
        let json = serde_json::to_string(&ErrorPhase::Prepare).unwrap();
        assert_eq!(json, r#""prepare""#);
    }
}

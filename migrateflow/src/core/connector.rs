//! The connector contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Which side of a migration a connector sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Where records are read from.
    Source,
    /// Where records are written to.
    Destination,
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

/// A checkable endpoint owned by exactly one pipeline.
///
/// Timeouts are the connector's own business; any error returned by
/// [`Connector::check`] is treated as "not ready".
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    /// Returns the connector's display name.
    fn name(&self) -> &str;

    /// Returns whether this is a source or destination.
    fn kind(&self) -> ConnectorKind;

    /// Probes the endpoint. `Ok(())` means ready.
    async fn check(&self) -> anyhow::Result<()>;
}

/// Outcome of probing one connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorCheck {
    /// The owning pipeline.
    pub pipeline: String,
    /// The connector name.
    pub connector: String,
    /// The connector kind.
    pub kind: ConnectorKind,
    /// Why the connector is not ready, if it isn't.
    pub failure: Option<String>,
}

impl ConnectorCheck {
    /// Probes a connector and records the outcome.
    pub async fn run(pipeline: &str, connector: &dyn Connector) -> Self {
        let failure = connector.check().await.err().map(|e| format!("{e:#}"));
        Self {
            pipeline: pipeline.to_string(),
            connector: connector.name().to_string(),
            kind: connector.kind(),
            failure,
        }
    }

    /// Returns true if the connector is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.failure.is_none()
    }

    /// Renders the operator-facing warning for a failed check.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        self.failure.as_ref().map(|reason| {
            format!(
                "{}: {} connector '{}' is not ready: {}",
                self.pipeline, self.kind, self.connector, reason
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnector;

    #[tokio::test]
    async fn test_ready_connector_has_no_warning() {
        let connector = MockConnector::ready("warehouse", ConnectorKind::Destination);
        let check = ConnectorCheck::run("OrdersPipeline", &connector).await;

        assert!(check.is_ready());
        assert!(check.warning().is_none());
        assert_eq!(connector.check_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_connector_warning() {
        let connector = MockConnector::failing("legacy-db", ConnectorKind::Source, "auth rejected");
        let check = ConnectorCheck::run("OrdersPipeline", &connector).await;

        assert!(!check.is_ready());
        assert_eq!(
            check.warning().unwrap(),
            "OrdersPipeline: source connector 'legacy-db' is not ready: auth rejected"
        );
    }

    #[test]
    fn test_connector_kind_display() {
        assert_eq!(ConnectorKind::Source.to_string(), "source");
        assert_eq!(ConnectorKind::Destination.to_string(), "destination");
    }
}

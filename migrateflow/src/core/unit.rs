//! Units of migration work.

use serde::{Deserialize, Serialize};

/// The data carried by a unit through the prepare and commit phases.
pub type Payload = serde_json::Value;

/// One atomic item of migration work.
///
/// Units are created fresh by their pipeline for every prepare pass. The
/// orchestrator never persists them beyond one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Opaque identifier of the source record, used for error reporting.
    pub source_id: String,
    /// The payload to transform or commit.
    pub payload: Payload,
}

impl Unit {
    /// Creates a new unit.
    #[must_use]
    pub fn new(source_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            source_id: source_id.into(),
            payload,
        }
    }

    /// Returns the source id.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns a unit with the same source id and a new payload.
    #[must_use]
    pub fn with_payload(&self, payload: Payload) -> Self {
        Self {
            source_id: self.source_id.clone(),
            payload,
        }
    }

    /// Consumes the unit, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_payload_keeps_source_id() {
        let unit = Unit::new("row-1", serde_json::json!({"name": "ada"}));
        let prepared = unit.with_payload(serde_json::json!({"name": "ADA"}));

        assert_eq!(prepared.source_id(), "row-1");
        assert_eq!(prepared.payload()["name"], "ADA");
        assert_eq!(unit.payload()["name"], "ada");
    }
}

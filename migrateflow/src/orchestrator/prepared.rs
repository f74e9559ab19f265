//! Prepared state kept between prepare and commit.

use super::staging::StagingArea;
use crate::core::Unit;
use crate::errors::MigrationError;
use std::collections::HashMap;
use std::path::PathBuf;

/// One successfully prepared unit.
#[derive(Debug, Clone)]
pub(crate) enum PreparedEntry {
    /// Held in memory.
    Memory(Unit),
    /// Spilled to the staging area.
    Staged { source_id: String, path: PathBuf },
}

impl PreparedEntry {
    /// Keeps a prepared unit, spilling it to disk when a staging area is set.
    pub(crate) async fn keep(
        unit: Unit,
        pipeline: &str,
        index: usize,
        staging: Option<&StagingArea>,
    ) -> Result<Self, MigrationError> {
        match staging {
            None => Ok(Self::Memory(unit)),
            Some(area) => {
                let path = area.entry_path(pipeline, index, &unit.source_id);
                StagingArea::write_unit(&path, &unit).await?;
                Ok(Self::Staged {
                    source_id: unit.source_id,
                    path,
                })
            }
        }
    }

    /// Returns the unit's source id.
    pub(crate) fn source_id(&self) -> &str {
        match self {
            Self::Memory(unit) => &unit.source_id,
            Self::Staged { source_id, .. } => source_id,
        }
    }

    /// Returns the prepared unit, reading it back from disk if staged.
    pub(crate) async fn load(&self) -> Result<Unit, MigrationError> {
        match self {
            Self::Memory(unit) => Ok(unit.clone()),
            Self::Staged { path, .. } => StagingArea::read_unit(path).await,
        }
    }
}

/// Prepared units per pipeline, in preparation order.
#[derive(Debug, Default)]
pub(crate) struct PreparedStore {
    by_pipeline: HashMap<String, Vec<PreparedEntry>>,
}

impl PreparedStore {
    pub(crate) fn extend(&mut self, pipeline: String, entries: Vec<PreparedEntry>) {
        self.by_pipeline.entry(pipeline).or_default().extend(entries);
    }

    pub(crate) fn entries(&self, pipeline: &str) -> &[PreparedEntry] {
        self.by_pipeline
            .get(pipeline)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn source_ids(&self, pipeline: &str) -> Vec<String> {
        self.entries(pipeline)
            .iter()
            .map(|e| e.source_id().to_string())
            .collect()
    }

    pub(crate) fn total(&self) -> usize {
        self.by_pipeline.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.by_pipeline.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_entries_keep_order() {
        let mut store = PreparedStore::default();
        let mut entries = Vec::new();
        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            let unit = Unit::new(id, serde_json::json!({"i": i}));
            entries.push(PreparedEntry::keep(unit, "p", i, None).await.unwrap());
        }
        store.extend("p".to_string(), entries);

        assert_eq!(store.source_ids("p"), vec!["a", "b", "c"]);
        assert_eq!(store.total(), 3);
        assert!(store.entries("unknown").is_empty());

        let loaded = store.entries("p")[1].load().await.unwrap();
        assert_eq!(loaded.payload["i"], 1);

        store.clear();
        assert_eq!(store.total(), 0);
    }

    #[tokio::test]
    async fn test_staged_entries_round_trip() {
        let base = tempfile::tempdir().unwrap();
        let area = StagingArea::create(base.path()).await.unwrap();

        let unit = Unit::new("row-9", serde_json::json!({"marker": "prepared"}));
        let entry = PreparedEntry::keep(unit.clone(), "p", 0, Some(&area))
            .await
            .unwrap();

        assert!(matches!(entry, PreparedEntry::Staged { .. }));
        assert_eq!(entry.source_id(), "row-9");
        assert_eq!(entry.load().await.unwrap(), unit);
    }
}

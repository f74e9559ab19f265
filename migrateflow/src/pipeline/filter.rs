//! Include/exclude filtering of pipelines by name.

use super::Pipeline;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Case-insensitive substring filter over pipeline names.
///
/// A name is kept iff (the include list is empty OR it matches at least one
/// include pattern) AND it matches no exclude pattern. Include is applied
/// before exclude. Patterns are lowercased and otherwise kept verbatim, so
/// an empty pattern matches every name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FilterPatterns")]
pub struct PipelineFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

/// Patterns as written in configuration, before lowercasing.
#[derive(Deserialize)]
struct FilterPatterns {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

impl From<FilterPatterns> for PipelineFilter {
    fn from(patterns: FilterPatterns) -> Self {
        Self::new(patterns.include, patterns.exclude)
    }
}

impl PipelineFilter {
    /// Creates a filter from include and exclude patterns.
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    /// Creates a filter that keeps everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds an include pattern.
    #[must_use]
    pub fn include(mut self, pattern: impl AsRef<str>) -> Self {
        self.include.extend(normalize([pattern]));
        self
    }

    /// Adds an exclude pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl AsRef<str>) -> Self {
        self.exclude.extend(normalize([pattern]));
        self
    }

    /// Returns true if the filter keeps everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Returns true if a pipeline with this name is kept.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let included =
            self.include.is_empty() || self.include.iter().any(|p| name.contains(p.as_str()));
        included && !self.exclude.iter().any(|p| name.contains(p.as_str()))
    }

    /// Returns the kept pipelines, preserving order.
    #[must_use]
    pub fn apply(&self, pipelines: &[Arc<dyn Pipeline>]) -> Vec<Arc<dyn Pipeline>> {
        pipelines
            .iter()
            .filter(|p| self.matches(p.name()))
            .cloned()
            .collect()
    }
}

fn normalize<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| p.as_ref().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPipeline;
    use pretty_assertions::assert_eq;

    fn pipelines() -> Vec<Arc<dyn Pipeline>> {
        ["UsersPipeline", "UserRolesPipeline", "OrdersPipeline", "LegacyOrdersPipeline"]
            .into_iter()
            .map(|name| Arc::new(MockPipeline::new(name)) as Arc<dyn Pipeline>)
            .collect()
    }

    fn names(pipelines: &[Arc<dyn Pipeline>]) -> Vec<String> {
        pipelines.iter().map(|p| p.name().to_string()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = PipelineFilter::all();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&pipelines()).len(), 4);
    }

    #[test]
    fn test_include_is_case_insensitive_substring() {
        let filter = PipelineFilter::new(["USER"], Vec::<String>::new());
        assert_eq!(
            names(&filter.apply(&pipelines())),
            vec!["UsersPipeline", "UserRolesPipeline"]
        );
    }

    #[test]
    fn test_exclude_only() {
        let filter = PipelineFilter::all().exclude("legacy");
        assert_eq!(
            names(&filter.apply(&pipelines())),
            vec!["UsersPipeline", "UserRolesPipeline", "OrdersPipeline"]
        );
    }

    #[test]
    fn test_include_then_exclude() {
        let filter = PipelineFilter::new(["orders", "roles"], ["legacy"]);
        assert_eq!(
            names(&filter.apply(&pipelines())),
            vec!["UserRolesPipeline", "OrdersPipeline"]
        );
    }

    #[test]
    fn test_filter_equals_include_then_exclude() {
        let all = pipelines();
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec![], vec![]),
            (vec!["user"], vec![]),
            (vec![], vec!["order"]),
            (vec!["order"], vec!["legacy"]),
            (vec!["pipeline"], vec!["user", "legacy"]),
            (vec!["nothing"], vec!["user"]),
        ];

        for (include, exclude) in cases {
            let combined = PipelineFilter::new(&include, &exclude).apply(&all);
            let included = PipelineFilter::new(&include, Vec::<String>::new()).apply(&all);
            let staged = PipelineFilter::new(Vec::<String>::new(), &exclude).apply(&included);
            assert_eq!(names(&combined), names(&staged), "include={include:?} exclude={exclude:?}");
        }
    }

    #[test]
    fn test_empty_pattern_matches_every_name() {
        let filter = PipelineFilter::new(Vec::<String>::new(), [""]);
        assert!(!filter.is_empty());
        assert!(!filter.matches("UsersPipeline"));
        assert!(filter.apply(&pipelines()).is_empty());

        let filter = PipelineFilter::new([""], Vec::<String>::new());
        assert_eq!(filter.apply(&pipelines()).len(), 4);
    }

    #[test]
    fn test_patterns_are_not_trimmed() {
        let filter = PipelineFilter::new([" users"], Vec::<String>::new());
        assert!(!filter.matches("MyUsersPipeline"));
        assert!(filter.matches("My UsersPipeline"));
    }

    #[test]
    fn test_deserialized_patterns_are_case_insensitive() {
        let filter: PipelineFilter =
            serde_json::from_str(r#"{"include":["USERS"],"exclude":["Legacy"]}"#).unwrap();
        assert_eq!(filter, PipelineFilter::new(["USERS"], ["Legacy"]));
        assert!(filter.matches("UsersPipeline"));
        assert!(!filter.matches("LegacyUsersPipeline"));

        let round_trip: PipelineFilter =
            serde_json::from_str(&serde_json::to_string(&filter).unwrap()).unwrap();
        assert_eq!(round_trip, filter);

        let defaults: PipelineFilter = serde_json::from_str("{}").unwrap();
        assert!(defaults.is_empty());
    }
}

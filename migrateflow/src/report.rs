//! Plain-text rendering of collected errors, warnings and pipeline lists.
//!
//! Every function returns lines without terminal styling; callers write
//! them to an [`OutputSink`](crate::events::OutputSink) or anywhere else.

use crate::errors::PipelineError;
use crate::pipeline::Pipeline;
use std::sync::Arc;

/// Renders collected errors, one block per error.
///
/// `label` names when the errors happened, e.g. `"preparation"`.
#[must_use]
pub fn render_errors(errors: &[PipelineError], label: &str) -> Vec<String> {
    let mut lines = vec![format!("There were errors during {label}."), String::new()];

    for error in errors {
        lines.push(error.pipeline.clone());
        lines.push(format!(
            "↳ Source ID: {}",
            error.source_id.as_deref().unwrap_or("-")
        ));
        lines.push(format!("↳ Error: {}", error.message));
        if let Some(cause) = error.root_cause() {
            lines.push(format!("↳ Cause: {}", cause.message));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "{} error(s) detected, see above for details.",
        errors.len()
    ));
    lines
}

/// Renders warnings as a bulleted list.
#[must_use]
pub fn render_warnings(warnings: &[String], label: &str) -> Vec<String> {
    let mut lines = vec![
        format!("Warnings were encountered during {label}."),
        String::new(),
    ];
    lines.extend(warnings.iter().map(|w| format!(" – {w}")));
    lines
}

/// Lists pipeline names.
#[must_use]
pub fn pipeline_listing(pipelines: &[Arc<dyn Pipeline>]) -> Vec<String> {
    if pipelines.is_empty() {
        return vec!["No data migration pipelines discovered.".to_string()];
    }

    let mut lines = vec!["The following data migration pipelines were discovered:".to_string()];
    lines.extend(pipelines.iter().map(|p| format!("– {}", p.name())));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCause, ErrorPhase};
    use crate::testing::{as_pipelines, MockPipeline};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_errors() {
        let errors = vec![
            PipelineError::prepare("UsersPipeline", "42", "invalid record 42")
                .with_cause(ErrorCause::new("bad row").with_source(ErrorCause::new("malformed row"))),
            PipelineError::new(ErrorPhase::Prepare, "OrdersPipeline", None, "cursor lost"),
        ];

        let lines = render_errors(&errors, "preparation");

        assert_eq!(
            lines,
            vec![
                "There were errors during preparation.",
                "",
                "UsersPipeline",
                "↳ Source ID: 42",
                "↳ Error: invalid record 42",
                "↳ Cause: malformed row",
                "",
                "OrdersPipeline",
                "↳ Source ID: -",
                "↳ Error: cursor lost",
                "",
                "2 error(s) detected, see above for details.",
            ]
        );
    }

    #[test]
    fn test_render_warnings() {
        let lines = render_warnings(&["connector down".to_string()], "testing");
        assert_eq!(
            lines,
            vec![
                "Warnings were encountered during testing.",
                "",
                " – connector down"
            ]
        );
    }

    #[test]
    fn test_pipeline_listing() {
        assert_eq!(
            pipeline_listing(&[]),
            vec!["No data migration pipelines discovered."]
        );

        let pipelines = as_pipelines(&[
            Arc::new(MockPipeline::new("UsersPipeline")),
            Arc::new(MockPipeline::new("OrdersPipeline")),
        ]);
        assert_eq!(
            pipeline_listing(&pipelines),
            vec![
                "The following data migration pipelines were discovered:",
                "– UsersPipeline",
                "– OrdersPipeline",
            ]
        );
    }
}

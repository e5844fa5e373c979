//! Stage executors, one module per stage.
//!
//! Each executor is a plain async function taking the [`StageContext`] and
//! the previous stages' outputs. Pipeline position and status transitions
//! belong to the controller.
//!
//! [`StageContext`]: crate::StageContext

pub mod analyze;
pub mod deploy;
pub mod generate;
pub mod plan;
pub mod validate;

use relift_core::analysis::AnalysisResult;
use relift_core::config::RunConfig;
use relift_core::deployment::DeploymentDescriptor;
use relift_core::plan::GenerationPlan;
use relift_core::project::GeneratedProject;
use relift_core::quality::QualityReport;
use relift_core::records::RunMetrics;

/// What the controller needs from any stage's output.
pub trait StageOutput {
    /// Stored as the stage log's output summary.
    fn summary(&self) -> serde_json::Value;

    /// Run attributes learned from this output.
    fn metrics(&self) -> Option<RunMetrics> {
        None
    }

    /// `Some(reason)` turns a produced output into a stage failure.
    fn rejection(&self, _config: &RunConfig) -> Option<String> {
        None
    }
}

impl StageOutput for AnalysisResult {
    fn summary(&self) -> serde_json::Value {
        AnalysisResult::summary(self)
    }

    fn metrics(&self) -> Option<RunMetrics> {
        Some(RunMetrics {
            module: Some(self.module.clone()),
            complexity_score: Some(self.complexity),
            ..Default::default()
        })
    }
}

impl StageOutput for GenerationPlan {
    fn summary(&self) -> serde_json::Value {
        GenerationPlan::summary(self)
    }
}

impl StageOutput for GeneratedProject {
    fn summary(&self) -> serde_json::Value {
        GeneratedProject::summary(self)
    }

    fn metrics(&self) -> Option<RunMetrics> {
        Some(RunMetrics {
            transformed_line_count: Some(self.transformed_line_count()),
            ..Default::default()
        })
    }
}

impl StageOutput for QualityReport {
    fn summary(&self) -> serde_json::Value {
        QualityReport::summary(self)
    }

    fn metrics(&self) -> Option<RunMetrics> {
        Some(RunMetrics {
            quality_score: Some(self.score),
            ..Default::default()
        })
    }

    fn rejection(&self, config: &RunConfig) -> Option<String> {
        (!self.passed).then(|| self.failure_message(config.min_quality_score))
    }
}

impl StageOutput for DeploymentDescriptor {
    fn summary(&self) -> serde_json::Value {
        DeploymentDescriptor::summary(self)
    }
}

/// Pull a text body out of a generator response.
///
/// Accepts a bare string, or an object (optionally wrapped in `data`)
/// carrying the text under one of `keys`.
pub(crate) fn text_payload(value: &serde_json::Value, keys: &[&str]) -> Option<String> {
    let body = value.get("data").unwrap_or(value);
    if let Some(text) = body.as_str() {
        return Some(text.to_string()).filter(|t| !t.trim().is_empty());
    }
    keys.iter()
        .filter_map(|k| body.get(*k).and_then(|v| v.as_str()))
        .find(|t| !t.trim().is_empty())
        .map(str::to_string)
}

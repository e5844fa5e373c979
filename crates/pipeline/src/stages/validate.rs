//! VALIDATE: build the generated project, check its structure, score it,
//! and persist the quality report.
//!
//! A failing report is still an `Ok` here; the controller turns
//! `passed == false` into a stage failure.

use std::path::Path;

use relift_core::plan::GenerationPlan;
use relift_core::project::{GeneratedProject, REQUIRED_DIRS, REQUIRED_PATHS};
use relift_core::quality::{QualityFindings, QualityReport};
use relift_core::status::Stage;

use super::generate::{SCHEMA_PATH, SERVICE_PATH};
use crate::context::StageContext;
use crate::error::StageError;

/// Issues copied from build output into the report.
const MAX_REPORTED_ISSUES: usize = 50;

pub async fn execute(
    ctx: &StageContext,
    plan: &GenerationPlan,
    project: &GeneratedProject,
) -> Result<QualityReport, StageError> {
    let mut findings = QualityFindings::default();

    ctx.report(Stage::Validate, 10, "Building generated project");
    match ctx.build_project(&project.root).await {
        Ok(output) => {
            let (errors, warnings) = output.diagnostics();
            findings.syntax_valid = output.success();
            findings.error_count = errors;
            findings.warning_count = warnings;
            findings.issues.extend(output.error_lines());
            if !output.success() && errors == 0 {
                findings
                    .issues
                    .push(format!("Build exited with code {}", output.exit_code));
            }
        }
        Err(e) => {
            tracing::warn!(run_id = %ctx.run_id, error = %e, "Build tool did not complete");
            findings.syntax_valid = false;
            findings.issues.push(format!("Build tool did not complete: {e}"));
        }
    }

    ctx.report(Stage::Validate, 60, "Checking project structure");
    let missing = missing_paths(&project.root).await;
    findings.structure_valid = missing.is_empty();
    findings
        .issues
        .extend(missing.into_iter().map(|p| format!("Missing required path: {p}")));

    let schema = project.file(SCHEMA_PATH).map(|f| f.content.as_str()).unwrap_or("");
    let service = project.file(SERVICE_PATH).map(|f| f.content.as_str()).unwrap_or("");
    findings.domain_compliant = plan.entities.iter().all(|e| schema.contains(&e.name));
    findings.logic_preserved = plan.service.entities.iter().all(|e| service.contains(e.as_str()));

    findings.issues.truncate(MAX_REPORTED_ISSUES);
    findings.recommendations = recommendations(&findings, project);

    let report = QualityReport::evaluate(ctx.run_id, findings, ctx.config.min_quality_score);
    ctx.gateway().create_quality_report(report.clone()).await?;

    tracing::info!(
        run_id = %ctx.run_id,
        score = report.score,
        passed = report.passed,
        errors = report.error_count,
        warnings = report.warning_count,
        "Validation complete",
    );
    Ok(report)
}

/// Required files and directories absent from `root`.
async fn missing_paths(root: &Path) -> Vec<String> {
    let mut missing = Vec::new();
    for dir in REQUIRED_DIRS {
        let is_dir = tokio::fs::metadata(root.join(dir))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            missing.push(format!("{dir}/"));
        }
    }
    for path in REQUIRED_PATHS {
        let is_file = tokio::fs::metadata(root.join(path))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            missing.push((*path).to_string());
        }
    }
    missing
}

fn recommendations(findings: &QualityFindings, project: &GeneratedProject) -> Vec<String> {
    let mut out = Vec::new();
    if !findings.syntax_valid {
        out.push("Fix the build errors reported for the generated sources".to_string());
    }
    if findings.warning_count > 0 {
        out.push(format!("Review {} build warning(s)", findings.warning_count));
    }
    if !findings.domain_compliant {
        out.push("Data model does not declare every planned entity".to_string());
    }
    if !findings.logic_preserved {
        out.push("Service does not expose every planned entity".to_string());
    }
    if !project.ui_generated {
        out.push("Add a UI application for the service".to_string());
    }
    if !project.sample_data {
        out.push("Add sample data under db/data for local testing".to_string());
    }
    out
}

//! ANALYZE: code analyzer (required) plus language-model enrichment
//! (optional, heuristic fallback).

use serde_json::json;

use relift_core::analysis::{AnalysisResult, ClassificationSource, UNKNOWN_MODULE};
use relift_core::providers::{CODE_ANALYZER, LANGUAGE_MODEL, OP_ANALYZE_CODE, OP_SUMMARIZE};
use relift_core::sanitize::truncate;
use relift_core::status::Stage;

use super::text_payload;
use crate::context::StageContext;
use crate::error::StageError;
use crate::heuristics;

/// Source excerpt sent to the language model.
const SUMMARY_SOURCE_CHARS: usize = 8_000;

pub async fn execute(ctx: &StageContext, source: &str) -> Result<AnalysisResult, StageError> {
    let source_lines = source.lines().count() as i64;

    ctx.report(Stage::Analyze, 10, "Analyzing source with code analyzer");
    let mut analysis = match ctx
        .call(CODE_ANALYZER, OP_ANALYZE_CODE, json!({ "code": source }))
        .await
    {
        Ok(value) => AnalysisResult::from_analyzer_payload(&value, source_lines)
            .map_err(|e| StageError::InvalidOutput(e.to_string()))?,
        Err(e) if e.is_optional_unavailable() => {
            tracing::warn!(
                run_id = %ctx.run_id,
                error = %e,
                "Code analyzer unavailable, using heuristic analysis",
            );
            heuristics::analyze(source)
        }
        Err(e) => return Err(e.into()),
    };

    ctx.report(Stage::Analyze, 60, "Enriching analysis with language model");
    let params = json!({
        "code": truncate(source, SUMMARY_SOURCE_CHARS),
        "tables": analysis.tables,
        "module": analysis.module,
    });
    match ctx.call(LANGUAGE_MODEL, OP_SUMMARIZE, params).await {
        Ok(value) => apply_summary(&mut analysis, &value),
        Err(e) => {
            tracing::warn!(
                run_id = %ctx.run_id,
                error = %e,
                "Language model unavailable, falling back to heuristic classification",
            );
            apply_heuristics(&mut analysis, source);
        }
    }

    tracing::info!(
        run_id = %ctx.run_id,
        module = %analysis.module,
        tables = analysis.tables.len(),
        complexity = analysis.complexity,
        "Analysis complete",
    );
    Ok(analysis)
}

/// Take documentation and, when the analyzer had none, the module tag
/// from the language model's answer.
fn apply_summary(analysis: &mut AnalysisResult, value: &serde_json::Value) {
    if let Some(doc) = text_payload(value, &["documentation", "summary", "text"]) {
        analysis.documentation = doc;
    }
    let suggested = value
        .get("data")
        .unwrap_or(value)
        .get("module")
        .and_then(|m| m.as_str())
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty() && m != UNKNOWN_MODULE);
    if analysis.module == UNKNOWN_MODULE {
        if let Some(module) = suggested {
            analysis.module = module;
            analysis.classification = ClassificationSource::LanguageModel;
        }
    }
    if analysis.documentation.trim().is_empty() {
        analysis.documentation = heuristics::document(analysis);
    }
}

/// Fill whatever the analyzer left open from the local heuristics.
fn apply_heuristics(analysis: &mut AnalysisResult, source: &str) {
    if analysis.module == UNKNOWN_MODULE {
        let local = heuristics::analyze(source);
        if local.module != UNKNOWN_MODULE {
            analysis.module = local.module;
            analysis.classification = ClassificationSource::Heuristic;
        }
    }
    if analysis.documentation.trim().is_empty() {
        analysis.documentation = heuristics::document(analysis);
    }
}

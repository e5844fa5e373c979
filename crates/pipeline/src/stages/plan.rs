//! PLAN: pure derivation plus optional best-practice lookup.

use serde_json::json;

use relift_core::analysis::AnalysisResult;
use relift_core::plan::GenerationPlan;
use relift_core::providers::{DOCS_SEARCH, OP_SEARCH_DOCS};
use relift_core::status::Stage;

use crate::context::StageContext;
use crate::error::StageError;

/// Upper bound on embedded best-practice snippets.
pub const MAX_BEST_PRACTICES: usize = 5;

pub async fn execute(
    ctx: &StageContext,
    analysis: &AnalysisResult,
) -> Result<GenerationPlan, StageError> {
    let mut plan = GenerationPlan::derive(analysis, ctx.config.ui_framework);
    ctx.report(
        Stage::Plan,
        50,
        format!(
            "Derived {} entities for {}",
            plan.entities.len(),
            plan.service.name
        ),
    );

    let query = format!(
        "CAP best practices for {} service with entities {}",
        plan.module,
        plan.service.entities.join(", ")
    );
    match ctx
        .call(
            DOCS_SEARCH,
            OP_SEARCH_DOCS,
            json!({ "query": query, "limit": MAX_BEST_PRACTICES }),
        )
        .await
    {
        Ok(value) => plan.best_practices = snippets(&value),
        Err(e) => {
            tracing::debug!(run_id = %ctx.run_id, error = %e, "Docs search skipped");
        }
    }

    Ok(plan)
}

/// Accepts `["..."]`, `{"results": [...]}` or `{"data": {"results": [...]}}`
/// where each result is a string or an object with `snippet`, `content`
/// or `title`.
fn snippets(value: &serde_json::Value) -> Vec<String> {
    let body = value.get("data").unwrap_or(value);
    let items = body
        .as_array()
        .or_else(|| body.get("results").and_then(|r| r.as_array()));
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            item.as_str().or_else(|| {
                ["snippet", "content", "title"]
                    .iter()
                    .find_map(|k| item.get(*k).and_then(|v| v.as_str()))
            })
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_BEST_PRACTICES)
        .collect()
}

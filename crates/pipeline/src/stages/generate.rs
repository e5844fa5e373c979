//! GENERATE: schema, service and UI sources from generator providers,
//! a build-tool skeleton, and the supporting files, written to the run's
//! work area.
//!
//! Schema generation, UI generation and scaffolding are independent and
//! run concurrently; service generation needs the schema and follows it.

use serde_json::json;

use relift_core::analysis::AnalysisResult;
use relift_core::config::UiFramework;
use relift_core::plan::GenerationPlan;
use relift_core::project::{GeneratedFile, GeneratedProject};
use relift_core::providers::{
    OP_GENERATE_SCHEMA, OP_GENERATE_SERVICE, OP_GENERATE_UI, SCHEMA_GENERATOR, SERVICE_GENERATOR,
    UI_GENERATOR,
};
use relift_core::status::Stage;

use super::text_payload;
use crate::artifacts;
use crate::context::StageContext;
use crate::error::StageError;

pub const SCHEMA_PATH: &str = "db/schema.cds";
pub const SERVICE_PATH: &str = "srv/service.cds";

pub async fn execute(
    ctx: &StageContext,
    analysis: &AnalysisResult,
    plan: &GenerationPlan,
) -> Result<GeneratedProject, StageError> {
    tokio::fs::create_dir_all(ctx.project_dir()).await?;
    let root = tokio::fs::canonicalize(ctx.project_dir()).await?;

    ctx.report(Stage::Generate, 10, "Generating data model");
    let entities = serde_json::to_value(&plan.entities).unwrap_or_default();

    let scaffold = async {
        match ctx.init_project(&root).await {
            Ok(output) => {
                if !output.success() {
                    tracing::warn!(
                        run_id = %ctx.run_id,
                        exit_code = output.exit_code,
                        "Project scaffold exited non-zero",
                    );
                }
                output.combined()
            }
            Err(e) => {
                tracing::warn!(run_id = %ctx.run_id, error = %e, "Project scaffold failed");
                format!("scaffold failed: {e}")
            }
        }
    };
    let schema = ctx.call(
        SCHEMA_GENERATOR,
        OP_GENERATE_SCHEMA,
        json!({
            "namespace": plan.namespace,
            "module": plan.module,
            "entities": entities,
        }),
    );
    let ui = generate_ui(ctx, plan);

    let (scaffold_log, schema, ui_files) = tokio::join!(scaffold, schema, ui);
    let schema = text_payload(&schema?, &["content", "schema", "cds"]).ok_or_else(|| {
        StageError::InvalidOutput("schema generator returned no content".to_string())
    })?;

    ctx.report(Stage::Generate, 50, "Generating service definition");
    let service = ctx
        .call(
            SERVICE_GENERATOR,
            OP_GENERATE_SERVICE,
            json!({
                "namespace": plan.namespace,
                "service": plan.service.name,
                "entities": plan.service.entities,
                "operations": plan.service.operations,
                "schema": schema,
            }),
        )
        .await?;
    let service = text_payload(&service, &["content", "service", "cds"]).ok_or_else(|| {
        StageError::InvalidOutput("service generator returned no content".to_string())
    })?;

    ctx.report(Stage::Generate, 75, "Writing project files");
    let mut files = vec![
        GeneratedFile::new(SCHEMA_PATH, with_header(&schema, plan)),
        GeneratedFile::new(SERVICE_PATH, service),
    ];
    let ui_generated = !ui_files.is_empty();
    files.extend(ui_files);
    files.extend(artifacts::supporting_files(&ctx.run_name, plan, analysis));
    if ctx.config.generate_sample_data {
        files.extend(artifacts::sample_data(plan));
    }
    artifacts::write_files(&root, &files).await?;

    tracing::info!(
        run_id = %ctx.run_id,
        files = files.len(),
        ui_generated,
        root = %root.display(),
        "Project generated",
    );

    Ok(GeneratedProject {
        name: ctx.run_name.clone(),
        root,
        files,
        ui_generated,
        sample_data: ctx.config.generate_sample_data,
        scaffold_log,
    })
}

/// Optional UI generation. Any failure yields no files.
async fn generate_ui(ctx: &StageContext, plan: &GenerationPlan) -> Vec<GeneratedFile> {
    if ctx.config.ui_framework == UiFramework::None {
        return Vec::new();
    }
    let framework = ctx.config.ui_framework.as_str();
    let result = ctx
        .call(
            UI_GENERATOR,
            OP_GENERATE_UI,
            json!({
                "framework": framework,
                "template": plan.ui_template,
                "service": plan.service.name,
                "entities": plan.service.entities,
            }),
        )
        .await;

    let value = match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(run_id = %ctx.run_id, error = %e, "UI generation skipped");
            return Vec::new();
        }
    };

    let body = value.get("data").unwrap_or(&value);
    let prefix = format!("app/{framework}");
    match body.get("files").and_then(|f| f.as_array()) {
        Some(files) => files
            .iter()
            .filter_map(|f| {
                let path = f.get("path")?.as_str()?;
                let content = f.get("content")?.as_str()?;
                let path = format!("{prefix}/{}", path.trim_start_matches('/'));
                artifacts::is_safe_relative(&path).then(|| GeneratedFile::new(path, content))
            })
            .collect(),
        None => text_payload(&value, &["content"])
            .map(|content| vec![GeneratedFile::new(format!("{prefix}/webapp/index.html"), content)])
            .unwrap_or_default(),
    }
}

/// Prefix the schema with best-practice notes from PLAN, as comments.
fn with_header(schema: &str, plan: &GenerationPlan) -> String {
    if plan.best_practices.is_empty() {
        return schema.to_string();
    }
    let mut out = String::new();
    for practice in &plan.best_practices {
        for line in practice.lines() {
            out.push_str("// ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('\n');
    out.push_str(schema);
    out
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tokio::sync::broadcast;

use relift_core::config::{RunConfig, UiFramework};
use relift_events::ProgressEvent;
use relift_pipeline::RunResult;
use relift_worker::{logging, Engine, WorkerConfig};

/// Run the relift pipeline once over a legacy source file and print the
/// result as JSON.
#[derive(Debug, Parser)]
#[command(name = "relift-worker", version)]
struct Args {
    /// Legacy source file to transform.
    source: PathBuf,

    /// JSON run configuration; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run name (derived from the source when omitted).
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Keep the generated project local.
    #[arg(long)]
    skip_deployment: bool,

    #[arg(long)]
    skip_notification: bool,

    /// fiori_elements, ui5_freestyle, react or none.
    #[arg(long, value_parser = UiFramework::from_str)]
    ui: Option<UiFramework>,

    /// Emit CSV sample data for every entity.
    #[arg(long)]
    sample_data: bool,

    /// Minimum quality score (0-100) for VALIDATE to pass.
    #[arg(long)]
    min_score: Option<i32>,
}

impl Args {
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading run config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing run config {}", path.display()))?
            }
            None => RunConfig::default(),
        };
        if self.name.is_some() {
            config.name = self.name.clone();
        }
        if self.description.is_some() {
            config.description = self.description.clone();
        }
        config.skip_deployment |= self.skip_deployment;
        config.skip_notification |= self.skip_notification;
        config.generate_sample_data |= self.sample_data;
        if let Some(ui) = self.ui {
            config.ui_framework = ui;
        }
        if let Some(score) = self.min_score {
            config.min_quality_score = score;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init("relift_worker=debug,relift_pipeline=debug,relift_tools=info,relift_events=info");

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Worker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let source = tokio::fs::read_to_string(&args.source)
        .await
        .with_context(|| format!("reading source file {}", args.source.display()))?;
    let run_config = args.run_config()?;

    let config = WorkerConfig::from_env();
    tracing::info!(
        work_dir = %config.work_dir.display(),
        persistent = config.database_url.is_some(),
        "Loaded worker configuration",
    );
    let engine = Engine::start(&config).await?;

    let progress = tokio::spawn(log_progress(engine.progress.subscribe()));
    let handle = engine.controller.submit(source, run_config).await?;
    let run_id = handle.run_id;

    let controller = Arc::clone(&engine.controller);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(%run_id, "Received SIGINT (Ctrl-C), cancelling run");
            controller.shutdown();
        }
    });

    let outcome = handle.wait().await;
    interrupt.abort();
    progress.abort();

    let code = match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&summary(&result))?);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let report = json!({
                "run_id": run_id,
                "status": "FAILED",
                "error": e.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            ExitCode::FAILURE
        }
    };

    engine.shutdown().await;
    Ok(code)
}

fn summary(result: &RunResult) -> serde_json::Value {
    json!({
        "run_id": result.run.id,
        "name": result.run.name,
        "status": result.run.status,
        "module": result.run.module,
        "complexity": result.run.complexity_score,
        "quality": {
            "score": result.quality.score,
            "passed": result.quality.passed,
            "issues": result.quality.issues.len(),
        },
        "project": {
            "root": result.project.root,
            "files": result.project.files.len(),
            "ui_generated": result.project.ui_generated,
        },
        "deployment": result.deployment,
    })
}

async fn log_progress(mut events: broadcast::Receiver<ProgressEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(
                run_id = %event.run_id,
                stage = ?event.stage,
                status = ?event.status,
                progress = event.progress,
                "{}",
                event.message,
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!(skipped = n, "Progress log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

//! Pipeline controller: run lifecycle, stage sequencing, and the
//! synchronous / asynchronous submission entry points.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use relift_core::analysis::AnalysisResult;
use relift_core::config::RunConfig;
use relift_core::deployment::DeploymentDescriptor;
use relift_core::hooks::{
    EVENT_RUN_COMPLETED, EVENT_RUN_FAILED, EVENT_RUN_STARTED, EVENT_STAGE_COMPLETED,
    EVENT_VALIDATION_FAILED, EVENT_VALIDATION_PASSED,
};
use relift_core::plan::GenerationPlan;
use relift_core::project::GeneratedProject;
use relift_core::quality::QualityReport;
use relift_core::records::{NewRun, NewStageLog, Run, StageLogOutcome};
use relift_core::status::{RunStatus, Stage, StageStatus};
use relift_core::types::RunId;
use relift_db::SharedGateway;
use relift_events::{HookContext, HookDispatcher, ProgressChannel, ProgressEvent, ProgressStatus};
use relift_tools::{BuildTool, ToolConnectionManager};

use crate::context::{PipelineSettings, StageContext};
use crate::error::{PipelineError, StageError};
use crate::stages::{self, StageOutput};

/// Failure reason recorded for cancelled runs.
pub const CANCELLED_REASON: &str = "cancelled";

/// Name used when neither the caller nor the source provides one.
const FALLBACK_RUN_NAME: &str = "legacy-program";

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run: Run,
    pub analysis: AnalysisResult,
    pub plan: GenerationPlan,
    pub project: GeneratedProject,
    pub quality: QualityReport,
    pub deployment: DeploymentDescriptor,
}

/// A run executing in the background.
pub struct RunHandle {
    pub run_id: RunId,
    cancel: CancellationToken,
    task: JoinHandle<Result<RunResult, PipelineError>>,
}

impl RunHandle {
    /// Request cancellation; observed at the next stage boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> Result<RunResult, PipelineError> {
        self.task
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?
    }
}

/// Drives runs through ANALYZE, PLAN, GENERATE, VALIDATE and DEPLOY.
///
/// The controller is the only writer of run status. Multiple runs may be
/// in flight at once; they share the tool connection manager.
pub struct PipelineController {
    gateway: SharedGateway,
    tools: Arc<ToolConnectionManager>,
    hooks: Arc<HookDispatcher>,
    progress: Arc<ProgressChannel>,
    build_tool: Arc<dyn BuildTool>,
    settings: Arc<PipelineSettings>,
    active: Mutex<HashMap<RunId, CancellationToken>>,
    shutdown: CancellationToken,
}

impl PipelineController {
    pub fn new(
        gateway: SharedGateway,
        tools: Arc<ToolConnectionManager>,
        hooks: Arc<HookDispatcher>,
        progress: Arc<ProgressChannel>,
        build_tool: Arc<dyn BuildTool>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            gateway,
            tools,
            hooks,
            progress,
            build_tool,
            settings: Arc::new(settings),
            active: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn gateway(&self) -> &SharedGateway {
        &self.gateway
    }

    pub fn tools(&self) -> &Arc<ToolConnectionManager> {
        &self.tools
    }

    pub fn hooks(&self) -> &Arc<HookDispatcher> {
        &self.hooks
    }

    pub fn progress(&self) -> &Arc<ProgressChannel> {
        &self.progress
    }

    // ---- entry points ----

    /// Execute a run to completion and return its result.
    ///
    /// Stage failures come back as [`PipelineError::Stage`] after the run
    /// has been marked `FAILED`.
    pub async fn run(&self, source: &str, config: RunConfig) -> Result<RunResult, PipelineError> {
        let (run, cancel) = self.prepare(source, &config).await?;
        self.drive(run, source, config, cancel).await
    }

    /// Create the run record and execute it on a background task.
    ///
    /// Returns as soon as the run exists.
    pub async fn submit(
        self: &Arc<Self>,
        source: String,
        config: RunConfig,
    ) -> Result<RunHandle, PipelineError> {
        let (run, cancel) = self.prepare(&source, &config).await?;
        let run_id = run.id;
        let controller = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move { controller.drive(run, &source, config, token).await });
        Ok(RunHandle {
            run_id,
            cancel,
            task,
        })
    }

    /// Cancel an in-flight run. Returns `false` if it is not running here.
    pub fn cancel(&self, run_id: RunId) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.get(&run_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(%run_id, "Run cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn active_runs(&self) -> Vec<RunId> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.keys().copied().collect()
    }

    /// Cancel every in-flight run.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // ---- lifecycle ----

    async fn prepare(
        &self,
        source: &str,
        config: &RunConfig,
    ) -> Result<(Run, CancellationToken), PipelineError> {
        if source.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "Source text must not be empty".to_string(),
            ));
        }
        config.validate()?;

        let name = config
            .name
            .as_deref()
            .map(str::trim)
            .map(str::to_string)
            .unwrap_or_else(|| derive_run_name(source));
        let run = self
            .gateway
            .create_run(NewRun {
                name,
                description: config.description.clone(),
                source_line_count: source.lines().count() as i64,
            })
            .await?;

        let cancel = self.shutdown.child_token();
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(run.id, cancel.clone());

        tracing::info!(run_id = %run.id, name = %run.name, lines = run.source_line_count, "Run created");
        Ok((run, cancel))
    }

    async fn drive(
        &self,
        run: Run,
        source: &str,
        config: RunConfig,
        cancel: CancellationToken,
    ) -> Result<RunResult, PipelineError> {
        let ctx = StageContext {
            run_id: run.id,
            run_name: run.name.clone(),
            config,
            tools: Arc::clone(&self.tools),
            build_tool: Arc::clone(&self.build_tool),
            gateway: Arc::clone(&self.gateway),
            progress: Arc::clone(&self.progress),
            settings: Arc::clone(&self.settings),
        };

        self.progress.publish(ProgressEvent::new(
            run.id,
            None,
            ProgressStatus::Started,
            format!("Run {} started", run.name),
            0,
        ));
        self.hooks
            .trigger(EVENT_RUN_STARTED, self.hook_context(&ctx))
            .await;

        let outcome = self.execute_stages(&ctx, source, &cancel).await;
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&run.id);

        match outcome {
            Ok(result) => self.complete(&ctx, result).await,
            Err(e) => Err(self.fail(&ctx, e).await),
        }
    }

    async fn execute_stages(
        &self,
        ctx: &StageContext,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<StagesOutput, PipelineError> {
        let analysis = self
            .run_stage(
                ctx,
                cancel,
                Stage::Analyze,
                json!({ "source_lines": source.lines().count(), "source_chars": source.len() }),
                stages::analyze::execute(ctx, source),
            )
            .await?;

        let plan = self
            .run_stage(
                ctx,
                cancel,
                Stage::Plan,
                analysis.summary(),
                stages::plan::execute(ctx, &analysis),
            )
            .await?;

        let project = self
            .run_stage(
                ctx,
                cancel,
                Stage::Generate,
                plan.summary(),
                stages::generate::execute(ctx, &analysis, &plan),
            )
            .await?;

        let validation = self
            .run_stage(
                ctx,
                cancel,
                Stage::Validate,
                project.summary(),
                stages::validate::execute(ctx, &plan, &project),
            )
            .await;
        let quality = match validation {
            Ok(report) => {
                let hook_ctx = self.hook_context(ctx).with("score", report.score);
                self.hooks.trigger(EVENT_VALIDATION_PASSED, hook_ctx).await;
                report
            }
            Err(e) => {
                if let PipelineError::Stage {
                    source: StageError::ValidationFailed(reason),
                    ..
                } = &e
                {
                    let hook_ctx = self.hook_context(ctx).with("error", reason.as_str());
                    self.hooks.trigger(EVENT_VALIDATION_FAILED, hook_ctx).await;
                }
                return Err(e);
            }
        };

        let deployment = self
            .run_stage(
                ctx,
                cancel,
                Stage::Deploy,
                json!({
                    "quality_score": quality.score,
                    "skip_deployment": ctx.config.skip_deployment,
                    "files": project.files.len(),
                }),
                stages::deploy::execute(ctx, &project),
            )
            .await?;

        Ok(StagesOutput {
            analysis,
            plan,
            project,
            quality,
            deployment,
        })
    }

    /// Execute one stage between a `STARTED` and a final stage log.
    async fn run_stage<T, F>(
        &self,
        ctx: &StageContext,
        cancel: &CancellationToken,
        stage: Stage,
        input_summary: serde_json::Value,
        exec: F,
    ) -> Result<T, PipelineError>
    where
        T: StageOutput,
        F: Future<Output = Result<T, StageError>>,
    {
        if cancel.is_cancelled() {
            tracing::info!(run_id = %ctx.run_id, next_stage = %stage, "Run cancelled before stage");
            return Err(PipelineError::Cancelled { run_id: ctx.run_id });
        }

        self.gateway
            .update_run_status(ctx.run_id, stage.running_status(), None)
            .await?;
        let log_id = self
            .gateway
            .append_stage_log(NewStageLog {
                run_id: ctx.run_id,
                stage,
                input_summary,
            })
            .await?;
        self.progress.publish(ProgressEvent::stage(
            ctx.run_id,
            stage,
            ProgressStatus::Started,
            format!("{stage} started"),
            0,
        ));
        tracing::info!(run_id = %ctx.run_id, %stage, "Stage started");

        let started = Instant::now();
        let result = exec.await;
        let duration_ms = started.elapsed().as_millis() as i64;

        let (outcome, result) = match result {
            Ok(output) => match output.rejection(&ctx.config) {
                None => (
                    StageLogOutcome {
                        status: StageStatus::Completed,
                        duration_ms,
                        output_summary: Some(output.summary()),
                        error_message: None,
                    },
                    Ok(output),
                ),
                Some(reason) => (
                    StageLogOutcome {
                        status: StageStatus::Failed,
                        duration_ms,
                        output_summary: Some(output.summary()),
                        error_message: Some(reason.clone()),
                    },
                    Err((StageError::ValidationFailed(reason), output.metrics())),
                ),
            },
            Err(e) => (
                StageLogOutcome {
                    status: StageStatus::Failed,
                    duration_ms,
                    output_summary: None,
                    error_message: Some(e.to_string()),
                },
                Err((e, None)),
            ),
        };
        self.gateway.finish_stage_log(log_id, outcome).await?;

        match result {
            Ok(output) => {
                if let Some(metrics) = output.metrics() {
                    self.gateway.update_run_metrics(ctx.run_id, metrics).await?;
                }
                self.progress.publish(ProgressEvent::stage(
                    ctx.run_id,
                    stage,
                    ProgressStatus::Completed,
                    format!("{stage} completed"),
                    100,
                ));
                tracing::info!(run_id = %ctx.run_id, %stage, duration_ms, "Stage completed");
                let hook_ctx = self
                    .hook_context(ctx)
                    .with("stage", stage.as_str())
                    .with("duration_ms", duration_ms);
                self.hooks.trigger(EVENT_STAGE_COMPLETED, hook_ctx).await;
                Ok(output)
            }
            Err((source, metrics)) => {
                // The stage error is what the run fails with; a metrics
                // write failure must not replace it.
                if let Some(metrics) = metrics {
                    if let Err(e) = self.gateway.update_run_metrics(ctx.run_id, metrics).await {
                        tracing::error!(
                            run_id = %ctx.run_id,
                            %stage,
                            error = %e,
                            "Failed to record metrics of rejected stage",
                        );
                    }
                }
                self.progress.publish(ProgressEvent::stage(
                    ctx.run_id,
                    stage,
                    ProgressStatus::Failed,
                    source.to_string(),
                    0,
                ));
                tracing::warn!(run_id = %ctx.run_id, %stage, duration_ms, error = %source, "Stage failed");
                Err(PipelineError::Stage {
                    run_id: ctx.run_id,
                    stage,
                    source,
                })
            }
        }
    }

    async fn complete(
        &self,
        ctx: &StageContext,
        output: StagesOutput,
    ) -> Result<RunResult, PipelineError> {
        let run = match self
            .gateway
            .update_run_status(ctx.run_id, RunStatus::Completed, None)
            .await
        {
            Ok(run) => run,
            Err(e) => return Err(self.fail(ctx, e.into()).await),
        };

        self.progress.publish(ProgressEvent::new(
            ctx.run_id,
            None,
            ProgressStatus::Completed,
            format!("Run {} completed", ctx.run_name),
            100,
        ));
        tracing::info!(run_id = %ctx.run_id, score = output.quality.score, "Run completed");

        let hook_ctx = self
            .hook_context(ctx)
            .with("status", RunStatus::Completed.as_str())
            .with("score", output.quality.score)
            .with("repository_url", output.deployment.repository_url.clone())
            .with("ide_url", output.deployment.ide_url.clone());
        self.hooks.trigger(EVENT_RUN_COMPLETED, hook_ctx).await;

        Ok(RunResult {
            run,
            analysis: output.analysis,
            plan: output.plan,
            project: output.project,
            quality: output.quality,
            deployment: output.deployment,
        })
    }

    /// Mark the run `FAILED`, announce it, and hand the error back.
    async fn fail(&self, ctx: &StageContext, error: PipelineError) -> PipelineError {
        let (reason, stage) = match &error {
            PipelineError::Cancelled { .. } => (CANCELLED_REASON.to_string(), None),
            PipelineError::Stage { stage, source, .. } => (source.to_string(), Some(*stage)),
            other => (other.to_string(), None),
        };

        if let Err(e) = self
            .gateway
            .update_run_status(ctx.run_id, RunStatus::Failed, Some(reason.clone()))
            .await
        {
            tracing::error!(run_id = %ctx.run_id, error = %e, "Failed to mark run as failed");
        }

        let progress = stage.map(|s| s.overall_progress(0)).unwrap_or(0);
        self.progress.publish(ProgressEvent::new(
            ctx.run_id,
            None,
            ProgressStatus::Failed,
            reason.clone(),
            progress,
        ));
        tracing::warn!(run_id = %ctx.run_id, stage = ?stage, reason = %reason, "Run failed");

        let mut hook_ctx = self
            .hook_context(ctx)
            .with("status", RunStatus::Failed.as_str())
            .with("error", reason);
        if let Some(stage) = stage {
            hook_ctx = hook_ctx.with("stage", stage.as_str());
        }
        self.hooks.trigger(EVENT_RUN_FAILED, hook_ctx).await;

        error
    }

    fn hook_context(&self, ctx: &StageContext) -> HookContext {
        HookContext::for_run(ctx.run_id).with("run_name", ctx.run_name.as_str())
    }
}

/// Outputs of the five stages, before the run is finalised.
struct StagesOutput {
    analysis: AnalysisResult,
    plan: GenerationPlan,
    project: GeneratedProject,
    quality: QualityReport,
    deployment: DeploymentDescriptor,
}

/// Name a run after the first `REPORT`/`PROGRAM`/`FUNCTION`/`CLASS`
/// statement in the source.
pub fn derive_run_name(source: &str) -> String {
    const KEYWORDS: [&str; 4] = ["REPORT", "PROGRAM", "FUNCTION", "CLASS"];
    source
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('*') && !l.starts_with('"'))
        .find_map(|line| {
            let mut words = line.split_whitespace();
            let keyword = words.next()?.to_uppercase();
            if !KEYWORDS.contains(&keyword.as_str()) {
                return None;
            }
            let name = words.next()?.trim_end_matches('.').trim_matches('\'');
            (!name.is_empty()).then(|| name.to_lowercase())
        })
        .unwrap_or_else(|| FALLBACK_RUN_NAME.to_string())
}

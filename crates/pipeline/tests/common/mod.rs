//! Shared fixture: a controller wired to in-process providers, an
//! in-memory gateway, and a scripted build tool.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;

use relift_core::providers::{
    CODE_ANALYZER, DOCS_SEARCH, LANGUAGE_MODEL, MESSAGING, SCHEMA_GENERATOR, SERVICE_GENERATOR,
    SOURCE_CONTROL, UI_GENERATOR,
};
use relift_core::error::CoreError;
use relift_core::quality::QualityReport;
use relift_core::records::{
    HookExecution, NewHookExecution, NewRun, NewStageLog, NewToolCallLog, Run, RunMetrics,
    StageLog, StageLogOutcome, ToolCallLog,
};
use relift_core::status::RunStatus;
use relift_core::types::{DbId, RunId};
use relift_db::{GatewayError, MemoryGateway, PersistenceGateway, SharedGateway};
use relift_events::{HookDispatcher, HookRegistry, ProgressChannel, ToolAgent, WebhookDelivery};
use relift_pipeline::{PipelineController, PipelineSettings};
use relift_tools::{
    BuildOutput, BuildTool, BuildToolError, InProcessProvider, ProviderSpec, RetryPolicy,
    ToolConnectionManager, ToolError,
};

pub const PRICING_SOURCE: &str = "\
REPORT zsd_pricing.
* Reprice open sales orders
SELECT * FROM vbak INTO TABLE lt_vbak WHERE auart = 'TA'.
LOOP AT lt_vbak INTO ls_vbak.
  SELECT * FROM vbap INTO TABLE lt_vbap WHERE vbeln = ls_vbak-vbeln.
  IF ls_vbak-netwr > 1000.
    UPDATE vbak SET netwr = ls_vbak-netwr WHERE vbeln = ls_vbak-vbeln.
  ENDIF.
ENDLOOP.
SELECT SINGLE * FROM kna1 INTO ls_kna1 WHERE kunnr = ls_vbak-kunnr.
";

/// Hooks used by the controller tests.
pub const HOOKS: &str = r#"[
    {"hook_id": "announce", "trigger_event": "run.completed",
     "actions": [{"kind": "tool", "provider": "messaging", "operation": "postMessage",
                  "params": {"text": "hook: {{run_id}} ready at {{ide_url}}"}}]},
    {"hook_id": "alert", "trigger_event": "run.failed",
     "actions": [{"kind": "tool", "provider": "messaging", "operation": "postMessage",
                  "params": {"text": "hook: {{run_id}} failed: {{error}}"}}]},
    {"hook_id": "gate", "trigger_event": "validation.failed",
     "actions": [{"kind": "tool", "provider": "messaging", "operation": "postMessage",
                  "params": {"text": "hook: quality gate rejected {{run_id}}"}}]},
    {"hook_id": "broken", "trigger_event": "stage.completed",
     "actions": [{"kind": "tool", "provider": "nowhere", "operation": "noop"}]}
]"#;

/// Build tool that scaffolds nothing and returns a fixed build result.
pub struct ScriptedBuildTool {
    output: BuildOutput,
    pub builds: AtomicU32,
}

impl ScriptedBuildTool {
    pub fn clean() -> Self {
        Self::with_output(BuildOutput {
            exit_code: 0,
            stdout: "Build succeeded".to_string(),
            ..Default::default()
        })
    }

    /// Exit 0 with `n` warning lines.
    pub fn warnings(n: usize) -> Self {
        let stdout = (0..n)
            .map(|i| format!("[WARNING] srv/service.cds:{i}: unused element"))
            .collect::<Vec<_>>()
            .join("\n");
        Self::with_output(BuildOutput {
            exit_code: 0,
            stdout,
            ..Default::default()
        })
    }

    /// Exit 1 with `n` error lines.
    pub fn errors(n: usize) -> Self {
        let stderr = (0..n)
            .map(|i| format!("[ERROR] db/schema.cds:{i}: unknown type"))
            .collect::<Vec<_>>()
            .join("\n");
        Self::with_output(BuildOutput {
            exit_code: 1,
            stderr,
            ..Default::default()
        })
    }

    fn with_output(output: BuildOutput) -> Self {
        Self {
            output,
            builds: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BuildTool for ScriptedBuildTool {
    async fn init_project(&self, _dir: &Path, name: &str) -> Result<BuildOutput, BuildToolError> {
        Ok(BuildOutput {
            exit_code: 0,
            stdout: format!("Initialized project {name}"),
            ..Default::default()
        })
    }

    async fn build(&self, _dir: &Path) -> Result<BuildOutput, BuildToolError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Memory gateway that cannot store quality scores.
pub struct MetricsUnavailable(pub Arc<MemoryGateway>);

#[async_trait]
impl PersistenceGateway for MetricsUnavailable {
    async fn create_run(&self, input: NewRun) -> Result<Run, GatewayError> {
        self.0.create_run(input).await
    }

    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
        failure_reason: Option<String>,
    ) -> Result<Run, GatewayError> {
        self.0.update_run_status(run_id, status, failure_reason).await
    }

    async fn update_run_metrics(
        &self,
        run_id: RunId,
        metrics: RunMetrics,
    ) -> Result<Run, GatewayError> {
        if metrics.quality_score.is_some() {
            return Err(GatewayError::Core(CoreError::Internal(
                "metrics store offline".to_string(),
            )));
        }
        self.0.update_run_metrics(run_id, metrics).await
    }

    async fn append_stage_log(&self, input: NewStageLog) -> Result<DbId, GatewayError> {
        self.0.append_stage_log(input).await
    }

    async fn finish_stage_log(
        &self,
        id: DbId,
        outcome: StageLogOutcome,
    ) -> Result<StageLog, GatewayError> {
        self.0.finish_stage_log(id, outcome).await
    }

    async fn append_tool_call_log(
        &self,
        input: NewToolCallLog,
    ) -> Result<ToolCallLog, GatewayError> {
        self.0.append_tool_call_log(input).await
    }

    async fn create_quality_report(&self, report: QualityReport) -> Result<(), GatewayError> {
        self.0.create_quality_report(report).await
    }

    async fn append_hook_execution(
        &self,
        input: NewHookExecution,
    ) -> Result<HookExecution, GatewayError> {
        self.0.append_hook_execution(input).await
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, GatewayError> {
        self.0.get_run(run_id).await
    }

    async fn list_runs(&self, limit: i64) -> Result<Vec<Run>, GatewayError> {
        self.0.list_runs(limit).await
    }

    async fn stage_logs(&self, run_id: RunId) -> Result<Vec<StageLog>, GatewayError> {
        self.0.stage_logs(run_id).await
    }

    async fn tool_call_logs(&self, run_id: RunId) -> Result<Vec<ToolCallLog>, GatewayError> {
        self.0.tool_call_logs(run_id).await
    }

    async fn quality_report(&self, run_id: RunId) -> Result<Option<QualityReport>, GatewayError> {
        self.0.quality_report(run_id).await
    }

    async fn hook_executions(
        &self,
        run_id: Option<RunId>,
    ) -> Result<Vec<HookExecution>, GatewayError> {
        self.0.hook_executions(run_id).await
    }
}

/// Which providers to register and how they behave.
pub struct Fixture {
    pub analyzer: Analyzer,
    pub llm: bool,
    pub docs: bool,
    pub ui: bool,
    pub source_control: bool,
    pub build: ScriptedBuildTool,
    pub hooks: &'static str,
    /// Make quality-score writes fail.
    pub metrics_fail: bool,
}

pub enum Analyzer {
    Available,
    /// Registered as required, never connects.
    Down,
    /// Registered as optional, never connects.
    OptionalDown,
    /// Signals `entered` when called, then waits for `release`.
    Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    },
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            analyzer: Analyzer::Available,
            llm: true,
            docs: true,
            ui: true,
            source_control: true,
            build: ScriptedBuildTool::warnings(5),
            hooks: HOOKS,
            metrics_fail: false,
        }
    }
}

pub struct Harness {
    pub gateway: Arc<MemoryGateway>,
    pub tools: Arc<ToolConnectionManager>,
    pub controller: Arc<PipelineController>,
    pub progress: Arc<ProgressChannel>,
    pub messages: Arc<Mutex<Vec<Value>>>,
    pub pushes: Arc<Mutex<Vec<Value>>>,
    pub work: TempDir,
}

impl Harness {
    /// Texts posted to the messaging host, in order.
    pub fn message_texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m["text"].as_str().map(str::to_string))
            .collect()
    }
}

fn analyzer_reply() -> Value {
    json!({
        "data": {
            "businessLogic": ["Reprice orders above 1000"],
            "tables": ["vbak", "VBAP", "kna1", "vbak"],
            "dependencies": [],
            "patterns": ["loop-with-select"],
            "metadata": {"module": "SD", "complexity": 4, "linesOfCode": 10},
            "documentation": ""
        }
    })
}

fn entity_names(params: &Value, key: &str) -> Vec<String> {
    params[key]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e.as_str().or_else(|| e["name"].as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Fixture {
    pub async fn build(self) -> Harness {
        let gateway = Arc::new(MemoryGateway::new());
        let shared: SharedGateway = if self.metrics_fail {
            Arc::new(MetricsUnavailable(Arc::clone(&gateway)))
        } else {
            gateway.clone()
        };
        let tools = Arc::new(ToolConnectionManager::new(
            shared.clone(),
            RetryPolicy::new(2, Duration::from_millis(1)),
        ));

        let analyzer: (ProviderSpec, InProcessProvider) = match self.analyzer {
            Analyzer::Available => (
                ProviderSpec::required(CODE_ANALYZER),
                InProcessProvider::from_fn(|_, _| Ok(analyzer_reply())),
            ),
            Analyzer::Down => (
                ProviderSpec::required(CODE_ANALYZER),
                InProcessProvider::unreachable(ToolError::Transient("connection refused".into())),
            ),
            Analyzer::OptionalDown => (
                ProviderSpec::optional(CODE_ANALYZER),
                InProcessProvider::unreachable(ToolError::Transient("connection refused".into())),
            ),
            Analyzer::Gated { entered, release } => (
                ProviderSpec::required(CODE_ANALYZER),
                InProcessProvider::new(move |_, _| {
                    let entered = Arc::clone(&entered);
                    let release = Arc::clone(&release);
                    async move {
                        entered.notify_one();
                        release.notified().await;
                        Ok(analyzer_reply())
                    }
                }),
            ),
        };
        tools.register(analyzer.0, Arc::new(analyzer.1)).await.unwrap();

        if self.llm {
            tools
                .register(
                    ProviderSpec::optional(LANGUAGE_MODEL),
                    Arc::new(InProcessProvider::from_fn(|op, _| match op {
                        "summarize" => Ok(json!({"documentation": "Reprices open sales orders."})),
                        _ => Ok(json!("done")),
                    })),
                )
                .await
                .unwrap();
        }

        if self.docs {
            tools
                .register(
                    ProviderSpec::optional(DOCS_SEARCH),
                    Arc::new(InProcessProvider::from_fn(|_, _| {
                        Ok(json!({"results": [{"snippet": "Use cuid and managed aspects"}]}))
                    })),
                )
                .await
                .unwrap();
        }

        tools
            .register(
                ProviderSpec::required(SCHEMA_GENERATOR),
                Arc::new(InProcessProvider::from_fn(|_, params| {
                    let body: String = entity_names(params, "entities")
                        .iter()
                        .map(|e| format!("entity {e} {{ key ID : UUID; }}\n"))
                        .collect();
                    Ok(json!({
                        "content": format!("namespace {};\n{body}", params["namespace"].as_str().unwrap_or(""))
                    }))
                })),
            )
            .await
            .unwrap();
        tools
            .register(
                ProviderSpec::required(SERVICE_GENERATOR),
                Arc::new(InProcessProvider::from_fn(|_, params| {
                    let body: String = entity_names(params, "entities")
                        .iter()
                        .map(|e| format!("  entity {e} as projection on db.{e};\n"))
                        .collect();
                    Ok(json!(format!(
                        "service {} {{\n{body}}}",
                        params["service"].as_str().unwrap_or("")
                    )))
                })),
            )
            .await
            .unwrap();

        if self.ui {
            tools
                .register(
                    ProviderSpec::optional(UI_GENERATOR),
                    Arc::new(InProcessProvider::from_fn(|_, _| {
                        Ok(json!({"files": [
                            {"path": "webapp/index.html", "content": "<html></html>"},
                            {"path": "webapp/manifest.json", "content": "{}"}
                        ]}))
                    })),
                )
                .await
                .unwrap();
        }

        let pushes = Arc::new(Mutex::new(Vec::new()));
        if self.source_control {
            let sink = Arc::clone(&pushes);
            tools
                .register(
                    ProviderSpec::optional(SOURCE_CONTROL),
                    Arc::new(InProcessProvider::from_fn(move |op, params| match op {
                        "createRepository" => Ok(json!({
                            "owner": {"login": "acme"},
                            "name": params["name"],
                            "html_url": format!(
                                "https://github.com/acme/{}",
                                params["name"].as_str().unwrap_or("")
                            ),
                        })),
                        "pushFiles" => {
                            sink.lock().unwrap().push(params.clone());
                            Ok(json!({"commit": "abc123"}))
                        }
                        "createWorkflow" => Ok(json!({"path": params["path"]})),
                        other => Err(ToolError::Permanent(format!("unknown operation {other}"))),
                    })),
                )
                .await
                .unwrap();
        }

        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        tools
            .register(
                ProviderSpec::optional(MESSAGING),
                Arc::new(InProcessProvider::from_fn(move |_, params| {
                    sink.lock().unwrap().push(params.clone());
                    Ok(json!({"ok": true}))
                })),
            )
            .await
            .unwrap();

        let hooks = Arc::new(
            HookDispatcher::new(
                HookRegistry::from_json(self.hooks).unwrap(),
                Arc::clone(&tools),
                Arc::new(ToolAgent::new(Arc::clone(&tools))),
                shared.clone(),
            )
            .with_webhooks(WebhookDelivery::new().with_retry_delays(vec![])),
        );

        let work = tempfile::tempdir().unwrap();
        let progress = Arc::new(ProgressChannel::default());
        let controller = Arc::new(PipelineController::new(
            shared,
            Arc::clone(&tools),
            hooks,
            Arc::clone(&progress),
            Arc::new(self.build),
            PipelineSettings {
                work_dir: work.path().to_path_buf(),
                ..Default::default()
            },
        ));

        Harness {
            gateway,
            tools,
            controller,
            progress,
            messages,
            pushes,
            work,
        }
    }
}

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use relift_api::config::ServerConfig;
use relift_api::router::build_app_router;
use relift_api::state::AppState;
use relift_core::providers::{CODE_ANALYZER, MESSAGING, SCHEMA_GENERATOR, SERVICE_GENERATOR};
use relift_db::{MemoryGateway, SharedGateway};
use relift_events::{HookDispatcher, HookRegistry, ProgressChannel, ToolAgent};
use relift_pipeline::{PipelineController, PipelineSettings};
use relift_tools::{
    BuildOutput, BuildTool, BuildToolError, InProcessProvider, ProviderSpec, RetryPolicy,
    ToolConnectionManager,
};

pub const SOURCE: &str = "REPORT zfi_ledger.\nSELECT * FROM bkpf INTO TABLE lt_bkpf.\nSELECT * FROM bseg INTO TABLE lt_bseg.";

/// Build tool that always reports a clean build.
struct CleanBuild;

#[async_trait]
impl BuildTool for CleanBuild {
    async fn init_project(&self, _dir: &Path, _name: &str) -> Result<BuildOutput, BuildToolError> {
        Ok(BuildOutput::default())
    }

    async fn build(&self, _dir: &Path) -> Result<BuildOutput, BuildToolError> {
        Ok(BuildOutput::default())
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

pub struct TestApp {
    pub app: Router,
    pub gateway: Arc<MemoryGateway>,
    pub controller: Arc<PipelineController>,
    pub work: TempDir,
}

/// Router over a controller with in-process generators. Only the code
/// analyzer is required; `analyzer_up = false` makes it unreachable.
pub async fn build_test_app(analyzer_up: bool, hooks_path: Option<PathBuf>) -> TestApp {
    let gateway = Arc::new(MemoryGateway::new());
    let shared: SharedGateway = gateway.clone();
    let tools = Arc::new(ToolConnectionManager::new(
        shared.clone(),
        RetryPolicy::new(1, Duration::from_millis(1)),
    ));

    let analyzer = if analyzer_up {
        InProcessProvider::from_fn(|_, _| {
            Ok(json!({"tables": ["BKPF", "BSEG"], "metadata": {"complexity": 2}}))
        })
    } else {
        InProcessProvider::unreachable(relift_tools::ToolError::Transient("refused".into()))
    };
    tools
        .register(ProviderSpec::required(CODE_ANALYZER), Arc::new(analyzer))
        .await
        .unwrap();
    tools
        .register(
            ProviderSpec::required(SCHEMA_GENERATOR),
            Arc::new(InProcessProvider::from_fn(|_, _| {
                Ok(json!({"content": "namespace relift.fi;"}))
            })),
        )
        .await
        .unwrap();
    tools
        .register(
            ProviderSpec::required(SERVICE_GENERATOR),
            Arc::new(InProcessProvider::from_fn(|_, _| {
                Ok(json!("service FinancialAccountingService {}"))
            })),
        )
        .await
        .unwrap();
    tools
        .register(
            ProviderSpec::optional(MESSAGING),
            Arc::new(InProcessProvider::from_fn(|_, _| Ok(json!({"ok": true})))),
        )
        .await
        .unwrap();

    // The unreachable analyzer makes startup fail; health then reports it.
    let _ = tools.start_all().await;

    let registry = match &hooks_path {
        Some(path) => HookRegistry::load_from_path(path).unwrap(),
        None => HookRegistry::default(),
    };
    let hooks = Arc::new(HookDispatcher::new(
        registry,
        Arc::clone(&tools),
        Arc::new(ToolAgent::new(Arc::clone(&tools))),
        shared.clone(),
    ));

    let work = tempfile::tempdir().unwrap();
    let controller = Arc::new(PipelineController::new(
        shared,
        tools,
        hooks,
        Arc::new(ProgressChannel::default()),
        Arc::new(CleanBuild),
        PipelineSettings {
            work_dir: work.path().to_path_buf(),
            ..Default::default()
        },
    ));

    let state = AppState {
        config: Arc::new(test_config()),
        controller: Arc::clone(&controller),
        hooks_path: hooks_path.map(Arc::new),
    };

    TestApp {
        app: build_app_router(state),
        gateway,
        controller,
        work,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A run request that never leaves the machine.
pub fn local_run(name: &str) -> Value {
    json!({
        "source": SOURCE,
        "config": {
            "name": name,
            "skip_deployment": true,
            "ui_framework": "none"
        }
    })
}

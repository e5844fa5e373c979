//! End-to-end runs through the controller against in-process providers.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use tokio::sync::Notify;

use relift_core::analysis::ClassificationSource;
use relift_core::config::{RunConfig, UiFramework};
use relift_core::deployment::DeploymentMode;
use relift_core::status::{HookStatus, RunStatus, Stage, StageStatus};
use relift_db::PersistenceGateway;
use relift_events::ProgressStatus;
use relift_pipeline::{PipelineError, StageError};
use relift_tools::ToolError;

use common::{Analyzer, Fixture, ScriptedBuildTool, PRICING_SOURCE};

fn named(name: &str) -> RunConfig {
    RunConfig {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_run_completes_every_stage() {
    let h = Fixture::default().build().await;

    let result = h
        .controller
        .run(PRICING_SOURCE, named("Sales Pricing"))
        .await
        .unwrap();
    let run_id = result.run.id;

    assert_eq!(result.run.status, RunStatus::Completed);
    assert_eq!(result.run.module.as_deref(), Some("SD"));
    assert_eq!(result.run.complexity_score, Some(4));
    assert_eq!(result.run.quality_score, Some(90));
    assert!(result.run.transformed_line_count.unwrap() > 0);
    assert_eq!(result.analysis.tables, ["VBAK", "VBAP", "KNA1"]);
    assert_eq!(result.plan.entities.len(), 3);
    assert_eq!(result.plan.best_practices, ["Use cuid and managed aspects"]);

    // One stage log per stage, in pipeline order.
    let logs = h.gateway.stage_logs(run_id).await.unwrap();
    let stages: Vec<Stage> = logs.iter().map(|l| l.stage).collect();
    assert_eq!(stages, Stage::ALL);
    assert!(logs.iter().all(|l| l.status == StageStatus::Completed));
    assert!(logs.iter().all(|l| l.duration_ms.is_some()));

    let report = h.gateway.quality_report(run_id).await.unwrap().unwrap();
    assert_eq!(report.score, 90);
    assert!(report.passed);
    assert_eq!(report.warning_count, 5);

    // Build-tool processes are logged alongside provider calls.
    let calls = h.gateway.tool_call_logs(run_id).await.unwrap();
    let build_calls: Vec<_> = calls.iter().filter(|c| c.provider == "build-tool").collect();
    let operations: Vec<&str> = build_calls.iter().map(|c| c.operation.as_str()).collect();
    assert_eq!(operations, ["init", "build"]);
    assert!(build_calls.iter().all(|c| c.error.is_none() && c.attempts == 1));
    let build = build_calls[1].result.as_ref().unwrap();
    assert_eq!(build["exit_code"], 0);
    assert!(build["output"].as_str().unwrap().contains("[WARNING]"));

    assert_eq!(result.deployment.mode, DeploymentMode::Remote);
    assert_eq!(
        result.deployment.ide_url.as_deref(),
        Some("https://vscode.dev/github/acme/sales-pricing")
    );
    assert!(result.deployment.ci_workflow);
    assert!(result.deployment.notified);

    let pushes = h.pushes.lock().unwrap().clone();
    assert_eq!(pushes.len(), 1);
    let pushed: Vec<&str> = pushes[0]["files"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["path"].as_str())
        .collect();
    assert!(pushed.contains(&"db/schema.cds"));
    assert!(pushed.contains(&"app/fiori_elements/webapp/index.html"));

    let root = h.work.path().join(run_id.to_string());
    assert!(root.join("package.json").is_file());
    assert!(root.join("srv/service.cds").is_file());

    let texts = h.message_texts();
    assert!(texts.contains(&format!(
        "hook: {run_id} ready at https://vscode.dev/github/acme/sales-pricing"
    )));

    let latest = h.progress.latest(run_id).unwrap();
    assert!(latest.is_terminal());
    assert_eq!(latest.status, ProgressStatus::Completed);
    assert_eq!(latest.progress, 100);
}

#[tokio::test]
async fn stage_progress_never_goes_backwards() {
    let h = Fixture::default().build().await;
    let result = h
        .controller
        .run(PRICING_SOURCE, named("monotonic"))
        .await
        .unwrap();

    let history = h.progress.history(result.run.id);
    assert!(history.len() > 10);
    let points: Vec<u8> = history.iter().map(|e| e.progress).collect();
    assert!(points.windows(2).all(|w| w[0] <= w[1]), "{points:?}");
    assert_eq!(history[0].status, ProgressStatus::Started);
}

#[tokio::test]
async fn failed_run_keeps_the_progress_it_reached() {
    let h = Fixture {
        build: ScriptedBuildTool::errors(2),
        ..Default::default()
    }
    .build()
    .await;
    let err = h
        .controller
        .run(PRICING_SOURCE, named("regressing"))
        .await
        .unwrap_err();
    let run_id = err.run_id().unwrap();

    let history = h.progress.history(run_id);
    let points: Vec<u8> = history.iter().map(|e| e.progress).collect();
    assert!(points.windows(2).all(|w| w[0] <= w[1]), "{points:?}");

    let reached = history
        .iter()
        .filter(|e| e.status == ProgressStatus::Running)
        .map(|e| e.progress)
        .max()
        .unwrap();
    let failed_stage = history
        .iter()
        .find(|e| e.stage == Some(Stage::Validate) && e.status == ProgressStatus::Failed)
        .unwrap();
    assert_eq!(failed_stage.progress, reached);

    let latest = h.progress.latest(run_id).unwrap();
    assert!(latest.is_terminal());
    assert_eq!(latest.progress, reached);
}

#[tokio::test]
async fn failing_hook_does_not_affect_the_run() {
    let h = Fixture::default().build().await;
    let result = h
        .controller
        .run(PRICING_SOURCE, named("isolated"))
        .await
        .unwrap();
    assert_eq!(result.run.status, RunStatus::Completed);

    let executions = h
        .gateway
        .hook_executions(Some(result.run.id))
        .await
        .unwrap();
    let broken: Vec<_> = executions.iter().filter(|e| e.hook_id == "broken").collect();
    assert_eq!(broken.len(), Stage::ALL.len());
    assert!(broken.iter().all(|e| e.status == HookStatus::Failed));

    let announce = executions.iter().find(|e| e.hook_id == "announce").unwrap();
    assert_eq!(announce.status, HookStatus::Completed);
}

#[tokio::test]
async fn required_analyzer_down_fails_the_run_at_analyze() {
    let h = Fixture {
        analyzer: Analyzer::Down,
        ..Default::default()
    }
    .build()
    .await;

    let err = h
        .controller
        .run(PRICING_SOURCE, named("orphan"))
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        PipelineError::Stage {
            stage: Stage::Analyze,
            source: StageError::Tool(ToolError::Unavailable { required: true, .. }),
            ..
        }
    );
    let run_id = err.run_id().unwrap();

    let run = h.gateway.get_run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.failure_reason.unwrap().contains("code-analyzer"));

    let logs = h.gateway.stage_logs(run_id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].stage, Stage::Analyze);
    assert_eq!(logs[0].status, StageStatus::Failed);
    assert!(logs[0].error_message.is_some());

    assert!(h.gateway.quality_report(run_id).await.unwrap().is_none());
    assert!(h
        .message_texts()
        .iter()
        .any(|t| t.starts_with(&format!("hook: {run_id} failed:"))));

    let latest = h.progress.latest(run_id).unwrap();
    assert_eq!(latest.status, ProgressStatus::Failed);
    assert!(latest.is_terminal());
}

#[tokio::test]
async fn optional_providers_degrade_gracefully() {
    let h = Fixture {
        analyzer: Analyzer::OptionalDown,
        llm: false,
        docs: false,
        ui: false,
        ..Default::default()
    }
    .build()
    .await;

    let result = h
        .controller
        .run(PRICING_SOURCE, named("degraded"))
        .await
        .unwrap();

    assert_eq!(result.run.status, RunStatus::Completed);
    assert_eq!(result.analysis.classification, ClassificationSource::Heuristic);
    assert!(result.analysis.tables.contains(&"VBAK".to_string()));
    assert!(!result.analysis.documentation.is_empty());
    assert!(result.plan.best_practices.is_empty());
    assert!(!result.project.ui_generated);
}

#[tokio::test]
async fn ui_framework_none_skips_ui_generation() {
    let h = Fixture::default().build().await;
    let config = RunConfig {
        ui_framework: UiFramework::None,
        generate_sample_data: true,
        ..named("headless")
    };
    let result = h.controller.run(PRICING_SOURCE, config).await.unwrap();

    assert!(!result.project.ui_generated);
    assert!(result.project.sample_data);
    assert!(result
        .project
        .files
        .iter()
        .any(|f| f.path.starts_with("db/data/") && f.path.ends_with(".csv")));
    assert!(!result.project.files.iter().any(|f| f.path.starts_with("app/")));
}

#[tokio::test]
async fn failing_build_is_rejected_by_the_quality_gate() {
    let h = Fixture {
        build: ScriptedBuildTool::errors(3),
        ..Default::default()
    }
    .build()
    .await;

    let err = h
        .controller
        .run(PRICING_SOURCE, named("broken build"))
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        PipelineError::Stage {
            stage: Stage::Validate,
            source: StageError::ValidationFailed(_),
            ..
        }
    );
    let run_id = err.run_id().unwrap();

    // 100 - 30 (syntax) - 3 * 5 (errors)
    let report = h.gateway.quality_report(run_id).await.unwrap().unwrap();
    assert_eq!(report.score, 55);
    assert!(!report.passed);
    assert!(!report.syntax_valid);
    assert_eq!(report.issues.len(), 3);

    let run = h.gateway.get_run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.quality_score, Some(55));

    let logs = h.gateway.stage_logs(run_id).await.unwrap();
    assert_eq!(logs.len(), 4);
    assert_eq!(logs[3].stage, Stage::Validate);
    assert_eq!(logs[3].status, StageStatus::Failed);
    assert!(logs[3].output_summary.is_some());

    let calls = h.gateway.tool_call_logs(run_id).await.unwrap();
    let build = calls
        .iter()
        .find(|c| c.provider == "build-tool" && c.operation == "build")
        .unwrap();
    assert!(build.error.is_none());
    assert_eq!(build.result.as_ref().unwrap()["exit_code"], 1);

    assert!(h.pushes.lock().unwrap().is_empty());
    assert!(h
        .message_texts()
        .contains(&format!("hook: quality gate rejected {run_id}")));
}

#[tokio::test]
async fn rejected_report_survives_a_metrics_write_failure() {
    let h = Fixture {
        build: ScriptedBuildTool::errors(1),
        metrics_fail: true,
        ..Default::default()
    }
    .build()
    .await;

    let err = h
        .controller
        .run(PRICING_SOURCE, named("unrecorded score"))
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        PipelineError::Stage {
            stage: Stage::Validate,
            source: StageError::ValidationFailed(_),
            ..
        }
    );
    let run_id = err.run_id().unwrap();

    let run = h.gateway.get_run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.quality_score.is_none());
    assert!(h
        .message_texts()
        .contains(&format!("hook: quality gate rejected {run_id}")));
}

#[tokio::test]
async fn score_below_configured_minimum_is_rejected() {
    let h = Fixture::default().build().await;
    let config = RunConfig {
        min_quality_score: 95,
        ..named("strict")
    };
    let err = h.controller.run(PRICING_SOURCE, config).await.unwrap_err();
    assert_matches!(
        &err,
        PipelineError::Stage {
            source: StageError::ValidationFailed(reason),
            ..
        } if reason.contains("90")
    );
}

#[tokio::test]
async fn skipped_deployment_still_records_deploy() {
    let h = Fixture::default().build().await;
    let config = RunConfig {
        skip_deployment: true,
        skip_notification: true,
        ..named("local")
    };
    let result = h.controller.run(PRICING_SOURCE, config).await.unwrap();

    assert_eq!(result.deployment.mode, DeploymentMode::Skipped);
    assert!(result.deployment.repository_url.is_none());
    assert!(!result.deployment.notified);
    assert!(h.pushes.lock().unwrap().is_empty());

    let logs = h.gateway.stage_logs(result.run.id).await.unwrap();
    assert_eq!(logs.last().unwrap().stage, Stage::Deploy);
    assert_eq!(logs.last().unwrap().status, StageStatus::Completed);
}

#[tokio::test]
async fn missing_source_control_falls_back_to_local_only() {
    let h = Fixture {
        source_control: false,
        ..Default::default()
    }
    .build()
    .await;

    let result = h
        .controller
        .run(PRICING_SOURCE, named("offline"))
        .await
        .unwrap();
    assert_eq!(result.run.status, RunStatus::Completed);
    assert_eq!(result.deployment.mode, DeploymentMode::LocalOnly);
    assert!(result.deployment.reason.is_some());
    assert!(result.deployment.ide_url.is_none());
}

#[tokio::test]
async fn deploy_failure_is_fatal_when_not_tolerated() {
    let h = Fixture {
        source_control: false,
        ..Default::default()
    }
    .build()
    .await;
    let config = RunConfig {
        tolerate_deploy_failure: false,
        ..named("strict deploy")
    };

    let err = h.controller.run(PRICING_SOURCE, config).await.unwrap_err();
    assert_matches!(
        &err,
        PipelineError::Stage {
            stage: Stage::Deploy,
            source: StageError::Deploy(_),
            ..
        }
    );
    let run = h.gateway.get_run(err.run_id().unwrap()).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    // The quality report survives a deploy failure.
    assert!(h.gateway.quality_report(run.id).await.unwrap().is_some());
}

#[tokio::test]
async fn cancellation_stops_at_the_next_stage_boundary() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let h = Fixture {
        analyzer: Analyzer::Gated {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        },
        ..Default::default()
    }
    .build()
    .await;

    let handle = h
        .controller
        .submit(PRICING_SOURCE.to_string(), named("cancelled"))
        .await
        .unwrap();
    let run_id = handle.run_id;
    entered.notified().await;
    assert!(h.controller.cancel(run_id));
    release.notify_one();

    let err = handle.wait().await.unwrap_err();
    assert_matches!(err, PipelineError::Cancelled { run_id: id } if id == run_id);

    let run = h.gateway.get_run(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.failure_reason.as_deref(), Some("cancelled"));

    let logs = h.gateway.stage_logs(run_id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, StageStatus::Completed);
    assert!(!h.controller.cancel(run_id));
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let h = Fixture::default().build().await;

    let first = h
        .controller
        .submit(PRICING_SOURCE.to_string(), named("first"))
        .await
        .unwrap();
    let second = h
        .controller
        .submit(PRICING_SOURCE.to_string(), named("second"))
        .await
        .unwrap();
    assert_ne!(first.run_id, second.run_id);

    let (a, b) = tokio::join!(first.wait(), second.wait());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.project.root, b.project.root);
    assert_eq!(h.gateway.stage_logs(a.run.id).await.unwrap().len(), 5);
    assert_eq!(h.gateway.stage_logs(b.run.id).await.unwrap().len(), 5);
    assert!(h.controller.active_runs().is_empty());
}

#[tokio::test]
async fn empty_source_creates_no_run() {
    let h = Fixture::default().build().await;
    let err = h
        .controller
        .run("   \n", RunConfig::default())
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::InvalidInput(_));
    assert!(h.gateway.list_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_the_run_exists() {
    let h = Fixture::default().build().await;
    let config = RunConfig {
        min_quality_score: 140,
        ..Default::default()
    };
    let err = h.controller.run(PRICING_SOURCE, config).await.unwrap_err();
    assert_matches!(err, PipelineError::Config(_));
    assert!(h.gateway.list_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn run_name_defaults_to_the_program_name() {
    let h = Fixture::default().build().await;
    let result = h
        .controller
        .run(PRICING_SOURCE, RunConfig::default())
        .await
        .unwrap();
    assert_eq!(result.run.name, "zsd_pricing");
    assert_eq!(
        result.deployment.ide_url.as_deref(),
        Some("https://vscode.dev/github/acme/zsd-pricing")
    );
}

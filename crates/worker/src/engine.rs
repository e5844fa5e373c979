use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;

use relift_db::{MemoryGateway, PgGateway, SharedGateway};
use relift_events::{HookDispatcher, HookRegistry, ProgressChannel, ToolAgent};
use relift_pipeline::PipelineController;
use relift_tools::manifest::{load_manifest, register_manifest};
use relift_tools::{ProcessBuildTool, ToolConnectionManager};

use crate::config::WorkerConfig;

/// Time given to lifecycle hooks fired by `stop_all`.
const LISTENER_GRACE: Duration = Duration::from_millis(500);

/// A started pipeline and the services it depends on.
pub struct Engine {
    pub controller: Arc<PipelineController>,
    pub tools: Arc<ToolConnectionManager>,
    pub hooks: Arc<HookDispatcher>,
    pub gateway: SharedGateway,
    pub progress: Arc<ProgressChannel>,
    listener: JoinHandle<()>,
}

impl Engine {
    /// Connect persistence, register and start providers, load hooks.
    ///
    /// Fails if a required provider cannot be started.
    pub async fn start(config: &WorkerConfig) -> anyhow::Result<Self> {
        let gateway = connect_gateway(config).await?;

        let tools = Arc::new(ToolConnectionManager::new(
            Arc::clone(&gateway),
            config.retry_policy(),
        ));
        if let Some(path) = &config.providers_path {
            let entries = load_manifest(path)
                .with_context(|| format!("loading provider manifest {}", path.display()))?;
            register_manifest(&tools, &entries).await?;
            tracing::info!(count = entries.len(), path = %path.display(), "Provider manifest loaded");
        } else {
            tracing::warn!("RELIFT_PROVIDERS not set, no tool providers registered");
        }

        let registry = match &config.hooks_path {
            Some(path) => HookRegistry::load_from_path(path)
                .with_context(|| format!("loading hook registry {}", path.display()))?,
            None => HookRegistry::default(),
        };
        tracing::info!(hooks = registry.len(), "Hook registry loaded");

        let hooks = Arc::new(HookDispatcher::new(
            registry,
            Arc::clone(&tools),
            Arc::new(ToolAgent::new(Arc::clone(&tools))),
            Arc::clone(&gateway),
        ));
        // Subscribe before connecting so provider.connected hooks fire.
        let listener = tokio::spawn(
            Arc::clone(&hooks).run_tool_event_listener(tools.subscribe()),
        );

        tools.start_all().await.context("starting tool providers")?;

        let progress = Arc::new(ProgressChannel::default());
        let build_tool = ProcessBuildTool::new(config.build_command.clone(), config.build_timeout());
        let controller = Arc::new(PipelineController::new(
            Arc::clone(&gateway),
            Arc::clone(&tools),
            Arc::clone(&hooks),
            Arc::clone(&progress),
            Arc::new(build_tool),
            config.pipeline_settings(),
        ));

        Ok(Self {
            controller,
            tools,
            hooks,
            gateway,
            progress,
            listener,
        })
    }

    /// Cancel in-flight runs and release every provider.
    ///
    /// The hook listener shares ownership of the tool manager, so its
    /// channel never closes on its own; it gets a short grace period for
    /// `provider.disconnected` hooks and is then aborted.
    pub async fn shutdown(self) {
        self.controller.shutdown();
        self.tools.stop_all().await;

        let mut listener = self.listener;
        if tokio::time::timeout(LISTENER_GRACE, &mut listener)
            .await
            .is_err()
        {
            listener.abort();
        }
        tracing::info!("Engine stopped");
    }
}

async fn connect_gateway(config: &WorkerConfig) -> anyhow::Result<SharedGateway> {
    let Some(url) = &config.database_url else {
        tracing::info!("DATABASE_URL not set, using in-memory persistence");
        return Ok(Arc::new(MemoryGateway::new()));
    };

    let pool = relift_db::create_pool(url)
        .await
        .context("connecting to database")?;
    relift_db::health_check(&pool)
        .await
        .context("database health check")?;
    relift_db::run_migrations(&pool)
        .await
        .context("running database migrations")?;
    tracing::info!("Database connection pool created and migrated");
    Ok(Arc::new(PgGateway::new(pool)))
}

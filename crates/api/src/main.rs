use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use relift_api::config::ServerConfig;
use relift_api::router::build_app_router;
use relift_api::state::AppState;
use relift_worker::{logging, Engine, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("relift_api=debug,relift_pipeline=debug,relift_tools=info,tower_http=debug");

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Pipeline ---
    let engine = Engine::start(&worker_config).await?;
    tracing::info!("Pipeline engine started");

    let state = AppState {
        config: Arc::new(config.clone()),
        controller: Arc::clone(&engine.controller),
        hooks_path: worker_config.hooks_path.clone().map(Arc::new),
    };
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // On a signal, in-flight runs are cancelled at their next stage
    // boundary; open requests then get `shutdown_timeout_secs` to drain.
    let controller = Arc::clone(&engine.controller);
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            controller.shutdown();
            let _ = signalled_tx.send(());
        })
        .into_future();
    let drain_deadline = async {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(Duration::from_secs(config.shutdown_timeout_secs)).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        result = server => result.context("Server error")?,
        () = drain_deadline => {
            tracing::warn!("In-flight requests did not drain in time");
        }
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    engine.shutdown().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

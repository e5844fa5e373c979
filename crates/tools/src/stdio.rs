//! Providers reached over a child process's stdin/stdout.
//!
//! Each request is one JSON-RPC line on stdin; the response is the first
//! stdout line carrying the same id. Lines that are not JSON, or carry
//! another id (a late answer to a call that already timed out), are
//! skipped. Stderr is forwarded to the log.
//!
//! A call holds the session for its whole exchange. `disconnect` first
//! cancels the session token, which ends any call in flight, so teardown
//! never waits for a slow response.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;
use crate::provider::{ProviderHealth, ToolProvider};
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};

/// Grace period for a child to exit after stdin is closed.
const EXIT_GRACE: Duration = Duration::from_secs(5);

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

pub struct StdioProvider {
    name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    session: Mutex<Option<Session>>,
    /// Cancelled on disconnect; replaced on each spawn.
    abort: Mutex<CancellationToken>,
    next_id: AtomicU64,
}

/// How an exchange failed. `Broken` means the session is unusable.
enum ExchangeError {
    Broken(ToolError),
    Reply(ToolError),
}

impl StdioProvider {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env,
            session: Mutex::new(None),
            abort: Mutex::new(CancellationToken::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn spawn(&self) -> Result<Session, ToolError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            let msg = format!("failed to spawn '{}': {e}", self.command);
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::Permanent(msg)
            } else {
                ToolError::Transient(msg)
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Protocol("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Protocol("child stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let provider = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(provider = %provider, "{line}");
                }
            });
        }

        Ok(Session {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl ToolProvider for StdioProvider {
    async fn connect(&self) -> Result<(), ToolError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            if matches!(session.child.try_wait(), Ok(None)) {
                return Ok(());
            }
        }
        *guard = Some(self.spawn()?);
        *self.abort.lock().await = CancellationToken::new();
        tracing::info!(provider = %self.name, command = %self.command, "Spawned provider process");
        Ok(())
    }

    async fn health_check(&self) -> ProviderHealth {
        let mut guard = self.session.lock().await;
        match guard.as_mut() {
            None => ProviderHealth::Unhealthy("not connected".to_string()),
            Some(session) => match session.child.try_wait() {
                Ok(None) => ProviderHealth::Healthy,
                Ok(Some(status)) => ProviderHealth::Unhealthy(format!("process exited: {status}")),
                Err(e) => ProviderHealth::Degraded(e.to_string()),
            },
        }
    }

    async fn call(
        &self,
        operation: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&JsonRpcRequest::new(id, operation, params))
            .map_err(|e| ToolError::Permanent(format!("params not serializable: {e}")))?;
        line.push('\n');

        let abort = self.abort.lock().await.clone();
        let disconnected =
            || ToolError::Transient(format!("provider '{}' disconnected", self.name));

        let mut guard = tokio::select! {
            _ = abort.cancelled() => return Err(disconnected()),
            guard = self.session.lock() => guard,
        };
        let session = guard
            .as_mut()
            .ok_or_else(|| ToolError::Transient(format!("provider '{}' not connected", self.name)))?;

        let outcome = tokio::select! {
            _ = abort.cancelled() => return Err(disconnected()),
            outcome = exchange(session, &self.name, id, &line) => outcome,
        };
        match outcome {
            Ok(value) => Ok(value),
            Err(ExchangeError::Reply(e)) => Err(e),
            Err(ExchangeError::Broken(e)) => {
                *guard = None;
                Err(e)
            }
        }
    }

    async fn disconnect(&self) {
        self.abort.lock().await.cancel();
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        drop(session.stdin);
        match tokio::time::timeout(EXIT_GRACE, session.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(provider = %self.name, "Provider did not exit, killing");
                let _ = session.child.kill().await;
            }
        }
        tracing::info!(provider = %self.name, "Provider process stopped");
    }
}

/// Write one request line and read until the matching response.
async fn exchange(
    session: &mut Session,
    provider: &str,
    id: u64,
    line: &str,
) -> Result<serde_json::Value, ExchangeError> {
    if let Err(e) = session.stdin.write_all(line.as_bytes()).await {
        return Err(ExchangeError::Broken(ToolError::Transient(format!(
            "write to provider failed: {e}"
        ))));
    }
    if let Err(e) = session.stdin.flush().await {
        return Err(ExchangeError::Broken(ToolError::Transient(format!(
            "flush to provider failed: {e}"
        ))));
    }

    loop {
        let next = session.stdout.next_line().await.map_err(|e| {
            ExchangeError::Broken(ToolError::Transient(format!("read from provider failed: {e}")))
        })?;
        let Some(raw) = next else {
            return Err(ExchangeError::Broken(ToolError::Transient(
                "provider process closed stdout".to_string(),
            )));
        };

        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonRpcResponse>(raw) {
            Ok(resp) if resp.matches(id) => return resp.into_result().map_err(ExchangeError::Reply),
            Ok(_) => tracing::debug!(provider = %provider, id, "Skipping unrelated message"),
            Err(_) => tracing::debug!(provider = %provider, "Skipping non-JSON output: {raw}"),
        }
    }
}

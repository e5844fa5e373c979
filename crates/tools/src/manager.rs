//! Registry and lifecycle owner for every named tool provider.
//!
//! [`ToolConnectionManager`] is created once per process and shared by
//! every run. It connects providers on [`start_all`](ToolConnectionManager::start_all),
//! reconnects lazily after transient failures, applies the retry policy
//! inside [`invoke`](ToolConnectionManager::invoke), and records one
//! [`NewToolCallLog`] per logical call.
//!
//! Lifecycle changes are broadcast via a [`tokio::sync::broadcast`]
//! channel. Call [`ToolConnectionManager::subscribe`] to receive them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use relift_core::records::NewToolCallLog;
use relift_core::sanitize::sanitize;
use relift_core::types::RunId;
use relift_db::SharedGateway;

use crate::error::ToolError;
use crate::events::ToolEvent;
use crate::provider::{ProviderHealth, ToolProvider};
use crate::retry::RetryPolicy;

/// Broadcast channel capacity for lifecycle events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Per-call timeout when neither the call nor the provider sets one.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
/// Longer than a stdio provider's exit grace, so a kill fits inside it.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Registration types
// ---------------------------------------------------------------------------

/// Static configuration of one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSpec {
    pub name: String,
    /// A required provider that cannot start aborts `start_all`, and its
    /// unavailability is fatal to callers.
    pub required: bool,
    /// Default deadline for connect and for each call attempt.
    pub timeout: Duration,
}

impl ProviderSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Connection state tracked per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ProviderState {
    /// Registered, never connected.
    Registered,
    Connected,
    /// Last connect failed, or a call hit a transient error. Reconnected
    /// on the next invocation.
    Failed(String),
    /// Released by `stop_all`. Terminal.
    Disconnected,
}

/// Per-provider entry in [`ToolConnectionManager::health_report`].
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub required: bool,
    pub state: ProviderState,
    /// Probed only for connected providers.
    pub health: Option<ProviderHealth>,
}

/// One logical external call.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub run_id: Option<RunId>,
    pub provider: String,
    pub operation: String,
    pub params: serde_json::Value,
    /// Overrides the provider's default per-attempt timeout.
    pub timeout: Option<Duration>,
}

impl ToolCall {
    pub fn new(
        provider: impl Into<String>,
        operation: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            run_id: None,
            provider: provider.into(),
            operation: operation.into(),
            params,
            timeout: None,
        }
    }

    /// Attribute the call to a run.
    pub fn for_run(mut self, run_id: Option<RunId>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

struct ManagedProvider {
    spec: ProviderSpec,
    provider: Arc<dyn ToolProvider>,
    state: Mutex<ProviderState>,
}

impl ManagedProvider {
    async fn is_connected(&self) -> bool {
        *self.state.lock().await == ProviderState::Connected
    }
}

/// Where an attempt failed; decides the error surfaced after retries.
enum AttemptError {
    Connect(ToolError),
    Call(ToolError),
}

impl AttemptError {
    fn inner(&self) -> &ToolError {
        match self {
            Self::Connect(e) | Self::Call(e) => e,
        }
    }
}

pub struct ToolConnectionManager {
    /// Registration order is start order.
    providers: RwLock<Vec<Arc<ManagedProvider>>>,
    gateway: SharedGateway,
    retry: RetryPolicy,
    event_tx: broadcast::Sender<ToolEvent>,
    /// Cancelled by `stop_all`; aborts pending backoff sleeps.
    cancel: CancellationToken,
}

impl ToolConnectionManager {
    pub fn new(gateway: SharedGateway, retry: RetryPolicy) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            providers: RwLock::new(Vec::new()),
            gateway,
            retry,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to provider lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ToolEvent> {
        self.event_tx.subscribe()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Add a provider. Names are unique.
    pub async fn register(
        &self,
        spec: ProviderSpec,
        provider: Arc<dyn ToolProvider>,
    ) -> Result<(), ToolError> {
        let mut providers = self.providers.write().await;
        if providers.iter().any(|p| p.spec.name == spec.name) {
            return Err(ToolError::Permanent(format!(
                "provider '{}' already registered",
                spec.name
            )));
        }
        tracing::debug!(provider = %spec.name, required = spec.required, "Registered provider");
        providers.push(Arc::new(ManagedProvider {
            spec,
            provider,
            state: Mutex::new(ProviderState::Registered),
        }));
        Ok(())
    }

    pub async fn provider_names(&self) -> Vec<String> {
        self.providers
            .read()
            .await
            .iter()
            .map(|p| p.spec.name.clone())
            .collect()
    }

    pub async fn state(&self, name: &str) -> Option<ProviderState> {
        let entry = self.find(name).await?;
        let state = entry.state.lock().await.clone();
        Some(state)
    }

    /// Connect every registered provider in registration order.
    ///
    /// Optional failures are logged and skipped. The first required
    /// failure aborts with [`ToolError::Unavailable`]; providers already
    /// connected stay connected so `stop_all` can release them.
    pub async fn start_all(&self) -> Result<(), ToolError> {
        let providers = self.providers.read().await.clone();
        tracing::info!(count = providers.len(), "Starting tool providers");

        for entry in providers {
            if entry.is_connected().await {
                continue;
            }
            match self.connect_entry(&entry).await {
                Ok(()) => {}
                Err(e) if entry.spec.required => {
                    tracing::error!(
                        provider = %entry.spec.name,
                        error = %e,
                        "Required provider failed to start, aborting startup",
                    );
                    return Err(ToolError::Unavailable {
                        provider: entry.spec.name.clone(),
                        required: true,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %entry.spec.name,
                        error = %e,
                        "Optional provider failed to start, continuing without it",
                    );
                }
            }
        }
        Ok(())
    }

    /// Release every provider that was started or attempted.
    ///
    /// Idempotent: a second call finds every provider `Disconnected` and
    /// does nothing. After this the manager refuses new calls.
    pub async fn stop_all(&self) {
        self.cancel.cancel();
        let providers = self.providers.read().await.clone();

        for entry in providers {
            let mut state = entry.state.lock().await;
            let previous = std::mem::replace(&mut *state, ProviderState::Disconnected);
            match previous {
                ProviderState::Disconnected | ProviderState::Registered => continue,
                ProviderState::Connected | ProviderState::Failed(_) => {}
            }
            drop(state);

            tracing::info!(provider = %entry.spec.name, "Stopping provider");
            // Spawned so a slow release still completes after we stop waiting.
            let provider = Arc::clone(&entry.provider);
            let release = tokio::spawn(async move { provider.disconnect().await });
            if tokio::time::timeout(DISCONNECT_TIMEOUT, release).await.is_err() {
                tracing::warn!(
                    provider = %entry.spec.name,
                    "Provider disconnect still running, continuing teardown",
                );
            }
            if previous == ProviderState::Connected {
                let _ = self.event_tx.send(ToolEvent::Disconnected {
                    provider: entry.spec.name.clone(),
                });
            }
        }
        tracing::info!("Tool providers stopped");
    }

    /// Run one logical call with timeout and retry, and log it.
    ///
    /// Transient failures are retried up to the policy's attempt budget.
    /// If the provider cannot be connected the error is
    /// [`ToolError::Unavailable`] carrying the provider's `required` flag.
    pub async fn invoke(&self, call: ToolCall) -> Result<serde_json::Value, ToolError> {
        let Some(entry) = self.find(&call.provider).await else {
            let err = ToolError::NotRegistered(call.provider.clone());
            self.record(&call, &Err(err.clone()), 0, Duration::ZERO).await;
            return Err(err);
        };

        if self.cancel.is_cancelled() {
            let err = ToolError::Unavailable {
                provider: entry.spec.name.clone(),
                required: entry.spec.required,
            };
            self.record(&call, &Err(err.clone()), 0, Duration::ZERO).await;
            return Err(err);
        }

        let timeout = call.timeout.unwrap_or(entry.spec.timeout);
        let mut attempts: u32 = 0;
        let mut elapsed = Duration::ZERO;

        let outcome = loop {
            attempts += 1;
            let started = Instant::now();
            let result = self.attempt(&entry, &call, timeout).await;
            elapsed += started.elapsed();

            let err = match result {
                Ok(value) => break Ok(value),
                Err(err) => err,
            };

            if !err.inner().is_transient() || attempts >= self.retry.max_attempts {
                break Err(err);
            }

            let delay = self.retry.delay_for_attempt(attempts);
            tracing::warn!(
                provider = %call.provider,
                operation = %call.operation,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err.inner(),
                "Transient tool failure, retrying",
            );
            tokio::select! {
                _ = self.cancel.cancelled() => break Err(err),
                _ = tokio::time::sleep(delay) => {}
            }
        };

        let outcome = outcome.map_err(|err| match err {
            AttemptError::Connect(_) => ToolError::Unavailable {
                provider: entry.spec.name.clone(),
                required: entry.spec.required,
            },
            AttemptError::Call(e) => e,
        });

        match &outcome {
            Ok(_) => tracing::info!(
                provider = %call.provider,
                operation = %call.operation,
                attempts,
                duration_ms = elapsed.as_millis() as u64,
                "Tool call succeeded",
            ),
            Err(e) => tracing::warn!(
                provider = %call.provider,
                operation = %call.operation,
                attempts,
                duration_ms = elapsed.as_millis() as u64,
                error = %e,
                "Tool call failed",
            ),
        }

        self.record(&call, &outcome, attempts, elapsed).await;
        outcome
    }

    /// Per-provider state, probing health of connected providers.
    pub async fn health_report(&self) -> Vec<ProviderStatus> {
        let providers = self.providers.read().await.clone();
        let mut report = Vec::with_capacity(providers.len());

        for entry in providers {
            let state = entry.state.lock().await.clone();
            let health = if state == ProviderState::Connected {
                let probe = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, entry.provider.health_check());
                Some(probe.await.unwrap_or_else(|_| {
                    ProviderHealth::Unhealthy("health check timed out".to_string())
                }))
            } else {
                None
            };
            report.push(ProviderStatus {
                name: entry.spec.name.clone(),
                required: entry.spec.required,
                state,
                health,
            });
        }
        report
    }

    // ---- private helpers ----

    async fn find(&self, name: &str) -> Option<Arc<ManagedProvider>> {
        self.providers
            .read()
            .await
            .iter()
            .find(|p| p.spec.name == name)
            .cloned()
    }

    /// Connect one provider, updating state and broadcasting the outcome.
    async fn connect_entry(&self, entry: &ManagedProvider) -> Result<(), ToolError> {
        let result = match tokio::time::timeout(entry.spec.timeout, entry.provider.connect()).await
        {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout(entry.spec.timeout)),
        };

        let mut state = entry.state.lock().await;
        if *state == ProviderState::Disconnected {
            // stop_all ran while connecting.
            drop(state);
            entry.provider.disconnect().await;
            return Err(ToolError::Unavailable {
                provider: entry.spec.name.clone(),
                required: entry.spec.required,
            });
        }

        match &result {
            Ok(()) => {
                *state = ProviderState::Connected;
                tracing::info!(provider = %entry.spec.name, "Provider connected");
                let _ = self.event_tx.send(ToolEvent::Connected {
                    provider: entry.spec.name.clone(),
                });
            }
            Err(e) => {
                *state = ProviderState::Failed(e.to_string());
                let _ = self.event_tx.send(ToolEvent::Failed {
                    provider: entry.spec.name.clone(),
                    required: entry.spec.required,
                    error: e.to_string(),
                });
            }
        }
        result
    }

    async fn attempt(
        &self,
        entry: &ManagedProvider,
        call: &ToolCall,
        timeout: Duration,
    ) -> Result<serde_json::Value, AttemptError> {
        if !entry.is_connected().await {
            self.connect_entry(entry)
                .await
                .map_err(AttemptError::Connect)?;
        }

        match tokio::time::timeout(timeout, entry.provider.call(&call.operation, &call.params)).await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if matches!(e, ToolError::Transient(_)) {
                    let mut state = entry.state.lock().await;
                    if *state == ProviderState::Connected {
                        *state = ProviderState::Failed(e.to_string());
                    }
                }
                Err(AttemptError::Call(e))
            }
            Err(_) => Err(AttemptError::Call(ToolError::Timeout(timeout))),
        }
    }

    async fn record(
        &self,
        call: &ToolCall,
        outcome: &Result<serde_json::Value, ToolError>,
        attempts: u32,
        elapsed: Duration,
    ) {
        let (result, error) = match outcome {
            Ok(value) => (Some(sanitize(value)), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let log = NewToolCallLog {
            run_id: call.run_id,
            provider: call.provider.clone(),
            operation: call.operation.clone(),
            params: sanitize(&call.params),
            result,
            error,
            attempts: i32::try_from(attempts).unwrap_or(i32::MAX),
            duration_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        };
        if let Err(e) = self.gateway.append_tool_call_log(log).await {
            tracing::error!(
                provider = %call.provider,
                operation = %call.operation,
                error = %e,
                "Failed to record tool call log",
            );
        }
    }
}

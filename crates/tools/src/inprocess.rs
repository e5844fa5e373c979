//! Closure-backed provider for embedding tools in the same process.
//!
//! Used by tests and by the worker for local stand-ins of external
//! services.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::ToolError;
use crate::provider::{ProviderHealth, ToolProvider};

type Handler = dyn Fn(String, serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, ToolError>>
    + Send
    + Sync;

type ConnectHook = dyn Fn() -> Result<(), ToolError> + Send + Sync;

pub struct InProcessProvider {
    handler: Arc<Handler>,
    on_connect: Option<Arc<ConnectHook>>,
    connected: AtomicBool,
    connects: AtomicU32,
    disconnects: AtomicU32,
}

impl InProcessProvider {
    /// Wrap an async handler taking `(operation, params)`.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(String, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value, ToolError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |op, params| Box::pin(handler(op, params))),
            on_connect: None,
            connected: AtomicBool::new(false),
            connects: AtomicU32::new(0),
            disconnects: AtomicU32::new(0),
        }
    }

    /// Synchronous convenience constructor.
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&str, &serde_json::Value) -> Result<serde_json::Value, ToolError>
            + Send
            + Sync
            + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(move |op, params| {
            let handler = Arc::clone(&handler);
            async move { handler(&op, &params) }
        })
    }

    /// A provider whose `connect` always fails with `err`.
    pub fn unreachable(err: ToolError) -> Self {
        Self::from_fn(|_, _| Err(ToolError::Transient("unreachable".to_string())))
            .with_connect(move || Err(err.clone()))
    }

    /// Run `hook` on every connect attempt; an error fails the connect.
    pub fn with_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), ToolError> + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(hook));
        self
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolProvider for InProcessProvider {
    async fn connect(&self) -> Result<(), ToolError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_connect {
            hook()?;
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> ProviderHealth {
        if self.connected.load(Ordering::SeqCst) {
            ProviderHealth::Healthy
        } else {
            ProviderHealth::Unhealthy("not connected".to_string())
        }
    }

    async fn call(
        &self,
        operation: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        (self.handler)(operation.to_string(), params.clone()).await
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }
}

//! Providers reached as JSON-over-HTTP services.
//!
//! An operation `op` is a `POST {base_url}/{op}` with the params as the
//! JSON body. `connect` probes the optional health path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::ToolError;
use crate::provider::{ProviderHealth, ToolProvider};

/// Transport-level ceiling; the manager's per-call timeout is usually tighter.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct HttpProvider {
    name: String,
    base_url: String,
    health_path: Option<String>,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        health_path: Option<String>,
        token: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_path,
            token,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn probe(&self) -> Result<(), ToolError> {
        let Some(path) = &self.health_path else {
            return Ok(());
        };
        let resp = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(classify_request_error)?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(classify_status(status, "health probe failed".to_string()))
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn classify_status(status: StatusCode, body: String) -> ToolError {
    let msg = format!("HTTP {}: {body}", status.as_u16());
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        ToolError::Transient(msg)
    } else {
        ToolError::Permanent(msg)
    }
}

fn classify_request_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ToolError::Transient(err.to_string())
    } else if err.is_decode() {
        ToolError::Protocol(err.to_string())
    } else {
        ToolError::Permanent(err.to_string())
    }
}

#[async_trait]
impl ToolProvider for HttpProvider {
    async fn connect(&self) -> Result<(), ToolError> {
        self.probe().await?;
        tracing::info!(provider = %self.name, base_url = %self.base_url, "HTTP provider reachable");
        Ok(())
    }

    async fn health_check(&self) -> ProviderHealth {
        match self.probe().await {
            Ok(()) => ProviderHealth::Healthy,
            Err(e) if e.is_transient() => ProviderHealth::Unhealthy(e.to_string()),
            Err(e) => ProviderHealth::Degraded(e.to_string()),
        }
    }

    async fn call(
        &self,
        operation: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let resp = self
            .authorize(self.client.post(self.url(operation)))
            .json(params)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| ToolError::Protocol(format!("invalid JSON body: {e}")))
    }

    async fn disconnect(&self) {
        tracing::debug!(provider = %self.name, "HTTP provider released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_classification() {
        assert_matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            ToolError::Transient(_)
        );
        assert_matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ToolError::Transient(_)
        );
        assert_matches!(
            classify_status(StatusCode::FORBIDDEN, "denied".into()),
            ToolError::Permanent(m) if m == "HTTP 403: denied"
        );
        assert_matches!(
            classify_status(StatusCode::NOT_FOUND, String::new()),
            ToolError::Permanent(_)
        );
    }

    #[test]
    fn url_joining_trims_slashes() {
        let provider = HttpProvider::new("scm", "http://localhost:9000/", None, None);
        assert_eq!(provider.url("/createRepository"), "http://localhost:9000/createRepository");
        assert_eq!(provider.url("health"), "http://localhost:9000/health");
    }

    #[tokio::test]
    async fn connect_without_health_path_succeeds() {
        let provider = HttpProvider::new("scm", "http://127.0.0.1:9", None, None);
        assert!(provider.connect().await.is_ok());
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        // Port 9 (discard) is closed on test hosts.
        let provider = HttpProvider::new("scm", "http://127.0.0.1:9", None, None);
        assert_matches!(
            provider.call("createRepository", &serde_json::json!({})).await,
            Err(ToolError::Transient(_))
        );
    }
}

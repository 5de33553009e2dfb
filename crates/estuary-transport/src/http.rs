//! Streamable HTTP provider transport (spec 4.2.3): a single endpoint,
//! session negotiated via the `Mcp-Session-Id` response header and echoed on
//! every request after `initialize`.

use crate::core::{
    next_request_id, CachedCounts, ClientMetrics, ClientState, LastError, NotificationSender,
    ProviderClient, TransportError, TransportResult,
};
use crate::resilience::ReconnectPolicy;
use async_trait::async_trait;
use estuary_types::capabilities::InitializeResult;
use estuary_types::catalog::ProviderCatalog;
use estuary_types::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

/// JSON-RPC code the spec assigns to a server rejecting an unknown or
/// missing `Mcp-Session-Id` on a non-initialize call (spec 4.2.3).
pub const SESSION_INVALID_CODE: i32 = -32600;

#[derive(Debug, Clone)]
pub struct HttpTuning {
    pub default_timeout: Duration,
    pub initialize_timeout: Duration,
    pub list_tools_timeout: Duration,
    pub retry: ReconnectPolicy,
}

impl Default for HttpTuning {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            initialize_timeout: Duration::from_secs(10),
            list_tools_timeout: Duration::from_secs(5),
            retry: ReconnectPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                backoff_factor: 2.0,
                max_attempts: Some(3),
            },
        }
    }
}

#[derive(Debug)]
pub struct HttpClientTransport {
    name: String,
    endpoint: Url,
    headers: HashMap<String, String>,
    auth_token: Option<String>,
    tuning: HttpTuning,
    http: HttpClient,
    state: Arc<RwLock<ClientState>>,
    session_id: RwLock<Option<String>>,
    catalog: RwLock<ProviderCatalog>,
    counts: CachedCounts,
    last_error: LastError,
    metrics: ClientMetrics,
    next_id: AtomicU64,
    #[allow(dead_code)]
    notifications: NotificationSender,
}

impl HttpClientTransport {
    pub fn new(
        name: String,
        endpoint: Url,
        headers: HashMap<String, String>,
        auth_token: Option<String>,
        tuning: HttpTuning,
        notifications: NotificationSender,
    ) -> Self {
        let http = HttpClient::builder()
            .build()
            .expect("reqwest client builder is infallible with default TLS backend");
        Self {
            name,
            endpoint,
            headers,
            auth_token,
            tuning,
            http,
            state: Arc::new(RwLock::new(ClientState::Disconnected)),
            session_id: RwLock::new(None),
            catalog: RwLock::new(ProviderCatalog::default()),
            counts: CachedCounts::default(),
            last_error: LastError::default(),
            metrics: ClientMetrics::default(),
            next_id: AtomicU64::new(1),
            notifications,
        }
    }

    fn timeout_for(&self, method: &str) -> Duration {
        match method {
            "initialize" => self.tuning.initialize_timeout,
            "tools/list" => self.tuning.list_tools_timeout,
            _ => self.tuning.default_timeout,
        }
    }

    async fn post_once(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        let id = next_request_id(&self.next_id);
        let request = JsonRpcRequest::new(method, params, id.clone());

        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .header("MCP-Protocol-Version", "2025-06-18")
            .json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        for (k, v) in &self.headers {
            builder = builder.header(k, v);
        }
        if method != "initialize" {
            if let Some(sid) = self.session_id.read().await.clone() {
                builder = builder.header("Mcp-Session-Id", sid);
            } else {
                return Err(TransportError::Protocol(
                    "no session established; call initialize first".into(),
                ));
            }
        }

        let timeout = self.timeout_for(method);
        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST && method != "initialize" {
            // Spec 4.2.3: unknown/missing session id surfaces as -32600.
            *self.session_id.write().await = None;
            return Err(TransportError::Protocol(format!(
                "code {SESSION_INVALID_CODE}: session rejected by provider"
            )));
        }
        if !status.is_success() {
            return Err(TransportError::ConnectionFailed(format!("http {status}")));
        }

        if method == "initialize" {
            if let Some(sid) = response
                .headers()
                .get("Mcp-Session-Id")
                .and_then(|v| v.to_str().ok())
            {
                *self.session_id.write().await = Some(sid.to_string());
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body_text = response
            .text()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        if content_type.contains("text/event-stream") {
            parse_sse_single_response(&body_text)
        } else {
            let parsed: JsonRpcResponse = serde_json::from_str(&body_text)
                .map_err(|e| TransportError::Protocol(e.to_string()))?;
            parsed.into_result().map_err(|e| TransportError::Protocol(e.message))
        }
    }

    async fn request(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        let mut last_err = None;
        let max_attempts = self.tuning.retry.max_attempts.unwrap_or(1).max(1);
        for attempt in 0..max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.tuning.retry.delay(attempt - 1)).await;
            }
            let start = Instant::now();
            match self.post_once(method, params.clone()).await {
                Ok(value) => {
                    self.metrics.requests_sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.metrics.responses_received.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.metrics.record_latency_us(start.elapsed().as_micros() as u64);
                    return Ok(value);
                }
                Err(err @ TransportError::Protocol(_)) => {
                    self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.last_error.set(err.to_string());
                    return Err(err);
                }
                Err(err) => {
                    self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.last_error.set(err.to_string());
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(TransportError::Timeout))
    }
}

fn parse_sse_single_response(body: &str) -> TransportResult<Value> {
    for event in body.split("\n\n") {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|l| l.strip_prefix("data:"))
            .map(|l| l.trim_start())
            .collect();
        if data.is_empty() {
            continue;
        }
        let joined = data.join("\n");
        if let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&joined) {
            return resp.into_result().map_err(|e| TransportError::Protocol(e.message));
        }
    }
    Err(TransportError::Protocol("no parseable sse response event".into()))
}

#[async_trait]
impl ProviderClient for HttpClientTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> ClientState {
        self.state.read().await.clone()
    }

    async fn initialize(&self) -> TransportResult<InitializeResult> {
        *self.state.write().await = ClientState::Connecting;
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": {},
                    "clientInfo": {"name": "estuary-daemon", "version": env!("CARGO_PKG_VERSION")},
                })),
            )
            .await?;
        *self.state.write().await = ClientState::Ready;
        serde_json::from_value(result).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    async fn catalog(&self) -> ProviderCatalog {
        self.catalog.read().await.clone()
    }

    async fn refresh_catalog(&self) -> TransportResult<ProviderCatalog> {
        let tools_resp = self.request("tools/list", None).await?;
        let resources_resp = self.request("resources/list", None).await?;
        let prompts_resp = self.request("prompts/list", None).await?;

        let mut catalog = ProviderCatalog::default();
        if let Some(tools) = tools_resp.get("tools") {
            catalog.tools = serde_json::from_value(tools.clone()).unwrap_or_default();
        }
        if let Some(resources) = resources_resp.get("resources") {
            catalog.resources = serde_json::from_value(resources.clone()).unwrap_or_default();
        }
        if let Some(prompts) = prompts_resp.get("prompts") {
            catalog.prompts = serde_json::from_value(prompts.clone()).unwrap_or_default();
        }
        *self.catalog.write().await = catalog.clone();
        self.counts.set(&catalog);
        Ok(catalog)
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> TransportResult<Value> {
        self.request("tools/call", Some(json!({"name": tool, "arguments": arguments})))
            .await
    }

    async fn read_resource(&self, uri: &str) -> TransportResult<Value> {
        self.request("resources/read", Some(json!({"uri": uri}))).await
    }

    async fn get_prompt(&self, name: &str, arguments: HashMap<String, String>) -> TransportResult<Value> {
        self.request("prompts/get", Some(json!({"name": name, "arguments": arguments})))
            .await
    }

    async fn call_raw(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        self.request(method, params).await
    }

    fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    fn cached_counts(&self) -> &CachedCounts {
        &self.counts
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.get()
    }

    async fn trigger_async_refresh(&self, timeout: Duration) -> TransportResult<()> {
        if !self.counts.start_refresh() {
            self.counts.wait_done().await;
            return Ok(());
        }
        let outcome = tokio::time::timeout(timeout, self.refresh_catalog()).await;
        self.counts.finish_refresh();
        match outcome {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn shutdown(&self) -> TransportResult<()> {
        *self.session_id.write().await = None;
        *self.state.write().await = ClientState::Disconnected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_matches_spec_sequence_prefix() {
        let tuning = HttpTuning::default();
        assert_eq!(tuning.retry.delay(0).as_secs(), 1);
        assert_eq!(tuning.retry.delay(1).as_secs(), 2);
    }

    #[test]
    fn parses_sse_wrapped_single_response() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"result\":{\"ok\":true},\"id\":1}\n\n";
        let value = parse_sse_single_response(body).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn http_client_starts_disconnected_with_no_session() {
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let client = HttpClientTransport::new(
            "docs".into(),
            Url::parse("https://example.invalid/mcp").unwrap(),
            HashMap::new(),
            None,
            HttpTuning::default(),
            tx,
        );
        assert_eq!(client.state().await, ClientState::Disconnected);
        assert!(client.session_id.read().await.is_none());
    }
}

//! Server-Sent Events provider transport (spec 4.2.2): one long-lived
//! `GET text/event-stream` for server→client messages, plain `POST`s for
//! client→server requests whose response may arrive synchronously in the
//! POST body or asynchronously as a `message` SSE event matched by id.

use crate::core::{
    next_request_id, CachedCounts, ClientMetrics, ClientState, LastError, NotificationSender,
    ProviderClient, ProviderNotification, TransportError, TransportResult,
};
use crate::resilience::ReconnectPolicy;
use async_trait::async_trait;
use estuary_types::capabilities::InitializeResult;
use estuary_types::catalog::ProviderCatalog;
use estuary_types::jsonrpc::{JsonRpcInbound, JsonRpcRequest, JsonRpcResponse, RequestId};
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex, RwLock};
use url::Url;

/// No data (including SSE comment lines) for this long declares the
/// connection stale (spec 4.2.2: "Liveness ... 90 s").
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(90);
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(5);
/// Extra attempts beyond the first for an individual request on network
/// errors / 5xx (spec 4.2.2: "Retry of individual requests").
const REQUEST_RETRY_ATTEMPTS: u32 = 3;

type PendingTable = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Value, Value>>>>>;

#[derive(Debug, Clone)]
pub struct SseTuning {
    pub default_timeout: Duration,
    pub initialize_timeout: Duration,
    pub list_tools_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for SseTuning {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            initialize_timeout: Duration::from_secs(10),
            list_tools_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                backoff_factor: 2.0,
                max_attempts: None,
            },
        }
    }
}

#[derive(Debug)]
pub struct SseClient {
    name: String,
    base_url: Url,
    headers: HashMap<String, String>,
    auth_token: Option<String>,
    tuning: SseTuning,
    http: HttpClient,
    state: Arc<RwLock<ClientState>>,
    endpoint: Arc<RwLock<Option<Url>>>,
    pending: PendingTable,
    last_activity: Arc<std::sync::Mutex<Instant>>,
    catalog: RwLock<ProviderCatalog>,
    counts: CachedCounts,
    last_error: LastError,
    metrics: ClientMetrics,
    notifications: NotificationSender,
    next_id: AtomicU64,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    watchdog_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SseClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        base_url: Url,
        headers: HashMap<String, String>,
        auth_token: Option<String>,
        tuning: SseTuning,
        notifications: NotificationSender,
    ) -> Self {
        let http = HttpClient::builder()
            .build()
            .expect("reqwest client builder is infallible with default TLS backend");
        Self {
            name,
            base_url,
            headers,
            auth_token,
            tuning,
            http,
            state: Arc::new(RwLock::new(ClientState::Disconnected)),
            endpoint: Arc::new(RwLock::new(None)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            last_activity: Arc::new(std::sync::Mutex::new(Instant::now())),
            catalog: RwLock::new(ProviderCatalog::default()),
            counts: CachedCounts::default(),
            last_error: LastError::default(),
            metrics: ClientMetrics::default(),
            notifications,
            next_id: AtomicU64::new(1),
            reader_task: Mutex::new(None),
            watchdog_task: Mutex::new(None),
        }
    }

    fn touch_activity(last_activity: &std::sync::Mutex<Instant>) {
        *last_activity.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    async fn connect(&self) -> TransportResult<()> {
        *self.state.write().await = ClientState::Connecting;
        self.spawn_reader();
        self.spawn_watchdog();
        Ok(())
    }

    fn spawn_reader(&self) {
        let sse_url = self.base_url.clone();
        let http = self.http.clone();
        let headers = self.headers.clone();
        let auth_token = self.auth_token.clone();
        let state = self.state.clone();
        let endpoint = self.endpoint.clone();
        let pending = self.pending.clone();
        let notifications = self.notifications.clone();
        let provider = self.name.clone();
        let last_activity = self.last_activity.clone();
        let last_error = self.last_error.clone();
        let reconnect = self.tuning.reconnect.clone();

        let task = tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                if attempt > 0 {
                    let delay = reconnect.delay(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
                *state.write().await = ClientState::Connecting;
                let mut request = http
                    .get(sse_url.clone())
                    .header(reqwest::header::ACCEPT, "text/event-stream");
                if let Some(token) = &auth_token {
                    request = request.bearer_auth(token);
                }
                for (k, v) in &headers {
                    request = request.header(k, v);
                }

                match request.send().await {
                    Ok(response) if response.status().is_success() => {
                        attempt = 0;
                        *state.write().await = ClientState::Initializing;
                        Self::touch_activity(&last_activity);
                        let mut stream = response.bytes_stream();
                        let mut buffer = String::new();
                        while let Some(chunk) = stream.next().await {
                            let Ok(bytes) = chunk else { break };
                            Self::touch_activity(&last_activity);
                            buffer.push_str(&String::from_utf8_lossy(&bytes));
                            while let Some(pos) = buffer.find("\n\n") {
                                let event = buffer[..pos].to_string();
                                buffer.drain(..pos + 2);
                                Self::dispatch_event(
                                    &event,
                                    &sse_url,
                                    &endpoint,
                                    &pending,
                                    &notifications,
                                    &provider,
                                )
                                .await;
                            }
                        }
                        tracing::warn!(provider = %provider, "sse stream ended, reconnecting");
                        *state.write().await = ClientState::Reconnecting;
                        last_error.set("sse stream closed by peer");
                    }
                    Ok(response) => {
                        last_error.set(format!("sse connect failed: status {}", response.status()));
                        *state.write().await = ClientState::Reconnecting;
                    }
                    Err(err) => {
                        last_error.set(format!("sse connect failed: {err}"));
                        *state.write().await = ClientState::Reconnecting;
                    }
                }
                attempt += 1;
            }
        });
        // Stash the handle; dropping a previous one (on reconnect-from-restart)
        // aborts the old reader loop.
        if let Ok(mut guard) = self.reader_task.try_lock() {
            if let Some(old) = guard.replace(task) {
                old.abort();
            }
        }
    }

    fn spawn_watchdog(&self) {
        let state = self.state.clone();
        let last_activity = self.last_activity.clone();
        let reader_restart = self.base_url.clone();
        let _ = reader_restart; // liveness only marks state; the reader's own loop handles reconnect
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(WATCHDOG_INTERVAL).await;
                let elapsed = last_activity
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .elapsed();
                if elapsed > LIVENESS_TIMEOUT {
                    let mut guard = state.write().await;
                    if !matches!(*guard, ClientState::Reconnecting | ClientState::Disconnected) {
                        tracing::warn!("sse connection stale for {elapsed:?}, marking disconnected");
                        *guard = ClientState::Reconnecting;
                    }
                }
            }
        });
        if let Ok(mut guard) = self.watchdog_task.try_lock() {
            if let Some(old) = guard.replace(task) {
                old.abort();
            }
        }
    }

    async fn dispatch_event(
        event: &str,
        base_url: &Url,
        endpoint: &RwLock<Option<Url>>,
        pending: &PendingTable,
        notifications: &NotificationSender,
        provider: &str,
    ) {
        let mut event_type: Option<&str> = None;
        let mut data_lines = Vec::new();
        for line in event.lines() {
            if line.starts_with(':') || line.is_empty() {
                continue; // comment / keepalive; liveness already touched above
            }
            if let Some(rest) = line.strip_prefix("event:") {
                event_type = Some(rest.trim());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.trim_start());
            }
        }
        if data_lines.is_empty() {
            return;
        }
        let data = data_lines.join("\n");

        match event_type {
            Some("endpoint") => {
                let resolved = if let Ok(abs) = Url::parse(&data) {
                    abs
                } else {
                    match base_url.join(&data) {
                        Ok(joined) => joined,
                        Err(err) => {
                            tracing::warn!(provider, %err, "unresolvable sse endpoint event");
                            return;
                        }
                    }
                };
                *endpoint.write().await = Some(resolved);
            }
            _ => {
                let Ok(inbound) = serde_json::from_str::<JsonRpcInbound>(&data) else {
                    tracing::warn!(provider, "unparseable sse message event");
                    return;
                };
                match inbound {
                    JsonRpcInbound::Response(resp) => dispatch_response(pending, resp).await,
                    JsonRpcInbound::Notification(notif) => {
                        let _ = notifications.try_send(ProviderNotification {
                            provider: provider.to_string(),
                            method: notif.method,
                            params: notif.params,
                        });
                    }
                }
            }
        }
    }

    async fn post_once(&self, method: &str, params: Option<Value>, id: RequestId) -> TransportResult<Value> {
        let endpoint = self
            .endpoint
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.base_url.clone());

        let request = JsonRpcRequest::new(method, params, id.clone());
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let mut builder = self.http.post(endpoint).json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        for (k, v) in &self.headers {
            builder = builder.header(k, v);
        }

        let send_result = builder.send().await;
        let response = match send_result {
            Ok(resp) => resp,
            Err(err) => {
                self.pending.lock().await.remove(&id);
                return Err(TransportError::ConnectionFailed(err.to_string()));
            }
        };
        let status = response.status();
        if status.is_success() {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if content_type.contains("application/json") {
                self.pending.lock().await.remove(&id);
                let resp: JsonRpcResponse = response
                    .json()
                    .await
                    .map_err(|e| TransportError::Protocol(e.to_string()))?;
                return resp
                    .into_result()
                    .map_err(|e| TransportError::Protocol(e.message));
            }
            // Response will arrive asynchronously over the SSE stream.
        } else if status.is_client_error() {
            self.pending.lock().await.remove(&id);
            return Err(TransportError::Protocol(format!("http {status}")));
        } else {
            self.pending.lock().await.remove(&id);
            return Err(TransportError::ConnectionFailed(format!("http {status}")));
        }

        let timeout = match method {
            "initialize" => self.tuning.initialize_timeout,
            "tools/list" => self.tuning.list_tools_timeout,
            _ => self.tuning.default_timeout,
        };
        let outcome = tokio::time::timeout(timeout, rx).await;
        self.pending.lock().await.remove(&id);
        match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(TransportError::Protocol(error.to_string())),
            Ok(Err(_)) => Err(TransportError::ConnectionLost("response channel dropped".into())),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Request with the retry policy spec 4.2.2 describes: up to three extra
    /// attempts on network errors / 5xx, none on 4xx or parse errors.
    async fn request(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        let mut last_err = None;
        for attempt in 0..=REQUEST_RETRY_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(self.tuning.reconnect.delay(attempt - 1)).await;
            }
            let id = next_request_id(&self.next_id);
            let start = Instant::now();
            match self.post_once(method, params.clone(), id).await {
                Ok(value) => {
                    self.metrics.requests_sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.metrics.responses_received.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.metrics.record_latency_us(start.elapsed().as_micros() as u64);
                    return Ok(value);
                }
                Err(err @ (TransportError::Protocol(_) | TransportError::Timeout)) => {
                    self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    self.last_error.set(err.to_string());
                    return Err(err); // 4xx / parse errors are not retried
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

async fn dispatch_response(pending: &PendingTable, resp: JsonRpcResponse) {
    let Some(id) = resp.id.clone() else { return };
    if let Some(tx) = pending.lock().await.remove(&id) {
        let _ = tx.send(resp.into_result().map_err(|e| json!({"code": e.code, "message": e.message})));
    }
}

#[async_trait]
impl ProviderClient for SseClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> ClientState {
        self.state.read().await.clone()
    }

    async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ClientState::Ready | ClientState::Initializing)
    }

    async fn initialize(&self) -> TransportResult<InitializeResult> {
        if self.reader_task.lock().await.is_none() {
            self.connect().await?;
        }
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
        let templates_resp = self.request("resources/templates/list", None).await;
        let prompts_resp = self.request("prompts/list", None).await?;

        let mut catalog = ProviderCatalog::default();
        if let Some(tools) = tools_resp.get("tools") {
            catalog.tools = serde_json::from_value(tools.clone()).unwrap_or_default();
        }
        if let Some(resources) = resources_resp.get("resources") {
            catalog.resources = serde_json::from_value(resources.clone()).unwrap_or_default();
        }
        if let Ok(templates_resp) = templates_resp {
            if let Some(templates) = templates_resp.get("resourceTemplates") {
                catalog.resource_templates = serde_json::from_value(templates.clone()).unwrap_or_default();
            }
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
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.watchdog_task.lock().await.take() {
            task.abort();
        }
        *self.state.write().await = ClientState::Disconnected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sse_client_reports_name_and_starts_disconnected() {
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let client = SseClient::new(
            "docs".into(),
            Url::parse("https://example.invalid/sse").unwrap(),
            HashMap::new(),
            None,
            SseTuning::default(),
            tx,
        );
        assert_eq!(client.name(), "docs");
        assert_eq!(client.state().await, ClientState::Disconnected);
        assert_eq!(client.cached_counts().get(), (-1, -1, -1));
    }

    #[test]
    fn reconnect_backoff_matches_spec_sequence() {
        let tuning = SseTuning::default();
        let seq: Vec<u64> = (0..8).map(|a| tuning.reconnect.delay(a).as_secs()).collect();
        assert_eq!(seq, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }
}

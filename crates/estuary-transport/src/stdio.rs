//! Subprocess provider transport: spawns `command` and speaks
//! newline-delimited JSON-RPC over its stdin/stdout.

use crate::core::{
    next_request_id, CachedCounts, ClientMetrics, ClientState, LastError, NotificationSender,
    ProviderClient, ProviderNotification, TransportError, TransportResult,
};
use async_trait::async_trait;
use estuary_types::capabilities::InitializeResult;
use estuary_types::catalog::ProviderCatalog;
use estuary_types::jsonrpc::{JsonRpcInbound, JsonRpcRequest, JsonRpcResponse, RequestId};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex, RwLock};

/// Bound on the buffered stderr tail exposed via `stderr_output()`: whichever
/// of line count or byte size is hit first.
const STDERR_MAX_LINES: usize = 64;
const STDERR_MAX_BYTES: usize = 16 * 1024;
/// Per-method deadlines matching the SSE/HTTP transports (spec.md:124,216:
/// "initialize: 10s, list_tools: 5s" defaults), not the general
/// `request_timeout`.
const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(10);
const LIST_TIMEOUT: Duration = Duration::from_secs(5);

type PendingTable = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Value, Value>>>>>;

#[derive(Debug)]
pub struct StdioClient {
    name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    working_dir: Option<String>,
    request_timeout: Duration,
    state: Arc<RwLock<ClientState>>,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<tokio::process::ChildStdin>>,
    pending: PendingTable,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_bytes: Arc<std::sync::atomic::AtomicUsize>,
    catalog: RwLock<ProviderCatalog>,
    next_id: AtomicU64,
    metrics: ClientMetrics,
    notifications: NotificationSender,
    counts: CachedCounts,
    last_error: LastError,
}

impl StdioClient {
    pub fn new(
        name: String,
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        working_dir: Option<String>,
        request_timeout: Duration,
        notifications: NotificationSender,
    ) -> Self {
        Self {
            name,
            command,
            args,
            env,
            working_dir,
            request_timeout,
            state: Arc::new(RwLock::new(ClientState::Disconnected)),
            child: Mutex::new(None),
            stdin: Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            stderr_tail: Arc::new(Mutex::new(VecDeque::new())),
            stderr_bytes: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            catalog: RwLock::new(ProviderCatalog::default()),
            next_id: AtomicU64::new(1),
            metrics: ClientMetrics::default(),
            notifications,
            counts: CachedCounts::default(),
            last_error: LastError::default(),
        }
    }

    /// Last buffered stderr lines, oldest first, bounded to the last 64
    /// lines or 16 KiB of text, whichever limit is hit first.
    pub async fn stderr_output(&self) -> Vec<String> {
        self.stderr_tail.lock().await.iter().cloned().collect()
    }

    async fn spawn(&self) -> TransportResult<()> {
        *self.state.write().await = ClientState::Connecting;

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::ConnectionFailed(format!("spawn {}: {e}", self.command)))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::ConnectionFailed("child process had no stdin pipe".into())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::ConnectionFailed("child process had no stdout pipe".into())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            TransportError::ConnectionFailed("child process had no stderr pipe".into())
        })?;

        *self.stdin.lock().await = Some(stdin);
        *self.child.lock().await = Some(child);

        self.spawn_stdout_reader(stdout);
        self.spawn_stderr_reader(stderr);

        *self.state.write().await = ClientState::Initializing;
        Ok(())
    }

    fn spawn_stdout_reader(&self, stdout: tokio::process::ChildStdout) {
        let pending = self.pending.clone();
        let notifications = self.notifications.clone();
        let provider = self.name.clone();
        let stderr_tail = self.stderr_tail.clone();
        let state = self.state.clone();
        let last_error = self.last_error.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<JsonRpcInbound>(&line) {
                    Ok(JsonRpcInbound::Response(resp)) => {
                        dispatch_response(&pending, resp).await;
                    }
                    Ok(JsonRpcInbound::Notification(notif)) => {
                        let _ = notifications.try_send(ProviderNotification {
                            provider: provider.clone(),
                            method: notif.method,
                            params: notif.params,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(provider = %provider, %err, "stdio provider sent unparseable line");
                    }
                }
            }
            // EOF: the child closed stdout. Record the stderr tail as the
            // diagnostic and drop the client to not-connected (spec 4.2.1).
            let tail = stderr_tail.lock().await.iter().cloned().collect::<Vec<_>>().join("\n");
            last_error.set(if tail.is_empty() {
                "provider process exited".to_string()
            } else {
                tail
            });
            *state.write().await = ClientState::Disconnected;
        });
    }

    fn spawn_stderr_reader(&self, stderr: tokio::process::ChildStderr) {
        let tail = self.stderr_tail.clone();
        let bytes = self.stderr_bytes.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let mut buf = tail.lock().await;
                bytes.fetch_add(line.len(), std::sync::atomic::Ordering::Relaxed);
                buf.push_back(line);
                while buf.len() > STDERR_MAX_LINES
                    || bytes.load(std::sync::atomic::Ordering::Relaxed) > STDERR_MAX_BYTES
                {
                    if let Some(dropped) = buf.pop_front() {
                        bytes.fetch_sub(dropped.len(), std::sync::atomic::Ordering::Relaxed);
                    } else {
                        break;
                    }
                }
            }
        });
    }

    async fn write_line(&self, payload: &str) -> TransportResult<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| TransportError::ConnectionLost("stdin closed".into()))?;
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        let id = next_request_id(&self.next_id);
        let request = JsonRpcRequest::new(method, params, id.clone());
        let payload = serde_json::to_string(&request)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let start = Instant::now();
        if let Err(err) = self.write_line(&payload).await {
            self.pending.lock().await.remove(&id);
            self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.last_error.set(err.to_string());
            return Err(err);
        }
        self.metrics.requests_sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let timeout = match method {
            "initialize" => INITIALIZE_TIMEOUT,
            "tools/list" | "resources/list" | "prompts/list" => LIST_TIMEOUT,
            _ => self.request_timeout,
        };
        let outcome = tokio::time::timeout(timeout, rx).await;
        self.pending.lock().await.remove(&id);

        match outcome {
            Ok(Ok(Ok(value))) => {
                self.metrics.responses_received.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.metrics.record_latency_us(start.elapsed().as_micros() as u64);
                Ok(value)
            }
            Ok(Ok(Err(error))) => {
                self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Err(TransportError::Protocol(error.to_string()))
            }
            Ok(Err(_)) => Err(TransportError::ConnectionLost("response channel dropped".into())),
            Err(_) => {
                self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Err(TransportError::Timeout)
            }
        }
    }
}

async fn dispatch_response(pending: &PendingTable, resp: JsonRpcResponse) {
    let Some(id) = resp.id.clone() else { return };
    if let Some(tx) = pending.lock().await.remove(&id) {
        let _ = tx.send(resp.into_result().map_err(|e| json!({"code": e.code, "message": e.message})));
    }
}

#[async_trait]
impl ProviderClient for StdioClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> ClientState {
        self.state.read().await.clone()
    }

    async fn initialize(&self) -> TransportResult<InitializeResult> {
        if matches!(*self.state.read().await, ClientState::Disconnected) {
            self.spawn().await?;
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
        self.write_line(&serde_json::to_string(&estuary_types::JsonRpcNotification::new(
            "notifications/initialized",
            None,
        )).unwrap())
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
            Ok(Err(err)) => {
                self.last_error.set(err.to_string());
                Err(err)
            }
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn shutdown(&self) -> TransportResult<()> {
        *self.state.write().await = ClientState::Disconnected;
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
        }
        self.stdin.lock().await.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdio_client_reports_name() {
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let client = StdioClient::new(
            "fs".into(),
            "true".into(),
            vec![],
            HashMap::new(),
            None,
            Duration::from_secs(1),
            tx,
        );
        assert_eq!(client.name(), "fs");
        assert_eq!(client.state().await, ClientState::Disconnected);
    }

    #[tokio::test]
    async fn stderr_tail_starts_empty() {
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let client = StdioClient::new(
            "fs".into(),
            "true".into(),
            vec![],
            HashMap::new(),
            None,
            Duration::from_secs(1),
            tx,
        );
        assert!(client.stderr_output().await.is_empty());
    }
}

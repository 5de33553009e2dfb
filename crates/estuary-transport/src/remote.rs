//! Remote-slave transport (spec 4.2.4 / 4.2.5): a mutually authenticated TLS
//! WebSocket between a slave daemon and the master it attaches to.
//!
//! Two halves live here. [`SlaveWebSocketClient`] is the slave-side outbound
//! connection: it dials the master, advertises the slave's own catalog, and
//! heartbeats. [`SlaveProxyClient`] is the master-side [`ProviderClient`]
//! wrapping one slave-hosted provider once the master's WebSocket server has
//! completed the handshake and handed this crate a [`SlaveConnectionHandle`].
//! The handshake itself (TLS accept, certificate/revocation check, `host_id`
//! binding) is server plumbing that belongs to whichever crate owns the
//! listener; this module only deals with the connection once established.

use crate::core::{
    next_request_id, CachedCounts, ClientMetrics, ClientState, LastError, NotificationSender,
    ProviderClient, TransportError, TransportResult,
};
use crate::resilience::ReconnectPolicy;
use async_trait::async_trait;
use estuary_types::capabilities::InitializeResult;
use estuary_types::catalog::ProviderCatalog;
use estuary_types::jsonrpc::{JsonRpcInbound, JsonRpcRequest, JsonRpcResponse, RequestId};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex, Notify, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// Missed-heartbeat budget before the master considers a slave connection
/// dead even without a TCP-level close (spec 4.2.4).
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);

fn reconnect_policy() -> ReconnectPolicy {
    // Same backoff as the SSE transport (spec 4.2.4: "same backoff policy as SSE").
    ReconnectPolicy {
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(60),
        backoff_factor: 2.0,
        max_attempts: None,
    }
}

type PendingTable = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Value, Value>>>>>;
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// TLS client material a slave presents when dialing its master.
pub struct SlaveTlsIdentity {
    pub client_cert_chain: Vec<tokio_rustls::rustls::pki_types::CertificateDer<'static>>,
    pub client_key: tokio_rustls::rustls::pki_types::PrivateKeyDer<'static>,
    pub ca_cert: tokio_rustls::rustls::pki_types::CertificateDer<'static>,
}

// ---------------------------------------------------------------------
// Slave side: outbound connection to the master
// ---------------------------------------------------------------------

/// Slave-side connection to a master. Owns the reconnect loop, advertises the
/// slave's local catalog on (re)connect, and answers `tools/call` requests
/// the master forwards by delegating to a caller-supplied dispatcher.
pub struct SlaveWebSocketClient {
    hostname: String,
    master_host: String,
    master_port: u16,
    identity: Arc<SlaveTlsIdentity>,
    state: Arc<RwLock<ClientState>>,
    last_error: LastError,
}

/// What the slave does when the master asks it to forward a call into the
/// slave's own local aggregate. Implemented by whatever owns the slave's own
/// `McpProxy` instance (the `estuary-proxy` crate), kept generic here so this
/// transport crate doesn't depend on the proxy core.
#[async_trait]
pub trait SlaveDispatcher: Send + Sync {
    async fn catalog(&self) -> ProviderCatalog;
    async fn call_tool(&self, tool: &str, arguments: Value) -> TransportResult<Value>;
}

impl SlaveWebSocketClient {
    pub fn new(
        hostname: String,
        master_host: String,
        master_port: u16,
        identity: SlaveTlsIdentity,
    ) -> Self {
        Self {
            hostname,
            master_host,
            master_port,
            identity: Arc::new(identity),
            state: Arc::new(RwLock::new(ClientState::Disconnected)),
            last_error: LastError::default(),
        }
    }

    pub async fn state(&self) -> ClientState {
        self.state.read().await.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.get()
    }

    /// Runs the connect/advertise/heartbeat/reconnect loop forever. Intended
    /// to be spawned as its own task; returns only if the dispatcher itself
    /// is dropped out from under it, which does not happen in normal
    /// operation.
    pub async fn run(&self, dispatcher: Arc<dyn SlaveDispatcher>) {
        let policy = reconnect_policy();
        let mut attempt = 0u32;
        loop {
            if attempt > 0 {
                tokio::time::sleep(policy.delay(attempt - 1)).await;
            }
            *self.state.write().await = ClientState::Connecting;
            match self.connect_once().await {
                Ok(stream) => {
                    attempt = 0;
                    *self.state.write().await = ClientState::Ready;
                    if let Err(err) = self.serve(stream, dispatcher.clone()).await {
                        self.last_error.set(err.to_string());
                    }
                    *self.state.write().await = ClientState::Reconnecting;
                }
                Err(err) => {
                    self.last_error.set(err.to_string());
                    *self.state.write().await = ClientState::Reconnecting;
                }
            }
            attempt += 1;
        }
    }

    async fn connect_once(&self) -> TransportResult<WsStream> {
        let tls_config = Arc::new(build_client_tls_config(&self.identity)?);
        let addr = format!("{}:{}", self.master_host, self.master_port);
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let url = format!("wss://{addr}/slaves/attach");
        let (stream, _response) = client_async_tls_with_config(
            url,
            tcp,
            None,
            Some(Connector::Rustls(tls_config)),
        )
        .await
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(stream)
    }

    async fn serve(&self, stream: WsStream, dispatcher: Arc<dyn SlaveDispatcher>) -> TransportResult<()> {
        let (mut write, mut read) = stream.split();

        let advertisement = json!({
            "jsonrpc": "2.0",
            "method": "estuary/advertise",
            "params": {
                "hostname": self.hostname,
                "catalog": dispatcher.catalog().await,
            }
        });
        write
            .send(Message::Text(advertisement.to_string()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let write = Arc::new(Mutex::new(write));
        let heartbeat_writer = write.clone();
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let ping = json!({"jsonrpc": "2.0", "method": "estuary/heartbeat", "params": {}});
                    if heartbeat_writer.lock().await.send(Message::Text(ping.to_string())).await.is_err() {
                        return Err(TransportError::ConnectionLost("heartbeat send failed".into()));
                    }
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        return Err(TransportError::ConnectionLost("master closed connection".into()));
                    };
                    let frame = frame.map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
                    let Message::Text(text) = frame else { continue };
                    // A master-forwarded tool call is a plain JsonRpcRequest
                    // (`{jsonrpc,method,params,id}`), not a JsonRpcInbound
                    // variant (that envelope is for this side's *own* pending
                    // requests, which the slave never issues). Dispatch on
                    // the request directly; anything else on this stream
                    // (e.g. a stray response) is not ours to answer.
                    let Ok(request) = serde_json::from_str::<JsonRpcRequest>(&text) else {
                        continue;
                    };
                    let dispatcher = dispatcher.clone();
                    let writer = write.clone();
                    tokio::spawn(async move {
                        let outcome = match request.method.as_str() {
                            "tools/call" => {
                                let tool = request.params.as_ref().and_then(|p| p.get("name")).and_then(|v| v.as_str()).unwrap_or_default().to_string();
                                let args = request.params.as_ref().and_then(|p| p.get("arguments")).cloned().unwrap_or(Value::Null);
                                dispatcher.call_tool(&tool, args).await
                            }
                            _ => Err(TransportError::Protocol(format!("method not forwarded: {}", request.method))),
                        };
                        let response = match outcome {
                            Ok(value) => JsonRpcResponse::success(value, request.id),
                            Err(err) => JsonRpcResponse::error(
                                estuary_types::JsonRpcErrorObject { code: -32000, message: err.to_string(), data: None },
                                Some(request.id),
                            ),
                        };
                        if let Ok(text) = serde_json::to_string(&response) {
                            let _ = writer.lock().await.send(Message::Text(text)).await;
                        }
                    });
                }
            }
        }
    }
}

fn build_client_tls_config(
    identity: &SlaveTlsIdentity,
) -> TransportResult<tokio_rustls::rustls::ClientConfig> {
    let mut roots = tokio_rustls::rustls::RootCertStore::empty();
    roots
        .add(identity.ca_cert.clone())
        .map_err(|e| TransportError::Configuration(e.to_string()))?;
    tokio_rustls::rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(identity.client_cert_chain.clone(), identity.client_key.clone_key())
        .map_err(|e| TransportError::Configuration(e.to_string()))
}

// ---------------------------------------------------------------------
// Master side: ProviderClient wrapping one slave-hosted provider
// ---------------------------------------------------------------------

/// Shared state between the master's WebSocket accept loop (which owns the
/// actual read/write halves and feeds this struct) and every
/// [`SlaveProxyClient`] built from the slave's advertised catalog.
#[derive(Debug)]
pub struct SlaveConnectionHandle {
    pub host_id: String,
    outbound: mpsc::Sender<Message>,
    pending: PendingTable,
    catalog: RwLock<ProviderCatalog>,
    state: Arc<RwLock<ClientState>>,
    last_heartbeat: std::sync::Mutex<Instant>,
    disconnected: Notify,
    next_id: AtomicU64,
}

use tokio::sync::mpsc;

impl SlaveConnectionHandle {
    pub fn new(host_id: String, outbound: mpsc::Sender<Message>) -> Arc<Self> {
        Arc::new(Self {
            host_id,
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
            catalog: RwLock::new(ProviderCatalog::default()),
            state: Arc::new(RwLock::new(ClientState::Ready)),
            last_heartbeat: std::sync::Mutex::new(Instant::now()),
            disconnected: Notify::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Called by the accept loop on every inbound frame from the slave.
    pub async fn on_inbound(&self, text: &str) {
        *self.last_heartbeat.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        if let Ok(request) = serde_json::from_str::<JsonRpcRequest>(text) {
            if request.method == "estuary/advertise" {
                if let Some(catalog) = request.params.as_ref().and_then(|p| p.get("catalog")) {
                    if let Ok(catalog) = serde_json::from_value(catalog.clone()) {
                        *self.catalog.write().await = catalog;
                    }
                }
                return;
            }
            if request.method == "estuary/heartbeat" {
                return;
            }
        }
        if let Ok(JsonRpcInbound::Response(resp)) = serde_json::from_str::<JsonRpcInbound>(text) {
            if let Some(id) = resp.id.clone() {
                if let Some(tx) = self.pending.lock().await.remove(&id) {
                    let _ = tx.send(
                        resp.into_result()
                            .map_err(|e| json!({"code": e.code, "message": e.message})),
                    );
                }
            }
        }
    }

    /// Called by the accept loop's heartbeat watchdog, or on TCP/TLS error.
    pub fn mark_disconnected(&self) {
        if let Ok(mut guard) = self.state.try_write() {
            *guard = ClientState::Disconnected;
        }
        self.disconnected.notify_waiters();
    }

    pub fn is_stale(&self) -> bool {
        self.last_heartbeat
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
            > HEARTBEAT_TIMEOUT
    }

    /// Resolves once the connection has been marked disconnected; the
    /// registry awaits this to know when to unregister the slave's clients
    /// (spec 4.2.5: "fires a disconnect channel when the underlying
    /// connection drops").
    pub async fn wait_disconnected(&self) {
        self.disconnected.notified().await;
    }
}

/// Master-side [`ProviderClient`] for one provider a slave advertises.
/// Prompts and resources are explicitly not forwarded (spec 4.2.5).
#[derive(Debug)]
pub struct SlaveProxyClient {
    name: String,
    handle: Arc<SlaveConnectionHandle>,
    counts: CachedCounts,
    last_error: LastError,
    metrics: ClientMetrics,
    #[allow(dead_code)]
    notifications: NotificationSender,
}

impl SlaveProxyClient {
    pub fn new(name: String, handle: Arc<SlaveConnectionHandle>, notifications: NotificationSender) -> Self {
        Self {
            name,
            handle,
            counts: CachedCounts::default(),
            last_error: LastError::default(),
            metrics: ClientMetrics::default(),
            notifications,
        }
    }

    /// Exposed so the registry can `select!` on disconnect and drive
    /// `unregister_slave_client`.
    pub fn connection(&self) -> &Arc<SlaveConnectionHandle> {
        &self.handle
    }

    async fn request(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        let id = next_request_id(&self.handle.next_id);
        let request = JsonRpcRequest::new(method, params, id.clone());
        let text = serde_json::to_string(&request).map_err(|e| TransportError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.handle.pending.lock().await.insert(id.clone(), tx);

        if self.handle.outbound.send(Message::Text(text)).await.is_err() {
            self.handle.pending.lock().await.remove(&id);
            return Err(TransportError::ConnectionLost("slave outbound channel closed".into()));
        }

        let start = Instant::now();
        let outcome = tokio::time::timeout(Duration::from_secs(30), rx).await;
        self.handle.pending.lock().await.remove(&id);
        match outcome {
            Ok(Ok(Ok(value))) => {
                self.metrics.requests_sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.metrics.responses_received.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.metrics.record_latency_us(start.elapsed().as_micros() as u64);
                Ok(value)
            }
            Ok(Ok(Err(error))) => {
                self.metrics.errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Err(TransportError::Protocol(error.to_string()))
            }
            Ok(Err(_)) => Err(TransportError::ConnectionLost("response channel dropped".into())),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl ProviderClient for SlaveProxyClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> ClientState {
        self.handle.state.read().await.clone()
    }

    async fn is_connected(&self) -> bool {
        matches!(*self.handle.state.read().await, ClientState::Ready)
    }

    async fn initialize(&self) -> TransportResult<InitializeResult> {
        // The slave already completed its own handshake before advertising;
        // the master treats a live connection as already initialized.
        Ok(InitializeResult {
            protocol_version: "2025-06-18".to_string(),
            capabilities: Default::default(),
            server_info: estuary_types::capabilities::Implementation {
                name: format!("slave:{}", self.handle.host_id),
                version: "0".to_string(),
            },
        })
    }

    async fn catalog(&self) -> ProviderCatalog {
        let catalog = self.handle.catalog.read().await.clone();
        self.counts.set(&catalog);
        catalog
    }

    async fn refresh_catalog(&self) -> TransportResult<ProviderCatalog> {
        // Passive: the slave pushes updates; the master never pulls (spec
        // 4.2.5: "updated when the slave pushes an update").
        Ok(self.catalog().await)
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> TransportResult<Value> {
        self.request("tools/call", Some(json!({"name": tool, "arguments": arguments})))
            .await
    }

    async fn read_resource(&self, _uri: &str) -> TransportResult<Value> {
        Err(TransportError::Protocol(
            "resources are not forwarded over the remote-slave transport".into(),
        ))
    }

    async fn get_prompt(&self, _name: &str, _arguments: HashMap<String, String>) -> TransportResult<Value> {
        Err(TransportError::Protocol(
            "prompts are not forwarded over the remote-slave transport".into(),
        ))
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

    async fn trigger_async_refresh(&self, _timeout: Duration) -> TransportResult<()> {
        self.catalog().await;
        Ok(())
    }

    async fn shutdown(&self) -> TransportResult<()> {
        self.handle.mark_disconnected();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slave_connection_handle_starts_ready_and_reports_stale_after_timeout() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = SlaveConnectionHandle::new("host-a".into(), tx);
        assert!(!handle.is_stale());
        *handle.last_heartbeat.lock().unwrap() = Instant::now() - HEARTBEAT_TIMEOUT - Duration::from_secs(1);
        assert!(handle.is_stale());
    }

    #[tokio::test]
    async fn slave_proxy_client_rejects_resources_and_prompts() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = SlaveConnectionHandle::new("host-a".into(), tx);
        let (notif_tx, _notif_rx) = tokio::sync::mpsc::channel(4);
        let client = SlaveProxyClient::new("slave1".into(), handle, notif_tx);
        assert!(client.read_resource("x://y").await.is_err());
        assert!(client.get_prompt("p", HashMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn disconnect_notifies_waiters() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = SlaveConnectionHandle::new("host-a".into(), tx);
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait_disconnected().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.mark_disconnected();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}

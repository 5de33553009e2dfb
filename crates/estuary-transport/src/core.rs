//! The `ProviderClient` trait every transport implements, plus the shared
//! state machine, metrics, and notification-event types the proxy core
//! drives them through.

use async_trait::async_trait;
use estuary_types::catalog::ProviderCatalog;
use estuary_types::jsonrpc::RequestId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("operation timed out")]
    Timeout,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<TransportError> for estuary_types::EstuaryError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => {
                estuary_types::EstuaryError::timeout("transport operation", 0)
            }
            TransportError::AuthenticationFailed(m) => estuary_types::EstuaryError::Authentication(m),
            TransportError::Configuration(m) => estuary_types::EstuaryError::config(m),
            other => estuary_types::EstuaryError::Transport(other.to_string()),
        }
    }
}

/// Lifecycle state of a provider connection, reported in status snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Initializing,
    Ready,
    Reconnecting,
    Failed { reason: String },
}

/// Lock-free per-client counters, sampled into a `ProviderStatus` on demand.
/// Modeled on the EMA-latency atomic metrics the teacher keeps per transport.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    pub requests_sent: AtomicU64,
    pub responses_received: AtomicU64,
    pub notifications_received: AtomicU64,
    pub errors: AtomicU64,
    avg_latency_us: AtomicU64,
}

impl ClientMetrics {
    pub fn record_latency_us(&self, latency_us: u64) {
        let current = self.avg_latency_us.load(Ordering::Relaxed);
        let new_avg = if current == 0 {
            latency_us
        } else {
            (current * 9 + latency_us) / 10
        };
        self.avg_latency_us.store(new_avg, Ordering::Relaxed);
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.avg_latency_us.load(Ordering::Relaxed) as f64 / 1000.0
    }
}

/// A notification pushed by a provider outside of any request/response
/// cycle (`notifications/tools/list_changed`, progress updates, log
/// messages, ...). The proxy core fans these in from every connected
/// provider over one bounded channel per spec 4.2.6.
#[derive(Debug, Clone)]
pub struct ProviderNotification {
    pub provider: String,
    pub method: String,
    pub params: Option<Value>,
}

pub type NotificationSender = mpsc::Sender<ProviderNotification>;
pub type NotificationReceiver = mpsc::Receiver<ProviderNotification>;

/// Capacity of each per-client notification forwarding channel; once full,
/// further notifications are dropped rather than blocking the reader task
/// (spec 4.2.6: bounded channel, drop-on-overflow, never back-pressure the
/// transport's own read loop).
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 10;

/// The operations the proxy core needs from any connected provider,
/// independent of what's underneath it. Every transport in this crate
/// implements this trait; the remote-slave client additionally aggregates
/// a whole slave's catalog behind a single `ProviderClient`.
#[async_trait]
pub trait ProviderClient: Send + Sync + std::fmt::Debug {
    /// Provider name as configured (the namespace prefix in aggregate names).
    fn name(&self) -> &str;

    /// Current lifecycle state.
    async fn state(&self) -> ClientState;

    /// `true` while the underlying transport has a live connection (spec
    /// 3: `is_connected()`). Default derives from `state()`.
    async fn is_connected(&self) -> bool {
        matches!(self.state().await, ClientState::Ready)
    }

    /// Run the MCP `initialize` handshake; idempotent once `Ready`.
    async fn initialize(&self) -> TransportResult<estuary_types::capabilities::InitializeResult>;

    /// Full catalog as last fetched; callers that want a fresh fetch should
    /// call `refresh_catalog` first.
    async fn catalog(&self) -> ProviderCatalog;

    /// Re-fetch tools/resources/prompts lists from the provider.
    async fn refresh_catalog(&self) -> TransportResult<ProviderCatalog>;

    /// Invoke `tools/call` with the given arguments, returning the raw
    /// `CallToolResult` JSON.
    async fn call_tool(&self, tool: &str, arguments: Value) -> TransportResult<Value>;

    /// Invoke `resources/read`.
    async fn read_resource(&self, uri: &str) -> TransportResult<Value>;

    /// Invoke `prompts/get`.
    async fn get_prompt(&self, name: &str, arguments: HashMap<String, String>) -> TransportResult<Value>;

    /// Arbitrary passthrough call for methods the aggregate surface doesn't
    /// special-case (`ping`, experimental methods, ...).
    async fn call_raw(&self, method: &str, params: Option<Value>) -> TransportResult<Value>;

    /// Metrics snapshot for status reporting.
    fn metrics(&self) -> &ClientMetrics;

    /// Cached tool/resource/prompt counts from the last successful
    /// `refresh_catalog`; `-1` in a slot means that kind was never fetched
    /// (spec 3: "cached counts ... -1 ≡ never fetched").
    fn cached_counts(&self) -> &CachedCounts;

    /// Most recent transport-level error, if any (spec 3: `last_error()`).
    /// Each implementation records errors into its own `LastError` cell
    /// (spec 3: `set_error(msg)`) as they occur on the wire.
    fn last_error(&self) -> Option<String>;

    /// Drop the cached catalog counts so the next status read triggers a
    /// fresh `refresh_catalog` (spec 3: `invalidate_tool_cache()`).
    fn invalidate_tool_cache(&self) {
        self.cached_counts().invalidate();
    }

    /// Kick off a background `refresh_catalog` if one isn't already running;
    /// concurrent callers collapse onto the same refresh (spec 3:
    /// `trigger_async_refresh`, single-flight per spec 4.3/9).
    async fn trigger_async_refresh(&self, timeout: std::time::Duration) -> TransportResult<()>;

    /// Tear the connection down; a subsequent `initialize` may reconnect.
    async fn shutdown(&self) -> TransportResult<()>;
}

/// Cached tool/resource/prompt counts plus the single-flight refresh guard
/// shared by every transport (spec 5: "Single-flight cache refresh").
/// `-1` means "never fetched" per spec 3.
#[derive(Debug)]
pub struct CachedCounts {
    tools: AtomicI64,
    resources: AtomicI64,
    prompts: AtomicI64,
    refreshing: std::sync::atomic::AtomicBool,
    done: Notify,
}

impl Default for CachedCounts {
    fn default() -> Self {
        Self {
            tools: AtomicI64::new(-1),
            resources: AtomicI64::new(-1),
            prompts: AtomicI64::new(-1),
            refreshing: std::sync::atomic::AtomicBool::new(false),
            done: Notify::new(),
        }
    }
}

impl CachedCounts {
    pub fn get(&self) -> (i64, i64, i64) {
        (
            self.tools.load(Ordering::Relaxed),
            self.resources.load(Ordering::Relaxed),
            self.prompts.load(Ordering::Relaxed),
        )
    }

    pub fn set(&self, catalog: &ProviderCatalog) {
        self.tools.store(catalog.tools.len() as i64, Ordering::Relaxed);
        self.resources.store(catalog.resources.len() as i64, Ordering::Relaxed);
        self.prompts.store(catalog.prompts.len() as i64, Ordering::Relaxed);
    }

    pub fn invalidate(&self) {
        self.tools.store(-1, Ordering::Relaxed);
        self.resources.store(-1, Ordering::Relaxed);
        self.prompts.store(-1, Ordering::Relaxed);
    }

    /// Returns `true` if the caller is the one that should actually perform
    /// the refresh (won the single-flight race); `false` means a refresh is
    /// already underway and the caller should await `wait_done()` instead.
    pub fn start_refresh(&self) -> bool {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish_refresh(&self) {
        self.refreshing.store(false, Ordering::Release);
        self.done.notify_waiters();
    }

    pub async fn wait_done(&self) {
        self.done.notified().await;
    }
}

/// Last transport error, swappable from any task without an async lock.
/// Cheap to clone: the inner cell is `Arc`-shared so a background reader
/// task can hold its own handle alongside the client.
#[derive(Debug, Clone, Default)]
pub struct LastError(std::sync::Arc<StdMutex<Option<String>>>);

impl LastError {
    pub fn get(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, message: impl Into<String>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Generates fresh correlation ids for requests a client issues to its
/// provider; transports keep a `pending: Mutex<HashMap<RequestId, oneshot::Sender<_>>>`
/// keyed by whatever this produces.
pub fn next_request_id(counter: &AtomicU64) -> RequestId {
    RequestId::Number(counter.fetch_add(1, Ordering::Relaxed) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_ema_converges_toward_new_samples() {
        let metrics = ClientMetrics::default();
        metrics.record_latency_us(1000);
        for _ in 0..50 {
            metrics.record_latency_us(2000);
        }
        let ms = metrics.average_latency_ms();
        assert!(ms > 1.9 && ms < 2.1, "expected ~2ms, got {ms}");
    }

    #[test]
    fn next_request_id_increments() {
        let counter = AtomicU64::new(0);
        let a = next_request_id(&counter);
        let b = next_request_id(&counter);
        assert_ne!(a, b);
    }
}

//! Provider transport clients: one implementation of [`core::ProviderClient`]
//! per wire protocol the daemon can aggregate (spec 4.2).

pub mod core;
pub mod http;
pub mod remote;
pub mod resilience;
pub mod sse;
pub mod stdio;

pub use core::{
    CachedCounts, ClientMetrics, ClientState, LastError, NotificationReceiver, NotificationSender,
    ProviderClient, ProviderNotification, TransportError, TransportResult,
    NOTIFICATION_CHANNEL_CAPACITY,
};
pub use http::{HttpClientTransport, HttpTuning};
pub use remote::{
    SlaveConnectionHandle, SlaveDispatcher, SlaveProxyClient, SlaveTlsIdentity, SlaveWebSocketClient,
};
pub use sse::{SseClient, SseTuning};
pub use stdio::StdioClient;

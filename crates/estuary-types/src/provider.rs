//! Provider configuration: how the daemon reaches each MCP tool provider it
//! aggregates, one variant per transport kind.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A single configured provider. Tagged on `type` so a TOML/JSON config file
/// reads naturally (`type = "stdio"`, `type = "sse"`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Subprocess speaking newline-delimited JSON-RPC over stdin/stdout.
    Stdio {
        name: String,
        #[serde(default = "default_enabled")]
        enabled: bool,
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        working_dir: Option<String>,
    },
    /// HTTP+SSE transport: POST to submit, GET/SSE stream for responses and
    /// server-initiated notifications.
    Sse {
        name: String,
        #[serde(default = "default_enabled")]
        enabled: bool,
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        auth_token: Option<String>,
    },
    /// Streamable HTTP transport: single endpoint, session negotiated via the
    /// `MCP-Session-Id` response header.
    Http {
        name: String,
        #[serde(default = "default_enabled")]
        enabled: bool,
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        auth_token: Option<String>,
    },
    /// A slave daemon reachable over a mutually authenticated TLS WebSocket;
    /// its entire aggregate catalog is imported under this provider's name.
    Remote {
        name: String,
        #[serde(default = "default_enabled")]
        enabled: bool,
        hostname: String,
        port: u16,
        client_cert_path: String,
        client_key_path: String,
        ca_path: String,
    },
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Stdio { name, .. }
            | Self::Sse { name, .. }
            | Self::Http { name, .. }
            | Self::Remote { name, .. } => name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Self::Stdio { enabled, .. }
            | Self::Sse { enabled, .. }
            | Self::Http { enabled, .. }
            | Self::Remote { enabled, .. } => *enabled,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Stdio { .. } => ProviderKind::Stdio,
            Self::Sse { .. } => ProviderKind::Sse,
            Self::Http { .. } => ProviderKind::Http,
            Self::Remote { .. } => ProviderKind::Remote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Stdio,
    Sse,
    Http,
    Remote,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::Http => "http",
            Self::Remote => "remote",
        };
        write!(f, "{s}")
    }
}

/// Timeouts and retry shape shared by every transport; individual clients
/// may ignore fields that don't apply (stdio has no reconnect backoff).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportTuning {
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub initial_reconnect_delay: Duration,
    #[serde(with = "duration_secs")]
    pub max_reconnect_delay: Duration,
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for TransportTuning {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            initial_reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: None,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

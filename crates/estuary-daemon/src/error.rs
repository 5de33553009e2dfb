//! Error taxonomy for the daemon binary itself (config loading, TLS/identity
//! setup, persistence). Lower-layer crate errors convert in via `#[from]`;
//! `main` collapses everything into `anyhow::Error` at the outer edge the
//! way the teacher's CLI-fronted crates do (`turbomcp-proxy::error`).

use thiserror::Error;

pub type DaemonResult<T> = std::result::Result<T, DaemonError>;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file '{path}': {source}")]
    ConfigParse { path: String, #[source] source: Box<toml::de::Error> },

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("no slave section configured, but slave mode was requested")]
    MissingSlaveConfig,

    #[error("TLS identity error: {0}")]
    Tls(String),

    #[error(transparent)]
    Proxy(#[from] estuary_proxy::ProxyError),

    #[error(transparent)]
    Pairing(#[from] estuary_pairing::PairingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

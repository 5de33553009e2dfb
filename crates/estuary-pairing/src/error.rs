//! Error taxonomy for pairing and slave enrollment (spec 7:
//! `Authn/AuthzError`, `RateLimited`, plus the `ConfigError`/`UnknownTarget`
//! cases the enrollment flow surfaces).

use thiserror::Error;

pub type PairingResult<T> = std::result::Result<T, PairingError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PairingError {
    #[error("no api key is configured for this daemon")]
    NoApiKeyConfigured,

    #[error("invalid or expired pairing code")]
    InvalidCode,

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("no pending request for hostname '{0}'")]
    UnknownPendingRequest(String),

    #[error("pending request for '{0}' has expired")]
    RequestExpired(String),

    #[error("csr could not be parsed or signed: {0}")]
    InvalidCsr(String),

    #[error("no such slave: {0}")]
    UnknownSlave(String),

    #[error("ca material could not be loaded or generated: {0}")]
    CaUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PairingError> for estuary_types::EstuaryError {
    fn from(err: PairingError) -> Self {
        use estuary_types::EstuaryError;
        match &err {
            PairingError::NoApiKeyConfigured => EstuaryError::config(err.to_string()),
            PairingError::InvalidCode => {
                EstuaryError::Authentication("invalid or expired pairing code".to_string())
            }
            PairingError::RateLimited { retry_after_ms } => {
                EstuaryError::RateLimited { retry_after_ms: *retry_after_ms }
            }
            PairingError::UnknownPendingRequest(host) | PairingError::UnknownSlave(host) => {
                EstuaryError::unknown_target(host.clone())
            }
            PairingError::RequestExpired(host) => {
                EstuaryError::Authentication(format!("pairing request for '{host}' expired"))
            }
            PairingError::InvalidCsr(msg) => EstuaryError::config(msg.clone()),
            PairingError::CaUnavailable(msg) => EstuaryError::config(msg.clone()),
            PairingError::Io(e) => EstuaryError::config(e.to_string()),
        }
    }
}

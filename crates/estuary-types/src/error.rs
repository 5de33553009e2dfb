//! Shared error taxonomy. Every crate in the workspace has its own
//! `thiserror` enum for the errors it originates, then converts into
//! [`EstuaryError`] at the boundary the aggregate proxy and the pairing HTTP
//! surface speak to callers through.

use thiserror::Error;

pub type EstuaryResult<T> = std::result::Result<T, EstuaryError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EstuaryError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("startup error for provider '{provider}': {message}")]
    Startup { provider: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("request '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("context '{context}' denies access to {target}")]
    ContextDenied { context: String, target: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EstuaryError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn startup(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Startup { provider: provider.into(), message: message.into() }
    }

    pub fn unknown_target(target: impl Into<String>) -> Self {
        Self::UnknownTarget(target.into())
    }

    pub fn context_denied(context: impl Into<String>, target: impl Into<String>) -> Self {
        Self::ContextDenied { context: context.into(), target: target.into() }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), timeout_ms }
    }

    /// Whether this error reflects a condition the caller can usefully
    /// retry (as opposed to a permanent configuration/authorization issue).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

//! Error taxonomy for the aggregate proxy surface (spec 7). Lower-layer
//! errors from `estuary-transport` and `estuary-context` convert in; this is
//! the superset callers of `McpProxy` actually see.

use thiserror::Error;

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider '{0}' failed to start: {1}")]
    Startup(String, String),

    #[error(transparent)]
    Transport(#[from] estuary_transport::TransportError),

    #[error("unknown target: {0}")]
    UnknownTool(String),

    #[error("context check failed: {0}")]
    ContextCheckFailed(String),

    #[error("tool not enabled in the active context")]
    ToolNotEnabled,

    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("no such provider: {0}")]
    UnknownProvider(String),
}

impl ProxyError {
    /// Every context-filter failure mode funnels into `ContextDenied` at the
    /// `estuary_types` boundary (spec 4.3: fail-closed, both "lookup failed"
    /// and "not enabled" deny the call).
    pub fn is_context_denial(&self) -> bool {
        matches!(self, Self::ContextCheckFailed(_) | Self::ToolNotEnabled)
    }
}

impl From<ProxyError> for estuary_types::EstuaryError {
    fn from(err: ProxyError) -> Self {
        use estuary_types::EstuaryError;
        match &err {
            ProxyError::Config(msg) => EstuaryError::config(msg.clone()),
            ProxyError::Startup(provider, msg) => EstuaryError::startup(provider.clone(), msg.clone()),
            ProxyError::Transport(inner) => inner.clone().into(),
            ProxyError::UnknownTool(target) | ProxyError::UnknownProvider(target) => {
                EstuaryError::unknown_target(target.clone())
            }
            ProxyError::ContextCheckFailed(ctx) => {
                EstuaryError::context_denied(ctx.clone(), "lookup failed".to_string())
            }
            ProxyError::ToolNotEnabled => {
                EstuaryError::context_denied("<active>".to_string(), "not enabled".to_string())
            }
            ProxyError::DuplicateProvider(_) => EstuaryError::config(err.to_string()),
        }
    }
}

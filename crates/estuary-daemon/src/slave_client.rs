//! Slave-side wiring (spec 4.2.4): adapts this daemon's own [`McpProxy`]
//! aggregate into an `estuary_transport::remote::SlaveDispatcher` and runs
//! the outbound connection to the configured master.

use async_trait::async_trait;
use estuary_proxy::McpProxy;
use estuary_transport::remote::{SlaveDispatcher, SlaveTlsIdentity, SlaveWebSocketClient};
use estuary_transport::core::{TransportError, TransportResult};
use estuary_types::catalog::ProviderCatalog;
use serde_json::Value;
use std::sync::Arc;

use crate::config::SlaveModeConfig;
use crate::error::DaemonResult;
use crate::tls::load_slave_identity;

/// Forwards `tools/call` into the slave's own proxy aggregate. Only tools
/// are forwarded (spec 4.2.5: resources and prompts stay local to the
/// slave), so the advertised catalog only ever carries a `tools` list.
struct LocalDispatcher {
    proxy: Arc<McpProxy>,
}

#[async_trait]
impl SlaveDispatcher for LocalDispatcher {
    async fn catalog(&self) -> ProviderCatalog {
        let tools = self.proxy.list_all_tools().await.into_iter().map(|t| t.tool).collect();
        ProviderCatalog { tools, ..Default::default() }
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> TransportResult<Value> {
        self.proxy
            .call_tool(tool, arguments)
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }
}

/// Builds and runs the slave's outbound connection forever. Intended to be
/// spawned as its own task alongside the daemon's own control HTTP surface.
pub async fn run_slave_mode(config: &SlaveModeConfig, proxy: Arc<McpProxy>) -> DaemonResult<()> {
    let identity: SlaveTlsIdentity = load_slave_identity(
        std::path::Path::new(&config.client_cert_path),
        std::path::Path::new(&config.client_key_path),
        std::path::Path::new(&config.ca_path),
    )?;

    let client = SlaveWebSocketClient::new(
        config.hostname.clone(),
        config.master_host.clone(),
        config.master_port,
        identity,
    );

    let dispatcher: Arc<dyn SlaveDispatcher> = Arc::new(LocalDispatcher { proxy });
    client.run(dispatcher).await;
    Ok(())
}

//! `McpProxy`: the registry of live provider clients, aggregate catalog
//! operations, name-prefix routing, reload diffing, and notification fan-in
//! (spec 4.1). Holds one `RwLock`-guarded map; every aggregate read takes the
//! read lock, `reload`/`restart_server`/`register_slave_client`/
//! `unregister_slave_client` take the write lock (spec 5: "Shared-resource
//! policy").

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use estuary_context::ContextFilter;
use estuary_transport::core::{
    NotificationReceiver, NotificationSender, ProviderClient, ProviderNotification,
    NOTIFICATION_CHANNEL_CAPACITY,
};
use estuary_types::{
    aggregate_prompt, aggregate_resource, aggregate_tool, split_namespaced, split_namespaced_uri,
    AggregatedPrompt, AggregatedResource, AggregatedTool, ProviderConfig, ProviderStatus,
    TransportTuning,
};
use tokio::sync::{mpsc, Mutex, Notify, RwLock};

use crate::config::ConfigProvider;
use crate::error::{ProxyError, ProxyResult};
use crate::factory::build_client;

/// Method name that, once observed from any client, is promoted to a
/// proxy-level tool-cache invalidation (spec 4.1: "the method
/// `notifications/tools/list_changed` is promoted to a proxy-level event").
pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

/// Notification the proxy fans out on its own aggregate channel (spec 4.1:
/// `restart_server` and `reload` each "emit a notification"). Distinct from
/// [`ProviderNotification`] because reload/restart events aren't tied to one
/// provider's own wire traffic.
#[derive(Debug, Clone)]
pub enum ProxyEvent {
    /// A provider pushed a notification of its own.
    Provider(ProviderNotification),
    /// `restart_server(name)` completed.
    ServerRestarted { name: String },
    /// `reload()` completed, regardless of diff size.
    ConfigReloaded,
}

struct ProxyState {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    init_errors: HashMap<String, String>,
    initializing: HashSet<String>,
    configs: Vec<ProviderConfig>,
}

pub struct McpProxy {
    state: RwLock<ProxyState>,
    config_provider: Arc<dyn ConfigProvider>,
    tuning: TransportTuning,
    event_tx: mpsc::Sender<ProxyEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<ProxyEvent>>>,
    pending_startups: AtomicUsize,
    init_done: Notify,
}

impl McpProxy {
    /// Loads configs once and starts every enabled, non-remote provider in
    /// the background (spec 4.1: "for every enabled config, start a client
    /// in the background"). Returns once startup has been *kicked off*, not
    /// once it's complete — call [`Self::wait_for_init`] to block until the
    /// initial round quiesces.
    pub async fn new(config_provider: Arc<dyn ConfigProvider>) -> ProxyResult<Arc<Self>> {
        let configs = config_provider.load_configs().await?;
        Self::from_configs(config_provider, configs).await
    }

    async fn from_configs(
        config_provider: Arc<dyn ConfigProvider>,
        configs: Vec<ProviderConfig>,
    ) -> ProxyResult<Arc<Self>> {
        let (event_tx, event_rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let proxy = Arc::new(Self {
            state: RwLock::new(ProxyState {
                clients: HashMap::new(),
                init_errors: HashMap::new(),
                initializing: HashSet::new(),
                configs: configs.clone(),
            }),
            config_provider,
            tuning: TransportTuning::default(),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            pending_startups: AtomicUsize::new(0),
            init_done: Notify::new(),
        });

        let startable: Vec<_> = configs
            .into_iter()
            .filter(|c| c.enabled() && !matches!(c, ProviderConfig::Remote { .. }))
            .collect();
        proxy.pending_startups.store(startable.len(), Ordering::SeqCst);
        if startable.is_empty() {
            proxy.init_done.notify_waiters();
        }
        for config in startable {
            let proxy = proxy.clone();
            tokio::spawn(async move { proxy.start_one(config).await });
        }
        Ok(proxy)
    }

    async fn start_one(self: &Arc<Self>, config: ProviderConfig) {
        let name = config.name().to_string();
        {
            let mut state = self.state.write().await;
            state.initializing.insert(name.clone());
            state.init_errors.remove(&name);
        }

        let result = self.start_client_inner(&config).await;

        let mut state = self.state.write().await;
        state.initializing.remove(&name);
        match result {
            Ok(client) => {
                state.clients.insert(name, client);
            }
            Err(err) => {
                tracing::warn!(provider = %name, %err, "provider failed to start");
                state.init_errors.insert(name, err.to_string());
            }
        }
        drop(state);

        if self.pending_startups.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.init_done.notify_waiters();
        }
    }

    async fn start_client_inner(&self, config: &ProviderConfig) -> ProxyResult<Arc<dyn ProviderClient>> {
        let (notif_tx, notif_rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let client = build_client(config, &self.tuning, notif_tx)?;
        client
            .initialize()
            .await
            .map_err(|e| ProxyError::Startup(config.name().to_string(), e.to_string()))?;
        self.spawn_notification_forwarder(client.clone(), notif_rx);
        Ok(client)
    }

    /// One task per live client forwards its notifications into the proxy's
    /// own bounded aggregate channel (spec 5: "one task per client
    /// forwarding notifications into the aggregate channel").
    fn spawn_notification_forwarder(
        &self,
        client: Arc<dyn ProviderClient>,
        mut notif_rx: NotificationReceiver,
    ) {
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(notification) = notif_rx.recv().await {
                if notification.method == TOOLS_LIST_CHANGED {
                    client.invalidate_tool_cache();
                }
                if event_tx.try_send(ProxyEvent::Provider(notification)).is_err() {
                    tracing::warn!("proxy notification channel full, dropping event");
                }
            }
        });
    }

    /// Blocks until every startup kicked off by `new()` has either succeeded
    /// or recorded an init error. Optional — aggregate operations are safe to
    /// call before this resolves, they just see fewer live clients.
    pub async fn wait_for_init(&self) {
        if self.pending_startups.load(Ordering::SeqCst) == 0 {
            return;
        }
        self.init_done.notified().await;
    }

    fn known_provider_names(state: &HashMap<String, Arc<dyn ProviderClient>>) -> Vec<String> {
        state.keys().cloned().collect()
    }

    // -----------------------------------------------------------------
    // Aggregate listings (spec 4.1)
    // -----------------------------------------------------------------

    pub async fn list_all_tools(&self) -> Vec<AggregatedTool> {
        let state = self.state.read().await;
        let mut out = Vec::new();
        for (name, client) in &state.clients {
            let catalog = client.catalog().await;
            out.extend(catalog.tools.into_iter().map(|t| aggregate_tool(name, t)));
        }
        out
    }

    pub async fn list_all_prompts(&self) -> Vec<AggregatedPrompt> {
        let state = self.state.read().await;
        let mut out = Vec::new();
        for (name, client) in &state.clients {
            let catalog = client.catalog().await;
            out.extend(catalog.prompts.into_iter().map(|p| aggregate_prompt(name, p)));
        }
        out
    }

    pub async fn list_all_resources(&self) -> Vec<AggregatedResource> {
        let state = self.state.read().await;
        let mut out = Vec::new();
        for (name, client) in &state.clients {
            let catalog = client.catalog().await;
            out.extend(catalog.resources.into_iter().map(|r| aggregate_resource(name, r)));
        }
        out
    }

    // -----------------------------------------------------------------
    // Routing (spec 4.1: longest-prefix match)
    // -----------------------------------------------------------------

    async fn resolve_tool<'a>(
        &self,
        state: &'a ProxyState,
        prefixed: &'a str,
    ) -> ProxyResult<(&'a Arc<dyn ProviderClient>, String)> {
        let names = Self::known_provider_names(&state.clients);
        let (provider, local) = split_namespaced(prefixed, &names)
            .ok_or_else(|| ProxyError::UnknownTool(prefixed.to_string()))?;
        let client = state
            .clients
            .get(provider)
            .ok_or_else(|| ProxyError::UnknownTool(prefixed.to_string()))?;
        Ok((client, local.to_string()))
    }

    pub async fn call_tool(&self, prefixed_name: &str, args: serde_json::Value) -> ProxyResult<serde_json::Value> {
        let state = self.state.read().await;
        let (client, local) = self.resolve_tool(&state, prefixed_name).await?;
        Ok(client.call_tool(&local, args).await?)
    }

    pub async fn get_prompt(
        &self,
        prefixed_name: &str,
        args: HashMap<String, String>,
    ) -> ProxyResult<serde_json::Value> {
        let state = self.state.read().await;
        let (client, local) = self.resolve_tool(&state, prefixed_name).await?;
        Ok(client.get_prompt(&local, args).await?)
    }

    pub async fn read_resource(&self, prefixed_uri: &str) -> ProxyResult<serde_json::Value> {
        let state = self.state.read().await;
        let names = Self::known_provider_names(&state.clients);
        let (provider, local) = split_namespaced_uri(prefixed_uri, &names)
            .ok_or_else(|| ProxyError::UnknownTool(prefixed_uri.to_string()))?;
        let client = state
            .clients
            .get(provider)
            .ok_or_else(|| ProxyError::UnknownTool(prefixed_uri.to_string()))?;
        Ok(client.read_resource(local).await?)
    }

    // -----------------------------------------------------------------
    // Context-scoped variants (spec 4.1/4.3: fail-closed)
    // -----------------------------------------------------------------

    pub async fn list_tools_for_context(
        &self,
        context: &str,
        filter: &dyn ContextFilter,
    ) -> Vec<AggregatedTool> {
        let enabled_servers = match filter.enabled_servers_for(context) {
            Ok(servers) => servers,
            Err(err) => {
                tracing::warn!(context, %err, "context lookup failed while listing tools");
                return Vec::new();
            }
        };
        let state = self.state.read().await;
        let mut out = Vec::new();
        for (name, client) in &state.clients {
            if !enabled_servers.contains(name) {
                continue;
            }
            let catalog = client.catalog().await;
            for tool in catalog.tools {
                match filter.is_tool_enabled(context, name, &tool.name) {
                    Ok(true) => out.push(aggregate_tool(name, tool)),
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(context, server = %name, tool = %tool.name, %err, "context lookup failed, omitting tool");
                    }
                }
            }
        }
        out
    }

    pub async fn call_tool_for_context(
        &self,
        context: &str,
        prefixed_name: &str,
        args: serde_json::Value,
        filter: &dyn ContextFilter,
    ) -> ProxyResult<serde_json::Value> {
        let state = self.state.read().await;
        let names = Self::known_provider_names(&state.clients);
        let (provider, local) = split_namespaced(prefixed_name, &names)
            .ok_or_else(|| ProxyError::UnknownTool(prefixed_name.to_string()))?;

        match filter.is_tool_enabled(context, provider, local) {
            Ok(true) => {}
            Ok(false) => return Err(ProxyError::ToolNotEnabled),
            Err(err) => return Err(ProxyError::ContextCheckFailed(err.to_string())),
        }

        let client = state
            .clients
            .get(provider)
            .ok_or_else(|| ProxyError::UnknownTool(prefixed_name.to_string()))?;
        Ok(client.call_tool(local, args).await?)
    }

    // -----------------------------------------------------------------
    // Lifecycle management (spec 4.1)
    // -----------------------------------------------------------------

    /// Locates the config by name, closes any current client, starts fresh,
    /// and emits one notification tagged with `name`. The proxy lock is held
    /// across close→open so no aggregate observes a gap (spec 4.1: "Locking
    /// discipline").
    pub async fn restart_server(&self, name: &str) -> ProxyResult<()> {
        let mut state = self.state.write().await;
        let config = state
            .configs
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownProvider(name.to_string()))?;

        if let Some(old) = state.clients.remove(name) {
            let _ = old.shutdown().await;
        }
        state.initializing.insert(name.to_string());

        let (notif_tx, notif_rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let build_result = build_client(&config, &self.tuning, notif_tx);
        let result = match build_result {
            Ok(client) => match client.initialize().await {
                Ok(_) => {
                    self.spawn_notification_forwarder(client.clone(), notif_rx);
                    Ok(client)
                }
                Err(e) => Err(ProxyError::Startup(name.to_string(), e.to_string())),
            },
            Err(e) => Err(e),
        };

        state.initializing.remove(name);
        match result {
            Ok(client) => {
                state.clients.insert(name.to_string(), client);
                state.init_errors.remove(name);
            }
            Err(err) => {
                state.init_errors.insert(name.to_string(), err.to_string());
                drop(state);
                return Err(err);
            }
        }
        drop(state);

        if self.event_tx.try_send(ProxyEvent::ServerRestarted { name: name.to_string() }).is_err() {
            tracing::warn!(provider = %name, "proxy notification channel full, dropping restart event");
        }
        Ok(())
    }

    /// Reloads configs and converges the live client set: stops removed or
    /// newly disabled providers, starts added or newly enabled ones, leaves
    /// unchanged entries alone (spec 4.1). Emits exactly one
    /// `"config-reload"` notification regardless of diff size.
    pub async fn reload(&self) -> ProxyResult<()> {
        let new_configs = self.config_provider.load_configs().await?;

        let mut state = self.state.write().await;
        let old_by_name: HashMap<String, ProviderConfig> =
            state.configs.iter().map(|c| (c.name().to_string(), c.clone())).collect();
        let new_by_name: HashMap<String, ProviderConfig> =
            new_configs.iter().map(|c| (c.name().to_string(), c.clone())).collect();

        // Stop removed-or-disabled.
        let to_stop: Vec<String> = old_by_name
            .iter()
            .filter(|(name, old)| {
                let still_enabled = new_by_name.get(*name).map(|c| c.enabled()).unwrap_or(false);
                old.enabled() && !still_enabled
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in &to_stop {
            if let Some(client) = state.clients.remove(name) {
                let _ = client.shutdown().await;
            }
            state.init_errors.remove(name);
        }

        // Start added-or-newly-enabled (non-remote only, same as initial startup).
        let to_start: Vec<ProviderConfig> = new_by_name
            .iter()
            .filter(|(name, new)| {
                if !new.enabled() || matches!(new, ProviderConfig::Remote { .. }) {
                    return false;
                }
                let was_enabled = old_by_name.get(*name).map(|c| c.enabled()).unwrap_or(false);
                !was_enabled
            })
            .map(|(_, c)| c.clone())
            .collect();

        state.configs = new_configs;
        drop(state);

        for config in to_start {
            let name = config.name().to_string();
            let mut state = self.state.write().await;
            state.initializing.insert(name.clone());
            drop(state);
            let result = self.start_client_inner(&config).await;
            let mut state = self.state.write().await;
            state.initializing.remove(&name);
            match result {
                Ok(client) => {
                    state.clients.insert(name, client);
                }
                Err(err) => {
                    state.init_errors.insert(name, err.to_string());
                }
            }
        }

        if self.event_tx.try_send(ProxyEvent::ConfigReloaded).is_err() {
            tracing::warn!("proxy notification channel full, dropping reload event");
        }
        Ok(())
    }

    pub async fn register_slave_client(
        &self,
        name: String,
        client: Arc<dyn ProviderClient>,
    ) -> ProxyResult<()> {
        let mut state = self.state.write().await;
        if state.clients.contains_key(&name) {
            return Err(ProxyError::DuplicateProvider(name));
        }
        state.clients.insert(name, client);
        Ok(())
    }

    pub async fn unregister_slave_client(&self, name: &str) -> ProxyResult<()> {
        let mut state = self.state.write().await;
        if let Some(client) = state.clients.remove(name) {
            let _ = client.shutdown().await;
            Ok(())
        } else {
            Err(ProxyError::UnknownProvider(name.to_string()))
        }
    }

    // -----------------------------------------------------------------
    // Status & notifications
    // -----------------------------------------------------------------

    pub async fn get_server_statuses(&self) -> Vec<ProviderStatus> {
        let state = self.state.read().await;
        let mut statuses = Vec::new();
        for config in &state.configs {
            let name = config.name();
            if let Some(client) = state.clients.get(name) {
                let connected = client.is_connected().await;
                let (tools, resources, prompts) = client.cached_counts().get();
                if (tools < 0 || resources < 0 || prompts < 0) && connected {
                    let client = client.clone();
                    let _ = tokio::time::timeout(
                        Duration::from_millis(50),
                        client.trigger_async_refresh(Duration::from_secs(5)),
                    )
                    .await;
                }
                let (tools, resources, prompts) = client.cached_counts().get();
                statuses.push(ProviderStatus {
                    name: name.to_string(),
                    transport: config.kind(),
                    connected,
                    initializing: state.initializing.contains(name),
                    tool_count: tools,
                    resource_count: resources,
                    prompt_count: prompts,
                    last_error: client.last_error(),
                    init_error: state.init_errors.get(name).cloned(),
                });
            } else {
                statuses.push(ProviderStatus {
                    name: name.to_string(),
                    transport: config.kind(),
                    connected: false,
                    initializing: state.initializing.contains(name),
                    tool_count: -1,
                    resource_count: -1,
                    prompt_count: -1,
                    last_error: None,
                    init_error: state.init_errors.get(name).cloned(),
                });
            }
        }
        statuses
    }

    /// Takes ownership of the fanned-in notification stream. Intended to be
    /// called once by whatever owns the proxy's lifetime (the daemon's
    /// client-facing notification forwarder); returns `None` on a second
    /// call.
    pub async fn notification_chan(&self) -> Option<mpsc::Receiver<ProxyEvent>> {
        self.event_rx.lock().await.take()
    }

    pub async fn provider_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        Self::known_provider_names(&state.clients)
    }

    pub async fn close(&self) {
        let mut state = self.state.write().await;
        for (_, client) in state.clients.drain() {
            let _ = client.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfigProvider;
    use estuary_context::ContextStore;
    use std::collections::HashMap as Map;

    fn stdio_config(name: &str, enabled: bool) -> ProviderConfig {
        ProviderConfig::Stdio {
            name: name.to_string(),
            enabled,
            command: "false".to_string(), // never actually spawned successfully in these tests
            args: vec![],
            env: Map::new(),
            working_dir: None,
        }
    }

    #[tokio::test]
    async fn disabled_config_is_never_started() {
        let provider = Arc::new(StaticConfigProvider::new(vec![stdio_config("a", false)]));
        let proxy = McpProxy::new(provider).await.unwrap();
        proxy.wait_for_init().await;
        let statuses = proxy.get_server_statuses().await;
        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].connected);
        assert!(statuses[0].init_error.is_none());
        assert!(!statuses[0].initializing);
    }

    #[tokio::test]
    async fn unknown_tool_prefix_is_rejected() {
        let provider = Arc::new(StaticConfigProvider::new(vec![]));
        let proxy = McpProxy::new(provider).await.unwrap();
        proxy.wait_for_init().await;
        let err = proxy.call_tool("ghost_ping", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ProxyError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn call_tool_for_context_denies_when_tool_not_enabled() {
        let provider = Arc::new(StaticConfigProvider::new(vec![]));
        let proxy = McpProxy::new(provider).await.unwrap();
        proxy.wait_for_init().await;

        let ctx = ContextStore::new();
        ctx.create_context("work", None, true).unwrap();

        let err = proxy
            .call_tool_for_context("work", "fs_read", serde_json::json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_context_denial());
    }

    #[tokio::test]
    async fn register_slave_client_rejects_duplicate_name() {
        let provider = Arc::new(StaticConfigProvider::new(vec![]));
        let proxy = McpProxy::new(provider).await.unwrap();
        proxy.wait_for_init().await;

        let (ws_tx, _ws_rx) = tokio::sync::mpsc::channel::<tokio_tungstenite::tungstenite::Message>(4);
        let handle = estuary_transport::SlaveConnectionHandle::new("host-a".into(), ws_tx);
        let (notif_tx, _notif_rx) = mpsc::channel(4);
        let client: Arc<dyn ProviderClient> =
            Arc::new(estuary_transport::SlaveProxyClient::new("laptop".into(), handle, notif_tx));
        proxy.register_slave_client("laptop".into(), client.clone()).await.unwrap();
        let err = proxy.register_slave_client("laptop".into(), client).await.unwrap_err();
        assert!(matches!(err, ProxyError::DuplicateProvider(_)));
    }

    #[tokio::test]
    async fn reload_with_unchanged_config_keeps_client_set_and_emits_one_event() {
        let config = stdio_config("fs", true);
        let provider = Arc::new(StaticConfigProvider::new(vec![config]));
        let proxy = McpProxy::new(provider).await.unwrap();
        proxy.wait_for_init().await;

        let before = proxy.get_server_statuses().await;
        proxy.reload().await.unwrap();
        let after = proxy.get_server_statuses().await;
        assert_eq!(before.len(), after.len());
    }
}

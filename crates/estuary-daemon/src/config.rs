//! TOML-backed `ConfigProvider` (SPEC_FULL §1 ambient config section):
//! the concrete file format the proxy's "external config provider" names
//! but does not itself specify. Modeled on `turbomcp-proxy::config`'s
//! tagged-enum style, one level up: this is the whole-daemon document that
//! embeds a `Vec<ProviderConfig>` alongside daemon-only settings.

use async_trait::async_trait;
use estuary_proxy::{ConfigProvider, ProxyError, ProxyResult};
use estuary_types::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{DaemonError, DaemonResult};

/// One initial context definition read from config. Only consulted on the
/// very first run, before any persisted [`estuary_context::ContextSnapshot`]
/// exists — after that, the persisted snapshot is authoritative and these
/// entries are not reapplied (config edits to `[[contexts]]` after day one
/// require deleting the snapshot file, same tradeoff the teacher's
/// TOML-backed backend list makes for already-running proxies).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Settings for attaching this daemon to a master as a slave (spec 4.2.4).
/// Absent entirely when this daemon only ever plays the master role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveModeConfig {
    /// Hostname this daemon claims in its CSR and presents to the master.
    pub hostname: String,
    pub master_host: String,
    pub master_port: u16,
    pub client_cert_path: String,
    pub client_key_path: String,
    pub ca_path: String,
}

/// Bind address for the mutually authenticated slave-attach WebSocket
/// listener (spec 4.2.4). Only meaningful for a daemon acting as a master;
/// absent disables slave attachment entirely.
fn default_control_addr() -> String {
    "127.0.0.1:8787".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Shared secret backing both the client pairing code (spec 4.4.1) and
    /// the value handed back from `/pair`.
    pub api_key: String,
    #[serde(default = "default_control_addr")]
    pub control_addr: String,
    #[serde(default)]
    pub slave_listen_addr: Option<String>,
    #[serde(default)]
    pub slave: Option<SlaveModeConfig>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub contexts: Vec<ContextSeed>,
}

impl DaemonConfig {
    /// A minimal starter document written by `estuaryd init-config`: a
    /// random API key and no providers, so the daemon at least boots and
    /// can be paired with before any provider is added.
    pub fn scaffold() -> Self {
        Self {
            api_key: generate_api_key(),
            control_addr: default_control_addr(),
            slave_listen_addr: None,
            slave: None,
            providers: Vec::new(),
            contexts: vec![ContextSeed {
                name: "default".to_string(),
                description: Some("default context".to_string()),
                is_default: true,
            }],
        }
    }

    pub fn load(path: &Path) -> DaemonResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| DaemonError::ConfigRead { path: path.display().to_string(), source })?;
        toml::from_str(&text)
            .map_err(|source| DaemonError::ConfigParse { path: path.display().to_string(), source: Box::new(source) })
    }

    pub fn save(&self, path: &Path) -> DaemonResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn generate_api_key() -> String {
    (0..32).map(|_| fastrand::alphanumeric()).collect()
}

/// Reads the provider list out of the on-disk config on every call, so
/// `McpProxy::reload` picks up edits made since the daemon started (spec
/// 4.1: "the proxy ... loads once at construction and again on every
/// reload").
pub struct TomlConfigProvider {
    path: PathBuf,
    /// Cached so callers that only need the daemon-level settings (API key,
    /// slave mode, control address) don't have to re-parse the file; only
    /// `load_configs` (the proxy-facing half) re-reads from disk.
    cached: RwLock<DaemonConfig>,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf, initial: DaemonConfig) -> Self {
        Self { path, cached: RwLock::new(initial) }
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        self.cached.read().expect("config lock poisoned").clone()
    }
}

#[async_trait]
impl ConfigProvider for TomlConfigProvider {
    async fn load_configs(&self) -> ProxyResult<Vec<ProviderConfig>> {
        let config = DaemonConfig::load(&self.path)
            .map_err(|err| ProxyError::Config(err.to_string()))?;
        let providers = config.providers.clone();
        *self.cached.write().expect("config lock poisoned") = config;
        Ok(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scaffold_round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estuaryd.toml");
        let config = DaemonConfig::scaffold();
        config.save(&path).unwrap();
        let loaded = DaemonConfig::load(&path).unwrap();
        assert_eq!(loaded.api_key, config.api_key);
        assert_eq!(loaded.contexts.len(), 1);
    }

    #[tokio::test]
    async fn config_provider_reloads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estuaryd.toml");
        let mut config = DaemonConfig::scaffold();
        config.save(&path).unwrap();

        let provider = TomlConfigProvider::new(path.clone(), config.clone());
        assert!(provider.load_configs().await.unwrap().is_empty());

        config.providers.push(ProviderConfig::Stdio {
            name: "fs".into(),
            enabled: true,
            command: "true".into(),
            args: vec![],
            env: Default::default(),
            working_dir: None,
        });
        config.save(&path).unwrap();

        assert_eq!(provider.load_configs().await.unwrap().len(), 1);
    }
}

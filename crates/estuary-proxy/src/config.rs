//! The `ConfigProvider` contract the proxy loads from at construction and on
//! every reload (spec 4.1: "accepts a `ConfigProvider` whose sole operation
//! is `load_configs`"). The concrete TOML-file-backed implementation lives in
//! `estuary-daemon`; this crate only depends on the trait so it stays
//! agnostic of where configs actually come from.

use async_trait::async_trait;
use estuary_types::ProviderConfig;

use crate::error::ProxyResult;

/// Declarative source of provider configs. Implementations must have no side
/// effects beyond reading their backing store — the proxy may call
/// `load_configs` many times over its lifetime (construction, every
/// `reload()`).
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn load_configs(&self) -> ProxyResult<Vec<ProviderConfig>>;
}

/// Fixed in-memory provider, mostly useful for tests and for embedding a
/// proxy whose configs come from somewhere other than a file (e.g. already
/// parsed out of a larger daemon config document).
pub struct StaticConfigProvider {
    configs: Vec<ProviderConfig>,
}

impl StaticConfigProvider {
    pub fn new(configs: Vec<ProviderConfig>) -> Self {
        Self { configs }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn load_configs(&self) -> ProxyResult<Vec<ProviderConfig>> {
        Ok(self.configs.clone())
    }
}

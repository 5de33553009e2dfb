//! MCP proxy core (spec 4.1): owns every live provider client, aggregates
//! their catalogs under name-prefix routing, applies the context filter
//! before listing or forwarding, and fans provider notifications into one
//! bounded channel.

pub mod config;
pub mod error;
pub mod factory;
pub mod registry;

pub use config::{ConfigProvider, StaticConfigProvider};
pub use error::{ProxyError, ProxyResult};
pub use factory::build_client;
pub use registry::{McpProxy, ProxyEvent, TOOLS_LIST_CHANGED};

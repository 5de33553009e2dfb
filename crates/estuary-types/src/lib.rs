//! Shared wire types for the estuary daemon: the JSON-RPC envelope every
//! transport speaks, the tool/resource/prompt catalog shape, provider
//! configuration, status snapshots, and the cross-crate error taxonomy.

pub mod capabilities;
pub mod catalog;
pub mod error;
pub mod jsonrpc;
pub mod provider;
pub mod status;

pub use error::{EstuaryError, EstuaryResult};
pub use jsonrpc::{
    JsonRpcErrorObject, JsonRpcInbound, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponsePayload, JsonRpcVersion, RequestId,
};
pub use catalog::{
    aggregate_prompt, aggregate_resource, aggregate_tool, namespaced_name, namespaced_uri,
    split_namespaced, split_namespaced_uri, AggregatedPrompt, AggregatedResource, AggregatedTool,
    ProviderCatalog, NAME_SEPARATOR, URI_SEPARATOR,
};
pub use provider::{ProviderConfig, ProviderKind, TransportTuning};
pub use status::ProviderStatus;

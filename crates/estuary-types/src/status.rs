//! Status snapshot returned by `get_server_statuses` (spec 4.1): one record
//! per configured provider, live or not.

use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub transport: ProviderKind,
    pub connected: bool,
    pub initializing: bool,
    /// Cached counts from the last successful list; `-1` if never fetched.
    pub tool_count: i64,
    pub resource_count: i64,
    pub prompt_count: i64,
    pub last_error: Option<String>,
    pub init_error: Option<String>,
}

impl ProviderStatus {
    pub fn unfetched(name: String, transport: ProviderKind) -> Self {
        Self {
            name,
            transport,
            connected: false,
            initializing: true,
            tool_count: -1,
            resource_count: -1,
            prompt_count: -1,
            last_error: None,
            init_error: None,
        }
    }
}

//! Context filter: a small relational model of contexts, server membership,
//! and per-tool enable flags that gates catalog visibility and tool-call
//! authority (spec 4.3). Fail-closed: any inability to answer "is this
//! visible" is treated as "no".

use estuary_types::EstuaryError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("context '{0}' does not exist")]
    UnknownContext(String),
    #[error("context '{0}' already exists")]
    AlreadyExists(String),
    #[error("server '{server}' is not a member of context '{context}'")]
    UnknownServerMembership { context: String, server: String },
    #[error("no default context is configured")]
    NoDefaultContext,
}

impl From<ContextError> for EstuaryError {
    fn from(err: ContextError) -> Self {
        EstuaryError::config(err.to_string())
    }
}

pub type ContextResult<T> = Result<T, ContextError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ServerMembership {
    enabled: bool,
    /// `tool_name -> enabled`. A tool with no row is not enabled (spec 4.3:
    /// "a tool row is meaningful only when a corresponding server row
    /// exists").
    tools: HashMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContextRecord {
    description: Option<String>,
    is_default: bool,
    servers: HashMap<String, ServerMembership>,
}

/// In-memory store backing the context filter. `estuary-daemon` is
/// responsible for any on-disk persistence of the same shape; this type only
/// owns the runtime invariants (at most one default, cascading deletes,
/// atomic bulk writes).
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: RwLock<HashMap<String, ContextRecord>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context. If `is_default` is set, clears the flag on
    /// whichever context previously held it (spec 4.3: "at most one
    /// default").
    pub fn create_context(
        &self,
        name: &str,
        description: Option<String>,
        is_default: bool,
    ) -> ContextResult<()> {
        let mut contexts = self.contexts.write();
        if contexts.contains_key(name) {
            return Err(ContextError::AlreadyExists(name.to_string()));
        }
        if is_default {
            for record in contexts.values_mut() {
                record.is_default = false;
            }
        }
        contexts.insert(
            name.to_string(),
            ContextRecord {
                description,
                is_default,
                servers: HashMap::new(),
            },
        );
        Ok(())
    }

    pub fn remove_context(&self, name: &str) -> ContextResult<()> {
        let mut contexts = self.contexts.write();
        contexts
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ContextError::UnknownContext(name.to_string()))
    }

    pub fn context_names(&self) -> Vec<String> {
        self.contexts.read().keys().cloned().collect()
    }

    /// `default_context()`: the one context with `is_default = true`.
    pub fn default_context(&self) -> ContextResult<String> {
        self.contexts
            .read()
            .iter()
            .find(|(_, record)| record.is_default)
            .map(|(name, _)| name.clone())
            .ok_or(ContextError::NoDefaultContext)
    }

    pub fn set_server_enabled(&self, context: &str, server: &str, enabled: bool) -> ContextResult<()> {
        let mut contexts = self.contexts.write();
        let record = contexts
            .get_mut(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        record
            .servers
            .entry(server.to_string())
            .or_default()
            .enabled = enabled;
        Ok(())
    }

    /// Removes a server's membership row, cascading to its tool rows (spec
    /// 4.3: "tool rows for that (context, server) are removed").
    pub fn remove_server(&self, context: &str, server: &str) -> ContextResult<()> {
        let mut contexts = self.contexts.write();
        let record = contexts
            .get_mut(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        record.servers.remove(server);
        Ok(())
    }

    /// `enabled_servers_for(context)`: servers enabled as a group, regardless
    /// of their individual tool rows.
    pub fn enabled_servers_for(&self, context: &str) -> ContextResult<HashSet<String>> {
        let contexts = self.contexts.read();
        let record = contexts
            .get(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        Ok(record
            .servers
            .iter()
            .filter(|(_, membership)| membership.enabled)
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// `is_tool_enabled(context, server, tool)`: true iff the server is
    /// enabled in the context **and** a tool row exists and is enabled.
    /// Absence of the server row means the tool is excluded, not enabled by
    /// default (spec 4.3).
    pub fn is_tool_enabled(&self, context: &str, server: &str, tool: &str) -> ContextResult<bool> {
        let contexts = self.contexts.read();
        let record = contexts
            .get(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        let Some(membership) = record.servers.get(server) else {
            return Ok(false);
        };
        if !membership.enabled {
            return Ok(false);
        }
        Ok(membership.tools.get(tool).copied().unwrap_or(false))
    }

    /// `bulk_set_tools_enabled(context, server, {tool: bool})`: all-or-nothing
    /// (spec 4.3). The server must already be a member; callers call
    /// `set_server_enabled` first.
    pub fn bulk_set_tools_enabled(
        &self,
        context: &str,
        server: &str,
        tools: &HashMap<String, bool>,
    ) -> ContextResult<()> {
        let mut contexts = self.contexts.write();
        let record = contexts
            .get_mut(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        let membership = record
            .servers
            .get_mut(server)
            .ok_or_else(|| ContextError::UnknownServerMembership {
                context: context.to_string(),
                server: server.to_string(),
            })?;
        // HashMap extend is infallible once we've validated the membership
        // row exists; nothing partially applies.
        for (tool, enabled) in tools {
            membership.tools.insert(tool.clone(), *enabled);
        }
        Ok(())
    }

    /// Exports the full relational model for on-disk persistence.
    /// `estuary-daemon` owns the actual file format and write path; this
    /// crate only guarantees the snapshot round-trips through
    /// [`Self::restore`].
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot { contexts: self.contexts.read().clone() }
    }

    /// Replaces the entire in-memory model with a previously exported
    /// snapshot. Intended for daemon startup only, before any client has
    /// observed the store.
    pub fn restore(snapshot: ContextSnapshot) -> Self {
        Self { contexts: RwLock::new(snapshot.contexts) }
    }
}

/// Serializable form of a [`ContextStore`]'s full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    contexts: HashMap<String, ContextRecord>,
}

/// Read-only facade exposing only the three query operations spec 4.3 names,
/// so callers that just need to gate visibility don't also get write access.
pub trait ContextFilter: Send + Sync {
    fn enabled_servers_for(&self, context: &str) -> ContextResult<HashSet<String>>;
    fn is_tool_enabled(&self, context: &str, server: &str, tool: &str) -> ContextResult<bool>;
    fn default_context(&self) -> ContextResult<String>;
}

impl ContextFilter for ContextStore {
    fn enabled_servers_for(&self, context: &str) -> ContextResult<HashSet<String>> {
        ContextStore::enabled_servers_for(self, context)
    }

    fn is_tool_enabled(&self, context: &str, server: &str, tool: &str) -> ContextResult<bool> {
        ContextStore::is_tool_enabled(self, context, server, tool)
    }

    fn default_context(&self) -> ContextResult<String> {
        ContextStore::default_context(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_absent_excludes_all_its_tools() {
        let store = ContextStore::new();
        store.create_context("work", None, false).unwrap();
        assert_eq!(store.enabled_servers_for("work").unwrap(), HashSet::new());
        assert!(!store.is_tool_enabled("work", "A", "A_ping").unwrap());
    }

    #[test]
    fn tool_enabled_requires_both_server_and_tool_rows() {
        let store = ContextStore::new();
        store.create_context("work", None, false).unwrap();
        store.set_server_enabled("work", "A", true).unwrap();
        assert!(!store.is_tool_enabled("work", "A", "A_ping").unwrap());

        let mut tools = HashMap::new();
        tools.insert("A_ping".to_string(), true);
        tools.insert("A_rm".to_string(), false);
        store.bulk_set_tools_enabled("work", "A", &tools).unwrap();

        assert!(store.is_tool_enabled("work", "A", "A_ping").unwrap());
        assert!(!store.is_tool_enabled("work", "A", "A_rm").unwrap());
    }

    #[test]
    fn disabling_server_disables_all_its_tools_as_a_group() {
        let store = ContextStore::new();
        store.create_context("work", None, false).unwrap();
        store.set_server_enabled("work", "A", true).unwrap();
        let mut tools = HashMap::new();
        tools.insert("A_ping".to_string(), true);
        store.bulk_set_tools_enabled("work", "A", &tools).unwrap();
        assert!(store.is_tool_enabled("work", "A", "A_ping").unwrap());

        store.set_server_enabled("work", "A", false).unwrap();
        assert!(!store.is_tool_enabled("work", "A", "A_ping").unwrap());
    }

    #[test]
    fn removing_server_cascades_tool_rows() {
        let store = ContextStore::new();
        store.create_context("work", None, false).unwrap();
        store.set_server_enabled("work", "A", true).unwrap();
        let mut tools = HashMap::new();
        tools.insert("A_ping".to_string(), true);
        store.bulk_set_tools_enabled("work", "A", &tools).unwrap();

        store.remove_server("work", "A").unwrap();
        assert!(!store.is_tool_enabled("work", "A", "A_ping").unwrap());
        assert!(store.enabled_servers_for("work").unwrap().is_empty());

        // The server row is gone entirely, so re-bulk-writing without
        // re-registering membership fails rather than silently recreating it.
        assert!(store.bulk_set_tools_enabled("work", "A", &tools).is_err());
    }

    #[test]
    fn at_most_one_default_context() {
        let store = ContextStore::new();
        store.create_context("work", None, true).unwrap();
        store.create_context("home", None, true).unwrap();
        assert_eq!(store.default_context().unwrap(), "home");
    }

    #[test]
    fn no_default_context_is_an_explicit_error() {
        let store = ContextStore::new();
        store.create_context("work", None, false).unwrap();
        assert_eq!(store.default_context(), Err(ContextError::NoDefaultContext));
    }

    #[test]
    fn bulk_set_is_atomic_on_missing_membership() {
        let store = ContextStore::new();
        store.create_context("work", None, false).unwrap();
        let mut tools = HashMap::new();
        tools.insert("A_ping".to_string(), true);
        let err = store.bulk_set_tools_enabled("work", "A", &tools).unwrap_err();
        assert!(matches!(err, ContextError::UnknownServerMembership { .. }));
        assert!(!store.is_tool_enabled("work", "A", "A_ping").unwrap());
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let store = ContextStore::new();
        store.create_context("work", Some("desc".to_string()), true).unwrap();
        store.set_server_enabled("work", "A", true).unwrap();
        let mut tools = HashMap::new();
        tools.insert("A_ping".to_string(), true);
        store.bulk_set_tools_enabled("work", "A", &tools).unwrap();

        let restored = ContextStore::restore(store.snapshot());
        assert_eq!(restored.default_context().unwrap(), "work");
        assert!(restored.is_tool_enabled("work", "A", "A_ping").unwrap());
    }
}

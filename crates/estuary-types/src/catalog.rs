//! Catalog types: the tool/resource/prompt descriptors a provider advertises,
//! and the namespaced form the aggregate proxy exposes to its own clients.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolInputSchema {
    #[serde(rename = "type", default = "schema_object_type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

fn schema_object_type() -> String {
    "object".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// Per-provider catalog snapshot, cached by the proxy core and refreshed on
/// `list_changed` notifications or explicit reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCatalog {
    pub tools: Vec<Tool>,
    pub resources: Vec<Resource>,
    pub resource_templates: Vec<ResourceTemplate>,
    pub prompts: Vec<Prompt>,
}

/// Separator used when namespacing a provider-local name into the
/// aggregate catalog (`<provider>_<tool>`, `<provider>://<uri>` for
/// resources whose own URI carries its own scheme already).
pub const NAME_SEPARATOR: char = '_';

/// Join a provider name and a local tool/prompt name into its aggregate form.
pub fn namespaced_name(provider: &str, local: &str) -> String {
    format!("{provider}{NAME_SEPARATOR}{local}")
}

/// Split an aggregate name back into `(provider, local)` using the longest
/// registered provider-name prefix. Callers pass the known provider names so
/// that a provider name containing the separator itself still resolves
/// unambiguously.
pub fn split_namespaced<'a>(aggregate: &'a str, known_providers: &[String]) -> Option<(&'a str, &'a str)> {
    known_providers
        .iter()
        .filter(|p| aggregate.starts_with(p.as_str()) && aggregate.as_bytes().get(p.len()) == Some(&(NAME_SEPARATOR as u8)))
        .max_by_key(|p| p.len())
        .map(|p| {
            let (provider, rest) = aggregate.split_at(p.len());
            (provider, &rest[1..])
        })
}

/// Scheme separator used for resource URIs, which already carry a scheme of
/// their own (`file://`, `s3://`, ...), so the provider namespace is itself a
/// scheme (`<provider>://<local-uri>`) rather than a plain prefix.
pub const URI_SEPARATOR: &str = "://";

pub fn namespaced_uri(provider: &str, local_uri: &str) -> String {
    format!("{provider}{URI_SEPARATOR}{local_uri}")
}

/// Same longest-match resolution as [`split_namespaced`], for resource URIs.
pub fn split_namespaced_uri<'a>(aggregate: &'a str, known_providers: &[String]) -> Option<(&'a str, &'a str)> {
    let prefix_len = |p: &str| p.len() + URI_SEPARATOR.len();
    known_providers
        .iter()
        .filter(|p| aggregate.starts_with(p.as_str()) && aggregate[p.len()..].starts_with(URI_SEPARATOR))
        .max_by_key(|p| p.len())
        .map(|p| aggregate.split_at(prefix_len(p)))
}

/// A tool as returned by an aggregate listing: the provider's declared
/// metadata plus the two synthetic fields the core adds (spec 3): the
/// namespaced name, and a `_server` back-reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedTool {
    #[serde(flatten)]
    pub tool: Tool,
    #[serde(rename = "_server")]
    pub server: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedPrompt {
    #[serde(flatten)]
    pub prompt: Prompt,
    #[serde(rename = "_server")]
    pub server: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResource {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(rename = "_server")]
    pub server: String,
}

pub fn aggregate_tool(server: &str, mut tool: Tool) -> AggregatedTool {
    tool.name = namespaced_name(server, &tool.name);
    AggregatedTool { tool, server: server.to_string() }
}

pub fn aggregate_prompt(server: &str, mut prompt: Prompt) -> AggregatedPrompt {
    prompt.name = namespaced_name(server, &prompt.name);
    AggregatedPrompt { prompt, server: server.to_string() }
}

pub fn aggregate_resource(server: &str, mut resource: Resource) -> AggregatedResource {
    resource.uri = namespaced_uri(server, &resource.uri);
    AggregatedResource { resource, server: server.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_name_joins_with_separator() {
        assert_eq!(namespaced_name("fs", "read_file"), "fs_read_file");
    }

    #[test]
    fn split_namespaced_picks_longest_matching_provider() {
        let known = vec!["fs".to_string(), "fs_extra".to_string()];
        let (provider, local) = split_namespaced("fs_extra_copy_tree", &known).unwrap();
        assert_eq!(provider, "fs_extra");
        assert_eq!(local, "copy_tree");
    }

    #[test]
    fn split_namespaced_returns_none_for_unknown_provider() {
        let known = vec!["fs".to_string()];
        assert!(split_namespaced("other_tool", &known).is_none());
    }

    #[test]
    fn namespaced_uri_joins_with_scheme_separator() {
        assert_eq!(namespaced_uri("docs", "file:///readme.md"), "docs://file:///readme.md");
    }

    #[test]
    fn split_namespaced_uri_picks_longest_matching_provider() {
        let known = vec!["docs".to_string(), "docs_internal".to_string()];
        let (provider, local) = split_namespaced_uri("docs_internal://spec.md", &known).unwrap();
        assert_eq!(provider, "docs_internal");
        assert_eq!(local, "spec.md");
    }

    #[test]
    fn aggregate_tool_prefixes_name_and_sets_server() {
        let tool = Tool {
            name: "read_file".to_string(),
            title: None,
            description: None,
            input_schema: ToolInputSchema::default(),
            annotations: None,
        };
        let aggregated = aggregate_tool("fs", tool);
        assert_eq!(aggregated.tool.name, "fs_read_file");
        assert_eq!(aggregated.server, "fs");
    }
}

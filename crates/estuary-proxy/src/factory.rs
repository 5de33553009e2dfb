//! Builds a concrete [`ProviderClient`] from a [`ProviderConfig`] (spec 4.1:
//! "The proxy opens one transport client per enabled entry"). Remote-slave
//! providers are excluded here — they never come from a static config entry,
//! they're registered dynamically as a slave daemon attaches over WebSocket
//! (spec 4.1: `register_slave_client`); see DESIGN.md for the reasoning.

use estuary_transport::core::{NotificationSender, ProviderClient};
use estuary_transport::{HttpClientTransport, HttpTuning, SseClient, SseTuning, StdioClient};
use estuary_types::provider::TransportTuning;
use estuary_types::ProviderConfig;
use std::sync::Arc;

use crate::error::{ProxyError, ProxyResult};

pub fn build_client(
    config: &ProviderConfig,
    tuning: &TransportTuning,
    notifications: NotificationSender,
) -> ProxyResult<Arc<dyn ProviderClient>> {
    match config {
        ProviderConfig::Stdio { name, command, args, env, working_dir, .. } => {
            Ok(Arc::new(StdioClient::new(
                name.clone(),
                command.clone(),
                args.clone(),
                env.clone(),
                working_dir.clone(),
                tuning.request_timeout,
                notifications,
            )))
        }
        ProviderConfig::Sse { name, url, headers, auth_token, .. } => {
            let base_url = url::Url::parse(url)
                .map_err(|e| ProxyError::Config(format!("provider '{name}': invalid url: {e}")))?;
            let sse_tuning = SseTuning {
                default_timeout: tuning.request_timeout,
                initialize_timeout: std::time::Duration::from_secs(10),
                list_tools_timeout: std::time::Duration::from_secs(5),
                reconnect: estuary_transport::resilience::ReconnectPolicy {
                    initial_delay: tuning.initial_reconnect_delay,
                    max_delay: tuning.max_reconnect_delay,
                    backoff_factor: 2.0,
                    max_attempts: tuning.max_reconnect_attempts,
                },
            };
            Ok(Arc::new(SseClient::new(
                name.clone(),
                base_url,
                headers.clone(),
                auth_token.clone(),
                sse_tuning,
                notifications,
            )))
        }
        ProviderConfig::Http { name, url, headers, auth_token, .. } => {
            let endpoint = url::Url::parse(url)
                .map_err(|e| ProxyError::Config(format!("provider '{name}': invalid url: {e}")))?;
            let http_tuning = HttpTuning {
                default_timeout: tuning.request_timeout,
                initialize_timeout: std::time::Duration::from_secs(10),
                list_tools_timeout: std::time::Duration::from_secs(5),
                retry: estuary_transport::resilience::ReconnectPolicy {
                    initial_delay: tuning.initial_reconnect_delay,
                    max_delay: tuning.max_reconnect_delay,
                    backoff_factor: 2.0,
                    max_attempts: Some(3),
                },
            };
            Ok(Arc::new(HttpClientTransport::new(
                name.clone(),
                endpoint,
                headers.clone(),
                auth_token.clone(),
                http_tuning,
                notifications,
            )))
        }
        ProviderConfig::Remote { name, .. } => Err(ProxyError::Config(format!(
            "provider '{name}': remote-slave providers attach dynamically, not via config startup"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn remote_config_is_rejected_by_the_static_factory() {
        let config = ProviderConfig::Remote {
            name: "laptop".into(),
            enabled: true,
            hostname: "laptop.local".into(),
            port: 7443,
            client_cert_path: "/tmp/cert.pem".into(),
            client_key_path: "/tmp/key.pem".into(),
            ca_path: "/tmp/ca.pem".into(),
        };
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let err = build_client(&config, &TransportTuning::default(), tx).unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[test]
    fn stdio_config_builds_a_client() {
        let config = ProviderConfig::Stdio {
            name: "fs".into(),
            enabled: true,
            command: "true".into(),
            args: vec![],
            env: HashMap::new(),
            working_dir: None,
        };
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let client = build_client(&config, &TransportTuning::default(), tx).unwrap();
        assert_eq!(client.name(), "fs");
    }
}

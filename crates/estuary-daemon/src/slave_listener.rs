//! Master-side accept loop for the slave-attach WebSocket (spec 4.2.4): TLS
//! accept, handing the established stream to `estuary-transport::remote`'s
//! connection plumbing, and registering/unregistering the resulting
//! provider client with the `McpProxy`. This is the "server plumbing"
//! `estuary-transport::remote` explicitly leaves to whoever owns the
//! listener.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock as StdRwLock};

use estuary_pairing::EnrollmentStore;
use estuary_proxy::McpProxy;
use estuary_transport::core::{NotificationSender, ProviderClient};
use estuary_transport::remote::{SlaveConnectionHandle, SlaveProxyClient};
use futures::{SinkExt, StreamExt};
use rustls::pki_types::CertificateDer;
use rustls_pemfile::certs;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::error::{DaemonError, DaemonResult};
use crate::tls::{build_server_tls_config, load_server_identity};

const STALE_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

/// Rebuilds the revoked-DER set from the enrollment store's current
/// revocation list, matched against each revoked hostname's last-issued
/// certificate (spec 4.4.2: revocation keys off `(host_id, cert_serial)`,
/// resolved here to the raw bytes the TLS verifier can actually compare).
fn revoked_der_set(enrollment: &EnrollmentStore) -> HashSet<Vec<u8>> {
    let revoked = enrollment.revoked_credentials();
    let slaves = enrollment.slaves();
    revoked
        .iter()
        .filter_map(|r| slaves.iter().find(|s| s.hostname == r.hostname && s.cert_serial == r.cert_serial))
        .filter_map(|slave| {
            certs(&mut slave.certificate_pem.as_bytes())
                .next()
                .and_then(Result::ok)
                .map(|der: CertificateDer<'static>| der.as_ref().to_vec())
        })
        .collect()
}

pub struct SlaveListener {
    proxy: Arc<McpProxy>,
    enrollment: Arc<EnrollmentStore>,
    notifications: NotificationSender,
    ca_cert_path: PathBuf,
    ca_key_path: PathBuf,
}

impl SlaveListener {
    pub fn new(
        proxy: Arc<McpProxy>,
        enrollment: Arc<EnrollmentStore>,
        notifications: NotificationSender,
        ca_cert_path: PathBuf,
        ca_key_path: PathBuf,
    ) -> Self {
        Self { proxy, enrollment, notifications, ca_cert_path, ca_key_path }
    }

    /// Runs forever: periodically refreshes the revocation set, accepts TLS
    /// connections, and spawns one handler task per slave.
    pub async fn run(self: Arc<Self>, bind_addr: &str) -> DaemonResult<()> {
        let revoked_der = Arc::new(StdRwLock::new(revoked_der_set(&self.enrollment)));

        let ca_der = certs(&mut BufReaderFile::open(&self.ca_cert_path)?)
            .next()
            .and_then(Result::ok)
            .ok_or_else(|| DaemonError::Tls("CA certificate file is empty or unreadable".to_string()))?;
        let (server_cert_chain, server_key) = load_server_identity(&self.ca_cert_path, &self.ca_key_path)?;

        let tls_config = build_server_tls_config(ca_der, server_cert_chain, server_key, revoked_der.clone())?;
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let listener = TcpListener::bind(bind_addr).await.map_err(DaemonError::Io)?;
        info!(addr = %bind_addr, "slave-attach listener bound");

        {
            let this = self.clone();
            let revoked_der = revoked_der.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(STALE_SWEEP_INTERVAL).await;
                    *revoked_der.write().expect("revocation lock poisoned") = revoked_der_set(&this.enrollment);
                }
            });
        }

        loop {
            let (tcp, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(%err, "slave-attach accept failed");
                    continue;
                }
            };
            let acceptor = acceptor.clone();
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(err) = this.handle_connection(tcp, acceptor).await {
                    warn!(%peer, %err, "slave-attach connection ended with error");
                }
            });
        }
    }

    async fn handle_connection(
        &self,
        tcp: tokio::net::TcpStream,
        acceptor: TlsAcceptor,
    ) -> DaemonResult<()> {
        let tls_stream = acceptor.accept(tcp).await.map_err(DaemonError::Io)?;
        let ws_stream = tokio_tungstenite::accept_async(tls_stream)
            .await
            .map_err(|e| DaemonError::Tls(format!("websocket upgrade failed: {e}")))?;
        let (mut write, mut read) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(32);

        // First frame must be the slave's `estuary/advertise` notification;
        // it carries the hostname we register the provider under.
        let Some(Ok(Message::Text(first))) = read.next().await else {
            return Err(DaemonError::Tls("slave did not advertise on connect".to_string()));
        };
        let hostname = serde_json::from_str::<serde_json::Value>(&first)
            .ok()
            .and_then(|v| v.get("params")?.get("hostname")?.as_str().map(str::to_string))
            .ok_or_else(|| DaemonError::Tls("advertise message missing hostname".to_string()))?;

        if !self.enrollment.slaves().iter().any(|s| s.hostname == hostname) {
            return Err(DaemonError::Tls(format!("'{hostname}' is not an enrolled slave")));
        }

        let handle = SlaveConnectionHandle::new(hostname.clone(), outbound_tx);
        handle.on_inbound(&first).await;

        let writer_task = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
        });

        let client = Arc::new(SlaveProxyClient::new(hostname.clone(), handle.clone(), self.notifications.clone()));
        self.proxy
            .register_slave_client(hostname.clone(), client.clone() as Arc<dyn ProviderClient>)
            .await
            .map_err(DaemonError::Proxy)?;
        info!(hostname = %hostname, "slave attached");

        let stale_watch = {
            let handle = handle.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(STALE_SWEEP_INTERVAL).await;
                    if handle.is_stale() {
                        handle.mark_disconnected();
                        break;
                    }
                }
            })
        };

        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => handle.on_inbound(&text).await,
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }

        handle.mark_disconnected();
        stale_watch.abort();
        writer_task.abort();
        if let Err(err) = self.proxy.unregister_slave_client(&hostname).await {
            warn!(hostname = %hostname, %err, "failed to unregister slave on disconnect");
        }
        info!(hostname = %hostname, "slave detached");
        Ok(())
    }
}

/// Small helper so both cert-chain reads above can share one `BufReader`
/// constructor without importing `std::io::BufReader` twice at call sites.
struct BufReaderFile;

impl BufReaderFile {
    fn open(path: &std::path::Path) -> DaemonResult<std::io::BufReader<std::fs::File>> {
        Ok(std::io::BufReader::new(std::fs::File::open(path).map_err(DaemonError::Io)?))
    }
}

//! TLS plumbing for the mutually authenticated slave transport (spec 4.2.4,
//! SPEC_FULL §4.4 CSR/cert issuance): loading a slave's own client identity
//! off disk, and the master-side `rustls` server config whose client-cert
//! verifier also consults the revocation list (spec 4.4.2: "revocation is
//! recorded in a list consulted by the TLS verifier").

use estuary_transport::remote::SlaveTlsIdentity;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::server::WebPkiClientVerifier;
use rustls::{DigitallySignedStruct, DistinguishedName, RootCertStore, ServerConfig, SignatureScheme};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{DaemonError, DaemonResult};

fn load_certs(path: &Path) -> DaemonResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(DaemonError::Io)?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DaemonError::Tls(format!("reading certs from {}: {e}", path.display())))
}

fn load_private_key(path: &Path) -> DaemonResult<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(DaemonError::Io)?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| DaemonError::Tls(format!("reading key from {}: {e}", path.display())))?
        .ok_or_else(|| DaemonError::Tls(format!("no private key found in {}", path.display())))
}

/// Loads the three files a slave writes to its config dir once enrollment
/// completes (spec 4.4.2 step 3: "writes the three files ... into its
/// config dir").
pub fn load_slave_identity(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
) -> DaemonResult<SlaveTlsIdentity> {
    let client_cert_chain = load_certs(cert_path)?;
    let client_key = load_private_key(key_path)?;
    let ca_cert = load_certs(ca_path)?
        .into_iter()
        .next()
        .ok_or_else(|| DaemonError::Tls(format!("no CA certificate found in {}", ca_path.display())))?;
    Ok(SlaveTlsIdentity { client_cert_chain, client_key, ca_cert })
}

/// Wraps the standard WebPKI client-cert verifier and additionally rejects
/// any end-entity certificate whose raw DER bytes appear in the live
/// revocation set. The set is swapped out wholesale on every
/// `EnrollmentStore::revoke` so in-flight handshakes never race a stale
/// copy for long (spec 4.4.2: "a revoked slave is disconnected on its next
/// heartbeat cycle" — this additionally blocks a *new* handshake attempt
/// immediately).
#[derive(Debug)]
struct RevocationAwareVerifier {
    inner: Arc<dyn ClientCertVerifier>,
    revoked_der: Arc<RwLock<HashSet<Vec<u8>>>>,
}

impl ClientCertVerifier for RevocationAwareVerifier {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: rustls::pki_types::UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        if self.revoked_der.read().expect("revocation lock poisoned").contains(end_entity.as_ref()) {
            return Err(rustls::Error::General("slave certificate has been revoked".to_string()));
        }
        self.inner.verify_client_cert(end_entity, intermediates, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Loads the master's own CA cert/key as its server-presented identity. The
/// master has no separate leaf certificate of its own (spec 4.4.2 only
/// describes the CA issuing *slave* certificates); reusing the
/// self-signed CA pair as the server's leaf is a deliberate simplification
/// documented in DESIGN.md rather than inventing a leaf-issuance step the
/// CSR-signing API the CA already exposes has no counterpart for.
pub fn load_server_identity(ca_cert_path: &Path, ca_key_path: &Path) -> DaemonResult<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let chain = load_certs(ca_cert_path)?;
    let key = load_private_key(ca_key_path)?;
    Ok((chain, key))
}

/// Builds the master's server-side TLS config: requires a client cert
/// signed by `ca_cert_pem`, presents `server_cert`/`server_key` (the same
/// CA-signed pair the master uses for itself), and consults
/// `revoked_der` live on every handshake.
pub fn build_server_tls_config(
    ca_cert: CertificateDer<'static>,
    server_cert_chain: Vec<CertificateDer<'static>>,
    server_key: PrivateKeyDer<'static>,
    revoked_der: Arc<RwLock<HashSet<Vec<u8>>>>,
) -> DaemonResult<ServerConfig> {
    let mut roots = RootCertStore::empty();
    roots.add(ca_cert).map_err(|e| DaemonError::Tls(e.to_string()))?;
    let roots = Arc::new(roots);

    let inner = WebPkiClientVerifier::builder(roots.clone())
        .build()
        .map_err(|e| DaemonError::Tls(e.to_string()))?;
    let verifier = Arc::new(RevocationAwareVerifier { inner, revoked_der });

    ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(server_cert_chain, server_key)
        .map_err(|e| DaemonError::Tls(e.to_string()))
}

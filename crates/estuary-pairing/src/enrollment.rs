//! Slave enrollment (spec 4.4.2): a three-actor flow between a slave
//! machine, the master, and a human operator. The master holds a CA
//! keypair, accepts CSRs behind a 6-digit pairing code, and on operator
//! approval signs a certificate the slave uses to open its WebSocket
//! remote-mode connection (see `estuary-transport::remote`).

use chrono::{DateTime, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DnType, IsCa, KeyPair,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{PairingError, PairingResult};

/// Lifetime of an unclaimed pairing request before it's dropped on the next
/// read (spec 4.4.2 step 5: "expiry is asynchronous ... entries past
/// `expires_at` are dropped").
pub const PENDING_REQUEST_TTL_SECS: i64 = 10 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PairingRequestState {
    Pending,
    Approved,
    Denied,
}

/// One slave's outstanding CSR submission (spec 4.4.2 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingRequest {
    pub hostname: String,
    pub csr_pem: String,
    pub platform: String,
    pub pairing_code: String,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: PairingRequestState,
    /// Filled in by `approve`; the slave reads these on its next poll.
    pub certificate_pem: Option<String>,
    pub ca_cert_pem: Option<String>,
}

impl PairingRequest {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A slave the master has enrolled and (transiently) connected to (spec
/// 4.4.2 step 3: "record a `Slave` row with the new serial").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveRecord {
    pub hostname: String,
    pub cert_serial: String,
    pub platform: String,
    pub issued_at: DateTime<Utc>,
    /// The signed leaf certificate, kept so the WebSocket listener's TLS
    /// verifier can match a presented certificate's raw DER bytes against
    /// the revocation list without needing an X.509-parsing dependency.
    pub certificate_pem: String,
}

/// A revoked credential consulted by the TLS client-cert verifier on every
/// WebSocket handshake (spec 4.4.2: "revocation is recorded in a list
/// consulted by the TLS verifier").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedCredential {
    pub hostname: String,
    pub cert_serial: String,
    pub revoked_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Persisted self-signed CA used to sign slave certificates. The private
/// key never leaves this process; only `ca_cert_pem` is ever handed out.
pub struct CertificateAuthority {
    cert: rcgen::Certificate,
    key_pair: KeyPair,
}

impl CertificateAuthority {
    /// Loads a CA keypair from `cert_path`/`key_path` if both exist,
    /// otherwise generates a fresh self-signed CA and persists it there.
    /// Grounded on the other retrieval-pack gateways that mint their own CA
    /// on first run rather than requiring an operator to provide one.
    pub fn load_or_generate(cert_path: &Path, key_path: &Path) -> PairingResult<Self> {
        if cert_path.exists() && key_path.exists() {
            let cert_pem = std::fs::read_to_string(cert_path)?;
            let key_pem = std::fs::read_to_string(key_path)?;
            let key_pair = KeyPair::from_pem(&key_pem)
                .map_err(|e| PairingError::CaUnavailable(format!("ca key: {e}")))?;
            let params = CertificateParams::from_ca_cert_pem(&cert_pem)
                .map_err(|e| PairingError::CaUnavailable(format!("ca cert: {e}")))?;
            let cert = params
                .self_signed(&key_pair)
                .map_err(|e| PairingError::CaUnavailable(format!("ca re-sign: {e}")))?;
            return Ok(Self { cert, key_pair });
        }

        let key_pair = KeyPair::generate()
            .map_err(|e| PairingError::CaUnavailable(format!("ca keygen: {e}")))?;
        let mut params = CertificateParams::new(Vec::<String>::new())
            .map_err(|e| PairingError::CaUnavailable(format!("ca params: {e}")))?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, "estuary master CA");
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| PairingError::CaUnavailable(format!("ca self-sign: {e}")))?;

        if let Some(parent) = cert_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(cert_path, cert.pem())?;
        std::fs::write(key_path, key_pair.serialize_pem())?;

        Ok(Self { cert, key_pair })
    }

    pub fn ca_cert_pem(&self) -> String {
        self.cert.pem()
    }

    /// Parses an incoming CSR, checks its `CN` matches the hostname the
    /// slave claimed when it submitted the pairing request, and signs it.
    /// Returns the signed leaf certificate's PEM.
    pub fn sign_csr(&self, csr_pem: &str, expected_cn: &str) -> PairingResult<String> {
        let csr = CertificateSigningRequestParams::from_pem(csr_pem)
            .map_err(|e| PairingError::InvalidCsr(e.to_string()))?;

        let common_name = csr.params.distinguished_name.get(&DnType::CommonName);
        let matches_hostname = common_name
            .map(|value| value.to_string() == expected_cn)
            .unwrap_or(false);
        if !matches_hostname {
            return Err(PairingError::InvalidCsr(format!(
                "csr CN does not match claimed hostname '{expected_cn}'"
            )));
        }

        let cert = csr
            .signed_by(&self.cert, &self.key_pair)
            .map_err(|e| PairingError::InvalidCsr(e.to_string()))?;
        Ok(cert.pem())
    }
}

/// What a slave sees on `GET /slaves/pair/{code}` (spec 4.4.2 step 3-4).
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Pending,
    Approved { certificate_pem: String, ca_cert_pem: String },
    Denied,
}

/// In-memory enrollment state: pending requests, enrolled slaves, and the
/// revocation list. `estuary-daemon` owns persisting the slave/revoked
/// rows across restarts; this type owns the runtime invariants.
pub struct EnrollmentStore {
    ca: CertificateAuthority,
    pending: RwLock<HashMap<String, PairingRequest>>,
    slaves: RwLock<HashMap<String, SlaveRecord>>,
    revoked: RwLock<Vec<RevokedCredential>>,
}

impl EnrollmentStore {
    pub fn new(ca: CertificateAuthority) -> Self {
        Self {
            ca,
            pending: RwLock::new(HashMap::new()),
            slaves: RwLock::new(HashMap::new()),
            revoked: RwLock::new(Vec::new()),
        }
    }

    pub fn ca_cert_pem(&self) -> String {
        self.ca.ca_cert_pem()
    }

    /// Drops any pending request past its TTL. Called on every read, per
    /// spec 4.4.2 step 5 ("expiry is asynchronous").
    fn sweep_expired(&self, now: DateTime<Utc>) {
        let mut pending = self.pending.write().expect("enrollment lock poisoned");
        pending.retain(|_, req| !req.is_expired(now));
    }

    /// Slave submits a CSR (spec 4.4.2 step 1). Overwrites any earlier
    /// pending request for the same hostname, minting a fresh code.
    pub fn submit_csr(
        &self,
        hostname: &str,
        csr_pem: &str,
        platform: &str,
        now: DateTime<Utc>,
    ) -> PairingRequest {
        self.sweep_expired(now);
        let pairing_code = mint_display_code();
        let request = PairingRequest {
            hostname: hostname.to_string(),
            csr_pem: csr_pem.to_string(),
            platform: platform.to_string(),
            pairing_code,
            requested_at: now,
            expires_at: now + chrono::Duration::seconds(PENDING_REQUEST_TTL_SECS),
            state: PairingRequestState::Pending,
            certificate_pem: None,
            ca_cert_pem: None,
        };
        self.pending
            .write()
            .expect("enrollment lock poisoned")
            .insert(hostname.to_string(), request.clone());
        request
    }

    /// `GET /slaves/pending` (spec 4.4.2 step 2).
    pub fn pending_requests(&self, now: DateTime<Utc>) -> Vec<PairingRequest> {
        self.sweep_expired(now);
        let pending = self.pending.read().expect("enrollment lock poisoned");
        let mut requests: Vec<_> = pending
            .values()
            .filter(|r| r.state == PairingRequestState::Pending)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        requests
    }

    /// Slave's poll loop (spec 4.4.2 steps 3-4). Looked up by code since the
    /// slave only ever learned its own code, not its pending-table key.
    pub fn poll(&self, pairing_code: &str, now: DateTime<Utc>) -> PairingResult<PollOutcome> {
        self.sweep_expired(now);
        let pending = self.pending.read().expect("enrollment lock poisoned");
        let request = pending
            .values()
            .find(|r| r.pairing_code == pairing_code)
            .ok_or_else(|| PairingError::InvalidCode)?;
        match request.state {
            PairingRequestState::Pending => Ok(PollOutcome::Pending),
            PairingRequestState::Denied => Ok(PollOutcome::Denied),
            PairingRequestState::Approved => Ok(PollOutcome::Approved {
                certificate_pem: request.certificate_pem.clone().unwrap_or_default(),
                ca_cert_pem: request.ca_cert_pem.clone().unwrap_or_default(),
            }),
        }
    }

    /// Operator approval (spec 4.4.2 step 3). Validates the pairing code
    /// out-of-band verification is the operator's job, not ours; we only
    /// check that `hostname`/`pairing_code` still refer to a live pending
    /// request, sign the CSR, and record the new slave.
    pub fn approve(
        &self,
        hostname: &str,
        pairing_code: &str,
        now: DateTime<Utc>,
    ) -> PairingResult<(String, String)> {
        self.sweep_expired(now);
        let mut pending = self.pending.write().expect("enrollment lock poisoned");
        let request = pending
            .get_mut(hostname)
            .ok_or_else(|| PairingError::UnknownPendingRequest(hostname.to_string()))?;
        if request.pairing_code != pairing_code {
            return Err(PairingError::InvalidCode);
        }
        if request.is_expired(now) {
            return Err(PairingError::RequestExpired(hostname.to_string()));
        }

        let certificate_pem = self.ca.sign_csr(&request.csr_pem, hostname)?;
        let ca_cert_pem = self.ca.ca_cert_pem();
        let cert_serial = Uuid::new_v4().to_string();

        request.state = PairingRequestState::Approved;
        request.certificate_pem = Some(certificate_pem.clone());
        request.ca_cert_pem = Some(ca_cert_pem.clone());

        self.slaves.write().expect("enrollment lock poisoned").insert(
            hostname.to_string(),
            SlaveRecord {
                hostname: hostname.to_string(),
                cert_serial,
                platform: request.platform.clone(),
                issued_at: now,
                certificate_pem: certificate_pem.clone(),
            },
        );

        Ok((certificate_pem, ca_cert_pem))
    }

    /// Operator denial (spec 4.4.2 step 4).
    pub fn deny(&self, hostname: &str, pairing_code: &str) -> PairingResult<()> {
        let mut pending = self.pending.write().expect("enrollment lock poisoned");
        let request = pending
            .get_mut(hostname)
            .ok_or_else(|| PairingError::UnknownPendingRequest(hostname.to_string()))?;
        if request.pairing_code != pairing_code {
            return Err(PairingError::InvalidCode);
        }
        request.state = PairingRequestState::Denied;
        Ok(())
    }

    /// Adds `hostname`'s current credential to the revocation list so the
    /// TLS verifier rejects it on the next handshake (spec 4.4.2, and the
    /// "TODO" in the teacher's source noted in spec 9 as a bug to fix).
    pub fn revoke(&self, hostname: &str, reason: Option<String>) -> PairingResult<()> {
        let slaves = self.slaves.read().expect("enrollment lock poisoned");
        let slave = slaves
            .get(hostname)
            .ok_or_else(|| PairingError::UnknownSlave(hostname.to_string()))?;
        self.revoked.write().expect("enrollment lock poisoned").push(RevokedCredential {
            hostname: slave.hostname.clone(),
            cert_serial: slave.cert_serial.clone(),
            revoked_at: Utc::now(),
            reason,
        });
        Ok(())
    }

    pub fn revoked_credentials(&self) -> Vec<RevokedCredential> {
        self.revoked.read().expect("enrollment lock poisoned").clone()
    }

    pub fn is_revoked(&self, cert_serial: &str) -> bool {
        self.revoked
            .read()
            .expect("enrollment lock poisoned")
            .iter()
            .any(|r| r.cert_serial == cert_serial)
    }

    pub fn slaves(&self) -> Vec<SlaveRecord> {
        self.slaves.read().expect("enrollment lock poisoned").values().cloned().collect()
    }

    /// Exports the enrolled-slave and revocation rows for on-disk
    /// persistence. Pending (in-flight) requests are deliberately excluded —
    /// they're short-lived and re-derivable by the slave resubmitting its CSR.
    pub fn export_state(&self) -> EnrollmentSnapshot {
        EnrollmentSnapshot {
            slaves: self.slaves(),
            revoked: self.revoked_credentials(),
        }
    }

    /// Seeds enrolled-slave and revocation rows from a prior
    /// [`Self::export_state`]. Intended for daemon startup only.
    pub fn import_state(&self, snapshot: EnrollmentSnapshot) {
        let mut slaves = self.slaves.write().expect("enrollment lock poisoned");
        for slave in snapshot.slaves {
            slaves.insert(slave.hostname.clone(), slave);
        }
        drop(slaves);
        *self.revoked.write().expect("enrollment lock poisoned") = snapshot.revoked;
    }
}

/// Serializable form of the durable parts of [`EnrollmentStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub slaves: Vec<SlaveRecord>,
    pub revoked: Vec<RevokedCredential>,
}

/// 6-digit operator-facing code for a pending enrollment request. Unlike
/// the client pairing code (`code.rs`), this one has no time-derived
/// structure; it's a one-shot random token the operator compares visually
/// against what the slave displays (spec 4.4.2 step 2).
fn mint_display_code() -> String {
    let value = fastrand::u32(0..1_000_000);
    format!("{:03}-{:03}", value / 1000, value % 1000)
}


impl std::fmt::Debug for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Pending => write!(f, "Pending"),
            PollOutcome::Approved { .. } => write!(f, "Approved"),
            PollOutcome::Denied => write!(f, "Denied"),
        }
    }
}

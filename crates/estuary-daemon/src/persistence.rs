//! On-disk persistence for the two in-memory stores that explicitly defer
//! durability to this crate: [`estuary_context::ContextStore`] and the
//! enrolled-slave/revocation rows of [`estuary_pairing::EnrollmentStore`].
//! Plain JSON files under the config dir, read once at startup and written
//! back after every mutation that matters across a restart.

use estuary_context::{ContextSnapshot, ContextStore};
use estuary_pairing::EnrollmentSnapshot;
use std::path::Path;
use tracing::warn;

pub fn load_context_store(path: &Path) -> ContextStore {
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<ContextSnapshot>(&text) {
            Ok(snapshot) => {
                tracing::info!(path = %path.display(), "loaded persisted context snapshot");
                return ContextStore::restore(snapshot);
            }
            Err(err) => warn!(path = %path.display(), %err, "discarding unreadable context snapshot"),
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "failed to read context snapshot"),
    }
    ContextStore::new()
}

pub fn save_context_store(path: &Path, store: &ContextStore) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(&store.snapshot())
        .expect("ContextSnapshot serialization is infallible");
    std::fs::write(path, text)
}

pub fn load_enrollment_snapshot(path: &Path) -> EnrollmentSnapshot {
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(snapshot) => {
                tracing::info!(path = %path.display(), "loaded persisted enrollment snapshot");
                snapshot
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "discarding unreadable enrollment snapshot");
                EnrollmentSnapshot::default()
            }
        },
        Err(_) => EnrollmentSnapshot::default(),
    }
}

pub fn save_enrollment_snapshot(path: &Path, snapshot: &EnrollmentSnapshot) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text =
        serde_json::to_string_pretty(snapshot).expect("EnrollmentSnapshot serialization is infallible");
    std::fs::write(path, text)
}

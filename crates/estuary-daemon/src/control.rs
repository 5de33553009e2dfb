//! Daemon-wide HTTP surface: nests the pairing router (spec 6) under the
//! same axum `Router` as a couple of daemon-only status endpoints, mirroring
//! how the teacher's transport crate merges multiple concern-specific axum
//! routers into one `Router` per bound address.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use estuary_pairing::PairingAppState;
use estuary_proxy::McpProxy;
use estuary_types::status::ProviderStatus;
use std::sync::Arc;

#[derive(Clone)]
struct StatusState {
    proxy: Arc<McpProxy>,
}

async fn statuses(State(state): State<StatusState>) -> Json<Vec<ProviderStatus>> {
    Json(state.proxy.get_server_statuses().await)
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn router(pairing_state: PairingAppState, proxy: Arc<McpProxy>) -> Router {
    let status_router = Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(statuses))
        .with_state(StatusState { proxy });

    Router::new().merge(estuary_pairing::router(pairing_state)).merge(status_router)
}

//! Axum HTTP surface for the pairing interface (spec 6: `POST /pair`,
//! `POST /slaves/pair`, `GET /slaves/pair/{code}`, `GET /slaves/pending`,
//! `POST /slaves/approve`, `POST /slaves/deny`, `POST /slaves/revoke`,
//! `GET /slaves/revoked`). Grounded on the teacher's axum handler shape
//! (`turbomcp-transport/src/axum/handlers/*.rs`: `State<T>` extractor,
//! handlers returning `(StatusCode, Json<Value>)` or a typed error that
//! implements `IntoResponse`).

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::code::{current_code, validate_code};
use crate::enrollment::{EnrollmentStore, PollOutcome};
use crate::error::PairingError;
use crate::rate_limit::{RateLimitKey, RateLimiter};

/// Everything an axum handler needs, grouped the way the teacher groups its
/// `McpAppState` for the equivalent health/session handlers.
#[derive(Clone)]
pub struct PairingAppState {
    pub api_key: Option<Arc<String>>,
    pub enrollment: Arc<EnrollmentStore>,
    pub pair_limiter: Arc<RateLimiter>,
    pub enroll_limiter: Arc<RateLimiter>,
}

/// `{error: <string>}` body shared by every failure response (spec 6).
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

impl IntoResponse for PairingError {
    fn into_response(self) -> Response {
        let status = match &self {
            PairingError::NoApiKeyConfigured | PairingError::CaUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PairingError::InvalidCode => StatusCode::UNAUTHORIZED,
            PairingError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PairingError::UnknownPendingRequest(_) | PairingError::UnknownSlave(_) => {
                StatusCode::NOT_FOUND
            }
            PairingError::RequestExpired(_) => StatusCode::GONE,
            PairingError::InvalidCsr(_) => StatusCode::BAD_REQUEST,
            PairingError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

pub fn router(state: PairingAppState) -> Router {
    Router::new()
        .route("/pair", post(pair))
        .route("/slaves/pair", post(slave_submit_csr))
        .route("/slaves/pair/{code}", get(slave_poll))
        .route("/slaves/pending", get(list_pending))
        .route("/slaves/approve", post(approve))
        .route("/slaves/deny", post(deny))
        .route("/slaves/revoke", post(revoke))
        .route("/slaves/revoked", get(list_revoked))
        .with_state(state)
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

fn unix_now() -> u64 {
    now().timestamp().max(0) as u64
}

// --- client-to-daemon pairing (spec 4.4.1) ------------------------------

#[derive(Debug, Deserialize)]
struct PairRequest {
    code: String,
}

#[derive(Debug, Serialize)]
struct PairResponse {
    api_key: String,
}

/// `/pair` is exempt from every other auth middleware; it's not nested
/// under any layer that would require a bearer token (spec 4.4.1).
async fn pair(
    State(state): State<PairingAppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<PairRequest>,
) -> Response {
    let Some(api_key) = state.api_key.as_deref() else {
        return PairingError::NoApiKeyConfigured.into_response();
    };

    let key = RateLimitKey::ip(addr.ip().to_string());
    if let Err(info) = state.pair_limiter.peek(&key, "pair").await {
        return PairingError::RateLimited { retry_after_ms: info.retry_after.as_millis() as u64 }
            .into_response();
    }

    // Only failed attempts consume the budget (spec 4.4.1): a valid code
    // must never lock the caller out of a subsequent re-pair.
    if !validate_code(api_key, &body.code, unix_now()) {
        state.pair_limiter.record_failure(&key, "pair").await;
        return PairingError::InvalidCode.into_response();
    }
    Json(PairResponse { api_key: api_key.to_string() }).into_response()
}

// --- slave enrollment (spec 4.4.2) --------------------------------------

#[derive(Debug, Deserialize)]
struct SubmitCsrRequest {
    hostname: String,
    csr_pem: String,
    platform: String,
}

#[derive(Debug, Serialize)]
struct SubmitCsrResponse {
    pairing_code: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

async fn slave_submit_csr(
    State(state): State<PairingAppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SubmitCsrRequest>,
) -> Response {
    let key = RateLimitKey::ip(addr.ip().to_string());
    if let Err(info) = state.enroll_limiter.check(&key, "slaves_pair").await {
        return PairingError::RateLimited { retry_after_ms: info.retry_after.as_millis() as u64 }
            .into_response();
    }

    let request = state.enrollment.submit_csr(&body.hostname, &body.csr_pem, &body.platform, now());
    Json(SubmitCsrResponse { pairing_code: request.pairing_code, expires_at: request.expires_at })
        .into_response()
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum SlavePollResponse {
    Pending,
    Approved { certificate: String, ca_cert: String },
    Denied,
}

async fn slave_poll(State(state): State<PairingAppState>, Path(code): Path<String>) -> Response {
    match state.enrollment.poll(&code, now()) {
        Ok(PollOutcome::Pending) => Json(SlavePollResponse::Pending).into_response(),
        Ok(PollOutcome::Denied) => Json(SlavePollResponse::Denied).into_response(),
        Ok(PollOutcome::Approved { certificate_pem, ca_cert_pem }) => {
            Json(SlavePollResponse::Approved { certificate: certificate_pem, ca_cert: ca_cert_pem })
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn list_pending(State(state): State<PairingAppState>) -> Response {
    Json(state.enrollment.pending_requests(now())).into_response()
}

#[derive(Debug, Deserialize)]
struct ApproveDenyRequest {
    hostname: String,
    pairing_code: String,
}

#[derive(Debug, Serialize)]
struct ApproveResponse {
    certificate_pem: String,
    ca_cert_pem: String,
}

async fn approve(
    State(state): State<PairingAppState>,
    Json(body): Json<ApproveDenyRequest>,
) -> Response {
    match state.enrollment.approve(&body.hostname, &body.pairing_code, now()) {
        Ok((certificate_pem, ca_cert_pem)) => {
            Json(ApproveResponse { certificate_pem, ca_cert_pem }).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn deny(State(state): State<PairingAppState>, Json(body): Json<ApproveDenyRequest>) -> Response {
    match state.enrollment.deny(&body.hostname, &body.pairing_code) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct RevokeRequest {
    hostname: String,
    reason: Option<String>,
}

async fn revoke(State(state): State<PairingAppState>, Json(body): Json<RevokeRequest>) -> Response {
    match state.enrollment.revoke(&body.hostname, body.reason) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_revoked(State(state): State<PairingAppState>) -> Response {
    Json(state.enrollment.revoked_credentials()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::CertificateAuthority;
    use crate::rate_limit::RateLimitConfig;
    use axum::body::Body;
    use axum::extract::connect_info::ConnectInfo;
    use axum::http::Request;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn with_peer(mut request: Request<Body>) -> Request<Body> {
        let addr: SocketAddr = "127.0.0.1:9"
            .parse()
            .expect("literal address parses");
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    fn app() -> Router {
        let dir = tempdir().unwrap();
        let ca = CertificateAuthority::load_or_generate(
            &dir.path().join("ca.pem"),
            &dir.path().join("ca.key"),
        )
        .unwrap();
        let state = PairingAppState {
            api_key: Some(Arc::new("test-api-key-for-pairing-http".to_string())),
            enrollment: Arc::new(EnrollmentStore::new(ca)),
            pair_limiter: Arc::new(RateLimiter::new(RateLimitConfig::recommended())),
            enroll_limiter: Arc::new(RateLimiter::new(RateLimitConfig::recommended())),
        };
        router(state)
    }

    #[tokio::test]
    async fn pair_without_api_key_is_service_unavailable() {
        let dir = tempdir().unwrap();
        let ca = CertificateAuthority::load_or_generate(
            &dir.path().join("ca.pem"),
            &dir.path().join("ca.key"),
        )
        .unwrap();
        let state = PairingAppState {
            api_key: None,
            enrollment: Arc::new(EnrollmentStore::new(ca)),
            pair_limiter: Arc::new(RateLimiter::new(RateLimitConfig::recommended())),
            enroll_limiter: Arc::new(RateLimiter::new(RateLimitConfig::recommended())),
        };
        let app = router(state);
        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/pair")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"code":"000-000"}"#))
                .unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn pair_with_wrong_code_is_unauthorized() {
        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/pair")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"code":"000-000"}"#))
                .unwrap(),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn pair_with_current_code_returns_api_key() {
        let api_key = "test-api-key-for-pairing-http";
        let code = current_code(api_key, unix_now());
        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/pair")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({"code": code}).to_string()))
                .unwrap(),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn approve_unknown_hostname_is_not_found() {
        let request = Request::builder()
            .method("POST")
            .uri("/slaves/approve")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"hostname":"ghost","pairing_code":"000-000"}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

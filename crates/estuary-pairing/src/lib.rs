//! Pairing codes, slave CSR/enrollment, rate limiting, and the `/pair` +
//! `/slaves/*` HTTP surface (spec 4.4, 6).

pub mod code;
pub mod enrollment;
pub mod error;
pub mod http;
pub mod rate_limit;

pub use code::{current_code, validate_code, WINDOW_SECS};
pub use enrollment::{
    CertificateAuthority, EnrollmentSnapshot, EnrollmentStore, PairingRequest, PairingRequestState,
    PollOutcome, RevokedCredential, SlaveRecord, PENDING_REQUEST_TTL_SECS,
};
pub use error::{PairingError, PairingResult};
pub use http::{router, PairingAppState};
pub use rate_limit::{RateLimitConfig, RateLimitInfo, RateLimitKey, RateLimiter};

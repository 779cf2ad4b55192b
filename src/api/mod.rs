//! HTTP API for claim verification
//!
//! - POST /api/v1/verify - Verify a claim
//! - GET /health - Liveness
//! - GET /metrics - Prometheus metrics

pub mod handlers;
pub mod routes;

pub use handlers::{health, metrics, verify_claim, ApiError, AppState, VerifyRequest};
pub use routes::build_router;

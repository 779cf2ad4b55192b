//! Verification API handlers

use crate::metrics::METRICS;
use crate::pipeline::{Verifier, VerificationResult};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared by the handlers
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub max_claim_chars: usize,
}

/// Request body for POST /api/v1/verify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub claim: String,
}

/// API error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Verify a claim
///
/// POST /api/v1/verify
///
/// Pipeline failures still answer 200 with a negative result; only invalid
/// input is rejected.
pub async fn verify_claim(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerificationResult>, (StatusCode, Json<ApiError>)> {
    let claim = request.claim.trim();

    if claim.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("VALIDATION_ERROR", "Claim cannot be empty")),
        ));
    }

    let length = claim.chars().count();
    if length > state.max_claim_chars {
        warn!("Rejected claim of {} characters", length);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                "CLAIM_TOO_LONG",
                format!("Claim cannot exceed {} characters", state.max_claim_chars),
            )),
        ));
    }

    info!("Verify request ({} characters)", length);

    Ok(Json(state.verifier.verify(claim).await))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// GET /metrics
pub async fn metrics() -> String {
    METRICS.export_prometheus()
}

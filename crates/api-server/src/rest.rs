//! Shared REST state, error mapping, and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use farmstand_core::LoyaltyError;
use farmstand_loyalty::LoyaltyEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LoyaltyEngine>,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<LoyaltyEngine>, node_id: String) -> Self {
        Self {
            engine,
            node_id,
            start_time: Instant::now(),
        }
    }
}

/// Engine error surfaced over HTTP.
#[derive(Debug)]
pub struct ApiError(pub LoyaltyError);

impl From<LoyaltyError> for ApiError {
    fn from(err: LoyaltyError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            LoyaltyError::NotFound(_) => StatusCode::NOT_FOUND,
            LoyaltyError::InsufficientPoints { .. } | LoyaltyError::RewardAlreadyConsumed(_) => {
                StatusCode::CONFLICT
            }
            LoyaltyError::InvalidAmount(_) | LoyaltyError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            LoyaltyError::Config(_) | LoyaltyError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self.0, "Loyalty request failed");
            metrics::counter!("api.errors").increment(1);
            "Internal processing error".to_string()
        } else {
            warn!(error = %self.0, "Loyalty request rejected");
            metrics::counter!("api.rejections", "code" => self.0.code()).increment(1);
            self.0.to_string()
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.code().to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        rewards_loaded: state.engine.catalog().len(),
    })
}

/// GET /ready — Readiness probe. Ready once the rewards catalog is loaded.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.engine.catalog().is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub rewards_loaded: usize,
}

//! Checkout discount endpoints.

use crate::rest::{ApiError, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use farmstand_core::loyalty::{ComposeDiscountRequest, ComposedDiscount, ConfirmCheckoutRequest};

/// POST /v1/checkout/discount — Preview the composed discount for a cart.
pub async fn handle_compose_discount(
    State(state): State<AppState>,
    Json(request): Json<ComposeDiscountRequest>,
) -> Result<Json<ComposedDiscount>, ApiError> {
    Ok(Json(state.engine.compose_checkout(&request)?))
}

/// POST /v1/checkout/confirm — Consume the reward used by a confirmed order.
/// Only called once payment and order placement have succeeded.
pub async fn handle_confirm_checkout(
    State(state): State<AppState>,
    Json(request): Json<ConfirmCheckoutRequest>,
) -> Result<StatusCode, ApiError> {
    state.engine.confirm_checkout(&request.user_id, request.used_reward_id)?;
    metrics::counter!("checkout.api.confirmations").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

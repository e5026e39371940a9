//! Loyalty program REST API endpoints.

use crate::rest::{ApiError, AppState};
use axum::extract::{Path, Query, State};
use axum::Json;
use farmstand_core::loyalty::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// POST /v1/loyalty/orders/completed — Order lifecycle event from the order
/// service. Safe to redeliver.
pub async fn handle_order_completed(
    State(state): State<AppState>,
    Json(event): Json<OrderCompleted>,
) -> Result<Json<OrderDisposition>, ApiError> {
    let disposition = state.engine.process_order_event(&event)?;
    metrics::counter!("loyalty.api.order_events").increment(1);

    if let OrderDisposition::Awarded(outcome) = &disposition {
        if !outcome.duplicate {
            info!(
                user_id = %event.user_id,
                order_id = %event.order_id,
                points_earned = outcome.points_earned,
                tier = ?outcome.status.tier,
                "Order awarded"
            );
            // Card refresh trails the award; a failure here never fails the award.
            let engine = state.engine.clone();
            let user_id = event.user_id.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.refresh_card(&user_id) {
                    warn!(user_id = %user_id, error = %e, "Card refresh after award failed");
                }
            });
        }
    }

    Ok(Json(disposition))
}

/// GET /v1/loyalty/status/:user_id — Points, tier and card state.
pub async fn handle_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LoyaltyStatus>, ApiError> {
    Ok(Json(state.engine.loyalty_status(&user_id)?))
}

/// GET /v1/loyalty/history/:user_id — Points history, oldest first.
pub async fn handle_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PointsEntry>>, ApiError> {
    Ok(Json(state.engine.points_history(&user_id)?))
}

/// GET /v1/loyalty/card/:user_id — Digital card, issued on first eligible view.
pub async fn handle_card(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DigitalCard>, ApiError> {
    Ok(Json(state.engine.get_or_issue_card(&user_id)?))
}

/// GET /v1/loyalty/rewards/:user_id/usable — Redeemed, unused rewards.
pub async fn handle_usable_rewards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UsableReward>>, ApiError> {
    Ok(Json(state.engine.list_usable_rewards(&user_id)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailableQuery {
    #[serde(default)]
    pub all: bool,
}

/// GET /v1/loyalty/rewards/:user_id/available — Rewards the user can afford;
/// `?all=true` lists the whole catalog.
pub async fn handle_available_rewards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Vec<AvailableReward>>, ApiError> {
    Ok(Json(state.engine.list_available_rewards(&user_id, query.all)?))
}

/// GET /v1/loyalty/catalog — Full rewards catalog.
pub async fn handle_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        rewards: state.engine.catalog().rewards().to_vec(),
    })
}

/// POST /v1/loyalty/redeem — Redeem points for a reward.
pub async fn handle_redeem(
    State(state): State<AppState>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<UsableReward>, ApiError> {
    let usable = state.engine.redeem(&request.user_id, &request.reward_name)?;
    metrics::counter!("loyalty.api.redemptions").increment(1);
    Ok(Json(usable))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub rewards: Vec<Reward>,
}

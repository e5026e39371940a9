//! API server: HTTP REST endpoints and the Prometheus exporter.

use crate::rest::{self, AppState};
use crate::{checkout_rest, loyalty_rest};
use axum::routing::{get, post};
use axum::Router;
use farmstand_core::config::AppConfig;
use farmstand_loyalty::LoyaltyEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the REST router over a shared engine.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Loyalty
        .route(
            "/v1/loyalty/orders/completed",
            post(loyalty_rest::handle_order_completed),
        )
        .route("/v1/loyalty/status/:user_id", get(loyalty_rest::handle_status))
        .route("/v1/loyalty/history/:user_id", get(loyalty_rest::handle_history))
        .route("/v1/loyalty/card/:user_id", get(loyalty_rest::handle_card))
        .route(
            "/v1/loyalty/rewards/:user_id/usable",
            get(loyalty_rest::handle_usable_rewards),
        )
        .route(
            "/v1/loyalty/rewards/:user_id/available",
            get(loyalty_rest::handle_available_rewards),
        )
        .route("/v1/loyalty/catalog", get(loyalty_rest::handle_catalog))
        .route("/v1/loyalty/redeem", post(loyalty_rest::handle_redeem))
        // Checkout
        .route(
            "/v1/checkout/discount",
            post(checkout_rest::handle_compose_discount),
        )
        .route(
            "/v1/checkout/confirm",
            post(checkout_rest::handle_confirm_checkout),
        )
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    engine: Arc<LoyaltyEngine>,
}

impl ApiServer {
    pub fn new(config: AppConfig, engine: Arc<LoyaltyEngine>) -> Self {
        Self { config, engine }
    }

    /// Start the HTTP REST server. Runs until the listener fails.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState::new(self.engine.clone(), self.config.node_id.clone());
        let app = router(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Install the Prometheus recorder and its HTTP listener.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}

//! Farmstand loyalty service: points, tiers, rewards, checkout discounts
//! and digital member cards for the storefront.
//!
//! Main entry point that loads configuration, builds the engine and starts
//! the server.

use clap::Parser;
use farmstand_api::ApiServer;
use farmstand_core::config::AppConfig;
use farmstand_loyalty::LoyaltyEngine;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "farmstand")]
#[command(about = "Loyalty and checkout-discount service for the Farmstand storefront")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (rewards catalog, promo codes, tiers)
    #[arg(long, env = "FARMSTAND_CONFIG")]
    config: Option<String>,

    /// Node identifier (overrides config)
    #[arg(long, env = "FARMSTAND__NODE_ID")]
    node_id: Option<String>,

    /// Bind address (overrides config)
    #[arg(long, env = "FARMSTAND__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "FARMSTAND__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Disable the Prometheus exporter
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "farmstand=info,farmstand_api=info,farmstand_loyalty=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Farmstand loyalty service starting up");

    // A named config file that is missing or malformed is fatal.
    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config from environment, using defaults");
            AppConfig::default()
        }),
    };

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if cli.no_metrics {
        config.metrics.enabled = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        rewards = config.rewards.len(),
        promo_codes = config.promo_codes.len(),
        "Configuration loaded"
    );

    // Invalid tier tables or catalogs are fatal: refuse to start.
    let engine = Arc::new(LoyaltyEngine::new(&config)?);

    let api_server = ApiServer::new(config.clone(), engine);

    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Farmstand is ready to serve traffic");

    // Blocks until shutdown
    api_server.start_http().await?;

    Ok(())
}

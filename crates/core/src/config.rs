use crate::loyalty::{PromoCodeDefinition, Reward};
use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `FARMSTAND__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    /// Rewards catalog. Empty means the built-in catalog is used.
    #[serde(default)]
    pub rewards: Vec<Reward>,
    /// Promo codes accepted by the built-in validator.
    #[serde(default)]
    pub promo_codes: Vec<PromoCodeDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            loyalty: LoyaltyConfig::default(),
            rewards: Vec::new(),
            promo_codes: Vec::new(),
        }
    }
}

// ─── Loyalty Config ─────────────────────────────────────────────────────────

/// Points earning, month lookback and the tier table. Thresholds are monthly
/// spend in minor currency units.
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    /// Spend needed to earn one point.
    #[serde(default = "default_points_unit_cents")]
    pub points_unit_cents: i64,
    /// Monthly spend buckets kept on the account, current month included.
    #[serde(default = "default_monthly_lookback_months")]
    pub monthly_lookback_months: u32,
    #[serde(default = "default_sprout_threshold")]
    pub sprout_threshold_cents: i64,
    #[serde(default = "default_seedling_threshold")]
    pub seedling_threshold_cents: i64,
    #[serde(default = "default_cultivator_threshold")]
    pub cultivator_threshold_cents: i64,
    #[serde(default = "default_bloom_threshold")]
    pub bloom_threshold_cents: i64,
    #[serde(default = "default_harvester_threshold")]
    pub harvester_threshold_cents: i64,
    #[serde(default = "default_sprout_discount")]
    pub sprout_card_discount_pct: u32,
    #[serde(default = "default_seedling_discount")]
    pub seedling_card_discount_pct: u32,
    #[serde(default = "default_cultivator_discount")]
    pub cultivator_card_discount_pct: u32,
    #[serde(default = "default_bloom_discount")]
    pub bloom_card_discount_pct: u32,
    #[serde(default = "default_harvester_discount")]
    pub harvester_card_discount_pct: u32,
}

fn default_points_unit_cents() -> i64 {
    10_000
}

fn default_monthly_lookback_months() -> u32 {
    12
}

fn default_sprout_threshold() -> i64 {
    500_000
}

fn default_seedling_threshold() -> i64 {
    1_500_000
}

fn default_cultivator_threshold() -> i64 {
    4_000_000
}

fn default_bloom_threshold() -> i64 {
    7_500_000
}

fn default_harvester_threshold() -> i64 {
    10_000_000
}

fn default_sprout_discount() -> u32 {
    5
}

fn default_seedling_discount() -> u32 {
    7
}

fn default_cultivator_discount() -> u32 {
    10
}

fn default_bloom_discount() -> u32 {
    12
}

fn default_harvester_discount() -> u32 {
    15
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            points_unit_cents: default_points_unit_cents(),
            monthly_lookback_months: default_monthly_lookback_months(),
            sprout_threshold_cents: default_sprout_threshold(),
            seedling_threshold_cents: default_seedling_threshold(),
            cultivator_threshold_cents: default_cultivator_threshold(),
            bloom_threshold_cents: default_bloom_threshold(),
            harvester_threshold_cents: default_harvester_threshold(),
            sprout_card_discount_pct: default_sprout_discount(),
            seedling_card_discount_pct: default_seedling_discount(),
            cultivator_card_discount_pct: default_cultivator_discount(),
            bloom_card_discount_pct: default_bloom_discount(),
            harvester_card_discount_pct: default_harvester_discount(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment
    /// variables (`FARMSTAND__LOYALTY__POINTS_UNIT_CENTS=5000`). A named
    /// file must exist and parse.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("FARMSTAND")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

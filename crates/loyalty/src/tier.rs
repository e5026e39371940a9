//! Tier policy: maps the current month's spend to a tier and the card
//! discount percentage attached to it.

use farmstand_core::config::LoyaltyConfig;
use farmstand_core::loyalty::LoyaltyTier;
use farmstand_core::{LoyaltyError, LoyaltyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TierBand {
    tier: LoyaltyTier,
    min_spend_cents: i64,
    discount_pct: u32,
}

/// Threshold table, stored highest tier first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicy {
    bands: Vec<TierBand>,
}

impl TierPolicy {
    pub fn from_config(config: &LoyaltyConfig) -> LoyaltyResult<Self> {
        let policy = Self::build(config);

        // Ascending thresholds from Sprout up, all positive.
        let mut previous = 0;
        for band in policy.bands.iter().rev().filter(|b| b.tier.is_eligible()) {
            if band.min_spend_cents <= previous {
                return Err(LoyaltyError::Config(format!(
                    "{} threshold {} must be greater than {}",
                    band.tier.label(),
                    band.min_spend_cents,
                    previous
                )));
            }
            if band.discount_pct > 100 {
                return Err(LoyaltyError::Config(format!(
                    "{} card discount {}% exceeds 100%",
                    band.tier.label(),
                    band.discount_pct
                )));
            }
            previous = band.min_spend_cents;
        }

        Ok(policy)
    }

    fn build(config: &LoyaltyConfig) -> Self {
        let band = |tier, min_spend_cents, discount_pct| TierBand {
            tier,
            min_spend_cents,
            discount_pct,
        };
        Self {
            bands: vec![
                band(
                    LoyaltyTier::Harvester,
                    config.harvester_threshold_cents,
                    config.harvester_card_discount_pct,
                ),
                band(
                    LoyaltyTier::Bloom,
                    config.bloom_threshold_cents,
                    config.bloom_card_discount_pct,
                ),
                band(
                    LoyaltyTier::Cultivator,
                    config.cultivator_threshold_cents,
                    config.cultivator_card_discount_pct,
                ),
                band(
                    LoyaltyTier::Seedling,
                    config.seedling_threshold_cents,
                    config.seedling_card_discount_pct,
                ),
                band(
                    LoyaltyTier::Sprout,
                    config.sprout_threshold_cents,
                    config.sprout_card_discount_pct,
                ),
                band(LoyaltyTier::None, 0, 0),
            ],
        }
    }

    /// Tier and card discount for a month's spend. Evaluated highest-first.
    pub fn tier_for(&self, monthly_spend_cents: i64) -> (LoyaltyTier, u32) {
        self.bands
            .iter()
            .find(|b| b.tier.is_eligible() && monthly_spend_cents >= b.min_spend_cents)
            .map(|b| (b.tier, b.discount_pct))
            .unwrap_or((LoyaltyTier::None, 0))
    }

    pub fn discount_for(&self, tier: LoyaltyTier) -> u32 {
        self.band(tier).map(|b| b.discount_pct).unwrap_or(0)
    }

    pub fn threshold_for(&self, tier: LoyaltyTier) -> i64 {
        self.band(tier).map(|b| b.min_spend_cents).unwrap_or(0)
    }

    /// Next tier above the one this spend reaches, and the spend still
    /// missing to get there. `None` at the top tier.
    pub fn progress(&self, monthly_spend_cents: i64) -> Option<(LoyaltyTier, i64)> {
        let (tier, _) = self.tier_for(monthly_spend_cents);
        let next = tier.next()?;
        let missing = (self.threshold_for(next) - monthly_spend_cents).max(0);
        Some((next, missing))
    }

    fn band(&self, tier: LoyaltyTier) -> Option<&TierBand> {
        self.bands.iter().find(|b| b.tier == tier)
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::build(&LoyaltyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: i64 = 100;

    #[test]
    fn test_tier_boundaries() {
        let policy = TierPolicy::default();
        assert_eq!(policy.tier_for(0).0, LoyaltyTier::None);
        assert_eq!(policy.tier_for(4_999 * UNIT).0, LoyaltyTier::None);
        assert_eq!(policy.tier_for(5_000 * UNIT).0, LoyaltyTier::Sprout);
        assert_eq!(policy.tier_for(14_999 * UNIT).0, LoyaltyTier::Sprout);
        assert_eq!(policy.tier_for(15_000 * UNIT).0, LoyaltyTier::Seedling);
        assert_eq!(policy.tier_for(40_000 * UNIT).0, LoyaltyTier::Cultivator);
        assert_eq!(policy.tier_for(75_000 * UNIT).0, LoyaltyTier::Bloom);
        assert_eq!(policy.tier_for(99_999 * UNIT).0, LoyaltyTier::Bloom);
        assert_eq!(policy.tier_for(100_000 * UNIT).0, LoyaltyTier::Harvester);
        assert_eq!(policy.tier_for(i64::MAX).0, LoyaltyTier::Harvester);
    }

    #[test]
    fn test_discount_percentages() {
        let policy = TierPolicy::default();
        assert_eq!(policy.tier_for(5_000 * UNIT), (LoyaltyTier::Sprout, 5));
        assert_eq!(policy.tier_for(100_000 * UNIT), (LoyaltyTier::Harvester, 15));
        assert_eq!(policy.discount_for(LoyaltyTier::None), 0);
        assert_eq!(policy.discount_for(LoyaltyTier::Bloom), 12);
    }

    #[test]
    fn test_progress_to_next_tier() {
        let policy = TierPolicy::default();
        assert_eq!(
            policy.progress(3_000 * UNIT),
            Some((LoyaltyTier::Sprout, 2_000 * UNIT))
        );
        assert_eq!(
            policy.progress(15_000 * UNIT),
            Some((LoyaltyTier::Cultivator, 25_000 * UNIT))
        );
        assert_eq!(policy.progress(250_000 * UNIT), None);
    }

    #[test]
    fn test_rejects_non_ascending_thresholds() {
        let config = LoyaltyConfig {
            bloom_threshold_cents: 3_000_000,
            ..Default::default()
        };
        let err = TierPolicy::from_config(&config).unwrap_err();
        assert!(matches!(err, LoyaltyError::Config(_)));
    }

    #[test]
    fn test_rejects_discount_over_100() {
        let config = LoyaltyConfig {
            harvester_card_discount_pct: 120,
            ..Default::default()
        };
        assert!(TierPolicy::from_config(&config).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let policy = TierPolicy::from_config(&LoyaltyConfig::default()).unwrap();
        assert_eq!(policy, TierPolicy::default());
    }
}

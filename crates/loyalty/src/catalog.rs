//! Rewards catalog. Loaded once at startup from configuration and shared
//! read-only behind an `Arc` for the life of the process.

use farmstand_core::loyalty::{AvailableReward, Reward, RewardBenefit};
use farmstand_core::{LoyaltyError, LoyaltyResult};
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RewardsCatalog {
    rewards: Vec<Reward>,
}

impl RewardsCatalog {
    /// Build the catalog from configured rewards, falling back to the
    /// built-in list when none are configured.
    pub fn from_config(rewards: &[Reward]) -> LoyaltyResult<Self> {
        let rewards = if rewards.is_empty() {
            default_rewards()
        } else {
            rewards.to_vec()
        };

        let mut names = HashSet::new();
        for reward in &rewards {
            if reward.name.trim().is_empty() {
                return Err(LoyaltyError::Config("reward name must not be empty".to_string()));
            }
            if !names.insert(reward.name.as_str()) {
                return Err(LoyaltyError::Config(format!(
                    "duplicate reward name '{}'",
                    reward.name
                )));
            }
            validate_benefit(reward)?;
        }

        info!(rewards = rewards.len(), "Rewards catalog loaded");
        Ok(Self { rewards })
    }

    pub fn get(&self, name: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.name == name)
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    /// Every reward, annotated with whether `points` covers its cost.
    pub fn available_for(&self, points: u64) -> Vec<AvailableReward> {
        self.rewards
            .iter()
            .map(|reward| AvailableReward {
                reward_type: reward.benefit.reward_type(),
                affordable: reward.cost <= points,
                points_short: reward.cost.saturating_sub(points),
                reward: reward.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

impl Default for RewardsCatalog {
    fn default() -> Self {
        Self {
            rewards: default_rewards(),
        }
    }
}

fn validate_benefit(reward: &Reward) -> LoyaltyResult<()> {
    match reward.benefit {
        RewardBenefit::Discount { amount_cents } if amount_cents <= 0 => Err(
            LoyaltyError::Config(format!("reward '{}' has a non-positive amount", reward.name)),
        ),
        RewardBenefit::Percentage { percent } if percent == 0 || percent > 100 => {
            Err(LoyaltyError::Config(format!(
                "reward '{}' percentage {} outside 1..=100",
                reward.name, percent
            )))
        }
        RewardBenefit::Bonus { points: 0 } => Err(LoyaltyError::Config(format!(
            "reward '{}' grants no bonus points",
            reward.name
        ))),
        _ => Ok(()),
    }
}

/// Built-in catalog used when configuration supplies none.
pub fn default_rewards() -> Vec<Reward> {
    let reward = |name: &str, benefit, cost, icon: &str| Reward {
        name: name.to_string(),
        benefit,
        cost,
        icon: icon.to_string(),
    };
    vec![
        reward(
            "50 Off Voucher",
            RewardBenefit::Discount { amount_cents: 5_000 },
            50,
            "ticket",
        ),
        reward(
            "150 Off Voucher",
            RewardBenefit::Discount {
                amount_cents: 15_000,
            },
            120,
            "ticket",
        ),
        reward(
            "5% Off Order",
            RewardBenefit::Percentage { percent: 5 },
            80,
            "percent",
        ),
        reward(
            "10% Off Order",
            RewardBenefit::Percentage { percent: 10 },
            150,
            "percent",
        ),
        reward("Free Shipping", RewardBenefit::Shipping, 60, "truck"),
        reward(
            "Harvest Bonus",
            RewardBenefit::Bonus { points: 30 },
            25,
            "sparkles",
        ),
    ]
}

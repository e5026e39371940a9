//! Redemption manager: turns catalog rewards into usable rewards owned by
//! the user, and consumes them once the checkout that used them is
//! confirmed.

use crate::catalog::RewardsCatalog;
use crate::ledger::PointsLedger;
use chrono::{DateTime, Utc};
use farmstand_core::loyalty::{LoyaltyAccount, RewardBenefit, UsableReward};
use farmstand_core::{LoyaltyError, LoyaltyResult};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct RedemptionManager {
    catalog: Arc<RewardsCatalog>,
    ledger: Arc<PointsLedger>,
}

impl RedemptionManager {
    pub fn new(catalog: Arc<RewardsCatalog>, ledger: Arc<PointsLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub fn catalog(&self) -> &RewardsCatalog {
        &self.catalog
    }

    /// Spend points on a catalog reward. The debit and the new usable
    /// reward land together or not at all.
    pub fn redeem(
        &self,
        account: &mut LoyaltyAccount,
        reward_name: &str,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<UsableReward> {
        let reward = self
            .catalog
            .get(reward_name)
            .ok_or_else(|| LoyaltyError::NotFound(format!("reward '{reward_name}'")))?;

        let usable = UsableReward {
            id: Uuid::new_v4(),
            reward_name: reward.name.clone(),
            benefit: reward.benefit.clone(),
            redeemed_at: now,
            consumed_at: None,
        };

        self.ledger.debit(account, reward.cost, usable.id, now)?;
        account.usable_rewards.push(usable.clone());

        metrics::counter!("loyalty.points_redeemed").increment(reward.cost);
        metrics::counter!("loyalty.redemptions").increment(1);

        info!(
            user_id = %account.user_id,
            reward = %reward.name,
            cost = reward.cost,
            new_balance = account.points,
            "Reward redeemed"
        );

        Ok(usable)
    }

    /// Rewards the user still holds, in redemption order.
    pub fn usable_rewards(&self, account: &LoyaltyAccount) -> Vec<UsableReward> {
        account
            .usable_rewards
            .iter()
            .filter(|r| !r.is_consumed())
            .cloned()
            .collect()
    }

    /// Mark a usable reward consumed after its checkout is confirmed. Bonus
    /// rewards credit their points at this point.
    pub fn consume(
        &self,
        account: &mut LoyaltyAccount,
        reward_id: Uuid,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<UsableReward> {
        let reward = account
            .usable_rewards
            .iter_mut()
            .find(|r| r.id == reward_id)
            .ok_or_else(|| LoyaltyError::NotFound(format!("usable reward {reward_id}")))?;

        if reward.is_consumed() {
            return Err(LoyaltyError::RewardAlreadyConsumed(reward_id));
        }
        reward.consumed_at = Some(now);
        let consumed = reward.clone();

        if let RewardBenefit::Bonus { points } = consumed.benefit {
            self.ledger.credit_bonus(account, points, reward_id, now);
        }
        account.updated_at = now;

        metrics::counter!("loyalty.rewards_consumed").increment(1);
        info!(
            user_id = %account.user_id,
            reward = %consumed.reward_name,
            reward_id = %reward_id,
            "Reward consumed"
        );

        Ok(consumed)
    }
}

/// Resolve a reward the user wants to apply, rejecting unknown and spent ones.
pub fn find_unconsumed(account: &LoyaltyAccount, reward_id: Uuid) -> LoyaltyResult<&UsableReward> {
    let reward = account
        .usable_reward(reward_id)
        .ok_or_else(|| LoyaltyError::NotFound(format!("usable reward {reward_id}")))?;
    if reward.is_consumed() {
        return Err(LoyaltyError::RewardAlreadyConsumed(reward_id));
    }
    Ok(reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierPolicy;
    use farmstand_core::config::LoyaltyConfig;
    use farmstand_core::loyalty::PointsSource;

    fn manager() -> RedemptionManager {
        let ledger =
            PointsLedger::new(Arc::new(TierPolicy::default()), &LoyaltyConfig::default()).unwrap();
        RedemptionManager::new(Arc::new(RewardsCatalog::default()), Arc::new(ledger))
    }

    fn account_with_points(points: u64) -> LoyaltyAccount {
        let now = Utc::now();
        let mut account = LoyaltyAccount::new("test-user", now);
        manager()
            .ledger
            .award(&mut account, "seed-order", points as i64 * 10_000, now)
            .unwrap();
        account
    }

    #[test]
    fn test_redeem_success() {
        let manager = manager();
        let mut account = account_with_points(200);

        let usable = manager
            .redeem(&mut account, "150 Off Voucher", Utc::now())
            .unwrap();

        assert_eq!(account.points, 80);
        assert_eq!(usable.benefit, RewardBenefit::Discount { amount_cents: 15_000 });
        assert!(!usable.is_consumed());
        let last = account.points_history.last().unwrap();
        assert_eq!(last.points, -120);
        assert_eq!(last.source, PointsSource::Redemption);
        assert_eq!(last.reward_id, Some(usable.id));
        assert_eq!(account.history_balance(), account.points as i64);
    }

    #[test]
    fn test_redeem_insufficient_points() {
        let manager = manager();
        let mut account = account_with_points(40);
        let before = account.clone();

        let err = manager
            .redeem(&mut account, "50 Off Voucher", Utc::now())
            .unwrap_err();

        assert!(matches!(err, LoyaltyError::InsufficientPoints { .. }));
        assert_eq!(account, before);
    }

    #[test]
    fn test_redeem_unknown_reward() {
        let manager = manager();
        let mut account = account_with_points(500);
        let err = manager
            .redeem(&mut account, "Golden Tractor", Utc::now())
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::NotFound(_)));
    }

    #[test]
    fn test_consume_once() {
        let manager = manager();
        let mut account = account_with_points(100);
        let usable = manager
            .redeem(&mut account, "Free Shipping", Utc::now())
            .unwrap();

        manager.consume(&mut account, usable.id, Utc::now()).unwrap();
        assert!(manager.usable_rewards(&account).is_empty());

        let err = manager
            .consume(&mut account, usable.id, Utc::now())
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::RewardAlreadyConsumed(id) if id == usable.id));
        assert!(matches!(
            find_unconsumed(&account, usable.id),
            Err(LoyaltyError::RewardAlreadyConsumed(_))
        ));
    }

    #[test]
    fn test_consume_bonus_credits_points() {
        let manager = manager();
        let mut account = account_with_points(25);
        let usable = manager
            .redeem(&mut account, "Harvest Bonus", Utc::now())
            .unwrap();
        assert_eq!(account.points, 0);

        manager.consume(&mut account, usable.id, Utc::now()).unwrap();
        assert_eq!(account.points, 30);
        assert_eq!(account.history_balance(), 30);
    }

    #[test]
    fn test_consume_unknown_reward() {
        let manager = manager();
        let mut account = account_with_points(10);
        let err = manager
            .consume(&mut account, Uuid::new_v4(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::NotFound(_)));
    }
}

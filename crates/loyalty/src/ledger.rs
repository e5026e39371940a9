//! Points ledger: awards points for orders, debits redemptions, credits
//! bonuses, and keeps purchase counts, spend buckets and tier in step with
//! the append-only history.
//!
//! Every function here is a pure mutation of a `LoyaltyAccount` at an
//! explicit `now`; locking and persistence live in the engine.

use crate::tier::TierPolicy;
use chrono::{DateTime, Datelike, Utc};
use farmstand_core::config::LoyaltyConfig;
use farmstand_core::loyalty::{
    month_key, LoyaltyAccount, LoyaltyStatus, LoyaltyTier, PointsEntry, PointsSource,
};
use farmstand_core::{LoyaltyError, LoyaltyResult};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// What an award did to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardResult {
    pub points_earned: u64,
    pub previous_tier: LoyaltyTier,
    pub tier_changed: bool,
    pub duplicate: bool,
}

pub struct PointsLedger {
    policy: Arc<TierPolicy>,
    points_unit_cents: i64,
    lookback_months: u32,
}

impl PointsLedger {
    pub fn new(policy: Arc<TierPolicy>, config: &LoyaltyConfig) -> LoyaltyResult<Self> {
        if config.points_unit_cents <= 0 {
            return Err(LoyaltyError::Config(format!(
                "points_unit_cents must be positive, got {}",
                config.points_unit_cents
            )));
        }
        Ok(Self {
            policy,
            points_unit_cents: config.points_unit_cents,
            lookback_months: config.monthly_lookback_months.max(1),
        })
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Points earned for an order total: one point per whole earning unit.
    pub fn points_for(&self, order_total_cents: i64) -> u64 {
        if order_total_cents <= 0 {
            return 0;
        }
        (order_total_cents / self.points_unit_cents) as u64
    }

    /// Award points for a qualifying order. Re-awarding an order already in
    /// the history leaves the account untouched and reports `duplicate`.
    pub fn award(
        &self,
        account: &mut LoyaltyAccount,
        order_id: &str,
        order_total_cents: i64,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<AwardResult> {
        if order_total_cents < 0 {
            return Err(LoyaltyError::InvalidAmount(order_total_cents));
        }
        if order_id.is_empty() {
            return Err(LoyaltyError::InvalidRequest(
                "order_id must not be empty".to_string(),
            ));
        }

        if account.has_awarded(order_id) {
            metrics::counter!("loyalty.awards.duplicate").increment(1);
            debug!(
                user_id = %account.user_id,
                order_id = order_id,
                "Order already awarded, skipping"
            );
            return Ok(AwardResult {
                points_earned: 0,
                previous_tier: account.tier,
                tier_changed: false,
                duplicate: true,
            });
        }

        let points_earned = self.points_for(order_total_cents);

        account.purchase_count += 1;
        account.total_spent_cents = account.total_spent_cents.saturating_add(order_total_cents);
        let bucket = account.monthly_spent.entry(month_key(now)).or_insert(0);
        *bucket = bucket.saturating_add(order_total_cents);
        account.points = account.points.saturating_add(points_earned);
        account.points_history.push(PointsEntry {
            points: points_earned as i64,
            source: PointsSource::Purchase,
            order_id: Some(order_id.to_string()),
            reward_id: None,
            created_at: now,
        });
        self.prune_months(account, now);

        let previous_tier = account.tier;
        let tier_changed = self.recompute_tier(account, now);
        account.updated_at = now;

        metrics::counter!("loyalty.points_awarded").increment(points_earned);

        debug!(
            user_id = %account.user_id,
            order_id = order_id,
            points_earned = points_earned,
            balance = account.points,
            tier = ?account.tier,
            "Points awarded"
        );

        Ok(AwardResult {
            points_earned,
            previous_tier,
            tier_changed,
            duplicate: false,
        })
    }

    /// Debit a redemption. Fails without touching the account when the
    /// balance is short.
    pub fn debit(
        &self,
        account: &mut LoyaltyAccount,
        cost: u64,
        reward_id: Uuid,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<()> {
        if account.points < cost {
            return Err(LoyaltyError::InsufficientPoints {
                required: cost,
                available: account.points,
            });
        }
        account.points -= cost;
        account.points_history.push(PointsEntry {
            points: -(cost as i64),
            source: PointsSource::Redemption,
            order_id: None,
            reward_id: Some(reward_id),
            created_at: now,
        });
        account.updated_at = now;
        Ok(())
    }

    /// Credit bonus points granted by a consumed reward.
    pub fn credit_bonus(
        &self,
        account: &mut LoyaltyAccount,
        points: u64,
        reward_id: Uuid,
        now: DateTime<Utc>,
    ) {
        account.points = account.points.saturating_add(points);
        account.points_history.push(PointsEntry {
            points: points as i64,
            source: PointsSource::Bonus,
            order_id: None,
            reward_id: Some(reward_id),
            created_at: now,
        });
        account.updated_at = now;
    }

    /// Tier the account holds right now, judged on this month's spend.
    pub fn current_tier(&self, account: &LoyaltyAccount, now: DateTime<Utc>) -> LoyaltyTier {
        self.policy.tier_for(account.spent_in_month(now)).0
    }

    /// Status snapshot as of `now`.
    pub fn status(&self, account: &LoyaltyAccount, now: DateTime<Utc>) -> LoyaltyStatus {
        let monthly_spent_cents = account.spent_in_month(now);
        let tier = self.policy.tier_for(monthly_spent_cents).0;
        let progress = self.policy.progress(monthly_spent_cents);
        LoyaltyStatus {
            user_id: account.user_id.clone(),
            points: account.points,
            purchase_count: account.purchase_count,
            total_spent_cents: account.total_spent_cents,
            monthly_spent_cents,
            tier,
            is_eligible: tier.is_eligible(),
            card_issued: account.card_issued(),
            next_tier: progress.map(|(next, _)| next),
            spend_to_next_tier_cents: progress.map(|(_, missing)| missing),
        }
    }

    /// Recompute and store the tier. Returns true if it changed.
    fn recompute_tier(&self, account: &mut LoyaltyAccount, now: DateTime<Utc>) -> bool {
        let old_tier = account.tier;
        let new_tier = self.current_tier(account, now);
        if new_tier == old_tier {
            return false;
        }

        account.tier = new_tier;
        if new_tier > old_tier {
            metrics::counter!("loyalty.tier_upgrades").increment(1);
            info!(
                user_id = %account.user_id,
                old = ?old_tier,
                new = ?new_tier,
                "Tier upgrade"
            );
        } else {
            metrics::counter!("loyalty.tier_downgrades").increment(1);
            info!(
                user_id = %account.user_id,
                old = ?old_tier,
                new = ?new_tier,
                "Tier downgrade"
            );
        }
        true
    }

    /// Drop spend buckets outside the lookback window.
    fn prune_months(&self, account: &mut LoyaltyAccount, now: DateTime<Utc>) {
        let oldest = now.year() * 12 + now.month0() as i32 - (self.lookback_months as i32 - 1);
        let cutoff = format!("{:04}-{:02}", oldest.div_euclid(12), oldest.rem_euclid(12) + 1);
        account.monthly_spent = account.monthly_spent.split_off(&cutoff);
    }
}

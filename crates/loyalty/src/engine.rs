//! Loyalty engine: the single entry point for order awards, redemptions,
//! checkout discounts and digital cards. Ledger writes for one user are
//! serialized through the user's lock; reads go straight to the store.

use crate::card::CardManager;
use crate::catalog::RewardsCatalog;
use crate::checkout::compose_discount;
use crate::ledger::PointsLedger;
use crate::promo::{ConfiguredPromoValidator, PromoValidator};
use crate::redemption::{find_unconsumed, RedemptionManager};
use crate::store::{AccountStore, InMemoryAccountStore, UserLocks};
use crate::tier::TierPolicy;
use chrono::{DateTime, Utc};
use farmstand_core::config::AppConfig;
use farmstand_core::loyalty::*;
use farmstand_core::{LoyaltyError, LoyaltyResult};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct LoyaltyEngine {
    store: Arc<dyn AccountStore>,
    promos: Arc<dyn PromoValidator>,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
    ledger: Arc<PointsLedger>,
    redemption: RedemptionManager,
    cards: CardManager,
}

impl LoyaltyEngine {
    /// Engine over an in-memory store and the configured promo codes.
    pub fn new(config: &AppConfig) -> LoyaltyResult<Self> {
        let promos = ConfiguredPromoValidator::new(&config.promo_codes)?;
        Self::with_parts(
            config,
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(promos),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        config: &AppConfig,
        store: Arc<dyn AccountStore>,
        promos: Arc<dyn PromoValidator>,
        clock: Arc<dyn Clock>,
    ) -> LoyaltyResult<Self> {
        let policy = Arc::new(TierPolicy::from_config(&config.loyalty)?);
        let ledger = Arc::new(PointsLedger::new(policy.clone(), &config.loyalty)?);
        let catalog = Arc::new(RewardsCatalog::from_config(&config.rewards)?);

        info!(
            points_unit_cents = config.loyalty.points_unit_cents,
            lookback_months = config.loyalty.monthly_lookback_months,
            rewards = catalog.len(),
            "Loyalty engine initialized"
        );

        Ok(Self {
            store,
            promos,
            clock,
            locks: UserLocks::new(),
            redemption: RedemptionManager::new(catalog, ledger.clone()),
            cards: CardManager::new(policy),
            ledger,
        })
    }

    // ─── Orders ─────────────────────────────────────────────────────────

    /// Handle an order lifecycle event. Non-qualifying orders are skipped
    /// without touching the ledger.
    pub fn process_order_event(&self, event: &OrderCompleted) -> LoyaltyResult<OrderDisposition> {
        if !event.qualifies() {
            metrics::counter!("loyalty.orders.skipped").increment(1);
            debug!(
                user_id = %event.user_id,
                order_id = %event.order_id,
                status = ?event.status,
                payment_status = ?event.payment_status,
                "Order does not qualify for points"
            );
            return Ok(OrderDisposition::Skipped {
                reason: format!(
                    "order status {:?} with payment {:?} does not qualify",
                    event.status, event.payment_status
                ),
            });
        }

        let outcome =
            self.award_for_order(&event.user_id, &event.order_id, event.order_total_cents)?;
        Ok(OrderDisposition::Awarded(outcome))
    }

    /// Award points for a qualifying order, exactly once per order id.
    pub fn award_for_order(
        &self,
        user_id: &str,
        order_id: &str,
        order_total_cents: i64,
    ) -> LoyaltyResult<AwardOutcome> {
        require_user_id(user_id)?;
        self.with_account(user_id, |account, now| {
            let result = self.ledger.award(account, order_id, order_total_cents, now)?;
            if result.tier_changed {
                info!(
                    user_id = %user_id,
                    old = ?result.previous_tier,
                    new = ?account.tier,
                    "Tier recomputed after award"
                );
            }
            Ok(AwardOutcome {
                status: self.ledger.status(account, now),
                points_earned: result.points_earned,
                tier_changed: result.tier_changed,
                duplicate: result.duplicate,
            })
        })
    }

    // ─── Reads ──────────────────────────────────────────────────────────

    /// Current status. Unknown users read as a zeroed account; reads never
    /// create accounts.
    pub fn loyalty_status(&self, user_id: &str) -> LoyaltyResult<LoyaltyStatus> {
        let now = self.clock.now();
        let account = self.load_or_empty(user_id, now)?;
        Ok(self.ledger.status(&account, now))
    }

    pub fn points_history(&self, user_id: &str) -> LoyaltyResult<Vec<PointsEntry>> {
        Ok(self
            .store
            .load(user_id)?
            .map(|a| a.points_history)
            .unwrap_or_default())
    }

    pub fn list_usable_rewards(&self, user_id: &str) -> LoyaltyResult<Vec<UsableReward>> {
        let account = self.load_or_empty(user_id, self.clock.now())?;
        Ok(self.redemption.usable_rewards(&account))
    }

    /// Catalog rewards the user can afford. With `include_unaffordable`
    /// the whole catalog is returned, still annotated.
    pub fn list_available_rewards(
        &self,
        user_id: &str,
        include_unaffordable: bool,
    ) -> LoyaltyResult<Vec<AvailableReward>> {
        let points = self.store.load(user_id)?.map(|a| a.points).unwrap_or(0);
        Ok(self
            .redemption
            .catalog()
            .available_for(points)
            .into_iter()
            .filter(|r| include_unaffordable || r.affordable)
            .collect())
    }

    pub fn catalog(&self) -> &RewardsCatalog {
        self.redemption.catalog()
    }

    // ─── Redemption ─────────────────────────────────────────────────────

    /// Redeem points for a catalog reward. Redemption also issues the
    /// digital card for eligible members who don't have one yet.
    pub fn redeem(&self, user_id: &str, reward_name: &str) -> LoyaltyResult<UsableReward> {
        require_user_id(user_id)?;
        self.with_account(user_id, |account, now| {
            let usable = self.redemption.redeem(account, reward_name, now)?;
            if account.card.is_none() {
                let tier = self.ledger.current_tier(account, now);
                self.cards.issue_or_refresh(account, tier, now);
            }
            Ok(usable)
        })
    }

    // ─── Checkout ───────────────────────────────────────────────────────

    /// Preview the discount for a checkout. Changes nothing.
    pub fn compose_checkout(
        &self,
        request: &ComposeDiscountRequest,
    ) -> LoyaltyResult<ComposedDiscount> {
        if request.subtotal_cents < 0 {
            return Err(LoyaltyError::InvalidAmount(request.subtotal_cents));
        }
        let now = self.clock.now();

        let account = match request.reward_id {
            Some(_) => self.store.load(&request.user_id)?,
            None => None,
        };
        let reward = match (request.reward_id, account.as_ref()) {
            (Some(reward_id), Some(account)) => Some(find_unconsumed(account, reward_id)?),
            (Some(reward_id), None) => {
                return Err(LoyaltyError::NotFound(format!("usable reward {reward_id}")))
            }
            (None, _) => None,
        };

        let mut rejection = None;
        let promo = match request.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                match self.promos.validate_and_price(code, request.subtotal_cents, now) {
                    PromoOutcome::Accepted(pricing) => Some(pricing),
                    PromoOutcome::Rejected { reason } => {
                        metrics::counter!("checkout.promo_rejected").increment(1);
                        debug!(
                            user_id = %request.user_id,
                            code = code,
                            reason = %reason,
                            "Promo rejected"
                        );
                        rejection = Some(reason);
                        None
                    }
                }
            }
            _ => None,
        };

        let mut composed = compose_discount(request.subtotal_cents, promo.as_ref(), reward);
        composed.promo_rejection = rejection;

        metrics::counter!("checkout.discounts_composed").increment(1);
        debug!(
            user_id = %request.user_id,
            subtotal = request.subtotal_cents,
            discount = composed.discount_amount_cents,
            free_shipping = composed.free_shipping,
            "Checkout discount composed"
        );

        Ok(composed)
    }

    /// Consume the reward used by a confirmed checkout. No reward is a no-op.
    pub fn confirm_checkout(
        &self,
        user_id: &str,
        used_reward_id: Option<Uuid>,
    ) -> LoyaltyResult<Option<UsableReward>> {
        let Some(reward_id) = used_reward_id else {
            return Ok(None);
        };
        require_user_id(user_id)?;
        if self.store.load(user_id)?.is_none() {
            return Err(LoyaltyError::NotFound(format!("usable reward {reward_id}")));
        }
        self.with_account(user_id, |account, now| {
            self.redemption.consume(account, reward_id, now).map(Some)
        })
    }

    // ─── Digital Card ───────────────────────────────────────────────────

    /// Card for a profile view: issued on first visit while the user holds
    /// a tier, refreshed afterwards, and a preview otherwise.
    pub fn get_or_issue_card(&self, user_id: &str) -> LoyaltyResult<DigitalCard> {
        let now = self.clock.now();
        let account = self.load_or_empty(user_id, now)?;
        let tier = self.ledger.current_tier(&account, now);
        match &account.card {
            None if !tier.is_eligible() => {
                return Ok(self.cards.preview(account.created_at, now));
            }
            Some(card) if self.cards.is_current(card, tier) => return Ok(card.clone()),
            _ => {}
        }

        self.with_account(user_id, |account, now| {
            let tier = self.ledger.current_tier(account, now);
            Ok(self
                .cards
                .issue_or_refresh(account, tier, now)
                .unwrap_or_else(|| self.cards.preview(account.created_at, now)))
        })
    }

    /// Refresh an existing card after the tier may have moved. Accounts
    /// without a card are left alone; an up-to-date card is not rewritten.
    pub fn refresh_card(&self, user_id: &str) -> LoyaltyResult<Option<DigitalCard>> {
        let now = self.clock.now();
        let Some(account) = self.store.load(user_id)? else {
            return Ok(None);
        };
        let tier = self.ledger.current_tier(&account, now);
        match &account.card {
            None => return Ok(None),
            Some(card) if self.cards.is_current(card, tier) => return Ok(Some(card.clone())),
            Some(_) => {}
        }
        self.with_account(user_id, |account, now| {
            let tier = self.ledger.current_tier(account, now);
            Ok(self.cards.refresh(account, tier, now))
        })
    }

    // ─── Internals ──────────────────────────────────────────────────────

    /// Load, mutate and save one account under the user's lock. Nothing is
    /// saved when `f` fails.
    fn with_account<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut LoyaltyAccount, DateTime<Utc>) -> LoyaltyResult<T>,
    ) -> LoyaltyResult<T> {
        let lock = self.locks.lock_for(user_id);
        let _guard = lock.lock();

        let now = self.clock.now();
        let mut account = self
            .store
            .load(user_id)?
            .unwrap_or_else(|| LoyaltyAccount::new(user_id, now));
        let before = account.clone();

        let value = f(&mut account, now)?;
        if account != before {
            self.store.save(&account)?;
        }
        Ok(value)
    }

    fn load_or_empty(&self, user_id: &str, now: DateTime<Utc>) -> LoyaltyResult<LoyaltyAccount> {
        Ok(self
            .store
            .load(user_id)?
            .unwrap_or_else(|| LoyaltyAccount::new(user_id, now)))
    }
}

fn require_user_id(user_id: &str) -> LoyaltyResult<()> {
    if user_id.trim().is_empty() {
        return Err(LoyaltyError::InvalidRequest(
            "user_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

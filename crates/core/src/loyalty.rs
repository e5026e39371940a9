//! Loyalty program domain types: monthly-spend tiers, points ledger,
//! redeemable rewards, checkout discounts and the digital member card.
//!
//! All money is carried as `i64` minor currency units (`*_cents`). Points are
//! whole numbers; history deltas are signed so the ledger can be summed.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ─── Tier System ────────────────────────────────────────────────────────────

/// Reward tiers, ordered lowest to highest. Derived from the current
/// calendar month's spend only.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    /// No qualifying spend this month.
    #[default]
    None,
    Sprout,
    Seedling,
    Cultivator,
    Bloom,
    Harvester,
}

impl LoyaltyTier {
    /// Every tier, ascending.
    pub const ALL: [LoyaltyTier; 6] = [
        LoyaltyTier::None,
        LoyaltyTier::Sprout,
        LoyaltyTier::Seedling,
        LoyaltyTier::Cultivator,
        LoyaltyTier::Bloom,
        LoyaltyTier::Harvester,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LoyaltyTier::None => "None",
            LoyaltyTier::Sprout => "Sprout",
            LoyaltyTier::Seedling => "Seedling",
            LoyaltyTier::Cultivator => "Cultivator",
            LoyaltyTier::Bloom => "Bloom",
            LoyaltyTier::Harvester => "Harvester",
        }
    }

    /// Colour theme used when rendering the digital card.
    pub fn card_theme(&self) -> &'static str {
        match self {
            LoyaltyTier::None => "slate",
            LoyaltyTier::Sprout => "leaf",
            LoyaltyTier::Seedling => "meadow",
            LoyaltyTier::Cultivator => "soil",
            LoyaltyTier::Bloom => "blossom",
            LoyaltyTier::Harvester => "gold",
        }
    }

    /// The tier directly above this one, if any.
    pub fn next(&self) -> Option<LoyaltyTier> {
        match self {
            LoyaltyTier::None => Some(LoyaltyTier::Sprout),
            LoyaltyTier::Sprout => Some(LoyaltyTier::Seedling),
            LoyaltyTier::Seedling => Some(LoyaltyTier::Cultivator),
            LoyaltyTier::Cultivator => Some(LoyaltyTier::Bloom),
            LoyaltyTier::Bloom => Some(LoyaltyTier::Harvester),
            LoyaltyTier::Harvester => None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        *self != LoyaltyTier::None
    }
}

/// Calendar-month bucket key, `YYYY-MM` in UTC. Lexicographic order matches
/// chronological order for four-digit years.
pub fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

// ─── Points Ledger ──────────────────────────────────────────────────────────

/// What produced a points history entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
    Purchase,
    Redemption,
    Bonus,
}

/// One immutable row of the append-only points history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointsEntry {
    /// Signed delta: positive for earnings, negative for redemptions.
    pub points: i64,
    pub source: PointsSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Loyalty state for a single user. Created lazily on first award.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoyaltyAccount {
    pub user_id: String,
    pub points: u64,
    pub purchase_count: u64,
    pub total_spent_cents: i64,
    /// Spend per `month_key`; only used for tier recomputation.
    pub monthly_spent: BTreeMap<String, i64>,
    pub tier: LoyaltyTier,
    pub points_history: Vec<PointsEntry>,
    pub usable_rewards: Vec<UsableReward>,
    pub card: Option<DigitalCard>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyAccount {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            points: 0,
            purchase_count: 0,
            total_spent_cents: 0,
            monthly_spent: BTreeMap::new(),
            tier: LoyaltyTier::None,
            points_history: Vec::new(),
            usable_rewards: Vec::new(),
            card: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a purchase award for this order is already in the history.
    pub fn has_awarded(&self, order_id: &str) -> bool {
        self.points_history.iter().any(|e| {
            e.source == PointsSource::Purchase && e.order_id.as_deref() == Some(order_id)
        })
    }

    /// Spend recorded for the month containing `at`.
    pub fn spent_in_month(&self, at: DateTime<Utc>) -> i64 {
        self.monthly_spent
            .get(&month_key(at))
            .copied()
            .unwrap_or(0)
    }

    /// Signed sum of every history entry. Always equals `points`.
    pub fn history_balance(&self) -> i64 {
        self.points_history.iter().map(|e| e.points).sum()
    }

    pub fn is_eligible(&self) -> bool {
        self.tier.is_eligible()
    }

    pub fn card_issued(&self) -> bool {
        self.card.is_some()
    }

    pub fn usable_reward(&self, reward_id: Uuid) -> Option<&UsableReward> {
        self.usable_rewards.iter().find(|r| r.id == reward_id)
    }
}

/// Loyalty status exposed to the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoyaltyStatus {
    pub user_id: String,
    pub points: u64,
    pub purchase_count: u64,
    pub total_spent_cents: i64,
    pub monthly_spent_cents: i64,
    pub tier: LoyaltyTier,
    pub is_eligible: bool,
    pub card_issued: bool,
    pub next_tier: Option<LoyaltyTier>,
    pub spend_to_next_tier_cents: Option<i64>,
}

// ─── Orders ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Completed,
    Cancelled,
    Refunded,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    #[serde(other)]
    Other,
}

/// Order lifecycle event delivered (at least once) by the order service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub user_id: String,
    pub order_id: String,
    pub order_total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl OrderCompleted {
    /// An order earns points once it is completed, or confirmed and paid.
    pub fn qualifies(&self) -> bool {
        match self.status {
            OrderStatus::Completed => true,
            OrderStatus::Confirmed => self.payment_status == PaymentStatus::Paid,
            _ => false,
        }
    }
}

/// Result of awarding points for a single order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwardOutcome {
    pub status: LoyaltyStatus,
    pub points_earned: u64,
    pub tier_changed: bool,
    /// True when the order had already been awarded and nothing changed.
    pub duplicate: bool,
}

/// What the engine did with an order event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum OrderDisposition {
    Awarded(AwardOutcome),
    Skipped { reason: String },
}

// ─── Rewards ────────────────────────────────────────────────────────────────

/// Coarse reward category shown in the storefront.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Discount,
    Shipping,
    Bonus,
}

/// What a reward is worth once applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardBenefit {
    /// Fixed amount off the order.
    Discount { amount_cents: i64 },
    /// Percentage off the original subtotal.
    Percentage { percent: u32 },
    /// Free shipping on the order.
    Shipping,
    /// Points credited when the checkout using it is confirmed.
    Bonus { points: u64 },
}

impl RewardBenefit {
    pub fn reward_type(&self) -> RewardType {
        match self {
            RewardBenefit::Discount { .. } | RewardBenefit::Percentage { .. } => {
                RewardType::Discount
            }
            RewardBenefit::Shipping => RewardType::Shipping,
            RewardBenefit::Bonus { .. } => RewardType::Bonus,
        }
    }
}

/// Catalog entry. Immutable once the catalog is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reward {
    pub name: String,
    pub benefit: RewardBenefit,
    /// Price in points.
    pub cost: u64,
    #[serde(default)]
    pub icon: String,
}

/// Catalog entry annotated with whether the user can afford it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableReward {
    #[serde(flatten)]
    pub reward: Reward,
    pub reward_type: RewardType,
    pub affordable: bool,
    pub points_short: u64,
}

/// A redeemed reward owned by a user, waiting to be used at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsableReward {
    pub id: Uuid,
    pub reward_name: String,
    pub benefit: RewardBenefit,
    pub redeemed_at: DateTime<Utc>,
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl UsableReward {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub user_id: String,
    pub reward_name: String,
}

// ─── Promo Codes ────────────────────────────────────────────────────────────

/// Discount granted by a validated promo code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromoDiscount {
    Amount { amount_cents: i64 },
    Percentage { percent: u32 },
}

/// Pricing returned by the promo validator for an accepted code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoPricing {
    pub code: String,
    pub discount: Option<PromoDiscount>,
    #[serde(default)]
    pub free_shipping: bool,
}

/// Outcome of validating a promo code against a subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromoOutcome {
    Accepted(PromoPricing),
    Rejected { reason: String },
}

/// Promo code definition for the config-backed validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoCodeDefinition {
    pub code: String,
    #[serde(default)]
    pub discount: Option<PromoDiscount>,
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub min_subtotal_cents: i64,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// ─── Checkout ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeDiscountRequest {
    pub user_id: String,
    pub subtotal_cents: i64,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub reward_id: Option<Uuid>,
}

/// Composed checkout discount. A preview: computing it changes nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposedDiscount {
    pub subtotal_cents: i64,
    pub discount_amount_cents: i64,
    pub net_total_cents: i64,
    pub free_shipping: bool,
    pub applied_reward_name: Option<String>,
    pub applied_reward_id: Option<Uuid>,
    pub applied_promo_code: Option<String>,
    /// Why a supplied promo code was not applied, for display.
    pub promo_rejection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmCheckoutRequest {
    pub user_id: String,
    #[serde(default)]
    pub used_reward_id: Option<Uuid>,
}

// ─── Digital Card ───────────────────────────────────────────────────────────

/// Digital loyalty card. `card_id` is assigned once and never changes;
/// preview cards for users without a tier carry no id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigitalCard {
    pub card_id: Option<String>,
    pub tier: LoyaltyTier,
    pub theme: String,
    pub discount_percentage: u32,
    pub is_active: bool,
    pub member_since: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub refreshed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> OrderCompleted {
        OrderCompleted {
            user_id: "u-1".to_string(),
            order_id: "o-1".to_string(),
            order_total_cents: 10_000,
            status,
            payment_status,
        }
    }

    #[test]
    fn test_order_qualification() {
        assert!(order(OrderStatus::Completed, PaymentStatus::Pending).qualifies());
        assert!(order(OrderStatus::Confirmed, PaymentStatus::Paid).qualifies());
        assert!(!order(OrderStatus::Confirmed, PaymentStatus::Pending).qualifies());
        assert!(!order(OrderStatus::Shipped, PaymentStatus::Paid).qualifies());
        assert!(!order(OrderStatus::Cancelled, PaymentStatus::Paid).qualifies());
    }

    #[test]
    fn test_unknown_status_deserializes_as_other() {
        let json = r#"{"user_id":"u","order_id":"o","order_total_cents":1,
            "status":"on_hold","payment_status":"cod"}"#;
        let event: OrderCompleted = serde_json::from_str(json).unwrap();
        assert_eq!(event.status, OrderStatus::Other);
        assert_eq!(event.payment_status, PaymentStatus::Other);
        assert!(!event.qualifies());
    }

    #[test]
    fn test_month_key_is_zero_padded() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(month_key(at), "2026-03");
    }

    #[test]
    fn test_tier_ordering_and_next() {
        assert!(LoyaltyTier::Harvester > LoyaltyTier::Bloom);
        assert!(LoyaltyTier::Sprout > LoyaltyTier::None);
        assert_eq!(LoyaltyTier::Bloom.next(), Some(LoyaltyTier::Harvester));
        assert_eq!(LoyaltyTier::Harvester.next(), None);
        assert!(!LoyaltyTier::None.is_eligible());
    }

    #[test]
    fn test_reward_benefit_wire_format() {
        let benefit: RewardBenefit =
            serde_json::from_str(r#"{"type":"percentage","percent":10}"#).unwrap();
        assert_eq!(benefit, RewardBenefit::Percentage { percent: 10 });
        assert_eq!(benefit.reward_type(), RewardType::Discount);
        assert_eq!(RewardBenefit::Shipping.reward_type(), RewardType::Shipping);
    }

    #[test]
    fn test_has_awarded_ignores_non_purchase_entries() {
        let now = Utc::now();
        let mut account = LoyaltyAccount::new("u-1", now);
        account.points_history.push(PointsEntry {
            points: 5,
            source: PointsSource::Bonus,
            order_id: Some("o-9".to_string()),
            reward_id: None,
            created_at: now,
        });
        assert!(!account.has_awarded("o-9"));
    }
}

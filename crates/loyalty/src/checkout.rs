//! Checkout discount composer: merges at most one promo code and one usable
//! reward into a single discount. Composition is a preview and never
//! mutates anything; consumption happens on checkout confirmation.

use farmstand_core::loyalty::{
    ComposedDiscount, PromoDiscount, PromoPricing, RewardBenefit, UsableReward,
};

/// `subtotal * percent / 100`, rounded half up. Inputs are non-negative.
pub fn percent_of(subtotal_cents: i64, percent: u32) -> i64 {
    let scaled = i128::from(subtotal_cents) * i128::from(percent);
    ((scaled + 50) / 100) as i64
}

/// Compose a checkout discount. Both sources are priced against the
/// original subtotal and summed; the total never exceeds the subtotal.
pub fn compose_discount(
    subtotal_cents: i64,
    promo: Option<&PromoPricing>,
    reward: Option<&UsableReward>,
) -> ComposedDiscount {
    let subtotal = subtotal_cents.max(0);

    let promo_amount = promo
        .and_then(|p| p.discount.as_ref())
        .map(|discount| match *discount {
            PromoDiscount::Amount { amount_cents } => amount_cents.clamp(0, subtotal),
            PromoDiscount::Percentage { percent } => percent_of(subtotal, percent.min(100)),
        })
        .unwrap_or(0);

    let reward_amount = reward
        .map(|r| match r.benefit {
            RewardBenefit::Discount { amount_cents } => amount_cents.clamp(0, subtotal),
            RewardBenefit::Percentage { percent } => percent_of(subtotal, percent.min(100)),
            RewardBenefit::Shipping | RewardBenefit::Bonus { .. } => 0,
        })
        .unwrap_or(0);

    let discount = promo_amount.saturating_add(reward_amount).min(subtotal);

    let free_shipping = promo.is_some_and(|p| p.free_shipping)
        || reward.is_some_and(|r| r.benefit == RewardBenefit::Shipping);

    ComposedDiscount {
        subtotal_cents: subtotal,
        discount_amount_cents: discount,
        net_total_cents: subtotal - discount,
        free_shipping,
        applied_reward_name: reward.map(|r| r.reward_name.clone()),
        applied_reward_id: reward.map(|r| r.id),
        applied_promo_code: promo.map(|p| p.code.clone()),
        promo_rejection: None,
    }
}

//! Digital loyalty card lifecycle.

use crate::tier::TierPolicy;
use chrono::{DateTime, Utc};
use farmstand_core::loyalty::{DigitalCard, LoyaltyAccount, LoyaltyTier};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct CardManager {
    policy: Arc<TierPolicy>,
}

impl CardManager {
    pub fn new(policy: Arc<TierPolicy>) -> Self {
        Self { policy }
    }

    /// Inactive card shown to users without a tier. Never persisted.
    pub fn preview(&self, member_since: DateTime<Utc>, now: DateTime<Utc>) -> DigitalCard {
        let tier = LoyaltyTier::Sprout;
        DigitalCard {
            card_id: None,
            tier,
            theme: tier.card_theme().to_string(),
            discount_percentage: self.policy.discount_for(tier),
            is_active: false,
            member_since,
            issued_at: None,
            refreshed_at: now,
        }
    }

    /// Issue a card for an eligible account that has none, or refresh the
    /// existing one in place. Returns `None` for ineligible accounts
    /// without a card.
    pub fn issue_or_refresh(
        &self,
        account: &mut LoyaltyAccount,
        tier: LoyaltyTier,
        now: DateTime<Utc>,
    ) -> Option<DigitalCard> {
        if account.card.is_some() {
            return self.refresh(account, tier, now);
        }
        if !tier.is_eligible() {
            return None;
        }

        let card = DigitalCard {
            card_id: Some(new_card_id()),
            tier,
            theme: tier.card_theme().to_string(),
            discount_percentage: self.policy.discount_for(tier),
            is_active: true,
            member_since: account.created_at,
            issued_at: Some(now),
            refreshed_at: now,
        };

        metrics::counter!("loyalty.cards_issued").increment(1);
        info!(
            user_id = %account.user_id,
            card_id = card.card_id.as_deref().unwrap_or_default(),
            tier = ?tier,
            "Digital card issued"
        );

        account.card = Some(card.clone());
        account.updated_at = now;
        Some(card)
    }

    /// Whether `card` already shows `tier`, its discount and active state.
    pub fn is_current(&self, card: &DigitalCard, tier: LoyaltyTier) -> bool {
        card.tier == tier
            && card.discount_percentage == self.policy.discount_for(tier)
            && card.is_active == tier.is_eligible()
    }

    /// Refresh tier, theme and discount on an existing card. The card id is
    /// never touched, and an up-to-date card is returned unchanged.
    pub fn refresh(
        &self,
        account: &mut LoyaltyAccount,
        tier: LoyaltyTier,
        now: DateTime<Utc>,
    ) -> Option<DigitalCard> {
        if self.is_current(account.card.as_ref()?, tier) {
            return account.card.clone();
        }

        let discount_percentage = self.policy.discount_for(tier);
        let card = account.card.as_mut()?;
        card.tier = tier;
        card.theme = tier.card_theme().to_string();
        card.discount_percentage = discount_percentage;
        card.is_active = tier.is_eligible();
        card.refreshed_at = now;
        account.updated_at = now;
        Some(card.clone())
    }
}

/// `FS-` followed by twelve upper-case hex characters.
fn new_card_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("FS-{}", &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> CardManager {
        CardManager::new(Arc::new(TierPolicy::default()))
    }

    #[test]
    fn test_preview_for_ineligible() {
        let now = Utc::now();
        let manager = manager();
        let mut account = LoyaltyAccount::new("test-user", now);

        assert!(manager
            .issue_or_refresh(&mut account, LoyaltyTier::None, now)
            .is_none());
        assert!(account.card.is_none());

        let preview = manager.preview(account.created_at, now);
        assert!(preview.card_id.is_none());
        assert!(!preview.is_active);
        assert_eq!(preview.tier, LoyaltyTier::Sprout);
        assert_eq!(preview.discount_percentage, 5);
    }

    #[test]
    fn test_card_id_stable_across_tier_change() {
        let now = Utc::now();
        let manager = manager();
        let mut account = LoyaltyAccount::new("test-user", now);

        let issued = manager
            .issue_or_refresh(&mut account, LoyaltyTier::Sprout, now)
            .unwrap();
        let card_id = issued.card_id.clone().unwrap();
        assert!(card_id.starts_with("FS-"));
        assert_eq!(card_id.len(), 15);

        let refreshed = manager
            .issue_or_refresh(&mut account, LoyaltyTier::Bloom, now)
            .unwrap();
        assert_eq!(refreshed.card_id.as_deref(), Some(card_id.as_str()));
        assert_eq!(refreshed.tier, LoyaltyTier::Bloom);
        assert_eq!(refreshed.theme, "blossom");
        assert_eq!(refreshed.discount_percentage, 12);
        assert_eq!(refreshed.issued_at, issued.issued_at);
    }

    #[test]
    fn test_refresh_to_none_deactivates() {
        let now = Utc::now();
        let manager = manager();
        let mut account = LoyaltyAccount::new("test-user", now);
        manager.issue_or_refresh(&mut account, LoyaltyTier::Seedling, now);

        let card = manager.refresh(&mut account, LoyaltyTier::None, now).unwrap();
        assert!(!card.is_active);
        assert_eq!(card.discount_percentage, 0);
        assert!(account.card_issued());
    }

    #[test]
    fn test_refresh_same_tier_leaves_account_untouched() {
        let issued_at = Utc::now();
        let manager = manager();
        let mut account = LoyaltyAccount::new("test-user", issued_at);
        manager.issue_or_refresh(&mut account, LoyaltyTier::Cultivator, issued_at);
        let before = account.clone();

        let later = issued_at + chrono::Duration::hours(3);
        let card = manager
            .refresh(&mut account, LoyaltyTier::Cultivator, later)
            .unwrap();
        assert_eq!(card.refreshed_at, issued_at);
        assert_eq!(account, before);

        let card = manager
            .refresh(&mut account, LoyaltyTier::Bloom, later)
            .unwrap();
        assert_eq!(card.refreshed_at, later);
        assert_ne!(account, before);
    }
}

//! Promo code validation port and a configuration-backed implementation.
//!
//! Promo ownership, usage caps and campaign management belong to the promo
//! service. The engine only needs the priced outcome for a code.

use chrono::{DateTime, Utc};
use farmstand_core::loyalty::{PromoCodeDefinition, PromoDiscount, PromoOutcome, PromoPricing};
use farmstand_core::{LoyaltyError, LoyaltyResult};
use std::collections::HashMap;
use tracing::info;

/// Prices a promo code against a subtotal. Never errors for a bad code:
/// unknown, expired or ineligible codes come back as `Rejected`.
pub trait PromoValidator: Send + Sync {
    fn validate_and_price(&self, code: &str, subtotal_cents: i64, now: DateTime<Utc>)
        -> PromoOutcome;
}

/// Validator over a fixed set of codes loaded from configuration.
/// Codes match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPromoValidator {
    codes: HashMap<String, PromoCodeDefinition>,
}

impl ConfiguredPromoValidator {
    pub fn new(definitions: &[PromoCodeDefinition]) -> LoyaltyResult<Self> {
        let mut codes = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let key = normalize(&definition.code);
            if key.is_empty() {
                return Err(LoyaltyError::Config("promo code must not be empty".to_string()));
            }
            match definition.discount {
                Some(PromoDiscount::Amount { amount_cents }) if amount_cents < 0 => {
                    return Err(LoyaltyError::Config(format!(
                        "promo '{}' has a negative amount",
                        definition.code
                    )));
                }
                Some(PromoDiscount::Percentage { percent }) if percent > 100 => {
                    return Err(LoyaltyError::Config(format!(
                        "promo '{}' percentage {} exceeds 100",
                        definition.code, percent
                    )));
                }
                _ => {}
            }
            if codes.insert(key, definition.clone()).is_some() {
                return Err(LoyaltyError::Config(format!(
                    "duplicate promo code '{}'",
                    definition.code
                )));
            }
        }

        info!(codes = codes.len(), "Promo codes loaded");
        Ok(Self { codes })
    }
}

impl PromoValidator for ConfiguredPromoValidator {
    fn validate_and_price(
        &self,
        code: &str,
        subtotal_cents: i64,
        now: DateTime<Utc>,
    ) -> PromoOutcome {
        let Some(definition) = self.codes.get(&normalize(code)) else {
            return PromoOutcome::Rejected {
                reason: format!("Promo code {} is not valid", code.trim()),
            };
        };

        if definition.expires_at.is_some_and(|expires| now >= expires) {
            return PromoOutcome::Rejected {
                reason: format!("Promo code {} has expired", definition.code),
            };
        }

        if subtotal_cents < definition.min_subtotal_cents {
            return PromoOutcome::Rejected {
                reason: format!(
                    "Promo code {} requires a subtotal of at least {}",
                    definition.code, definition.min_subtotal_cents
                ),
            };
        }

        PromoOutcome::Accepted(PromoPricing {
            code: definition.code.clone(),
            discount: definition.discount.clone(),
            free_shipping: definition.free_shipping,
        })
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

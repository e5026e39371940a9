#![warn(clippy::unwrap_used)]

pub mod card;
pub mod catalog;
pub mod checkout;
pub mod engine;
pub mod ledger;
pub mod promo;
pub mod redemption;
pub mod store;
pub mod tier;

pub use catalog::RewardsCatalog;
pub use checkout::compose_discount;
pub use engine::{Clock, LoyaltyEngine, SystemClock};
pub use promo::{ConfiguredPromoValidator, PromoValidator};
pub use store::{AccountStore, InMemoryAccountStore};
pub use tier::TierPolicy;

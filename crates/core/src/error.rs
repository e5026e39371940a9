use thiserror::Error;
use uuid::Uuid;

pub type LoyaltyResult<T> = Result<T, LoyaltyError>;

#[derive(Error, Debug)]
pub enum LoyaltyError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient points: need {required}, have {available}")]
    InsufficientPoints { required: u64, available: u64 },

    #[error("Invalid amount: {0} (must be non-negative)")]
    InvalidAmount(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Reward {0} has already been consumed")]
    RewardAlreadyConsumed(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LoyaltyError {
    /// Stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LoyaltyError::NotFound(_) => "not_found",
            LoyaltyError::InsufficientPoints { .. } => "insufficient_points",
            LoyaltyError::InvalidAmount(_) => "invalid_amount",
            LoyaltyError::InvalidRequest(_) => "invalid_request",
            LoyaltyError::RewardAlreadyConsumed(_) => "reward_already_consumed",
            LoyaltyError::Config(_) => "config_error",
            LoyaltyError::Storage(_) => "storage_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_points_message() {
        let err = LoyaltyError::InsufficientPoints {
            required: 120,
            available: 45,
        };
        assert_eq!(err.to_string(), "Insufficient points: need 120, have 45");
        assert_eq!(err.code(), "insufficient_points");
    }
}

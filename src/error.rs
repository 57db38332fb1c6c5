use crate::domain::activity::ActivityDraft;
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::reward::RewardId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoyaltyError>;

#[derive(Error, Debug)]
pub enum LoyaltyError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),
    #[error("Reward not found: {0}")]
    RewardNotFound(RewardId),
    #[error("Reward is not available: {0}")]
    RewardUnavailable(RewardId),
    #[error("Insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: u64, required: u64 },
    #[error("Concurrent update on customer {0}")]
    Conflict(CustomerId),
    #[error("Customer already exists: {0}")]
    DuplicateCustomer(String),
    #[error("Activity reference already recorded: {0}")]
    DuplicateActivity(String),
    /// A first-credit-only award found the balance had already moved.
    #[error("Customer {0} already has balance history")]
    AlreadyCredited(CustomerId),
    /// The balance write committed but the activity row did not. The caller
    /// retries `insert_activity` with `draft`; re-running the award would
    /// double-credit.
    #[error("Balance committed for customer {} but activity was not recorded: {source}", .customer.id)]
    PartialWrite {
        customer: Box<Customer>,
        draft: Box<ActivityDraft>,
        #[source]
        source: Box<LoyaltyError>,
    },
    #[error("Persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Template configuration error: {0}")]
    Template(String),
    #[error("Notification delivery failed: {0}")]
    Notification(String),
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoyaltyError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into().into())
    }

    /// Only a lost compare-and-swap is worth re-running the cycle for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Text safe to show a customer or merchant. Store internals never leak.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InsufficientPoints { .. } => "You don't have enough points for this reward.",
            Self::RewardUnavailable(_) => "This reward is no longer available.",
            _ => "Something went wrong. Please try again later.",
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LoyaltyError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Persistence(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        let id = CustomerId::new();
        assert!(LoyaltyError::Conflict(id).is_retryable());
        assert!(!LoyaltyError::CustomerNotFound(id).is_retryable());
        assert!(
            !LoyaltyError::InsufficientPoints {
                balance: 1,
                required: 2
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_user_message_hides_store_details() {
        let err = LoyaltyError::persistence("connection refused on 10.0.0.3:5432");
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = LoyaltyError::InsufficientPoints {
            balance: 500,
            required: 800,
        };
        assert!(err.user_message().contains("enough points"));
    }
}

use super::ledger::commit_balance;
use super::retry::RetryPolicy;
use crate::domain::activity::{ActivityDetails, ActivityType};
use crate::domain::customer::{BalanceUpdate, Customer, CustomerId};
use crate::domain::notification::{NotificationEvent, NotificationPayload};
use crate::domain::ports::{DispatcherHandle, LedgerStoreHandle};
use crate::domain::reward::RewardId;
use crate::error::{LoyaltyError, Result};
use chrono::Utc;
use rand::Rng;
use tracing::{error, info};

const CODE_PREFIX: &str = "RWD-";
const CODE_LEN: usize = 9;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short, human-enterable redemption code, e.g. `RWD-7K2QX9M4B`.
pub fn generate_redemption_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub customer: Customer,
    pub code: String,
}

/// Spends points on catalog rewards.
///
/// Redemption is an internal ledger event: the issued code is honoured by the
/// merchant's own checkout and no external discount system is consulted.
#[derive(Clone)]
pub struct RedemptionEngine {
    store: LedgerStoreHandle,
    dispatcher: DispatcherHandle,
    retry: RetryPolicy,
}

impl RedemptionEngine {
    pub fn new(store: LedgerStoreHandle, dispatcher: DispatcherHandle) -> Self {
        Self {
            store,
            dispatcher,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Deducts the reward's cost and issues a redemption code.
    ///
    /// The balance check runs inside the compare-and-swap cycle, so two
    /// racing redemptions can never both spend the same points. A resulting
    /// tier downgrade is stored but not announced.
    pub async fn redeem(&self, customer_id: CustomerId, reward_id: &RewardId) -> Result<Redemption> {
        let reward = self
            .store
            .get_reward(reward_id)
            .await?
            .ok_or_else(|| LoyaltyError::RewardNotFound(reward_id.clone()))?;
        if !reward.available {
            return Err(LoyaltyError::RewardUnavailable(reward_id.clone()));
        }
        let cost = reward.points_cost;
        let delta = i64::try_from(cost).map(|c| -c).map_err(|_| {
            LoyaltyError::InvalidSettings(format!(
                "reward {reward_id} costs more points than a ledger entry can hold"
            ))
        })?;

        let committed = commit_balance(self.store.as_ref(), &self.retry, customer_id, |customer| {
            let balance = customer.points();
            if balance < cost {
                return Err(LoyaltyError::InsufficientPoints {
                    balance,
                    required: cost,
                });
            }
            Ok(BalanceUpdate::new(balance - cost, Utc::now()))
        })
        .await?;
        let customer = committed.after;

        let code = generate_redemption_code();
        let draft = ActivityDetails::new(ActivityType::Redemption, format!("Redeemed {}", reward.name))
            .with_reference(code.clone())
            .into_draft(customer_id, delta);
        if let Err(source) = self.store.insert_activity(draft.clone()).await {
            error!(%customer_id, %reward_id, error = %source, "activity insert failed after redemption");
            return Err(LoyaltyError::PartialWrite {
                customer: Box::new(customer),
                draft: Box::new(draft),
                source: Box::new(source),
            });
        }

        info!(
            %customer_id,
            %reward_id,
            cost,
            remaining = customer.points(),
            "reward redeemed"
        );

        self.dispatcher
            .dispatch(NotificationEvent::new(
                customer.clone(),
                NotificationPayload::RewardRedeemed {
                    reward_name: reward.name.clone(),
                    reward_code: code.clone(),
                    instructions: reward.instructions(&code),
                },
            ))
            .await;

        Ok(Redemption { customer, code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let code = generate_redemption_code();
        assert_eq!(code.len(), CODE_PREFIX.len() + CODE_LEN);
        assert!(code.starts_with(CODE_PREFIX));
        assert!(
            code[CODE_PREFIX.len()..]
                .bytes()
                .all(|b| CODE_ALPHABET.contains(&b))
        );
    }

    #[test]
    fn test_codes_differ() {
        let codes: std::collections::HashSet<_> =
            (0..1000).map(|_| generate_redemption_code()).collect();
        assert_eq!(codes.len(), 1000);
    }
}

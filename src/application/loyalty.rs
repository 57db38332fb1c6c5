use super::ledger::commit_balance;
use super::retry::RetryPolicy;
use crate::domain::activity::{Activity, ActivityDetails, ActivityType};
use crate::domain::customer::{BalanceUpdate, Customer, CustomerId};
use crate::domain::notification::{NotificationEvent, NotificationPayload};
use crate::domain::ports::{DispatcherHandle, LedgerStoreHandle};
use crate::domain::tier::benefits_for;
use crate::error::{LoyaltyError, Result};
use chrono::Utc;
use tracing::{error, info};

/// Result of a committed award.
#[derive(Debug, Clone, PartialEq)]
pub struct Award {
    pub customer: Customer,
    pub activity: Activity,
}

/// Applies point accruals (and signed adjustments) to customer balances.
///
/// Constructed by the host with explicit store and dispatcher handles;
/// cloning shares them.
#[derive(Clone)]
pub struct LoyaltyEngine {
    store: LedgerStoreHandle,
    dispatcher: DispatcherHandle,
    retry: RetryPolicy,
}

impl LoyaltyEngine {
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

    /// Adds `points` to the customer's balance, records the activity and
    /// notifies the customer.
    ///
    /// A draft whose reference is already on record is refused with
    /// `LoyaltyError::DuplicateActivity` before the balance moves. The balance
    /// write is authoritative. If the activity insert fails after it,
    /// `LoyaltyError::PartialWrite` is returned and no notification is sent;
    /// retry the insert, not the award. Deduplicating redelivered events is
    /// the ingestion layer's job, not this method's.
    pub async fn award_points(
        &self,
        customer_id: CustomerId,
        points: i64,
        details: ActivityDetails,
    ) -> Result<Award> {
        self.award(customer_id, points, details, false).await
    }

    /// Like [`award_points`](Self::award_points), but only while the
    /// customer's balance has never moved (version 0). Otherwise fails with
    /// `LoyaltyError::AlreadyCredited`. The check runs inside the
    /// compare-and-swap cycle, so racing sign-ups credit at most once.
    pub async fn award_welcome(
        &self,
        customer_id: CustomerId,
        points: i64,
        details: ActivityDetails,
    ) -> Result<Award> {
        self.award(customer_id, points, details, true).await
    }

    async fn award(
        &self,
        customer_id: CustomerId,
        points: i64,
        details: ActivityDetails,
        first_credit_only: bool,
    ) -> Result<Award> {
        if let Some(reference) = &details.reference
            && self.store.activity_by_reference(reference).await?.is_some()
        {
            return Err(LoyaltyError::DuplicateActivity(reference.clone()));
        }

        let kind = details.r#type;
        let committed = commit_balance(self.store.as_ref(), &self.retry, customer_id, |customer| {
            if first_credit_only && customer.version() != 0 {
                return Err(LoyaltyError::AlreadyCredited(customer_id));
            }
            let balance = customer.points();
            let total = balance.checked_add_signed(points).ok_or_else(|| {
                if points < 0 {
                    LoyaltyError::InsufficientPoints {
                        balance,
                        required: points.unsigned_abs(),
                    }
                } else {
                    LoyaltyError::InvalidEvent(format!("point total overflow for {customer_id}"))
                }
            })?;
            let update = BalanceUpdate::new(total, Utc::now());
            Ok(match kind {
                ActivityType::Purchase => update.with_purchase(),
                ActivityType::Referral => update.with_referral(),
                _ => update,
            })
        })
        .await?;
        let (before, after) = (committed.before, committed.after);

        let draft = details.into_draft(customer_id, points);
        let activity = match self.store.insert_activity(draft.clone()).await {
            Ok(activity) => activity,
            Err(source) => {
                error!(%customer_id, error = %source, "activity insert failed after balance commit");
                return Err(LoyaltyError::PartialWrite {
                    customer: Box::new(after),
                    draft: Box::new(draft),
                    source: Box::new(source),
                });
            }
        };

        info!(
            %customer_id,
            points,
            total = after.points(),
            tier = %after.tier(),
            "points awarded"
        );

        self.dispatcher
            .dispatch(NotificationEvent::new(
                after.clone(),
                NotificationPayload::PointsEarned {
                    points,
                    total_points: after.points(),
                    activity: activity.clone(),
                },
            ))
            .await;

        // Only a strictly higher rank is announced; downgrades stay silent.
        if after.tier() > before.tier() {
            self.dispatcher
                .dispatch(NotificationEvent::new(
                    after.clone(),
                    NotificationPayload::TierUpgrade {
                        old_tier: before.tier(),
                        new_tier: after.tier(),
                        benefits: benefits_for(after.tier()),
                    },
                ))
                .await;
        }

        Ok(Award {
            customer: after,
            activity,
        })
    }

    /// Current state of one customer.
    pub async fn customer(&self, customer_id: CustomerId) -> Result<Customer> {
        self.store
            .get_customer(customer_id)
            .await?
            .ok_or(LoyaltyError::CustomerNotFound(customer_id))
    }

    /// The customer's audit trail, oldest first.
    pub async fn history(&self, customer_id: CustomerId) -> Result<Vec<Activity>> {
        self.store.activities_for(customer_id).await
    }
}

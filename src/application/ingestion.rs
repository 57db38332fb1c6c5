//! Translates commerce-platform events into ledger mutations.
//!
//! Platforms deliver webhooks at least once. Each event is claimed under the
//! key `event:<event_id>` before any mutation, so a redelivery becomes a
//! no-op rather than a `DuplicateActivity` refusal. A failed event releases
//! its claim so the next delivery can try again. Whether the program is
//! active lives in the store, so an uninstall outlasts the process.

use super::loyalty::LoyaltyEngine;
use super::redemption::RedemptionEngine;
use crate::config::ProgramSettings;
use crate::domain::activity::{ActivityDetails, ActivityType};
use crate::domain::customer::{Customer, NewCustomer};
use crate::domain::notification::{NotificationEvent, NotificationPayload};
use crate::domain::ports::{DispatcherHandle, LedgerStoreHandle};
use crate::domain::reward::RewardId;
use crate::error::{LoyaltyError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    OrderCreated {
        event_id: String,
        email: String,
        name: String,
        order_number: u64,
        total: Decimal,
    },
    CustomerCreated {
        event_id: String,
        email: String,
        name: String,
    },
    ReferralCompleted {
        event_id: String,
        referrer_email: String,
        referred_name: String,
    },
    RewardRedeemed {
        event_id: String,
        email: String,
        reward_id: RewardId,
    },
    AppUninstalled {
        event_id: String,
    },
}

impl PlatformEvent {
    pub fn event_id(&self) -> &str {
        match self {
            PlatformEvent::OrderCreated { event_id, .. }
            | PlatformEvent::CustomerCreated { event_id, .. }
            | PlatformEvent::ReferralCompleted { event_id, .. }
            | PlatformEvent::RewardRedeemed { event_id, .. }
            | PlatformEvent::AppUninstalled { event_id } => event_id,
        }
    }

    /// Deduplication key shared by the claim table and activity references.
    pub fn idempotency_key(&self) -> String {
        format!("event:{}", self.event_id())
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Points were credited. `code` is set for redemptions.
    Applied {
        customer: Customer,
        code: Option<String>,
    },
    /// Processed, but nothing changed on the ledger (e.g. a zero-point order).
    NoChange,
    /// The event key was already claimed by an earlier delivery.
    Duplicate,
    /// Skipped because the program was deactivated earlier.
    Inactive,
    /// This event deactivated the program.
    Deactivated,
}

pub struct IngestionService {
    store: LedgerStoreHandle,
    dispatcher: DispatcherHandle,
    loyalty: LoyaltyEngine,
    redemption: RedemptionEngine,
    settings: ProgramSettings,
}

impl IngestionService {
    pub fn new(store: LedgerStoreHandle, dispatcher: DispatcherHandle, settings: ProgramSettings) -> Self {
        let retry = settings.retry.policy();
        Self {
            loyalty: LoyaltyEngine::new(store.clone(), dispatcher.clone()).with_retry_policy(retry),
            redemption: RedemptionEngine::new(store.clone(), dispatcher.clone()).with_retry_policy(retry),
            store,
            dispatcher,
            settings,
        }
    }

    /// Writes the configured reward catalog to the store.
    pub async fn seed_rewards(&self) -> Result<()> {
        for reward in &self.settings.rewards {
            self.store.put_reward(reward.clone()).await?;
        }
        Ok(())
    }

    pub async fn is_active(&self) -> Result<bool> {
        self.store.program_active().await
    }

    pub fn loyalty(&self) -> &LoyaltyEngine {
        &self.loyalty
    }

    pub fn redemption(&self) -> &RedemptionEngine {
        &self.redemption
    }

    pub async fn handle(&self, event: PlatformEvent) -> Result<IngestOutcome> {
        if !self.is_active().await? {
            info!(event_id = event.event_id(), "program inactive, skipping event");
            return Ok(IngestOutcome::Inactive);
        }
        // Deactivating twice is harmless, so uninstalls skip the claim table.
        if let PlatformEvent::AppUninstalled { event_id } = &event {
            return self.deactivate(event_id).await;
        }

        let key = event.idempotency_key();
        if !self.store.claim_event(&key).await? {
            info!(event_id = event.event_id(), "duplicate delivery ignored");
            return Ok(IngestOutcome::Duplicate);
        }

        match self.apply(event, &key).await {
            Ok(outcome) => Ok(outcome),
            // The balance already moved; a redelivery must not credit again.
            Err(e @ LoyaltyError::PartialWrite { .. }) => Err(e),
            Err(e) => {
                if let Err(release) = self.store.release_event(&key).await {
                    warn!(%key, error = %release, "could not release event claim");
                }
                Err(e)
            }
        }
    }

    async fn apply(&self, event: PlatformEvent, key: &str) -> Result<IngestOutcome> {
        match event {
            PlatformEvent::OrderCreated {
                email,
                name,
                order_number,
                total,
                ..
            } => {
                let customer = self.find_or_create(&email, &name).await?;
                let points = self.points_for(total);
                if points == 0 {
                    debug!(order_number, %total, "order earns no points");
                    return Ok(IngestOutcome::NoChange);
                }
                let details = ActivityDetails::new(ActivityType::Purchase, format!("Order #{order_number}"))
                    .with_reference(key);
                let award = self.loyalty.award_points(customer.id, points, details).await?;
                Ok(IngestOutcome::Applied {
                    customer: award.customer,
                    code: None,
                })
            }
            PlatformEvent::CustomerCreated { email, name, .. } => {
                let customer = self.find_or_create(&email, &name).await?;
                let welcome = self.settings.welcome_points;
                if welcome == 0 {
                    return Ok(IngestOutcome::NoChange);
                }
                let details =
                    ActivityDetails::new(ActivityType::Welcome, "Welcome bonus").with_reference(key);
                match self
                    .loyalty
                    .award_welcome(customer.id, to_delta(welcome)?, details)
                    .await
                {
                    Ok(award) => Ok(IngestOutcome::Applied {
                        customer: award.customer,
                        code: None,
                    }),
                    Err(LoyaltyError::AlreadyCredited(customer_id)) => {
                        debug!(%customer_id, "existing customer, no welcome bonus");
                        Ok(IngestOutcome::NoChange)
                    }
                    Err(e) => Err(e),
                }
            }
            PlatformEvent::ReferralCompleted {
                referrer_email,
                referred_name,
                ..
            } => {
                let referrer = self
                    .store
                    .get_customer_by_email(&referrer_email)
                    .await?
                    .ok_or_else(|| LoyaltyError::InvalidEvent(format!("unknown referrer {referrer_email}")))?;
                let points = self.settings.referral_points;
                if points == 0 {
                    debug!(referrer_id = %referrer.id, "referral program awards no points");
                    return Ok(IngestOutcome::NoChange);
                }
                let details = ActivityDetails::new(ActivityType::Referral, format!("Referred {referred_name}"))
                    .with_reference(key);
                let award = self
                    .loyalty
                    .award_points(referrer.id, to_delta(points)?, details)
                    .await?;
                self.dispatcher
                    .dispatch(NotificationEvent::new(
                        award.customer.clone(),
                        NotificationPayload::ReferralSuccess {
                            referred_name,
                            points,
                        },
                    ))
                    .await;
                Ok(IngestOutcome::Applied {
                    customer: award.customer,
                    code: None,
                })
            }
            PlatformEvent::RewardRedeemed { email, reward_id, .. } => {
                let customer = self
                    .store
                    .get_customer_by_email(&email)
                    .await?
                    .ok_or_else(|| LoyaltyError::InvalidEvent(format!("unknown customer {email}")))?;
                let redemption = self.redemption.redeem(customer.id, &reward_id).await?;
                Ok(IngestOutcome::Applied {
                    customer: redemption.customer,
                    code: Some(redemption.code),
                })
            }
            PlatformEvent::AppUninstalled { event_id } => self.deactivate(&event_id).await,
        }
    }

    async fn deactivate(&self, event_id: &str) -> Result<IngestOutcome> {
        self.store.set_program_active(false).await?;
        warn!(event_id, "app uninstalled, program deactivated");
        Ok(IngestOutcome::Deactivated)
    }

    /// Returns the customer for `email`, opening an account if needed.
    async fn find_or_create(&self, email: &str, name: &str) -> Result<Customer> {
        if let Some(customer) = self.store.get_customer_by_email(email).await? {
            return Ok(customer);
        }
        match self
            .store
            .insert_customer(NewCustomer::new(email, name.trim()))
            .await
        {
            Ok(customer) => {
                info!(customer_id = %customer.id, "customer enrolled");
                Ok(customer)
            }
            // Lost a race with a concurrent enrolment of the same email
            Err(LoyaltyError::DuplicateCustomer(_)) => self
                .store
                .get_customer_by_email(email)
                .await?
                .ok_or_else(|| LoyaltyError::persistence(format!("customer {email} vanished"))),
            Err(e) => Err(e),
        }
    }

    fn points_for(&self, total: Decimal) -> i64 {
        (total * self.settings.points_rate)
            .floor()
            .to_i64()
            .unwrap_or(0)
            .max(0)
    }
}

fn to_delta(points: u64) -> Result<i64> {
    i64::try_from(points)
        .map_err(|_| LoyaltyError::InvalidSettings(format!("{points} points exceeds a ledger entry")))
}

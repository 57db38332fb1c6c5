use super::activity::{Activity, ActivityDraft};
use super::customer::{BalanceUpdate, Customer, CustomerId, NewCustomer};
use super::notification::{NotificationEvent, NotificationKind};
use super::reward::{Reward, RewardId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable record of customers, their activities and the reward catalog.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;
    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer>;
    /// Writes `update` to the record. With `Some(version)` the write only
    /// lands if the stored version still matches, else `LoyaltyError::Conflict`.
    async fn update_customer(
        &self,
        id: CustomerId,
        update: BalanceUpdate,
        expected_version: Option<u64>,
    ) -> Result<Customer>;
    async fn all_customers(&self) -> Result<Vec<Customer>>;

    /// Appends to the audit trail. A draft whose reference is already on
    /// record fails with `LoyaltyError::DuplicateActivity` and writes nothing.
    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity>;
    async fn activity_by_reference(&self, reference: &str) -> Result<Option<Activity>>;
    async fn activities_for(&self, customer_id: CustomerId) -> Result<Vec<Activity>>;

    async fn get_reward(&self, id: &RewardId) -> Result<Option<Reward>>;
    async fn put_reward(&self, reward: Reward) -> Result<()>;

    /// Atomically marks an inbound event key as seen. `false` means some
    /// earlier delivery already claimed it.
    async fn claim_event(&self, key: &str) -> Result<bool>;
    async fn release_event(&self, key: &str) -> Result<()>;

    /// Whether the program is running. A fresh store reports `true`.
    async fn program_active(&self) -> Result<bool>;
    async fn set_program_active(&self, active: bool) -> Result<()>;
}

/// Best-effort fan-out of notification events. Never fails the caller.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: NotificationEvent);
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub to: String,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

/// Transport that actually delivers rendered messages (email, push, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: OutboundMessage) -> Result<()>;
}

pub type LedgerStoreHandle = Arc<dyn LedgerStore>;
pub type DispatcherHandle = Arc<dyn NotificationDispatcher>;
pub type NotificationSinkBox = Box<dyn NotificationSink>;

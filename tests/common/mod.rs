#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use loyalty_ledger::domain::activity::{Activity, ActivityDraft};
use loyalty_ledger::domain::customer::{BalanceUpdate, Customer, CustomerId, NewCustomer};
use loyalty_ledger::domain::notification::{NotificationEvent, NotificationKind};
use loyalty_ledger::domain::ports::{
    LedgerStore, NotificationDispatcher, NotificationSink, OutboundMessage,
};
use loyalty_ledger::domain::reward::{Reward, RewardId, RewardType};
use loyalty_ledger::error::{LoyaltyError, Result};
use loyalty_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Dispatcher that keeps every event it is handed.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<NotificationEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }
}

#[async_trait]
impl NotificationDispatcher for Recorder {
    async fn dispatch(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Sink that keeps every rendered message.
#[derive(Clone, Default)]
pub struct Outbox(pub Arc<Mutex<Vec<OutboundMessage>>>);

impl Outbox {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for Outbox {
    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        self.0.lock().unwrap().push(message);
        Ok(())
    }
}

/// Wraps the in-memory store with injectable faults.
///
/// `rival_writes` conditional updates each get a competing write slipped in
/// just before them, so they lose their compare-and-swap. With
/// `fail_activities` set every activity insert fails.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryLedgerStore,
    rival_writes: AtomicU32,
    fail_activities: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: InMemoryLedgerStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn with_rival_writes(self, count: u32) -> Self {
        self.rival_writes.store(count, Ordering::SeqCst);
        self
    }

    pub fn fail_activities(&self, fail: bool) {
        self.fail_activities.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        self.inner.get_customer(id).await
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        self.inner.get_customer_by_email(email).await
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer> {
        self.inner.insert_customer(customer).await
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: BalanceUpdate,
        expected_version: Option<u64>,
    ) -> Result<Customer> {
        let rival = expected_version.is_some()
            && self
                .rival_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if rival && let Some(current) = self.inner.get_customer(id).await? {
            self.inner
                .update_customer(id, BalanceUpdate::new(current.points(), Utc::now()), None)
                .await?;
        }
        self.inner.update_customer(id, update, expected_version).await
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        self.inner.all_customers().await
    }

    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity> {
        if self.fail_activities.load(Ordering::SeqCst) {
            return Err(LoyaltyError::persistence("activity log unavailable"));
        }
        self.inner.insert_activity(draft).await
    }

    async fn activity_by_reference(&self, reference: &str) -> Result<Option<Activity>> {
        self.inner.activity_by_reference(reference).await
    }

    async fn activities_for(&self, customer_id: CustomerId) -> Result<Vec<Activity>> {
        self.inner.activities_for(customer_id).await
    }

    async fn get_reward(&self, id: &RewardId) -> Result<Option<Reward>> {
        self.inner.get_reward(id).await
    }

    async fn put_reward(&self, reward: Reward) -> Result<()> {
        self.inner.put_reward(reward).await
    }

    async fn claim_event(&self, key: &str) -> Result<bool> {
        self.inner.claim_event(key).await
    }

    async fn release_event(&self, key: &str) -> Result<()> {
        self.inner.release_event(key).await
    }

    async fn program_active(&self) -> Result<bool> {
        self.inner.program_active().await
    }

    async fn set_program_active(&self, active: bool) -> Result<()> {
        self.inner.set_program_active(active).await
    }
}

/// Enrols a customer and sets the starting balance without recording an
/// activity.
pub async fn seed_customer(store: &dyn LedgerStore, email: &str, points: u64) -> Customer {
    let customer = store
        .insert_customer(NewCustomer::new(email, "Ana"))
        .await
        .unwrap();
    if points == 0 {
        return customer;
    }
    store
        .update_customer(customer.id, BalanceUpdate::new(points, Utc::now()), None)
        .await
        .unwrap()
}

pub fn discount_reward(id: &str, points_cost: u64) -> Reward {
    Reward {
        id: RewardId::from(id),
        name: format!("{points_cost} point discount"),
        description: String::new(),
        points_cost,
        r#type: RewardType::Discount,
        value: dec!(10),
        available: true,
    }
}

use crate::domain::activity::{Activity, ActivityDraft};
use crate::domain::customer::{BalanceUpdate, Customer, CustomerId, NewCustomer, email_key};
use crate::domain::ports::LedgerStore;
use crate::domain::reward::{Reward, RewardId};
use crate::error::{LoyaltyError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct CustomerTable {
    by_id: HashMap<CustomerId, Customer>,
    by_email: HashMap<String, CustomerId>,
}

#[derive(Default)]
struct ActivityLog {
    rows: Vec<Activity>,
    by_reference: HashMap<String, usize>,
}

/// A thread-safe in-memory ledger store.
///
/// Each table sits behind its own `Arc<RwLock<..>>`; the customer
/// compare-and-swap runs entirely under the customer table's write lock.
/// Ideal for testing or single-process runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    customers: Arc<RwLock<CustomerTable>>,
    activities: Arc<RwLock<ActivityLog>>,
    rewards: Arc<RwLock<HashMap<RewardId, Reward>>>,
    events: Arc<RwLock<HashSet<String>>>,
    deactivated: Arc<RwLock<bool>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a customer record as-is, replacing any previous one with the
    /// same id. Used to seed fixtures.
    pub async fn restore_customer(&self, customer: Customer) {
        let mut table = self.customers.write().await;
        table.by_email.insert(email_key(&customer.email), customer.id);
        table.by_id.insert(customer.id, customer);
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let table = self.customers.read().await;
        Ok(table.by_id.get(&id).cloned())
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let table = self.customers.read().await;
        Ok(table
            .by_email
            .get(&email_key(email))
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut table = self.customers.write().await;
        let key = email_key(&customer.email);
        if table.by_email.contains_key(&key) {
            return Err(LoyaltyError::DuplicateCustomer(customer.email));
        }
        let customer = Customer::open(customer, Utc::now());
        table.by_email.insert(key, customer.id);
        table.by_id.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: BalanceUpdate,
        expected_version: Option<u64>,
    ) -> Result<Customer> {
        let mut table = self.customers.write().await;
        let customer = table
            .by_id
            .get_mut(&id)
            .ok_or(LoyaltyError::CustomerNotFound(id))?;
        if let Some(expected) = expected_version
            && customer.version() != expected
        {
            return Err(LoyaltyError::Conflict(id));
        }
        customer.apply(&update);
        Ok(customer.clone())
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        let table = self.customers.read().await;
        Ok(table.by_id.values().cloned().collect())
    }

    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity> {
        let mut log = self.activities.write().await;
        if let Some(reference) = &draft.reference
            && log.by_reference.contains_key(reference)
        {
            return Err(LoyaltyError::DuplicateActivity(reference.clone()));
        }
        let activity = Activity::record(draft, Utc::now());
        if let Some(reference) = &activity.reference {
            let index = log.rows.len();
            log.by_reference.insert(reference.clone(), index);
        }
        log.rows.push(activity.clone());
        Ok(activity)
    }

    async fn activity_by_reference(&self, reference: &str) -> Result<Option<Activity>> {
        let log = self.activities.read().await;
        Ok(log
            .by_reference
            .get(reference)
            .map(|&index| log.rows[index].clone()))
    }

    async fn activities_for(&self, customer_id: CustomerId) -> Result<Vec<Activity>> {
        let log = self.activities.read().await;
        Ok(log
            .rows
            .iter()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn get_reward(&self, id: &RewardId) -> Result<Option<Reward>> {
        let rewards = self.rewards.read().await;
        Ok(rewards.get(id).cloned())
    }

    async fn put_reward(&self, reward: Reward) -> Result<()> {
        let mut rewards = self.rewards.write().await;
        rewards.insert(reward.id.clone(), reward);
        Ok(())
    }

    async fn claim_event(&self, key: &str) -> Result<bool> {
        let mut events = self.events.write().await;
        Ok(events.insert(key.to_string()))
    }

    async fn release_event(&self, key: &str) -> Result<()> {
        let mut events = self.events.write().await;
        events.remove(key);
        Ok(())
    }

    async fn program_active(&self) -> Result<bool> {
        Ok(!*self.deactivated.read().await)
    }

    async fn set_program_active(&self, active: bool) -> Result<()> {
        *self.deactivated.write().await = !active;
        Ok(())
    }
}

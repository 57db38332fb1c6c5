use crate::domain::activity::{Activity, ActivityDraft};
use crate::domain::customer::{BalanceUpdate, Customer, CustomerId, NewCustomer, email_key};
use crate::domain::ports::LedgerStore;
use crate::domain::reward::{Reward, RewardId};
use crate::error::{LoyaltyError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for customer records, keyed by customer id.
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family mapping normalized email to customer id.
pub const CF_EMAILS: &str = "emails";
/// Column Family for activities, keyed by customer id then activity id.
pub const CF_ACTIVITIES: &str = "activities";
/// Column Family mapping an activity reference to its activity key.
pub const CF_REFERENCES: &str = "references";
/// Column Family for the reward catalog.
pub const CF_REWARDS: &str = "rewards";
/// Column Family for claimed inbound event keys.
pub const CF_EVENTS: &str = "events";
/// Column Family for program-wide state such as the active flag.
pub const CF_PROGRAM: &str = "program";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_CUSTOMERS,
    CF_EMAILS,
    CF_ACTIVITIES,
    CF_REFERENCES,
    CF_REWARDS,
    CF_EVENTS,
    CF_PROGRAM,
];

const ACTIVE_KEY: &[u8] = b"active";

/// A persistent ledger store using RocksDB.
///
/// Every entity lives in its own Column Family. RocksDB has no
/// compare-and-swap, so read-check-write sequences run under `write_lock`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LoyaltyError::persistence(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, encode(value)?)?;
        Ok(())
    }

    fn load_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        self.get_json(CF_CUSTOMERS, id.0.as_bytes())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| LoyaltyError::Persistence(Box::new(e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| LoyaltyError::Persistence(Box::new(e)))
}

fn activity_key(customer_id: CustomerId, activity: &Activity) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(customer_id.0.as_bytes());
    key.extend_from_slice(activity.id.0.as_bytes());
    key
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        self.load_customer(id)
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let cf = self.cf(CF_EMAILS)?;
        let Some(bytes) = self.db.get_cf(cf, email_key(email).as_bytes())? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&bytes).map_err(|e| LoyaltyError::Persistence(Box::new(e)))?;
        self.load_customer(CustomerId(id))
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let _guard = self.write_lock.lock().await;

        let key = email_key(&customer.email);
        let emails = self.cf(CF_EMAILS)?;
        if self.db.get_pinned_cf(emails, key.as_bytes())?.is_some() {
            return Err(LoyaltyError::DuplicateCustomer(customer.email));
        }

        let customer = Customer::open(customer, Utc::now());
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_CUSTOMERS)?, customer.id.0.as_bytes(), encode(&customer)?);
        batch.put_cf(emails, key.as_bytes(), customer.id.0.as_bytes());
        self.db.write(batch)?;

        Ok(customer)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: BalanceUpdate,
        expected_version: Option<u64>,
    ) -> Result<Customer> {
        let _guard = self.write_lock.lock().await;

        let mut customer = self
            .load_customer(id)?
            .ok_or(LoyaltyError::CustomerNotFound(id))?;
        if let Some(expected) = expected_version
            && customer.version() != expected
        {
            return Err(LoyaltyError::Conflict(id));
        }
        customer.apply(&update);
        self.put_json(CF_CUSTOMERS, id.0.as_bytes(), &customer)?;

        Ok(customer)
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        let cf = self.cf(CF_CUSTOMERS)?;
        let mut customers = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            customers.push(decode(&value)?);
        }
        Ok(customers)
    }

    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity> {
        let _guard = self.write_lock.lock().await;

        let references = self.cf(CF_REFERENCES)?;
        if let Some(reference) = &draft.reference
            && self.db.get_pinned_cf(references, reference.as_bytes())?.is_some()
        {
            return Err(LoyaltyError::DuplicateActivity(reference.clone()));
        }

        let activity = Activity::record(draft, Utc::now());
        let key = activity_key(activity.customer_id, &activity);
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ACTIVITIES)?, &key, encode(&activity)?);
        if let Some(reference) = &activity.reference {
            batch.put_cf(references, reference.as_bytes(), &key);
        }
        self.db.write(batch)?;

        Ok(activity)
    }

    async fn activity_by_reference(&self, reference: &str) -> Result<Option<Activity>> {
        let references = self.cf(CF_REFERENCES)?;
        let Some(key) = self.db.get_cf(references, reference.as_bytes())? else {
            return Ok(None);
        };
        self.get_json::<Activity>(CF_ACTIVITIES, &key)?
            .map(Some)
            .ok_or_else(|| LoyaltyError::persistence(format!("dangling reference {reference}")))
    }

    async fn activities_for(&self, customer_id: CustomerId) -> Result<Vec<Activity>> {
        let cf = self.cf(CF_ACTIVITIES)?;
        let prefix = customer_id.0.as_bytes();
        let mut activities = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            activities.push(decode(&value)?);
        }
        Ok(activities)
    }

    async fn get_reward(&self, id: &RewardId) -> Result<Option<Reward>> {
        self.get_json(CF_REWARDS, id.0.as_bytes())
    }

    async fn put_reward(&self, reward: Reward) -> Result<()> {
        self.put_json(CF_REWARDS, reward.id.0.as_bytes(), &reward)
    }

    async fn claim_event(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let cf = self.cf(CF_EVENTS)?;
        if self.db.get_pinned_cf(cf, key.as_bytes())?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, key.as_bytes(), b"")?;
        Ok(true)
    }

    async fn release_event(&self, key: &str) -> Result<()> {
        let cf = self.cf(CF_EVENTS)?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }

    async fn program_active(&self) -> Result<bool> {
        Ok(self.get_json(CF_PROGRAM, ACTIVE_KEY)?.unwrap_or(true))
    }

    async fn set_program_active(&self, active: bool) -> Result<()> {
        self.put_json(CF_PROGRAM, ACTIVE_KEY, &active)
    }
}

use crate::domain::notification::{NotificationEvent, NotificationPayload};
use crate::domain::ports::{DispatcherHandle, LedgerStoreHandle};
use crate::error::Result;
use chrono::NaiveDate;
use tracing::info;

/// Sends `birthdayComing` notifications. Read-only with respect to the ledger.
pub struct BirthdayReminders {
    store: LedgerStoreHandle,
    dispatcher: DispatcherHandle,
}

impl BirthdayReminders {
    pub fn new(store: LedgerStoreHandle, dispatcher: DispatcherHandle) -> Self {
        Self { store, dispatcher }
    }

    /// Notifies every customer whose birthday is within `window_days` of
    /// `today` (inclusive). Returns how many events were dispatched.
    pub async fn run(&self, today: NaiveDate, window_days: u32) -> Result<usize> {
        let mut sent = 0;
        for customer in self.store.all_customers().await? {
            let Some(days_until) = customer.days_until_birthday(today) else {
                continue;
            };
            if days_until > window_days {
                continue;
            }
            self.dispatcher
                .dispatch(NotificationEvent::new(
                    customer,
                    NotificationPayload::BirthdayComing { days_until },
                ))
                .await;
            sent += 1;
        }
        info!(%today, window_days, sent, "birthday reminders dispatched");
        Ok(sent)
    }
}

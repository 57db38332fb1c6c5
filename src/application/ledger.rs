use super::retry::RetryPolicy;
use crate::domain::customer::{BalanceUpdate, Customer, CustomerId};
use crate::domain::ports::LedgerStore;
use crate::error::{LoyaltyError, Result};
use tracing::{debug, warn};

/// A customer record just before and just after a committed balance write.
#[derive(Debug, Clone)]
pub(crate) struct Committed {
    pub before: Customer,
    pub after: Customer,
}

/// Runs read → compute → conditional write against one customer record.
///
/// `compute` sees the freshly read state each attempt and may refuse with an
/// error, which is returned as-is. A lost compare-and-swap restarts the whole
/// cycle until `policy` is exhausted, then surfaces `Conflict`.
pub(crate) async fn commit_balance<F>(
    store: &dyn LedgerStore,
    policy: &RetryPolicy,
    customer_id: CustomerId,
    mut compute: F,
) -> Result<Committed>
where
    F: FnMut(&Customer) -> Result<BalanceUpdate>,
{
    let mut attempt = 1;
    loop {
        let before = store
            .get_customer(customer_id)
            .await?
            .ok_or(LoyaltyError::CustomerNotFound(customer_id))?;
        let update = compute(&before)?;

        match store
            .update_customer(customer_id, update, Some(before.version()))
            .await
        {
            Ok(after) => {
                debug!(%customer_id, attempt, version = after.version(), "balance committed");
                return Ok(Committed { before, after });
            }
            Err(e) if e.is_retryable() && policy.should_retry(attempt) => {
                warn!(%customer_id, attempt, "balance write lost a concurrent update, retrying");
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Application layer orchestrating the ledger.
//!
//! `LoyaltyEngine` and `RedemptionEngine` are the two mutation paths. Both
//! run their read-compute-write cycle through `ledger::commit_balance`, which
//! serializes writers per customer with the store's compare-and-swap and
//! retries lost races. Notifications are dispatched after the commit and can
//! never undo it.

pub mod ingestion;
mod ledger;
pub mod loyalty;
pub mod notifications;
pub mod redemption;
pub mod reminders;
pub mod retry;
pub mod templates;

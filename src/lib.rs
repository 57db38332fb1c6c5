//! Loyalty points ledger and tier-transition engine.
//!
//! Customers accrue points through [`application::loyalty::LoyaltyEngine`],
//! spend them through [`application::redemption::RedemptionEngine`], and
//! move between tiers as a pure function of their balance
//! ([`domain::tier::tier_for`]). Storage and notification delivery sit behind
//! the ports in [`domain::ports`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

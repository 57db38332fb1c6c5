//! CSV batch interface: platform events in, customer ledger out.

pub mod customer_writer;
pub mod event_reader;

//! Domain types and the ports the application layer talks through.

pub mod activity;
pub mod customer;
pub mod notification;
pub mod ports;
pub mod reward;
pub mod tier;

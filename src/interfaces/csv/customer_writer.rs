use crate::domain::customer::{Customer, CustomerId};
use crate::domain::tier::Tier;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CustomerRow<'a> {
    id: CustomerId,
    email: &'a str,
    name: &'a str,
    points: u64,
    tier: Tier,
    referrals: u32,
}

impl<'a> From<&'a Customer> for CustomerRow<'a> {
    fn from(customer: &'a Customer) -> Self {
        Self {
            id: customer.id,
            email: &customer.email,
            name: &customer.name,
            points: customer.points(),
            tier: customer.tier(),
            referrals: customer.referrals(),
        }
    }
}

/// Writes the customer ledger as CSV, one row per customer ordered by email.
pub struct CustomerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CustomerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_customers(&mut self, mut customers: Vec<Customer>) -> Result<()> {
        customers.sort_by(|a, b| a.email.cmp(&b.email));
        for customer in &customers {
            self.writer.serialize(CustomerRow::from(customer))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

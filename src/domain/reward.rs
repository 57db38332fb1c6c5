use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardId(pub String);

impl From<&str> for RewardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RewardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardType {
    Discount,
    FreeProduct,
    FreeShipping,
    Exclusive,
}

/// Merchant catalog entry. Read-only to the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: RewardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points_cost: u64,
    pub r#type: RewardType,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default = "available_by_default")]
    pub available: bool,
}

fn available_by_default() -> bool {
    true
}

impl Reward {
    /// How the customer uses a code for this reward at checkout.
    pub fn instructions(&self, code: &str) -> String {
        match self.r#type {
            RewardType::Discount => format!(
                "To use your {}, enter code {code} at checkout to get {} off.",
                self.name, self.value
            ),
            RewardType::FreeProduct => format!(
                "To claim your {}, add it to your cart and enter code {code} at checkout.",
                self.name
            ),
            RewardType::FreeShipping => {
                format!("Enter code {code} at checkout to get free shipping on your next order.")
            }
            RewardType::Exclusive => format!(
                "Show code {code} to our team or enter it at checkout to unlock {}.",
                self.name
            ),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Loyalty rank. Variant order is rank order, so `Ord` compares ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum];

    /// Minimum point total required to hold this tier.
    pub const fn threshold(self) -> u64 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 1000,
            Tier::Gold => 2500,
            Tier::Platinum => 5000,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a point total to its tier. Total and monotonic.
pub fn tier_for(points: u64) -> Tier {
    Tier::ALL
        .into_iter()
        .rev()
        .find(|tier| points >= tier.threshold())
        .unwrap_or(Tier::Bronze)
}

const BRONZE_BENEFITS: &[&str] = &["2% cashback on purchases", "Access to basic rewards"];
const SILVER_BENEFITS: &[&str] = &[
    "5% cashback on purchases",
    "Free shipping on orders over $50",
    "Early access to sales",
];
const GOLD_BENEFITS: &[&str] = &[
    "10% cashback on purchases",
    "Free shipping with no minimum",
    "Priority support",
];
const PLATINUM_BENEFITS: &[&str] = &[
    "15% cashback on purchases",
    "Free express shipping",
    "24/7 VIP support",
    "Monthly surprise gifts",
];

fn own_benefits(tier: Tier) -> &'static [&'static str] {
    match tier {
        Tier::Bronze => BRONZE_BENEFITS,
        Tier::Silver => SILVER_BENEFITS,
        Tier::Gold => GOLD_BENEFITS,
        Tier::Platinum => PLATINUM_BENEFITS,
    }
}

/// Benefits of `tier`, highest tier's perks first, followed by everything
/// inherited from lower tiers.
pub fn benefits_for(tier: Tier) -> Vec<&'static str> {
    Tier::ALL
        .into_iter()
        .rev()
        .filter(|t| *t <= tier)
        .flat_map(own_benefits)
        .copied()
        .collect()
}

use super::activity::Activity;
use super::customer::Customer;
use super::tier::Tier;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    PointsEarned,
    TierUpgrade,
    RewardRedeemed,
    ReferralSuccess,
    BirthdayComing,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::PointsEarned,
        NotificationKind::TierUpgrade,
        NotificationKind::RewardRedeemed,
        NotificationKind::ReferralSuccess,
        NotificationKind::BirthdayComing,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationKind::PointsEarned => "pointsEarned",
            NotificationKind::TierUpgrade => "tierUpgrade",
            NotificationKind::RewardRedeemed => "rewardRedeemed",
            NotificationKind::ReferralSuccess => "referralSuccess",
            NotificationKind::BirthdayComing => "birthdayComing",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific data carried by a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    PointsEarned {
        points: i64,
        total_points: u64,
        activity: Activity,
    },
    TierUpgrade {
        old_tier: Tier,
        new_tier: Tier,
        benefits: Vec<&'static str>,
    },
    RewardRedeemed {
        reward_name: String,
        reward_code: String,
        instructions: String,
    },
    ReferralSuccess {
        referred_name: String,
        points: u64,
    },
    BirthdayComing {
        days_until: u32,
    },
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayload::PointsEarned { .. } => NotificationKind::PointsEarned,
            NotificationPayload::TierUpgrade { .. } => NotificationKind::TierUpgrade,
            NotificationPayload::RewardRedeemed { .. } => NotificationKind::RewardRedeemed,
            NotificationPayload::ReferralSuccess { .. } => NotificationKind::ReferralSuccess,
            NotificationPayload::BirthdayComing { .. } => NotificationKind::BirthdayComing,
        }
    }

    /// Template variables supplied by this payload.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        match self {
            NotificationPayload::PointsEarned {
                points,
                total_points,
                activity,
            } => vec![
                ("points", points.to_string()),
                ("totalPoints", total_points.to_string()),
                ("activityDescription", activity.description.clone()),
            ],
            NotificationPayload::TierUpgrade {
                old_tier,
                new_tier,
                benefits,
            } => vec![
                ("oldTier", old_tier.to_string()),
                ("newTier", new_tier.to_string()),
                (
                    "benefits",
                    benefits
                        .iter()
                        .map(|b| format!("- {b}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
            ],
            NotificationPayload::RewardRedeemed {
                reward_name,
                reward_code,
                instructions,
            } => vec![
                ("rewardName", reward_name.clone()),
                ("rewardCode", reward_code.clone()),
                ("rewardInstructions", instructions.clone()),
            ],
            NotificationPayload::ReferralSuccess {
                referred_name,
                points,
            } => vec![
                ("referredName", referred_name.clone()),
                ("points", points.to_string()),
            ],
            NotificationPayload::BirthdayComing { days_until } => {
                vec![("daysUntil", days_until.to_string())]
            }
        }
    }
}

/// A state change worth telling the customer about. Built inside one
/// mutation, handed to the dispatcher by value, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub customer: Customer,
    pub payload: NotificationPayload,
}

impl NotificationEvent {
    pub fn new(customer: Customer, payload: NotificationPayload) -> Self {
        Self { customer, payload }
    }

    pub fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::benefits_for;

    #[test]
    fn test_kind_serializes_camel_case() {
        let json = serde_json::to_string(&NotificationKind::TierUpgrade).unwrap();
        assert_eq!(json, "\"tierUpgrade\"");
        assert_eq!(NotificationKind::TierUpgrade.as_str(), "tierUpgrade");
    }

    #[test]
    fn test_tier_upgrade_variables() {
        let payload = NotificationPayload::TierUpgrade {
            old_tier: Tier::Bronze,
            new_tier: Tier::Silver,
            benefits: benefits_for(Tier::Silver),
        };
        let vars = payload.variables();
        assert!(vars.contains(&("newTier", "Silver".to_string())));
        let benefits = &vars.iter().find(|(k, _)| *k == "benefits").unwrap().1;
        assert!(benefits.starts_with("- 5% cashback"));
    }
}

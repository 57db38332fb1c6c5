use crate::application::retry::RetryPolicy;
use crate::application::templates::{EmailTemplate, TemplateTable};
use crate::domain::reward::Reward;
use crate::error::{LoyaltyError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_ms: u64::try_from(policy.backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

/// Merchant-level program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramSettings {
    pub store_name: String,
    /// Points credited per currency unit spent.
    pub points_rate: Decimal,
    pub welcome_points: u64,
    pub referral_points: u64,
    pub rewards: Vec<Reward>,
    /// Replaces the built-in template table when present.
    pub templates: Option<Vec<EmailTemplate>>,
    pub retry: RetrySettings,
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self {
            store_name: "Your Store".to_string(),
            points_rate: dec!(1),
            welcome_points: 0,
            referral_points: 0,
            rewards: Vec::new(),
            templates: None,
            retry: RetrySettings::default(),
        }
    }
}

impl ProgramSettings {
    /// Reads settings from a JSON file and validates them.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.points_rate.is_sign_negative() {
            return Err(LoyaltyError::InvalidSettings(format!(
                "points_rate must not be negative, got {}",
                self.points_rate
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(LoyaltyError::InvalidSettings(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(reward) = self.rewards.iter().find(|r| r.points_cost == 0) {
            return Err(LoyaltyError::InvalidSettings(format!(
                "reward {} must cost at least one point",
                reward.id
            )));
        }
        let ledger_max = i64::MAX.unsigned_abs();
        if let Some(reward) = self.rewards.iter().find(|r| r.points_cost > ledger_max) {
            return Err(LoyaltyError::InvalidSettings(format!(
                "reward {} costs more than {ledger_max} points",
                reward.id
            )));
        }
        for (name, points) in [
            ("welcome_points", self.welcome_points),
            ("referral_points", self.referral_points),
        ] {
            if points > ledger_max {
                return Err(LoyaltyError::InvalidSettings(format!(
                    "{name} must not exceed {ledger_max}"
                )));
            }
        }
        self.template_table()?;
        Ok(())
    }

    pub fn template_table(&self) -> Result<TemplateTable> {
        match &self.templates {
            Some(templates) => TemplateTable::new(templates.clone()),
            None => TemplateTable::defaults(),
        }
    }
}

use super::customer::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    /// Time-ordered, so sorting ids sorts by creation time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Purchase,
    Referral,
    Review,
    Social,
    Redemption,
    Welcome,
}

/// Caller-supplied part of an activity; the engine fills in owner and delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetails {
    pub r#type: ActivityType,
    pub description: String,
    pub reference: Option<String>,
}

impl ActivityDetails {
    pub fn new(r#type: ActivityType, description: impl Into<String>) -> Self {
        Self {
            r#type,
            description: description.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn into_draft(self, customer_id: CustomerId, points: i64) -> ActivityDraft {
        ActivityDraft {
            customer_id,
            r#type: self.r#type,
            points,
            description: self.description,
            reference: self.reference,
        }
    }
}

/// A fully specified activity awaiting insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub customer_id: CustomerId,
    pub r#type: ActivityType,
    pub points: i64,
    pub description: String,
    /// Idempotency key; a second draft with the same reference is refused.
    pub reference: Option<String>,
}

/// Immutable audit row for one committed balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub customer_id: CustomerId,
    pub r#type: ActivityType,
    pub points: i64,
    pub date: DateTime<Utc>,
    pub description: String,
    pub reference: Option<String>,
}

impl Activity {
    pub fn record(draft: ActivityDraft, date: DateTime<Utc>) -> Self {
        Self {
            id: ActivityId::new(),
            customer_id: draft.customer_id,
            r#type: draft.r#type,
            points: draft.points,
            date,
            description: draft.description,
            reference: draft.reference,
        }
    }
}

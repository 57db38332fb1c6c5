use crate::application::ingestion::PlatformEvent;
use crate::domain::reward::RewardId;
use crate::error::{LoyaltyError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum EventKind {
    Order,
    Signup,
    Referral,
    Redeem,
    Uninstall,
}

/// One CSV row. Which optional columns are required depends on `type`.
#[derive(Debug, Deserialize)]
struct EventRecord {
    r#type: EventKind,
    event: String,
    email: Option<String>,
    name: Option<String>,
    amount: Option<Decimal>,
    order: Option<u64>,
    reward: Option<String>,
}

fn required<T>(value: Option<T>, column: &str, event: &str) -> Result<T> {
    value.ok_or_else(|| LoyaltyError::InvalidEvent(format!("event {event}: missing {column}")))
}

impl TryFrom<EventRecord> for PlatformEvent {
    type Error = LoyaltyError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let id = record.event;
        if id.is_empty() {
            return Err(LoyaltyError::InvalidEvent("missing event id".to_string()));
        }
        Ok(match record.r#type {
            EventKind::Order => PlatformEvent::OrderCreated {
                email: required(record.email, "email", &id)?,
                name: record.name.unwrap_or_default(),
                order_number: required(record.order, "order", &id)?,
                total: required(record.amount, "amount", &id)?,
                event_id: id,
            },
            EventKind::Signup => PlatformEvent::CustomerCreated {
                email: required(record.email, "email", &id)?,
                name: record.name.unwrap_or_default(),
                event_id: id,
            },
            EventKind::Referral => PlatformEvent::ReferralCompleted {
                referrer_email: required(record.email, "email", &id)?,
                referred_name: required(record.name, "name", &id)?,
                event_id: id,
            },
            EventKind::Redeem => PlatformEvent::RewardRedeemed {
                email: required(record.email, "email", &id)?,
                reward_id: RewardId(required(record.reward, "reward", &id)?),
                event_id: id,
            },
            EventKind::Uninstall => PlatformEvent::AppUninstalled { event_id: id },
        })
    }
}

/// Turns an exported webhook log into [`PlatformEvent`]s.
///
/// Rows carry a `type` column (`order`, `signup`, `referral`, `redeem`,
/// `uninstall`) and leave the columns their type does not use empty.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Padding around cells is ignored and short rows are accepted.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads rows; a malformed row yields an error and the stream
    /// carries on with the next one.
    pub fn events(self) -> impl Iterator<Item = Result<PlatformEvent>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| result.map_err(LoyaltyError::from).and_then(PlatformEvent::try_from))
    }
}

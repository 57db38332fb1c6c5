use super::notification::NotificationKind;
use super::tier::{Tier, tier_for};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-kind opt-in flags. A kind missing from the map is treated as opted out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPreferences(BTreeMap<NotificationKind, bool>);

impl NotificationPreferences {
    pub fn all_enabled() -> Self {
        Self(NotificationKind::ALL.into_iter().map(|k| (k, true)).collect())
    }

    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        self.0.get(&kind).copied().unwrap_or(false)
    }

    pub fn set(&mut self, kind: NotificationKind, enabled: bool) {
        self.0.insert(kind, enabled);
    }
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self::all_enabled()
    }
}

/// Lookup key for an email address; stores index customers by this.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Data needed to open a new loyalty account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

impl NewCustomer {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            birthday: None,
        }
    }
}

/// A member of the loyalty program.
///
/// `points`, `tier`, `referrals`, `last_purchase` and `version` only change
/// through [`Customer::apply`], so the stored tier always matches the stored
/// balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub name: String,
    points: u64,
    tier: Tier,
    referrals: u32,
    pub notification_preferences: NotificationPreferences,
    pub join_date: DateTime<Utc>,
    last_purchase: Option<DateTime<Utc>>,
    pub birthday: Option<NaiveDate>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl Customer {
    /// Opens an account with a zero balance at the lowest tier.
    pub fn open(new: NewCustomer, now: DateTime<Utc>) -> Self {
        Self {
            id: CustomerId::new(),
            email: new.email,
            name: new.name,
            points: 0,
            tier: Tier::Bronze,
            referrals: 0,
            notification_preferences: NotificationPreferences::default(),
            join_date: now,
            last_purchase: None,
            birthday: new.birthday,
            version: 0,
            updated_at: now,
        }
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn referrals(&self) -> u32 {
        self.referrals
    }

    pub fn last_purchase(&self) -> Option<DateTime<Utc>> {
        self.last_purchase
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a committed balance mutation and bumps the version.
    pub fn apply(&mut self, update: &BalanceUpdate) {
        self.points = update.points;
        self.tier = update.tier;
        self.updated_at = update.updated_at;
        if update.purchase {
            self.last_purchase = Some(update.updated_at);
        }
        if update.referral {
            self.referrals = self.referrals.saturating_add(1);
        }
        self.version += 1;
    }

    /// Days from `today` until the next birthday, 0 when it is today.
    /// A 29 February birthday falls on 28 February in common years.
    pub fn days_until_birthday(&self, today: NaiveDate) -> Option<u32> {
        let birthday = self.birthday?;
        let on_year = |year: i32| {
            NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
                .or_else(|| NaiveDate::from_ymd_opt(year, birthday.month(), 28))
        };
        let mut next = on_year(today.year())?;
        if next < today {
            next = on_year(today.year() + 1)?;
        }
        u32::try_from((next - today).num_days()).ok()
    }
}

/// A new `(points, tier)` pair for one customer record.
///
/// The tier is derived from the points on construction, which is the only
/// way to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceUpdate {
    points: u64,
    tier: Tier,
    purchase: bool,
    referral: bool,
    updated_at: DateTime<Utc>,
}

impl BalanceUpdate {
    pub fn new(points: u64, updated_at: DateTime<Utc>) -> Self {
        Self {
            points,
            tier: tier_for(points),
            purchase: false,
            referral: false,
            updated_at,
        }
    }

    /// Also stamps `last_purchase`.
    pub fn with_purchase(mut self) -> Self {
        self.purchase = true;
        self
    }

    /// Also counts one successful referral.
    pub fn with_referral(mut self) -> Self {
        self.referral = true;
        self
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer::open(NewCustomer::new("ana@example.com", "Ana"), Utc::now())
    }

    #[test]
    fn test_open_starts_at_bronze_with_zero_points() {
        let c = customer();
        assert_eq!(c.points(), 0);
        assert_eq!(c.tier(), Tier::Bronze);
        assert_eq!(c.version(), 0);
        assert!(c.notification_preferences.is_enabled(NotificationKind::TierUpgrade));
    }

    #[test]
    fn test_apply_keeps_tier_in_step_with_points() {
        let mut c = customer();
        c.apply(&BalanceUpdate::new(2600, Utc::now()));
        assert_eq!(c.points(), 2600);
        assert_eq!(c.tier(), Tier::Gold);
        assert_eq!(c.version(), 1);

        c.apply(&BalanceUpdate::new(10, Utc::now()));
        assert_eq!(c.tier(), Tier::Bronze);
        assert_eq!(c.version(), 2);
    }

    #[test]
    fn test_apply_purchase_and_referral_flags() {
        let mut c = customer();
        let now = Utc::now();
        c.apply(&BalanceUpdate::new(100, now).with_purchase());
        assert_eq!(c.last_purchase(), Some(now));
        assert_eq!(c.referrals(), 0);

        c.apply(&BalanceUpdate::new(200, now).with_referral());
        assert_eq!(c.referrals(), 1);
    }

    #[test]
    fn test_missing_preference_is_opted_out() {
        let mut prefs = NotificationPreferences::none();
        assert!(!prefs.is_enabled(NotificationKind::PointsEarned));
        prefs.set(NotificationKind::PointsEarned, true);
        assert!(prefs.is_enabled(NotificationKind::PointsEarned));
    }

    #[test]
    fn test_days_until_birthday() {
        let mut c = customer();
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(c.days_until_birthday(today), None);

        c.birthday = NaiveDate::from_ymd_opt(1990, 3, 15);
        assert_eq!(c.days_until_birthday(today), Some(5));

        c.birthday = NaiveDate::from_ymd_opt(1990, 3, 10);
        assert_eq!(c.days_until_birthday(today), Some(0));

        c.birthday = NaiveDate::from_ymd_opt(1990, 3, 1);
        assert_eq!(c.days_until_birthday(today), Some(356));
    }

    #[test]
    fn test_leap_day_birthday_in_common_year() {
        let mut c = customer();
        c.birthday = NaiveDate::from_ymd_opt(2000, 2, 29);
        let today = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap();
        assert_eq!(c.days_until_birthday(today), Some(8));
    }
}

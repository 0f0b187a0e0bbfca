use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tiers::{FeatureKey, FREE_TIER};

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

/// Per-user usage ledger
///
/// Persisted as `{ userId, planId, status, expiresAt, usage, usageResetAt }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLedger {
    pub user_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage: BTreeMap<FeatureKey, u32>,
    pub usage_reset_at: DateTime<Utc>,
}

impl UsageLedger {
    /// Fresh free-tier ledger with an empty usage window starting this month
    pub fn new_free(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            plan_id: FREE_TIER.to_string(),
            status: SubscriptionStatus::Active,
            expires_at: None,
            usage: BTreeMap::new(),
            usage_reset_at: month_start(now),
        }
    }

    /// Units of a feature consumed in the current window
    pub fn used(&self, feature: FeatureKey) -> u32 {
        self.usage.get(&feature).copied().unwrap_or(0)
    }

    /// Consume one unit; only the quota service calls this
    pub(crate) fn increment(&mut self, feature: FeatureKey) {
        let count = self.usage.entry(feature).or_insert(0);
        *count = count.saturating_add(1);
    }

    pub(crate) fn clear_usage(&mut self) {
        self.usage.clear();
    }
}

/// What `reconcile` changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub downgraded: bool,
    pub reset: bool,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        self.downgraded || self.reset
    }
}

/// Bring a ledger up to date with the clock
///
/// Applies the expiry downgrade first, then the monthly usage reset. Idempotent:
/// a second call with the same `now` changes nothing.
pub fn reconcile(ledger: &mut UsageLedger, now: DateTime<Utc>) -> Reconciliation {
    let downgraded = downgrade_if_expired(ledger, now);
    let reset = reset_if_new_month(ledger, now);

    Reconciliation { downgraded, reset }
}

/// Fall back to the free tier once a paid period has lapsed
///
/// Applies to active and cancelled subscriptions alike; cancellation only takes
/// effect at expiry.
pub fn downgrade_if_expired(ledger: &mut UsageLedger, now: DateTime<Utc>) -> bool {
    match ledger.expires_at {
        Some(expires_at) if now > expires_at => {
            ledger.plan_id = FREE_TIER.to_string();
            ledger.status = SubscriptionStatus::Active;
            ledger.expires_at = None;
            ledger.clear_usage();
            true
        }
        _ => false,
    }
}

/// Zero all counters once the current billing month has ended
pub fn reset_if_new_month(ledger: &mut UsageLedger, now: DateTime<Utc>) -> bool {
    if now < add_months(ledger.usage_reset_at, 1) {
        return false;
    }

    ledger.clear_usage();
    ledger.usage_reset_at = month_start(now);
    true
}

/// First instant (UTC) of the calendar month containing `now`
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(now)
}

/// Calendar-aware month arithmetic, clamping to the end of shorter months
pub fn add_months(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_add_months(Months::new(months))
        .unwrap_or_else(|| at + Duration::days(30 * months as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_month_start() {
        assert_eq!(month_start(at(2026, 3, 17, 15)), at(2026, 3, 1, 0));
        assert_eq!(month_start(at(2026, 3, 1, 0)), at(2026, 3, 1, 0));
    }

    #[test]
    fn test_add_months_clamps() {
        assert_eq!(add_months(at(2026, 1, 31, 0), 1), at(2026, 2, 28, 0));
        assert_eq!(add_months(at(2026, 12, 1, 0), 1), at(2027, 1, 1, 0));
    }

    #[test]
    fn test_fresh_ledger() {
        let ledger = UsageLedger::new_free("user-1", at(2026, 5, 20, 9));

        assert_eq!(ledger.plan_id, "free");
        assert_eq!(ledger.status, SubscriptionStatus::Active);
        assert_eq!(ledger.usage_reset_at, at(2026, 5, 1, 0));
        assert_eq!(ledger.used(FeatureKey::Comparisons), 0);
    }

    #[test]
    fn test_reset_on_new_month() {
        let mut ledger = UsageLedger::new_free("user-1", at(2026, 5, 20, 9));
        ledger.increment(FeatureKey::Comparisons);
        ledger.increment(FeatureKey::Comparisons);

        // Same month: untouched
        let outcome = reconcile(&mut ledger, at(2026, 5, 31, 23));
        assert!(!outcome.changed());
        assert_eq!(ledger.used(FeatureKey::Comparisons), 2);

        // Next month: zeroed and window advanced
        let outcome = reconcile(&mut ledger, at(2026, 6, 2, 8));
        assert!(outcome.reset);
        assert_eq!(ledger.used(FeatureKey::Comparisons), 0);
        assert_eq!(ledger.usage_reset_at, at(2026, 6, 1, 0));
    }

    #[test]
    fn test_reset_after_long_absence_lands_on_current_month() {
        let mut ledger = UsageLedger::new_free("user-1", at(2026, 1, 10, 0));
        ledger.increment(FeatureKey::PathwaysPerMonth);

        reconcile(&mut ledger, at(2026, 9, 14, 12));

        assert_eq!(ledger.usage_reset_at, at(2026, 9, 1, 0));
        assert!(ledger.usage.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut ledger = UsageLedger::new_free("user-1", at(2026, 1, 10, 0));
        ledger.plan_id = "premium".to_string();
        ledger.expires_at = Some(at(2026, 2, 10, 0));
        ledger.increment(FeatureKey::Comparisons);

        let now = at(2026, 3, 5, 0);
        let first = reconcile(&mut ledger, now);
        let snapshot = ledger.clone();
        let second = reconcile(&mut ledger, now);

        assert!(first.downgraded && first.reset);
        assert!(!second.changed());
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_expired_premium_downgrades() {
        let mut ledger = UsageLedger::new_free("user-1", at(2026, 4, 2, 0));
        ledger.plan_id = "premium".to_string();
        ledger.expires_at = Some(at(2026, 4, 30, 0));
        ledger.increment(FeatureKey::Comparisons);

        assert!(!downgrade_if_expired(&mut ledger, at(2026, 4, 29, 0)));
        assert_eq!(ledger.plan_id, "premium");

        assert!(downgrade_if_expired(&mut ledger, at(2026, 4, 30, 1)));
        assert_eq!(ledger.plan_id, "free");
        assert_eq!(ledger.expires_at, None);
        assert!(ledger.usage.is_empty());
    }

    #[test]
    fn test_cancelled_keeps_plan_until_expiry() {
        let mut ledger = UsageLedger::new_free("user-1", at(2026, 4, 2, 0));
        ledger.plan_id = "pro".to_string();
        ledger.status = SubscriptionStatus::Cancelled;
        ledger.expires_at = Some(at(2026, 4, 30, 0));

        assert!(!reconcile(&mut ledger, at(2026, 4, 15, 0)).changed());
        assert_eq!(ledger.plan_id, "pro");
        assert_eq!(ledger.status, SubscriptionStatus::Cancelled);

        assert!(reconcile(&mut ledger, at(2026, 4, 30, 12)).downgraded);
        assert_eq!(ledger.plan_id, "free");
        assert_eq!(ledger.status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_ledger_wire_format() {
        let mut ledger = UsageLedger::new_free("user-1", at(2026, 4, 2, 0));
        ledger.increment(FeatureKey::PathwaysPerMonth);

        let json = serde_json::to_value(&ledger).unwrap();

        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["planId"], "free");
        assert_eq!(json["status"], "active");
        assert_eq!(json["usage"]["pathwaysPerMonth"], 1);
        assert!(json["expiresAt"].is_null());
    }
}

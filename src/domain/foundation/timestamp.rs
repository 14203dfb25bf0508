//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by adding the specified number of hours.
    pub fn add_hours(&self, hours: i64) -> Self {
        Self(self.0 + Duration::hours(hours))
    }

    /// Creates a new timestamp by adding a chrono duration.
    pub fn add(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    /// Creates a new timestamp by adding calendar months.
    ///
    /// Month ends are clamped (Jan 31 + 1 month = Feb 28/29). Falls back to
    /// 30-day months if the calendar result is out of range.
    pub fn add_months(&self, months: u32) -> Self {
        match self.0.checked_add_months(Months::new(months)) {
            Some(dt) => Self(dt),
            None => Self(self.0 + Duration::days(i64::from(months) * 30)),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap())
    }

    #[test]
    fn ordering_helpers_agree_with_ord() {
        let earlier = at(2024, 3, 1);
        let later = at(2024, 3, 2);
        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
        assert!(earlier < later);
    }

    #[test]
    fn add_days_supports_negative_offsets() {
        assert_eq!(at(2024, 3, 10).add_days(-9), at(2024, 3, 1));
    }

    #[test]
    fn add_months_uses_calendar_months() {
        assert_eq!(at(2024, 1, 15).add_months(1), at(2024, 2, 15));
        assert_eq!(at(2024, 1, 15).add_months(12), at(2025, 1, 15));
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(at(2024, 1, 31).add_months(1), at(2024, 2, 29));
    }

    #[test]
    fn duration_since_is_signed() {
        let a = at(2024, 3, 1);
        let b = a.add_hours(2);
        assert_eq!(b.duration_since(&a), Duration::hours(2));
        assert_eq!(a.duration_since(&b), Duration::hours(-2));
    }
}

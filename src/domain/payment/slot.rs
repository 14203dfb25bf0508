//! Booked consultation slot parsing.
//!
//! Slots arrive as free text captured when the patient picked a time. A slot
//! that cannot be parsed still produces an appointment, an hour from now, but
//! flagged so staff reschedule it.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::foundation::Timestamp;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Hours added to "now" when the requested slot is unreadable.
pub const FALLBACK_OFFSET_HOURS: i64 = 1;

/// Resolved appointment start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedSlot {
    pub starts_at: Timestamp,
    /// True when `starts_at` is the fallback rather than the patient's choice.
    pub needs_schedule_review: bool,
}

impl BookedSlot {
    /// Parses RFC 3339 or a naive `YYYY-MM-DD[T ]HH:MM[:SS]` (taken as UTC).
    pub fn parse(raw: &str) -> Option<Timestamp> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Timestamp::from_datetime(dt.with_timezone(&Utc)));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| Timestamp::from_datetime(naive.and_utc()))
    }

    pub fn parse_or_fallback(raw: &str, now: Timestamp) -> Self {
        match Self::parse(raw) {
            Some(starts_at) => Self {
                starts_at,
                needs_schedule_review: false,
            },
            None => Self {
                starts_at: now.add_hours(FALLBACK_OFFSET_HOURS),
                needs_schedule_review: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expected(h: u32, m: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 5, 20, h, m, 0).unwrap())
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(BookedSlot::parse("2024-05-20T16:30:00+02:00"), Some(expected(14, 30)));
    }

    #[test]
    fn parses_naive_formats_as_utc() {
        assert_eq!(BookedSlot::parse("2024-05-20T14:30"), Some(expected(14, 30)));
        assert_eq!(BookedSlot::parse("2024-05-20 14:30"), Some(expected(14, 30)));
        assert_eq!(BookedSlot::parse("2024-05-20T14:30:00"), Some(expected(14, 30)));
    }

    #[test]
    fn unreadable_slot_falls_back_one_hour_ahead_and_is_flagged() {
        let now = expected(9, 0);
        let slot = BookedSlot::parse_or_fallback("next tuesday afternoon", now);
        assert!(slot.needs_schedule_review);
        assert_eq!(slot.starts_at, expected(10, 0));
    }

    #[test]
    fn readable_slot_is_not_flagged() {
        let slot = BookedSlot::parse_or_fallback("2024-05-20 14:30", expected(9, 0));
        assert!(!slot.needs_schedule_review);
        assert_eq!(slot.starts_at, expected(14, 30));
    }

    #[test]
    fn empty_slot_falls_back() {
        assert!(BookedSlot::parse_or_fallback("  ", expected(9, 0)).needs_schedule_review);
    }
}

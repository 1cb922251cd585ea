// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for clocks, calendar comparisons and timestamp formatting.

use chrono::{Datelike, DateTime, FixedOffset, Local, SecondsFormat, TimeDelta, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" for everything time-windowed.
///
/// The offset of the returned value is the user's local offset; calendar
/// days and weeks are evaluated in it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the device's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
            offset: *start.offset(),
        }
    }

    pub fn set(&self, instant: DateTime<FixedOffset>) {
        self.millis
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: TimeDelta) {
        self.millis
            .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let millis = self.millis.load(Ordering::SeqCst);
        self.offset
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.with_timezone(&self.offset))
    }
}

/// Convert stored epoch milliseconds to an instant in `offset`.
pub fn from_millis(millis: i64, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(offset))
}

/// True when `other` falls on the same calendar day as `now`, in `now`'s offset.
pub fn is_same_day(now: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
    now.date_naive() == other.with_timezone(now.offset()).date_naive()
}

/// True when `other` falls on the calendar day before `now`.
pub fn is_previous_day(now: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
    is_same_day(&(*now - TimeDelta::days(1)), other)
}

/// True when `other` falls in the same ISO week (Monday start) as `now`.
pub fn is_same_week(now: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
    now.date_naive().iso_week() == other.with_timezone(now.offset()).date_naive().iso_week()
}

/// True when `other` falls in the ISO week before `now`'s.
pub fn is_previous_week(now: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
    is_same_week(&(*now - TimeDelta::days(7)), other)
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).expect("valid timestamp")
    }

    #[test]
    fn test_same_day_uses_local_offset() {
        let now = at("2024-03-02T00:30:00+02:00");
        assert!(is_same_day(&now, &at("2024-03-02T00:05:00+02:00")));

        // Still the 1st in UTC, but already the 2nd on the device.
        let utc_view = at("2024-03-01T22:15:00+00:00");
        assert!(is_same_day(&now, &utc_view));
        assert!(!is_previous_day(&now, &utc_view));
    }

    #[test]
    fn test_previous_day_across_month_boundary() {
        let now = at("2024-03-01T09:00:00+01:00");
        assert!(is_previous_day(&now, &at("2024-02-29T22:00:00+01:00")));
        assert!(!is_previous_day(&now, &at("2024-02-28T22:00:00+01:00")));
    }

    #[test]
    fn test_iso_week_starts_monday() {
        // 2024-06-09 is a Sunday, 2024-06-10 a Monday.
        let sunday = at("2024-06-09T20:00:00+00:00");
        let monday = at("2024-06-10T06:00:00+00:00");
        assert!(!is_same_week(&monday, &sunday));
        assert!(is_previous_week(&monday, &sunday));
        assert!(is_same_week(&sunday, &at("2024-06-03T00:00:00+00:00")));
    }

    #[test]
    fn test_iso_week_across_year_boundary() {
        // 2024-12-30 (Mon) and 2025-01-02 (Thu) are both in ISO week 2025-W01.
        assert!(is_same_week(
            &at("2025-01-02T12:00:00+00:00"),
            &at("2024-12-30T12:00:00+00:00")
        ));
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(at("2024-01-01T00:00:00+01:00"));
        clock.advance(TimeDelta::hours(25));
        assert_eq!(clock.now(), at("2024-01-02T01:00:00+01:00"));
        assert_eq!(clock.now().offset(), &FixedOffset::east_opt(3600).unwrap());
    }

    #[test]
    fn test_from_millis_round_trip() {
        let instant = at("2024-05-05T12:34:56.789+02:00");
        let restored = from_millis(instant.timestamp_millis(), instant.offset()).unwrap();
        assert_eq!(restored, instant);
    }
}

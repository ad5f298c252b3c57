// crates/upgrade-guard-core/src/clock.rs
// ============================================================================
// Module: Upgrade Guard Time Helpers
// Description: Timestamp parsing, formatting, and day-age arithmetic.
// Purpose: One tolerant ISO-8601 surface shared by contract, drift, snapshot.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Contract and snooze timestamps arrive as ISO-8601 text with or without an
//! offset; naive values are assumed UTC. Ages are computed with floor
//! division over whole seconds, so 23h59m reads as 0 days and a snooze
//! expired by half a day reads as 1 day overdue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::well_known::Iso8601;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Seconds per day for age arithmetic.
const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an ISO-8601 timestamp, treating naive values as UTC.
///
/// Accepts full offset timestamps (`2025-01-01T00:00:00Z`,
/// `2025-01-01T00:00:00+02:00`), naive datetimes, and bare dates (midnight
/// UTC). Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(moment) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(moment.to_offset(time::UtcOffset::UTC));
    }
    if let Ok(naive) = PrimitiveDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(naive.assume_utc());
    }
    if let Ok(date) = Date::parse(text, &Iso8601::DEFAULT) {
        return Some(PrimitiveDateTime::new(date, time::Time::MIDNIGHT).assume_utc());
    }
    None
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats a timestamp as RFC 3339 UTC text.
#[must_use]
pub fn format_timestamp(moment: OffsetDateTime) -> String {
    moment
        .to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_else(|_| moment.unix_timestamp().to_string())
}

// ============================================================================
// SECTION: Age Arithmetic
// ============================================================================

/// Whole days between two moments, floor-divided.
///
/// Negative when `later` precedes `earlier`; `-0.5` days floors to `-1`.
#[must_use]
pub fn whole_days_between(earlier: OffsetDateTime, later: OffsetDateTime) -> i64 {
    (later - earlier).whole_seconds().div_euclid(SECONDS_PER_DAY)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use time::Duration;
    use time::OffsetDateTime;

    use super::parse_timestamp;
    use super::whole_days_between;

    #[test]
    fn parses_offset_and_naive_timestamps() {
        let zulu = parse_timestamp("2025-06-01T12:00:00Z").unwrap();
        let naive = parse_timestamp("2025-06-01T12:00:00").unwrap();
        assert_eq!(zulu, naive);
    }

    #[test]
    fn parses_bare_dates_as_midnight_utc() {
        let date = parse_timestamp("2025-06-01").unwrap();
        assert_eq!(date.unix_timestamp() % 86_400, 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn floors_partial_days() {
        let base = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let almost_day = base + Duration::seconds(86_399);
        assert_eq!(whole_days_between(base, almost_day), 0);
        assert_eq!(whole_days_between(almost_day, base), -1);
    }
}

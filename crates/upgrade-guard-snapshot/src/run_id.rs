// crates/upgrade-guard-snapshot/src/run_id.rs
// ============================================================================
// Module: Snapshot Run Identifiers
// Description: Timestamp-derived run identifiers with optional tags.
// Purpose: Zero-padded, monotonic identifiers whose lexicographic order is
// chronological order.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Run identifiers are `<UTC timestamp>[-sanitized-tag]` with one-second
//! resolution (`20250601T120000Z-staging`). Zero padding makes
//! lexicographic order match chronological order, which the index's
//! "latest" pointer relies on. Parsing back splits at the first `-` so tags
//! never affect retention arithmetic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::macros::format_description;

// ============================================================================
// SECTION: Format
// ============================================================================

/// Timestamp layout shared by formatting and parsing.
const RUN_ID_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// Formats a run identifier from a moment and an optional tag.
///
/// Tag characters outside `[A-Za-z0-9_-]` are dropped; leading and trailing
/// separators are trimmed. An empty sanitized tag is omitted entirely.
#[must_use]
pub fn format_run_id(moment: OffsetDateTime, tag: Option<&str>) -> String {
    let stamp = moment
        .to_offset(time::UtcOffset::UTC)
        .format(&RUN_ID_FORMAT)
        .unwrap_or_else(|_| moment.unix_timestamp().to_string());
    let cleaned: String = tag
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
        .collect();
    let cleaned = cleaned.trim_matches(['-', '_']);
    if cleaned.is_empty() { stamp } else { format!("{stamp}-{cleaned}") }
}

/// Parses a run identifier back into its timestamp.
///
/// Returns `None` for directory names that are not run identifiers;
/// retention pruning treats those as foreign data and leaves them alone.
#[must_use]
pub fn parse_run_id(run_id: &str) -> Option<OffsetDateTime> {
    let stamp = run_id.split_once('-').map_or(run_id, |(stamp, _)| stamp);
    PrimitiveDateTime::parse(stamp, &RUN_ID_FORMAT).ok().map(PrimitiveDateTime::assume_utc)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use time::macros::datetime;

    use super::format_run_id;
    use super::parse_run_id;

    #[test]
    fn formats_zero_padded_utc() {
        let moment = datetime!(2025-06-01 09:05:03 UTC);
        assert_eq!(format_run_id(moment, None), "20250601T090503Z");
    }

    #[test]
    fn sanitizes_tags() {
        let moment = datetime!(2025-06-01 09:05:03 UTC);
        assert_eq!(format_run_id(moment, Some("stag ing!")), "20250601T090503Z-staging");
        assert_eq!(format_run_id(moment, Some("--")), "20250601T090503Z");
    }

    #[test]
    fn round_trips_through_parse() {
        let moment = datetime!(2025-06-01 09:05:03 UTC);
        let run_id = format_run_id(moment, Some("prod"));
        assert_eq!(parse_run_id(&run_id).unwrap(), moment);
    }

    #[test]
    fn rejects_foreign_directory_names() {
        assert!(parse_run_id("lost+found").is_none());
        assert!(parse_run_id("2025-06-01").is_none());
    }
}

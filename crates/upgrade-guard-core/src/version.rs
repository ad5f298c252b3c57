// crates/upgrade-guard-core/src/version.rs
// ============================================================================
// Module: Upgrade Guard Release Versions
// Description: Release-tuple parsing and comparison for drift classification.
// Purpose: Compare pinned vs. latest versions without a full constraint solver.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Drift classification only needs the numeric release components of a
//! version (`1.2.3` → `[1, 2, 3]`). Pre-release and local segments are
//! ignored; comparison is lexicographic over the component tuples, so
//! `1.2 < 1.2.1`.

// ============================================================================
// SECTION: Release Type
// ============================================================================

/// Numeric release components of a version string.
///
/// # Invariants
/// - Always contains at least one component.
/// - Ordering is lexicographic over components (`Ord` on the inner `Vec`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Release(Vec<u64>);

impl Release {
    /// Parses the leading dotted numeric components of a version string.
    ///
    /// A leading `v`/`V` prefix is tolerated. Parsing stops at the first
    /// segment without a leading digit; a version whose first segment has no
    /// digits is unparsable.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        let mut components: Vec<u64> = Vec::new();
        for segment in trimmed.split('.') {
            let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                break;
            }
            components.push(digits.parse().ok()?);
            if digits.len() != segment.len() {
                // Segment had a non-numeric suffix (e.g. `3rc1`); stop here.
                break;
            }
        }
        if components.is_empty() { None } else { Some(Self(components)) }
    }

    /// Returns the major (first) component.
    #[must_use]
    pub fn major(&self) -> u64 {
        self.0.first().copied().unwrap_or_default()
    }

    /// Returns the first two components as parsed, without zero padding.
    ///
    /// `1` and `1.0` deliberately compare unequal here, matching tuple
    /// semantics in upstream metadata tooling.
    #[must_use]
    pub fn minor_pair(&self) -> &[u64] {
        let end = self.0.len().min(2);
        &self.0[..end]
    }

    /// Returns all components.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::Release;

    #[test]
    fn parses_plain_releases() {
        assert_eq!(Release::parse("1.2.3").unwrap().components(), &[1, 2, 3]);
        assert_eq!(Release::parse("v2.0").unwrap().components(), &[2, 0]);
    }

    #[test]
    fn stops_at_prerelease_suffix() {
        assert_eq!(Release::parse("1.2.3rc1").unwrap().components(), &[1, 2, 3]);
        assert_eq!(Release::parse("1.2-beta").unwrap().components(), &[1, 2]);
    }

    #[test]
    fn rejects_non_numeric_versions() {
        assert!(Release::parse("latest").is_none());
        assert!(Release::parse("").is_none());
    }

    #[test]
    fn orders_lexicographically() {
        let short = Release::parse("1.2").unwrap();
        let long = Release::parse("1.2.1").unwrap();
        assert!(short < long);
    }
}

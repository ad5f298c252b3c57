// crates/upgrade-guard-planner/src/candidates.rs
// ============================================================================
// Module: Planner Candidate Selection & Scoring
// Description: Canonical names, candidate filtering, and additive scoring.
// Purpose: Rank upgrade candidates deterministically before verification.
// Dependencies: serde, upgrade-guard-core
// ============================================================================

//! ## Overview
//! Candidates come from SBOM components whose metadata shows a newer
//! release. Scoring is additive with the factor breakdown retained in the
//! output, so a reviewer can see exactly why one upgrade outranks another.
//! Ordering is `(score desc, severity asc, canonical name asc)`, which
//! keeps re-runs over identical inputs byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use upgrade_guard_core::MetadataSnapshot;
use upgrade_guard_core::drift::DriftPolicy;
use upgrade_guard_core::drift::DriftSeverity;
use upgrade_guard_core::drift::classify_drift;
use upgrade_guard_core::sources::SbomComponent;

// ============================================================================
// SECTION: Scoring Weights
// ============================================================================

/// Score contribution of a patch-level upgrade.
const WEIGHT_PATCH: f64 = 3.0;
/// Score contribution of a minor-level upgrade.
const WEIGHT_MINOR: f64 = 6.0;
/// Score contribution of a major-level upgrade.
const WEIGHT_MAJOR: f64 = 9.0;
/// Score contribution of an unclassified upgrade.
const WEIGHT_OTHER: f64 = 1.0;
/// Penalty for a major upgrade without explicit approval.
const PENALTY_MAJOR_UNAPPROVED: f64 = -4.0;
/// Additional penalty when policy pins the package to its major.
const PENALTY_STAY_ON_MAJOR: f64 = -2.0;
/// Contribution of resolver verification.
const WEIGHT_RESOLVER: f64 = 2.0;
/// Fixed recency contribution.
const WEIGHT_RECENCY: f64 = 1.5;

// ============================================================================
// SECTION: Canonical Names
// ============================================================================

/// Canonicalizes a package name: lowercase with runs of `-`, `_`, and `.`
/// collapsed to a single `-`.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            pending_separator = !canonical.is_empty();
            continue;
        }
        if pending_separator {
            canonical.push('-');
            pending_separator = false;
        }
        canonical.extend(ch.to_lowercase());
    }
    canonical
}

// ============================================================================
// SECTION: Candidates
// ============================================================================

/// One ranked upgrade candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeCandidate {
    /// Package name as authored in the SBOM.
    pub name: String,
    /// Canonical name used for filtering, overrides, and resolver commands.
    pub canonical_name: String,
    /// Pinned version from the SBOM.
    pub current: Option<String>,
    /// Latest known version from metadata.
    pub latest: Option<String>,
    /// Classified upgrade severity.
    pub severity: DriftSeverity,
    /// Classification notes explaining the severity.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Additive score, rounded to two decimals.
    pub score: f64,
    /// Per-factor score breakdown.
    pub score_breakdown: BTreeMap<String, f64>,
}

/// Inputs steering candidate selection and scoring.
#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    /// Explicit canonical-name filter; empty means no filter.
    pub packages: BTreeSet<String>,
    /// Whether major upgrades may be planned.
    pub allow_major: bool,
    /// Whether resolver verification will be skipped.
    pub skip_resolver: bool,
    /// Cap on the number of ranked candidates.
    pub limit: Option<usize>,
}

/// Builds, scores, and ranks upgrade candidates from SBOM components.
///
/// Components without a name, without an actionable severity (patch, minor,
/// major), outside the explicit filter, or at a new major without
/// `allow_major` are dropped.
#[must_use]
pub fn select_candidates(
    components: &[SbomComponent],
    metadata: Option<&MetadataSnapshot>,
    policy: &DriftPolicy,
    options: &SelectionOptions,
) -> Vec<UpgradeCandidate> {
    let empty = MetadataSnapshot::default();
    let metadata_ref = metadata.unwrap_or(&empty);

    let mut candidates: Vec<UpgradeCandidate> = Vec::new();
    for component in components {
        let Some(raw_name) =
            component.name.as_deref().map(str::trim).filter(|name| !name.is_empty())
        else {
            continue;
        };
        let canonical = canonical_name(raw_name);
        if canonical.is_empty() {
            continue;
        }
        if !options.packages.is_empty() && !options.packages.contains(&canonical) {
            continue;
        }
        let latest = metadata_ref
            .packages
            .get(&raw_name.to_lowercase())
            .or_else(|| metadata_ref.packages.get(&canonical))
            .and_then(|record| record.preferred())
            .map(str::to_string)
            .filter(|value| !value.is_empty());
        let (severity, notes) =
            classify_drift(raw_name, component.version.as_deref(), latest.as_deref(), policy);
        if !matches!(severity, DriftSeverity::Patch | DriftSeverity::Minor | DriftSeverity::Major)
        {
            continue;
        }
        if severity == DriftSeverity::Major && !options.allow_major {
            continue;
        }
        let (score, score_breakdown) = score_candidate(
            &canonical,
            severity,
            policy,
            options.allow_major,
            options.skip_resolver,
        );
        candidates.push(UpgradeCandidate {
            name: raw_name.to_string(),
            canonical_name: canonical,
            current: component.version.clone().filter(|value| !value.is_empty()),
            latest,
            severity,
            notes,
            score,
            score_breakdown,
        });
    }

    candidates.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.severity.cmp(&right.severity))
            .then_with(|| left.canonical_name.cmp(&right.canonical_name))
    });
    if let Some(limit) = options.limit {
        candidates.truncate(limit);
    }
    candidates
}

// ============================================================================
// SECTION: Scoring
// ============================================================================

/// Scores one candidate, returning the rounded total plus the breakdown.
#[must_use]
pub fn score_candidate(
    name: &str,
    severity: DriftSeverity,
    policy: &DriftPolicy,
    allow_major: bool,
    skip_resolver: bool,
) -> (f64, BTreeMap<String, f64>) {
    let severity_weight = match severity {
        DriftSeverity::Patch => WEIGHT_PATCH,
        DriftSeverity::Minor => WEIGHT_MINOR,
        DriftSeverity::Major => WEIGHT_MAJOR,
        _ => WEIGHT_OTHER,
    };

    let mut contract_penalty = 0.0;
    if severity == DriftSeverity::Major && !allow_major {
        contract_penalty += PENALTY_MAJOR_UNAPPROVED;
    }
    let pinned = policy
        .package_overrides
        .get(&name.to_lowercase())
        .or_else(|| policy.package_overrides.get(name))
        .is_some_and(|entry| entry.stay_on_major);
    if severity == DriftSeverity::Major && pinned {
        contract_penalty += PENALTY_STAY_ON_MAJOR;
    }

    let resolver_weight = if skip_resolver { WEIGHT_RESOLVER / 2.0 } else { WEIGHT_RESOLVER };

    let mut breakdown: BTreeMap<String, f64> = BTreeMap::new();
    breakdown.insert("severity".to_string(), severity_weight);
    breakdown.insert("contract".to_string(), contract_penalty);
    breakdown.insert("resolver".to_string(), resolver_weight);
    breakdown.insert("recency".to_string(), WEIGHT_RECENCY);

    let total = severity_weight + contract_penalty + resolver_weight + WEIGHT_RECENCY;
    (round2(total), breakdown)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]
    #![allow(clippy::float_cmp, reason = "Scores are rounded to fixed decimals.")]

    use std::collections::BTreeMap;

    use upgrade_guard_core::drift::DriftPolicy;
    use upgrade_guard_core::drift::DriftSeverity;
    use upgrade_guard_core::drift::PackageOverride;

    use super::canonical_name;
    use super::score_candidate;

    #[test]
    fn canonicalizes_pep503_style() {
        assert_eq!(canonical_name("Foo.Bar__baz"), "foo-bar-baz");
        assert_eq!(canonical_name("  typing-extensions "), "typing-extensions");
        assert_eq!(canonical_name("a..b"), "a-b");
    }

    #[test]
    fn minor_with_resolver_scores_nine_and_a_half() {
        let policy = DriftPolicy::default();
        let (score, breakdown) =
            score_candidate("requests", DriftSeverity::Minor, &policy, false, false);
        assert_eq!(score, 9.5);
        assert_eq!(breakdown.get("severity"), Some(&6.0));
        assert_eq!(breakdown.get("resolver"), Some(&2.0));
        assert_eq!(breakdown.get("recency"), Some(&1.5));
        assert_eq!(breakdown.get("contract"), Some(&0.0));
    }

    #[test]
    fn skipping_resolver_halves_its_weight() {
        let policy = DriftPolicy::default();
        let (score, _) = score_candidate("requests", DriftSeverity::Patch, &policy, false, true);
        assert_eq!(score, 5.5);
    }

    #[test]
    fn pinned_major_takes_both_penalties() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "django".to_string(),
            PackageOverride { name: "django".to_string(), stay_on_major: true },
        );
        let policy = DriftPolicy { package_overrides: overrides, ..DriftPolicy::default() };
        let (score, breakdown) =
            score_candidate("django", DriftSeverity::Major, &policy, false, false);
        assert_eq!(breakdown.get("contract"), Some(&-6.0));
        assert_eq!(score, 6.5);
    }
}

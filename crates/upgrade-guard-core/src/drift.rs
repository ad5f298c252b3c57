// crates/upgrade-guard-core/src/drift.rs
// ============================================================================
// Module: Upgrade Guard Drift Evaluation
// Description: SBOM-vs-latest-metadata drift classification and reporting.
// Purpose: Fold version drift and SBOM staleness into the guard verdict.
// Dependencies: crate::{clock, risk, sources, version}, serde, time
// ============================================================================

//! ## Overview
//! Drift compares each SBOM component's pinned version against the latest
//! known version from the metadata snapshot. Severity is classified from
//! release tuples (major/minor/patch), folded to a per-report worst, and
//! mapped onto the guard risk lattice. An SBOM older than its cadence
//! threshold forces at least `NeedsReview` regardless of severity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::format_timestamp;
use crate::clock::whole_days_between;
use crate::risk::RiskLevel;
use crate::sources::MetadataSnapshot;
use crate::sources::SbomComponent;
use crate::version::Release;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default SBOM cadence threshold in days.
pub const DEFAULT_SBOM_MAX_AGE_DAYS: i64 = 7;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Drift severity for a package or an entire report.
///
/// # Invariants
/// - Declaration order is the fold order: later variants are worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftSeverity {
    /// Pinned version is current.
    UpToDate,
    /// Patch-level upgrade available.
    Patch,
    /// Minor-level upgrade available.
    Minor,
    /// Major-level upgrade available.
    Major,
    /// Version constraints conflict.
    Conflict,
    /// Versions missing or unparsable.
    Unknown,
}

impl DriftSeverity {
    /// Returns a stable label for the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpToDate => "up-to-date",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Conflict => "conflict",
            Self::Unknown => "unknown",
        }
    }

    /// Maps drift severity onto the guard risk lattice.
    #[must_use]
    pub const fn risk(self) -> RiskLevel {
        match self {
            Self::UpToDate => RiskLevel::Safe,
            Self::Patch | Self::Minor | Self::Unknown => RiskLevel::NeedsReview,
            Self::Major | Self::Conflict => RiskLevel::Blocked,
        }
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Update policy extracted from the contract's `[policies.updates]` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftPolicy {
    /// Days a patch upgrade may wait.
    pub default_update_window_days: i64,
    /// Days a minor upgrade may wait.
    pub minor_update_window_days: i64,
    /// Whether major upgrades require explicit review.
    pub major_review_required: bool,
    /// Whether transitive conflicts are tolerated.
    pub allow_transitive_conflicts: bool,
    /// Autoresolver weight for recency.
    pub weight_recency: i64,
    /// Autoresolver weight for security signals.
    pub weight_security: i64,
    /// Autoresolver weight for contract compliance.
    pub weight_contract: i64,
    /// Autoresolver weight for historical success.
    pub weight_success: i64,
    /// Per-package overrides keyed by lowercase name.
    pub package_overrides: BTreeMap<String, PackageOverride>,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            default_update_window_days: 14,
            minor_update_window_days: 30,
            major_review_required: true,
            allow_transitive_conflicts: false,
            weight_recency: 3,
            weight_security: 5,
            weight_contract: 4,
            weight_success: 2,
            package_overrides: BTreeMap::new(),
        }
    }
}

/// Per-package policy override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOverride {
    /// Package name as authored.
    pub name: String,
    /// Pin the package to its current major version.
    #[serde(default)]
    pub stay_on_major: bool,
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Drift record for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDrift {
    /// Package name.
    pub name: String,
    /// Pinned version.
    pub current: Option<String>,
    /// Latest known version.
    pub latest: Option<String>,
    /// Classified severity.
    pub severity: DriftSeverity,
    /// Classification notes.
    pub notes: Vec<String>,
}

/// Full drift report folded into the guard assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Report timestamp (RFC 3339).
    pub generated_at: String,
    /// Per-package drift records, name-sorted.
    pub packages: Vec<PackageDrift>,
    /// Worst severity across packages.
    pub severity: DriftSeverity,
    /// Report-level notes.
    pub notes: Vec<String>,
    /// Metadata snapshot path, when one was read.
    pub metadata_path: Option<String>,
    /// SBOM file age in days, when measurable.
    pub sbom_age_days: Option<i64>,
    /// Cadence threshold applied to the SBOM age.
    pub sbom_age_threshold_days: Option<i64>,
    /// Whether the SBOM exceeded its cadence threshold.
    pub sbom_stale: bool,
}

impl DriftReport {
    /// Maps the report onto the guard risk lattice; staleness forces at
    /// least `NeedsReview`.
    #[must_use]
    pub fn risk(&self) -> RiskLevel {
        if self.sbom_stale {
            return self.severity.risk().max(RiskLevel::NeedsReview);
        }
        self.severity.risk()
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies one component's drift against the latest-known version.
#[must_use]
pub fn classify_drift(
    name: &str,
    current: Option<&str>,
    latest: Option<&str>,
    policy: &DriftPolicy,
) -> (DriftSeverity, Vec<String>) {
    let Some(current_text) = current.filter(|value| !value.trim().is_empty()) else {
        return (DriftSeverity::Unknown, vec!["missing current version".to_string()]);
    };
    let Some(latest_text) = latest.filter(|value| !value.trim().is_empty()) else {
        return (DriftSeverity::Unknown, vec!["missing metadata".to_string()]);
    };
    let (Some(current_release), Some(latest_release)) =
        (Release::parse(current_text), Release::parse(latest_text))
    else {
        return (DriftSeverity::Unknown, vec!["invalid version encountered".to_string()]);
    };
    if latest_release <= current_release {
        return (DriftSeverity::UpToDate, Vec::new());
    }
    let override_entry = policy.package_overrides.get(&name.to_lowercase());
    if current_release.major() != latest_release.major() {
        let mut notes = vec![format!("major upgrade available ({current_text} -> {latest_text})")];
        if override_entry.is_some_and(|entry| entry.stay_on_major) {
            notes.push("major upgrades require override".to_string());
        }
        return (DriftSeverity::Major, notes);
    }
    if current_release.minor_pair() != latest_release.minor_pair() {
        return (
            DriftSeverity::Minor,
            vec![format!("minor upgrade available ({current_text} -> {latest_text})")],
        );
    }
    (
        DriftSeverity::Patch,
        vec![format!("patch upgrade available ({current_text} -> {latest_text})")],
    )
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates drift across all named SBOM components.
#[must_use]
pub fn evaluate_drift(
    components: &[SbomComponent],
    metadata: Option<&MetadataSnapshot>,
    policy: &DriftPolicy,
    now: OffsetDateTime,
) -> DriftReport {
    let empty = MetadataSnapshot::default();
    let metadata_ref = metadata.unwrap_or(&empty);

    let mut packages: Vec<PackageDrift> = Vec::new();
    for component in components {
        let Some(name) = component.name.as_deref().map(str::trim).filter(|name| !name.is_empty())
        else {
            continue;
        };
        let latest = metadata_ref
            .packages
            .get(&name.to_lowercase())
            .and_then(|record| record.preferred())
            .map(str::to_string)
            .filter(|value| !value.is_empty());
        let (severity, notes) =
            classify_drift(name, component.version.as_deref(), latest.as_deref(), policy);
        packages.push(PackageDrift {
            name: name.to_string(),
            current: component.version.clone().filter(|value| !value.is_empty()),
            latest,
            severity,
            notes,
        });
    }
    packages.sort_by(|left, right| left.name.to_lowercase().cmp(&right.name.to_lowercase()));

    let severity =
        packages.iter().map(|package| package.severity).max().unwrap_or(DriftSeverity::UpToDate);

    let mut notes: Vec<String> = Vec::new();
    if metadata.is_none_or(|snapshot| snapshot.packages.is_empty()) {
        notes.push("metadata snapshot missing or empty; severity may be inaccurate".to_string());
    }

    DriftReport {
        generated_at: format_timestamp(now),
        packages,
        severity,
        notes,
        metadata_path: None,
        sbom_age_days: None,
        sbom_age_threshold_days: None,
        sbom_stale: false,
    }
}

/// Applies SBOM file age against the cadence threshold, flagging staleness.
pub fn apply_sbom_age(
    report: &mut DriftReport,
    sbom_path: &Path,
    threshold_days: Option<i64>,
    now: OffsetDateTime,
) {
    report.sbom_age_threshold_days = threshold_days.filter(|days| *days >= 0);
    let Ok(metadata) = fs::metadata(sbom_path) else {
        return;
    };
    let Ok(modified) = metadata.modified() else {
        return;
    };
    let modified_at = OffsetDateTime::from(modified);
    let age_days = whole_days_between(modified_at, now);
    report.sbom_age_days = Some(age_days);
    if let Some(threshold) = report.sbom_age_threshold_days {
        if age_days > threshold {
            report.sbom_stale = true;
            report.notes.push(format!(
                "SBOM generated {age_days} day(s) ago exceeds cadence threshold of {threshold} day(s)"
            ));
        }
    }
}

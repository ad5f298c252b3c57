// crates/upgrade-guard-core/src/risk.rs
// ============================================================================
// Module: Upgrade Guard Risk Model
// Description: Ordered risk levels, source summaries, and package assessments.
// Purpose: Provide the monotone risk lattice every guard source folds into.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every guard input reduces to `PackageAssessment` records carrying an
//! ordered [`RiskLevel`]. Risk is only ever widened through
//! [`PackageAssessment::elevate`]; no code path narrows an assigned level.
//! Degraded inputs are represented as [`SourceSummary`] data, never as
//! control flow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Risk Levels
// ============================================================================

/// Ordered risk verdict for a package or an entire run.
///
/// # Invariants
/// - Total order: `Safe < NeedsReview < Blocked` (derived `Ord`).
/// - Serialized labels are stable for downstream tooling.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskLevel {
    /// No review required.
    #[default]
    #[serde(rename = "safe")]
    Safe,
    /// Requires human review before rollout.
    #[serde(rename = "needs-review")]
    NeedsReview,
    /// Blocks the upgrade until resolved.
    #[serde(rename = "blocked")]
    Blocked,
}

impl RiskLevel {
    /// Returns a stable label for the risk level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::NeedsReview => "needs-review",
            Self::Blocked => "blocked",
        }
    }

    /// Parses a stable label back into a risk level.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "safe" => Some(Self::Safe),
            "needs-review" => Some(Self::NeedsReview),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Source Summaries
// ============================================================================

/// Load state of a single guard input source.
///
/// # Invariants
/// - Variants are stable for serialization and snapshot manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// Source was present and parsed.
    Ok,
    /// Source path absent or file not found.
    Missing,
    /// Source present but unreadable or malformed.
    Error,
}

impl SourceState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Missing => "missing",
            Self::Error => "error",
        }
    }
}

/// Per-source load outcome.
///
/// # Invariants
/// - A `Missing` or `Error` summary never aborts a guard run; it only
///   degrades the aggregate verdict downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Source name (`preflight`, `renovate`, `cve`, `contract`, `drift`, `mirror`).
    pub name: String,
    /// Load state.
    pub state: SourceState,
    /// Optional human-readable detail (parse error, "path not provided").
    pub message: Option<String>,
    /// Path the source was read from, when one was supplied.
    pub raw_path: Option<PathBuf>,
}

impl SourceSummary {
    /// Creates an `Ok` summary for a successfully parsed source.
    #[must_use]
    pub fn ok(name: impl Into<String>, raw_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            state: SourceState::Ok,
            message: None,
            raw_path: Some(raw_path),
        }
    }

    /// Creates a `Missing` summary.
    #[must_use]
    pub fn missing(
        name: impl Into<String>,
        message: impl Into<String>,
        raw_path: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            state: SourceState::Missing,
            message: Some(message.into()),
            raw_path,
        }
    }

    /// Creates an `Error` summary.
    #[must_use]
    pub fn error(
        name: impl Into<String>,
        message: impl Into<String>,
        raw_path: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            state: SourceState::Error,
            message: Some(message.into()),
            raw_path,
        }
    }

    /// Returns the raw path rendered as a string, when present.
    #[must_use]
    pub fn raw_path_string(&self) -> Option<String> {
        self.raw_path.as_ref().map(|path| path.display().to_string())
    }
}

// ============================================================================
// SECTION: Package Assessments
// ============================================================================

/// Aggregated upgrade assessment for a single package.
///
/// # Invariants
/// - `risk` is monotone: [`Self::elevate`] is the only mutation path and it
///   never lowers an assigned level.
/// - `reasons` preserves insertion order across merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAssessment {
    /// Package name (merge key).
    pub name: String,
    /// Currently pinned version, when known.
    pub current: Option<String>,
    /// Proposed candidate version, when known.
    pub candidate: Option<String>,
    /// Widest risk observed across sources.
    pub risk: RiskLevel,
    /// Human-readable reasons, one per contributing signal.
    pub reasons: Vec<String>,
}

impl PackageAssessment {
    /// Creates an assessment with no versions and `Safe` risk.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: None,
            candidate: None,
            risk: RiskLevel::Safe,
            reasons: Vec::new(),
        }
    }

    /// Creates an assessment seeded with version information.
    #[must_use]
    pub fn with_versions(
        name: impl Into<String>,
        current: Option<String>,
        candidate: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            current,
            candidate,
            risk: RiskLevel::Safe,
            reasons: Vec::new(),
        }
    }

    /// Raises the package risk when the new level is higher and records the
    /// reason when one is supplied.
    pub fn elevate(&mut self, risk: RiskLevel, reason: Option<&str>) {
        if risk > self.risk {
            self.risk = risk;
        }
        if let Some(reason) = reason {
            self.reasons.push(reason.to_string());
        }
    }
}

// ============================================================================
// SECTION: Merging
// ============================================================================

/// Merges per-source assessment groups into one list keyed by package name.
///
/// The first non-empty current/candidate version wins; reasons are
/// concatenated in group order; risk is folded through `elevate` and never
/// overwritten.
#[must_use]
pub fn merge_assessments<I>(groups: I) -> Vec<PackageAssessment>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = PackageAssessment>,
{
    let mut merged: Vec<PackageAssessment> = Vec::new();
    for group in groups {
        for assessment in group {
            let index = merged
                .iter()
                .position(|entry| entry.name == assessment.name)
                .unwrap_or_else(|| {
                    merged.push(PackageAssessment::new(assessment.name.clone()));
                    merged.len() - 1
                });
            let Some(existing) = merged.get_mut(index) else {
                continue;
            };
            if existing.current.is_none() && assessment.current.is_some() {
                existing.current = assessment.current.clone();
            }
            if existing.candidate.is_none() && assessment.candidate.is_some() {
                existing.candidate = assessment.candidate.clone();
            }
            existing.reasons.extend(assessment.reasons.iter().cloned());
            existing.elevate(assessment.risk, None);
        }
    }
    merged
}

/// Returns the widest risk across a set of assessments.
#[must_use]
pub fn highest_risk(packages: &[PackageAssessment]) -> RiskLevel {
    packages
        .iter()
        .map(|package| package.risk)
        .max()
        .unwrap_or(RiskLevel::Safe)
}

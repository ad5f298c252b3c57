// crates/upgrade-guard-core/src/assess.rs
// ============================================================================
// Module: Upgrade Guard Package Assessors
// Description: Pure per-source mappings from raw entries to assessments.
// Purpose: Classify preflight, upgrade-bot, and CVE signals into risk levels.
// Dependencies: crate::{risk, sources}
// ============================================================================

//! ## Overview
//! Each assessor is a pure function over one source's parsed payload.
//! Entries without a package name are skipped silently; classification
//! tables are fixed and documented per source. Assessors only ever widen
//! risk via [`PackageAssessment::elevate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::risk::PackageAssessment;
use crate::risk::RiskLevel;
use crate::sources::CveEntry;
use crate::sources::CveIssue;
use crate::sources::PreflightEntry;
use crate::sources::RenovateEntry;

// ============================================================================
// SECTION: Classification Tables
// ============================================================================

/// Maps a preflight status string onto a risk level.
///
/// `error`/`fail`/`failure`/`blocked` block; `warn`/`warning`/`allowlisted`/
/// `sdist`/`degraded` need review; anything else is safe.
#[must_use]
pub fn risk_from_status(status: Option<&str>) -> RiskLevel {
    let status = status.unwrap_or_default().trim().to_ascii_lowercase();
    match status.as_str() {
        "error" | "fail" | "failure" | "blocked" => RiskLevel::Blocked,
        "warn" | "warning" | "allowlisted" | "sdist" | "degraded" => RiskLevel::NeedsReview,
        _ => RiskLevel::Safe,
    }
}

/// Maps a CVE severity string onto a risk level.
#[must_use]
pub fn risk_from_severity(severity: &str) -> RiskLevel {
    match severity {
        "critical" | "high" => RiskLevel::Blocked,
        "info" => RiskLevel::Safe,
        // medium/moderate/low/unknown and anything unrecognized.
        _ => RiskLevel::NeedsReview,
    }
}

// ============================================================================
// SECTION: Preflight Assessor
// ============================================================================

/// Assesses wheel preflight entries.
///
/// An allowlisted sdist fallback forces at least `NeedsReview` regardless of
/// the reported status.
#[must_use]
pub fn assess_preflight(entries: &[PreflightEntry]) -> Vec<PackageAssessment> {
    let mut assessments: Vec<PackageAssessment> = Vec::new();
    for entry in entries {
        let Some(name) = nonempty(entry.name.as_deref()) else {
            continue;
        };
        let index = find_or_insert(&mut assessments, name, entry.version.clone(), None);
        let Some(assessment) = assessments.get_mut(index) else {
            continue;
        };

        let mut risk = risk_from_status(entry.status.as_deref());
        let mut reason_parts: Vec<String> = Vec::new();
        if let Some(status) = nonempty(entry.status.as_deref()) {
            reason_parts.push(format!("status={status}"));
        }
        if !entry.missing_targets.is_empty() {
            reason_parts.push(format!("missing={} targets", entry.missing_targets.len()));
        }
        if entry.allowlisted {
            reason_parts.push("allowlisted sdist".to_string());
            risk = risk.max(RiskLevel::NeedsReview);
        }
        let reason = if reason_parts.is_empty() { None } else { Some(reason_parts.join(", ")) };
        assessment.elevate(risk, reason.as_deref());
    }
    assessments
}

// ============================================================================
// SECTION: Renovate Assessor
// ============================================================================

/// Assesses upgrade-bot candidates by update type.
///
/// `major` blocks, `minor` needs review, `patch` is safe; any other
/// non-empty type needs review with the literal type recorded.
#[must_use]
pub fn assess_renovate(entries: &[RenovateEntry]) -> Vec<PackageAssessment> {
    let mut assessments: Vec<PackageAssessment> = Vec::new();
    for entry in entries {
        let Some(name) = nonempty(entry.name.as_deref()) else {
            continue;
        };
        let current = entry.version.as_deref().and_then(|value| nonempty(Some(value)));
        let latest = entry.latest.as_deref().and_then(|value| nonempty(Some(value)));
        let index = find_or_insert(
            &mut assessments,
            name,
            current.map(str::to_string),
            latest.map(str::to_string),
        );
        let Some(assessment) = assessments.get_mut(index) else {
            continue;
        };

        let update_type = entry
            .update_type_raw
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match update_type.as_str() {
            "major" => assessment.elevate(RiskLevel::Blocked, Some("major upgrade candidate")),
            "minor" => assessment.elevate(RiskLevel::NeedsReview, Some("minor upgrade candidate")),
            "patch" => assessment.elevate(RiskLevel::Safe, Some("patch upgrade candidate")),
            "" => {}
            other => {
                assessment.elevate(RiskLevel::NeedsReview, Some(&format!("upgrade type={other}")));
            }
        }
    }
    assessments
}

// ============================================================================
// SECTION: CVE Assessor
// ============================================================================

/// Assesses CVE advisories; a package with multiple issues elevates to the
/// worst severity seen.
#[must_use]
pub fn assess_cve(entries: &[CveEntry]) -> Vec<PackageAssessment> {
    let mut assessments: Vec<PackageAssessment> = Vec::new();
    for entry in entries {
        let Some(name) = nonempty(entry.name.as_deref()) else {
            continue;
        };
        let current = entry.version.as_deref().and_then(|value| nonempty(Some(value)));
        let candidate = entry.next_version.as_deref().and_then(|value| nonempty(Some(value)));
        let index = find_or_insert(
            &mut assessments,
            name,
            current.map(str::to_string),
            candidate.map(str::to_string),
        );
        let Some(assessment) = assessments.get_mut(index) else {
            continue;
        };
        for issue in &entry.issues {
            apply_cve_issue(assessment, issue);
        }
    }
    assessments
}

fn apply_cve_issue(assessment: &mut PackageAssessment, issue: &CveIssue) {
    let severity = issue
        .severity
        .as_deref()
        .and_then(|value| nonempty(Some(value)))
        .unwrap_or("unknown")
        .to_ascii_lowercase();
    let identifier = issue
        .identifier
        .as_deref()
        .and_then(|value| nonempty(Some(value)))
        .unwrap_or("cve");
    let risk = risk_from_severity(&severity);
    let mut reason = format!("{identifier} severity={severity}");
    if let Some(summary) = issue.summary.as_deref().and_then(|value| nonempty(Some(value))) {
        reason = format!("{reason}: {summary}");
    }
    assessment.elevate(risk, Some(&reason));
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn find_or_insert(
    assessments: &mut Vec<PackageAssessment>,
    name: &str,
    current: Option<String>,
    candidate: Option<String>,
) -> usize {
    if let Some(index) = assessments.iter().position(|entry| entry.name == name) {
        return index;
    }
    assessments.push(PackageAssessment::with_versions(name, current, candidate));
    assessments.len() - 1
}

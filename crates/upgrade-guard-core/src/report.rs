// crates/upgrade-guard-core/src/report.rs
// ============================================================================
// Module: Upgrade Guard Report Assembly
// Description: Aggregation, ordering, Markdown rendering, and exit codes.
// Purpose: Reduce all sources to one deterministic, auditable assessment.
// Dependencies: crate::{clock, contract, drift, risk, sources}, serde
// ============================================================================

//! ## Overview
//! The guard report folds package, contract, and drift risk into one
//! ordered verdict. Packages render sorted by `(risk desc, name asc)`, so
//! re-running aggregation over the same inputs yields byte-identical
//! artifacts. Exit codes follow the fail threshold: Blocked always exits
//! harder than NeedsReview.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::format_timestamp;
use crate::contract::ContractReport;
use crate::drift::DriftReport;
use crate::drift::DriftSeverity;
use crate::risk::PackageAssessment;
use crate::risk::RiskLevel;
use crate::risk::SourceState;
use crate::risk::SourceSummary;
use crate::risk::highest_risk;
use crate::sources::SOURCE_CONTRACT;
use crate::sources::SOURCE_DRIFT;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Report schema version embedded in every artifact.
pub const GUARD_VERSION: &str = "1.0.0";
/// Drift notes surfaced into the summary.
const MAX_SUMMARY_DRIFT_NOTES: usize = 3;
/// Drifted packages rendered in Markdown.
const MAX_MARKDOWN_DRIFT_PACKAGES: usize = 10;
/// Notes rendered per drifted package in Markdown.
const MAX_MARKDOWN_DRIFT_NOTES: usize = 3;

// ============================================================================
// SECTION: Guard Data
// ============================================================================

/// Everything a guard run collected before aggregation.
#[derive(Debug, Clone)]
pub struct GuardData {
    /// Preflight source summary.
    pub preflight_summary: SourceSummary,
    /// Upgrade-bot source summary.
    pub renovate_summary: SourceSummary,
    /// CVE source summary.
    pub cve_summary: SourceSummary,
    /// Contract source summary.
    pub contract_summary: SourceSummary,
    /// Drift/SBOM source summary.
    pub drift_summary: SourceSummary,
    /// Contract report, when one could be built or synthesized.
    pub contract_report: Option<ContractReport>,
    /// Drift report, when the SBOM was readable.
    pub drift_report: Option<DriftReport>,
}

impl GuardData {
    /// Returns the five source summaries in canonical order.
    #[must_use]
    pub fn summaries(&self) -> [&SourceSummary; 5] {
        [
            &self.preflight_summary,
            &self.renovate_summary,
            &self.cve_summary,
            &self.contract_summary,
            &self.drift_summary,
        ]
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Summary block of the guard report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSummary {
    /// Widest risk across packages, contract, and drift.
    pub highest_severity: RiskLevel,
    /// Packages with risk above `Safe`.
    pub packages_flagged: usize,
    /// Names of sources that were missing.
    pub inputs_missing: Vec<String>,
    /// Aggregated notes from degraded sources and sub-reports.
    pub notes: Vec<String>,
    /// Contract risk contribution.
    pub contract_risk: RiskLevel,
    /// Drift severity, when drift was evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_severity: Option<DriftSeverity>,
}

/// Full guard assessment artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardReport {
    /// Run timestamp (RFC 3339).
    pub generated_at: String,
    /// Report schema version.
    pub guard_version: String,
    /// Summary block.
    pub summary: GuardSummary,
    /// Merged packages sorted by `(risk desc, name asc)`.
    pub packages: Vec<PackageAssessment>,
    /// Contract report, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractReport>,
    /// Drift report, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftReport>,
    /// Evidence map: source name to raw input path.
    pub evidence: BTreeMap<String, Option<String>>,
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Computes the run's widest risk across packages, contract, and drift.
#[must_use]
pub fn compute_highest_risk(
    packages: &[PackageAssessment],
    contract: Option<&ContractReport>,
    drift: Option<&DriftReport>,
) -> RiskLevel {
    let mut highest = highest_risk(packages);
    if let Some(contract) = contract {
        highest = highest.max(contract.risk);
    }
    if let Some(drift) = drift {
        highest = highest.max(drift.risk());
    }
    highest
}

/// Builds the aggregated note list for the summary block.
#[must_use]
pub fn build_summary_notes(data: &GuardData) -> Vec<String> {
    let mut notes: Vec<String> = Vec::new();
    for summary in data.summaries() {
        if summary.state == SourceState::Error {
            if let Some(message) = &summary.message {
                notes.push(format!("{}: {message}", summary.name));
            }
        }
    }
    if let Some(contract) = &data.contract_report {
        if contract.risk != RiskLevel::Safe {
            if let Some(note) = &contract.note {
                notes.push(format!("{SOURCE_CONTRACT}: {note}"));
            }
        }
    }
    if let Some(drift) = &data.drift_report {
        for note in drift.notes.iter().take(MAX_SUMMARY_DRIFT_NOTES) {
            notes.push(format!("{SOURCE_DRIFT}: {note}"));
        }
    }
    notes
}

/// Sorts packages by `(risk desc, name asc)` for deterministic output.
pub fn sort_packages(packages: &mut [PackageAssessment]) {
    packages.sort_by(|left, right| {
        right.risk.cmp(&left.risk).then_with(|| left.name.cmp(&right.name))
    });
}

/// Assembles the guard report from collected data and merged packages.
#[must_use]
pub fn assemble_report(
    data: &GuardData,
    mut packages: Vec<PackageAssessment>,
    now: OffsetDateTime,
) -> GuardReport {
    sort_packages(&mut packages);
    let flagged = packages.iter().filter(|package| package.risk != RiskLevel::Safe).count();
    let highest =
        compute_highest_risk(&packages, data.contract_report.as_ref(), data.drift_report.as_ref());
    let notes = build_summary_notes(data);

    let inputs_missing = data
        .summaries()
        .iter()
        .filter(|summary| summary.state == SourceState::Missing)
        .map(|summary| summary.name.clone())
        .collect();

    let mut evidence: BTreeMap<String, Option<String>> = BTreeMap::new();
    evidence.insert(data.preflight_summary.name.clone(), data.preflight_summary.raw_path_string());
    evidence.insert(data.renovate_summary.name.clone(), data.renovate_summary.raw_path_string());
    evidence.insert(data.cve_summary.name.clone(), data.cve_summary.raw_path_string());
    evidence.insert(data.contract_summary.name.clone(), data.contract_summary.raw_path_string());
    evidence.insert(data.drift_summary.name.clone(), data.drift_summary.raw_path_string());
    if let Some(drift) = &data.drift_report {
        if let Some(metadata_path) = &drift.metadata_path {
            evidence.insert("drift_metadata".to_string(), Some(metadata_path.clone()));
        }
    }

    GuardReport {
        generated_at: format_timestamp(now),
        guard_version: GUARD_VERSION.to_string(),
        summary: GuardSummary {
            highest_severity: highest,
            packages_flagged: flagged,
            inputs_missing,
            notes,
            contract_risk: data
                .contract_report
                .as_ref()
                .map_or(RiskLevel::Safe, |contract| contract.risk),
            drift_severity: data.drift_report.as_ref().map(|drift| drift.severity),
        },
        packages,
        contract: data.contract_report.clone(),
        drift: data.drift_report.clone(),
        evidence,
    }
}

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Maps the run verdict onto a process exit code.
///
/// Below the threshold exits 0. At or above it, NeedsReview exits 1 and
/// any other verdict exits 2, so Blocked always exits harder and a Safe
/// threshold makes even a clean run non-zero.
#[must_use]
pub fn determine_exit_code(highest: RiskLevel, fail_threshold: RiskLevel) -> u8 {
    if highest >= fail_threshold {
        if highest == RiskLevel::NeedsReview { 1 } else { 2 }
    } else {
        0
    }
}

// ============================================================================
// SECTION: Markdown Rendering
// ============================================================================

/// Renders the report as a human-readable Markdown summary.
#[must_use]
pub fn render_markdown(report: &GuardReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Upgrade Guard Assessment".to_string());
    lines.push(String::new());
    lines.push(format!("Generated: {}", report.generated_at));
    lines.push(format!("Guard version: {}", report.guard_version));
    lines.push(String::new());

    render_summary_section(report, &mut lines);
    if let Some(contract) = &report.contract {
        render_contract_section(contract, &mut lines);
    }
    if let Some(drift) = &report.drift {
        render_drift_section(drift, &mut lines);
    }
    if !report.packages.is_empty() {
        render_package_section(&report.packages, &mut lines);
    }
    render_evidence_section(&report.evidence, &mut lines);
    lines.join("\n")
}

fn render_summary_section(report: &GuardReport, lines: &mut Vec<String>) {
    let summary = &report.summary;
    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- Highest severity: **{}**", summary.highest_severity.as_str()));
    lines.push(format!("- Packages flagged: **{}**", summary.packages_flagged));
    if let Some(contract) = &report.contract {
        lines.push(format!(
            "- Contract risk: **{}** ({})",
            contract.risk.as_str(),
            contract.status.as_str()
        ));
    }
    if let Some(severity) = summary.drift_severity {
        lines.push(format!("- Drift severity: **{}**", severity.as_str()));
    }
    if !summary.inputs_missing.is_empty() {
        lines.push(format!("- Missing inputs: {}", summary.inputs_missing.join(", ")));
    }
    if !summary.notes.is_empty() {
        lines.push("- Notes:".to_string());
        for note in &summary.notes {
            lines.push(format!("  - {note}"));
        }
    }
    lines.push(String::new());
}

fn render_contract_section(contract: &ContractReport, lines: &mut Vec<String>) {
    lines.push("## Contract Status".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- Last validated: {}",
        contract.last_validated.as_deref().unwrap_or("n/a")
    ));
    if let Some(age) = contract.age_days {
        lines.push(format!("- Age: {age} day(s)"));
    }
    match contract.threshold_days {
        Some(threshold) => lines.push(format!("- Threshold: {threshold} day(s)")),
        None => lines.push("- Threshold: n/a".to_string()),
    }
    if let Some(state) = &contract.contract_status {
        lines.push(format!("- Contract state: {state}"));
    }
    if let Some(note) = &contract.note {
        lines.push(format!("  - {note}"));
    }
    lines.push(String::new());
}

fn render_drift_section(drift: &DriftReport, lines: &mut Vec<String>) {
    lines.push("## Drift Analysis".to_string());
    lines.push(String::new());
    lines.push(format!("- Severity: {}", drift.severity.as_str()));
    if let Some(metadata_path) = &drift.metadata_path {
        lines.push(format!("- Metadata snapshot: `{metadata_path}`"));
    }
    if !drift.notes.is_empty() {
        lines.push("- Notes:".to_string());
        for note in &drift.notes {
            lines.push(format!("  - {note}"));
        }
    }
    if !drift.packages.is_empty() {
        lines.push(String::new());
        lines.push("### Drifted Packages".to_string());
        lines.push(String::new());
        for package in drift.packages.iter().take(MAX_MARKDOWN_DRIFT_PACKAGES) {
            lines.push(format!(
                "- **{}** ({} → {}): {}",
                package.name,
                package.current.as_deref().unwrap_or("n/a"),
                package.latest.as_deref().unwrap_or("n/a"),
                package.severity.as_str()
            ));
            for note in package.notes.iter().take(MAX_MARKDOWN_DRIFT_NOTES) {
                lines.push(format!("  - {note}"));
            }
        }
    }
    lines.push(String::new());
}

fn render_package_section(packages: &[PackageAssessment], lines: &mut Vec<String>) {
    lines.push("## Package Risk".to_string());
    lines.push(String::new());
    for package in packages {
        lines.push(format!(
            "- **{}** ({} → {}): {}",
            package.name,
            package.current.as_deref().unwrap_or("n/a"),
            package.candidate.as_deref().unwrap_or("n/a"),
            package.risk.as_str()
        ));
        for reason in &package.reasons {
            lines.push(format!("  - {reason}"));
        }
    }
    lines.push(String::new());
}

fn render_evidence_section(evidence: &BTreeMap<String, Option<String>>, lines: &mut Vec<String>) {
    lines.push("## Evidence".to_string());
    lines.push(String::new());
    for (key, value) in evidence {
        if let Some(value) = value {
            lines.push(format!("- {key}: `{value}`"));
        }
    }
    lines.push(String::new());
}

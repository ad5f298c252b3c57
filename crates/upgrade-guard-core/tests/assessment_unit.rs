// crates/upgrade-guard-core/tests/assessment_unit.rs
// ============================================================================
// Module: Assessor & Report Unit Tests
// Description: Classification tables, aggregation, exit codes, Markdown.
// Purpose: Pin the per-source verdicts and the report's deterministic shape.
// ============================================================================

//! Unit tests for source assessors and guard report assembly.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use time::macros::datetime;
use upgrade_guard_core::GuardData;
use upgrade_guard_core::PackageAssessment;
use upgrade_guard_core::RiskLevel;
use upgrade_guard_core::SourceSummary;
use upgrade_guard_core::assemble_report;
use upgrade_guard_core::assess_cve;
use upgrade_guard_core::assess_preflight;
use upgrade_guard_core::assess_renovate;
use upgrade_guard_core::determine_exit_code;
use upgrade_guard_core::render_markdown;
use upgrade_guard_core::sources::CveEntry;
use upgrade_guard_core::sources::CveIssue;
use upgrade_guard_core::sources::PreflightEntry;
use upgrade_guard_core::sources::RenovateEntry;
use upgrade_guard_core::sources::SOURCE_CONTRACT;
use upgrade_guard_core::sources::SOURCE_CVE;
use upgrade_guard_core::sources::SOURCE_DRIFT;
use upgrade_guard_core::sources::SOURCE_PREFLIGHT;
use upgrade_guard_core::sources::SOURCE_RENOVATE;

fn missing_data() -> GuardData {
    GuardData {
        preflight_summary: SourceSummary::missing(SOURCE_PREFLIGHT, "path not provided", None),
        renovate_summary: SourceSummary::missing(SOURCE_RENOVATE, "path not provided", None),
        cve_summary: SourceSummary::missing(SOURCE_CVE, "path not provided", None),
        contract_summary: SourceSummary::missing(SOURCE_CONTRACT, "path not provided", None),
        drift_summary: SourceSummary::missing(SOURCE_DRIFT, "path not provided", None),
        contract_report: None,
        drift_report: None,
    }
}

#[test]
fn preflight_statuses_map_to_expected_risk() {
    let entries = vec![
        PreflightEntry {
            name: Some("alpha".to_string()),
            status: Some("error".to_string()),
            ..PreflightEntry::default()
        },
        PreflightEntry {
            name: Some("beta".to_string()),
            status: Some("warn".to_string()),
            ..PreflightEntry::default()
        },
        PreflightEntry {
            name: Some("gamma".to_string()),
            status: Some("ok".to_string()),
            ..PreflightEntry::default()
        },
        PreflightEntry { name: None, status: Some("error".to_string()), ..PreflightEntry::default() },
    ];
    let assessments = assess_preflight(&entries);
    assert_eq!(assessments.len(), 3);
    assert_eq!(assessments[0].risk, RiskLevel::Blocked);
    assert_eq!(assessments[0].reasons, vec!["status=error".to_string()]);
    assert_eq!(assessments[1].risk, RiskLevel::NeedsReview);
    assert_eq!(assessments[2].risk, RiskLevel::Safe);
}

#[test]
fn allowlisted_sdist_forces_review_even_when_status_is_ok() {
    let entries = vec![PreflightEntry {
        name: Some("pillow".to_string()),
        status: Some("ok".to_string()),
        missing_targets: vec!["manylinux_aarch64".to_string()],
        allowlisted: true,
        ..PreflightEntry::default()
    }];
    let assessments = assess_preflight(&entries);
    assert_eq!(assessments[0].risk, RiskLevel::NeedsReview);
    assert_eq!(
        assessments[0].reasons,
        vec!["status=ok, missing=1 targets, allowlisted sdist".to_string()]
    );
}

#[test]
fn renovate_update_types_map_to_expected_risk() {
    let entries = vec![
        RenovateEntry {
            name: Some("django".to_string()),
            update_type_raw: Some("major".to_string()),
            ..RenovateEntry::default()
        },
        RenovateEntry {
            name: Some("requests".to_string()),
            update_type_raw: Some("minor".to_string()),
            ..RenovateEntry::default()
        },
        RenovateEntry {
            name: Some("urllib3".to_string()),
            update_type_raw: Some("patch".to_string()),
            ..RenovateEntry::default()
        },
        RenovateEntry {
            name: Some("numpy".to_string()),
            update_type_raw: Some("pinDigest".to_string()),
            ..RenovateEntry::default()
        },
    ];
    let assessments = assess_renovate(&entries);
    assert_eq!(assessments[0].risk, RiskLevel::Blocked);
    assert_eq!(assessments[0].reasons, vec!["major upgrade candidate".to_string()]);
    assert_eq!(assessments[1].risk, RiskLevel::NeedsReview);
    assert_eq!(assessments[2].risk, RiskLevel::Safe);
    assert_eq!(assessments[3].risk, RiskLevel::NeedsReview);
    assert_eq!(assessments[3].reasons, vec!["upgrade type=pindigest".to_string()]);
}

#[test]
fn cve_issues_elevate_to_worst_severity() {
    let entries = vec![CveEntry {
        name: Some("cryptography".to_string()),
        version: Some("41.0.0".to_string()),
        next_version: Some("42.0.2".to_string()),
        issues: vec![
            CveIssue {
                severity: Some("medium".to_string()),
                identifier: Some("GHSA-xxxx".to_string()),
                summary: None,
            },
            CveIssue {
                severity: Some("critical".to_string()),
                identifier: Some("CVE-2024-0001".to_string()),
                summary: Some("memory corruption".to_string()),
            },
        ],
    }];
    let assessments = assess_cve(&entries);
    assert_eq!(assessments[0].risk, RiskLevel::Blocked);
    assert_eq!(
        assessments[0].reasons,
        vec![
            "GHSA-xxxx severity=medium".to_string(),
            "CVE-2024-0001 severity=critical: memory corruption".to_string(),
        ]
    );
    assert_eq!(assessments[0].candidate.as_deref(), Some("42.0.2"));
}

#[test]
fn exit_codes_follow_the_fail_threshold() {
    let cases = [
        (RiskLevel::Safe, RiskLevel::NeedsReview, 0),
        (RiskLevel::NeedsReview, RiskLevel::NeedsReview, 1),
        (RiskLevel::Blocked, RiskLevel::NeedsReview, 2),
        (RiskLevel::NeedsReview, RiskLevel::Blocked, 0),
        (RiskLevel::Blocked, RiskLevel::Blocked, 2),
        (RiskLevel::Safe, RiskLevel::Safe, 2),
        (RiskLevel::Blocked, RiskLevel::Safe, 2),
    ];
    for (highest, threshold, expected) in cases {
        assert_eq!(determine_exit_code(highest, threshold), expected);
    }
}

#[test]
fn report_sorts_packages_and_counts_flags() {
    let now = datetime!(2025-06-01 12:00:00 UTC);
    let mut safe = PackageAssessment::new("zlib");
    safe.elevate(RiskLevel::Safe, None);
    let mut blocked = PackageAssessment::new("openssl");
    blocked.elevate(RiskLevel::Blocked, Some("CVE-2025-1 severity=critical"));
    let mut review = PackageAssessment::new("attrs");
    review.elevate(RiskLevel::NeedsReview, Some("minor upgrade candidate"));

    let report = assemble_report(&missing_data(), vec![safe, blocked, review], now);
    let names: Vec<&str> = report.packages.iter().map(|package| package.name.as_str()).collect();
    assert_eq!(names, vec!["openssl", "attrs", "zlib"]);
    assert_eq!(report.summary.packages_flagged, 2);
    assert_eq!(report.summary.highest_severity, RiskLevel::Blocked);
    assert_eq!(report.summary.inputs_missing.len(), 5);
    assert_eq!(report.generated_at, "2025-06-01T12:00:00Z");
}

#[test]
fn markdown_renders_summary_and_package_sections() {
    let now = datetime!(2025-06-01 12:00:00 UTC);
    let mut blocked = PackageAssessment::with_versions(
        "openssl",
        Some("3.0.0".to_string()),
        Some("3.2.1".to_string()),
    );
    blocked.elevate(RiskLevel::Blocked, Some("CVE-2025-1 severity=critical"));

    let report = assemble_report(&missing_data(), vec![blocked], now);
    let markdown = render_markdown(&report);
    assert!(markdown.starts_with("# Upgrade Guard Assessment"));
    assert!(markdown.contains("## Summary"));
    assert!(markdown.contains("- Highest severity: **blocked**"));
    assert!(markdown.contains("**openssl** (3.0.0 → 3.2.1): blocked"));
    assert!(markdown.contains("  - CVE-2025-1 severity=critical"));
    assert!(markdown.contains("## Evidence"));
}

// crates/upgrade-guard-core/tests/contract_unit.rs
// ============================================================================
// Module: Contract Evaluation Unit Tests
// Description: Staleness, signature-compliance, and snooze verdicts.
// Purpose: Pin the contract's three sub-verdicts and their risk fold.
// ============================================================================

//! Unit tests for dependency-contract evaluation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use time::macros::datetime;
use upgrade_guard_core::ContractMetadata;
use upgrade_guard_core::ContractStatus;
use upgrade_guard_core::RiskLevel;
use upgrade_guard_core::SignaturePolicy;
use upgrade_guard_core::SignatureStatus;
use upgrade_guard_core::SnoozeEntry;
use upgrade_guard_core::apply_contract_enforcements;
use upgrade_guard_core::contract::assess_signature_compliance;
use upgrade_guard_core::contract::assess_snoozes;
use upgrade_guard_core::evaluate_contract_metadata;
use upgrade_guard_core::sources::MirrorArtifact;
use upgrade_guard_core::sources::MirrorAudit;
use upgrade_guard_core::sources::MirrorSignature;

fn audit_with(status: &str, reason: Option<&str>) -> MirrorAudit {
    MirrorAudit {
        root: Some("/srv/mirror".to_string()),
        generated_at: Some("2025-06-01T00:00:00Z".to_string()),
        artifacts: vec![MirrorArtifact {
            name: "torch-2.3.0-py3-none-any.whl".to_string(),
            signature: MirrorSignature {
                status: status.to_string(),
                reason: reason.map(str::to_string),
            },
        }],
    }
}

#[test]
fn contract_validated_forty_days_ago_is_expired_and_blocked() {
    let metadata = ContractMetadata {
        last_validated: Some("2025-04-22T00:00:00Z".to_string()),
        default_review_days: Some(14),
        ..ContractMetadata::default()
    };
    let now = datetime!(2025-06-01 00:00:00 UTC);
    let report = evaluate_contract_metadata(&metadata, now);
    assert_eq!(report.status, ContractStatus::Expired);
    assert_eq!(report.risk, RiskLevel::Blocked);
    assert_eq!(report.age_days, Some(40));
    assert_eq!(report.threshold_days, Some(14));
    assert_eq!(report.note.as_deref(), Some("validated 40 day(s) ago (threshold 14 day(s))"));
}

#[test]
fn contract_within_cadence_is_fresh() {
    let metadata = ContractMetadata {
        last_validated: Some("2025-05-27T00:00:00Z".to_string()),
        default_review_days: Some(14),
        ..ContractMetadata::default()
    };
    let report = evaluate_contract_metadata(&metadata, datetime!(2025-06-01 00:00:00 UTC));
    assert_eq!(report.status, ContractStatus::Fresh);
    assert_eq!(report.risk, RiskLevel::Safe);
    assert_eq!(report.note.as_deref(), Some("validated 5 day(s) ago"));
}

#[test]
fn missing_validation_timestamp_needs_review() {
    let report = evaluate_contract_metadata(
        &ContractMetadata::default(),
        datetime!(2025-06-01 00:00:00 UTC),
    );
    assert_eq!(report.status, ContractStatus::Unknown);
    assert_eq!(report.risk, RiskLevel::NeedsReview);
    assert_eq!(report.age_days, None);
}

#[test]
fn unverified_enforced_artifact_fails_and_blocks() {
    let policy = SignaturePolicy {
        required: true,
        enforced_artifacts: vec!["torch-2.3.0-py3-none-any.whl".to_string()],
        ..SignaturePolicy::default()
    };
    let audit = audit_with("failed", Some("digest mismatch"));
    let compliance = assess_signature_compliance(Some(&policy), Some(&audit), None, false);
    assert_eq!(compliance.status, SignatureStatus::Failed);
    assert_eq!(compliance.risk, RiskLevel::Blocked);
    assert_eq!(compliance.failed_artifacts, 1);
    assert_eq!(
        compliance.issues,
        vec!["torch-2.3.0-py3-none-any.whl: digest mismatch".to_string()]
    );
}

#[test]
fn verified_artifacts_pass_cleanly() {
    let policy = SignaturePolicy { required: true, ..SignaturePolicy::default() };
    let audit = audit_with("verified", None);
    let compliance = assess_signature_compliance(Some(&policy), Some(&audit), None, false);
    assert_eq!(compliance.status, SignatureStatus::Verified);
    assert_eq!(compliance.risk, RiskLevel::Safe);
    assert_eq!(compliance.verified_artifacts, 1);
}

#[test]
fn signatures_not_required_and_not_forced_is_safe() {
    let compliance = assess_signature_compliance(None, None, None, false);
    assert_eq!(compliance.status, SignatureStatus::NotRequired);
    assert_eq!(compliance.risk, RiskLevel::Safe);
}

#[test]
fn forced_signature_check_without_audit_needs_review() {
    let compliance = assess_signature_compliance(None, None, None, true);
    assert_eq!(compliance.status, SignatureStatus::Unknown);
    assert_eq!(compliance.risk, RiskLevel::NeedsReview);
    assert_eq!(compliance.issues, vec!["mirror audit not provided".to_string()]);
}

#[test]
fn expired_snooze_blocks_with_days_overdue() {
    let snoozes = vec![SnoozeEntry {
        id: "SNZ-1".to_string(),
        expires_at: Some("2025-05-20T00:00:00Z".to_string()),
        ..SnoozeEntry::default()
    }];
    let status = assess_snoozes(&snoozes, datetime!(2025-06-01 00:00:00 UTC));
    assert_eq!(status.risk, RiskLevel::Blocked);
    assert_eq!(status.entries[0].days_overdue, Some(12));
    assert_eq!(status.counts.get("expired"), Some(&1));
}

#[test]
fn snooze_expiring_tomorrow_needs_review() {
    let snoozes = vec![SnoozeEntry {
        id: "SNZ-2".to_string(),
        expires_at: Some("2025-06-02T12:00:00Z".to_string()),
        ..SnoozeEntry::default()
    }];
    let status = assess_snoozes(&snoozes, datetime!(2025-06-01 00:00:00 UTC));
    assert_eq!(status.risk, RiskLevel::NeedsReview);
    assert_eq!(status.entries[0].days_remaining, Some(1));
    assert_eq!(status.counts.get("expiring-soon"), Some(&1));
}

#[test]
fn enforcement_fold_widens_a_fresh_contract() {
    let metadata = ContractMetadata {
        last_validated: Some("2025-05-30T00:00:00Z".to_string()),
        signature_policy: Some(SignaturePolicy { required: true, ..SignaturePolicy::default() }),
        ..ContractMetadata::default()
    };
    let now = datetime!(2025-06-01 00:00:00 UTC);
    let mut report = evaluate_contract_metadata(&metadata, now);
    assert_eq!(report.risk, RiskLevel::Safe);

    let audit = audit_with("missing", None);
    apply_contract_enforcements(&mut report, Some(&audit), None, false, now);
    assert_eq!(report.risk, RiskLevel::Blocked);
    let compliance = report.signature_compliance.unwrap();
    assert_eq!(compliance.status, SignatureStatus::Failed);
    assert_eq!(compliance.issues, vec!["torch-2.3.0-py3-none-any.whl: missing".to_string()]);
}

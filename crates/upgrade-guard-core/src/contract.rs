// crates/upgrade-guard-core/src/contract.rs
// ============================================================================
// Module: Upgrade Guard Contract Evaluation
// Description: Staleness, signature-compliance, and snooze verdicts.
// Purpose: Reduce the dependency contract to one folded risk level.
// Dependencies: crate::{clock, risk, sources}, serde, time
// ============================================================================

//! ## Overview
//! The dependency contract is a hand-authored policy document. Its report
//! folds three sub-verdicts: validation staleness against a review cadence,
//! signature compliance cross-checked against the mirror audit, and
//! per-exception snooze expiry. Contract risk is the max of the three and is
//! folded into the run's aggregate verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::parse_timestamp;
use crate::clock::whole_days_between;
use crate::risk::RiskLevel;
use crate::risk::SourceState;
use crate::sources::MirrorAudit;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Review cadence applied when the contract names none.
pub const DEFAULT_REVIEW_DAYS: i64 = 14;
/// Snoozes expiring within this window are flagged as expiring soon.
const SNOOZE_WARNING_DAYS: i64 = 3;

// ============================================================================
// SECTION: Policy Inputs
// ============================================================================

/// Signature policy extracted from `[policies.signatures]`.
///
/// # Invariants
/// - `enforced_artifacts` scopes the audit intersection; empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePolicy {
    /// Whether signatures are required at all.
    pub required: bool,
    /// Keyring reference, informational.
    pub keyring: Option<String>,
    /// Artifact names the policy enforces.
    pub enforced_artifacts: Vec<String>,
    /// Artifact names requiring attestations.
    pub attestation_required: Vec<String>,
    /// Grace period before unsigned artifacts block.
    pub grace_period_days: Option<i64>,
    /// Publishers trusted without per-artifact signatures.
    pub trusted_publishers: Vec<String>,
    /// Profiles allowed to ship unsigned artifacts.
    pub allow_unsigned_profiles: Vec<String>,
}

/// One snooze exception from `[[governance.snoozes]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeEntry {
    /// Snooze identifier.
    pub id: String,
    /// Optional scope selectors (package, profile, ...).
    pub scope: Option<BTreeMap<String, String>>,
    /// Why the exception exists.
    pub reason: Option<String>,
    /// Expiry timestamp text as authored.
    pub expires_at: Option<String>,
    /// Who requested the exception.
    pub requested_by: Option<String>,
    /// Who approved the exception.
    pub approver: Option<String>,
}

/// Environment alignment block from `[environment_alignment]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentAlignment {
    /// Channel alerted on alignment drift.
    pub alert_channel: Option<String>,
    /// Default sync window in days.
    pub default_sync_window_days: Option<i64>,
    /// Per-environment alignment records.
    pub environments: Vec<EnvironmentRecord>,
}

/// One environment's alignment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// Environment name.
    pub name: String,
    /// Dependency profiles the environment tracks.
    pub profiles: Vec<String>,
    /// Lockfiles the environment pins.
    pub lockfiles: Vec<String>,
    /// Model registry reference.
    pub model_registry: Option<String>,
    /// Last successful sync timestamp text.
    pub last_synced: Option<String>,
    /// Sync window override in days.
    pub sync_window_days: Option<i64>,
    /// Whether the environment requires signed artifacts.
    pub requires_signatures: bool,
}

/// Contract metadata the staleness verdict is computed from.
#[derive(Debug, Clone, Default)]
pub struct ContractMetadata {
    /// `[contract].status` as authored.
    pub contract_status: Option<String>,
    /// `[contract].last_validated` as authored.
    pub last_validated: Option<String>,
    /// `[contract].default_review_days` as authored.
    pub default_review_days: Option<i64>,
    /// Signature policy, when present.
    pub signature_policy: Option<SignaturePolicy>,
    /// Snooze exceptions.
    pub snoozes: Vec<SnoozeEntry>,
    /// Environment alignment block, when present.
    pub environment_alignment: Option<EnvironmentAlignment>,
}

// ============================================================================
// SECTION: Verdict Types
// ============================================================================

/// Contract staleness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractStatus {
    /// Validated within the review cadence.
    Fresh,
    /// Validated within twice the cadence.
    Stale,
    /// Validation older than twice the cadence.
    Expired,
    /// Timestamp missing or unparsable.
    Unknown,
    /// Contract source absent.
    Missing,
    /// Contract source unreadable.
    Error,
}

impl ContractStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Stale => "stale",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
            Self::Missing => "missing",
            Self::Error => "error",
        }
    }
}

/// Signature-compliance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureStatus {
    /// Policy does not require signatures and the caller did not force them.
    NotRequired,
    /// Mirror audit unavailable.
    Unknown,
    /// No audited artifact matched the enforced scope.
    MissingArtifacts,
    /// At least one enforced artifact failed verification.
    Failed,
    /// Every enforced artifact verified.
    Verified,
}

/// Per-snooze expiry verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnoozeState {
    /// Expiry comfortably in the future.
    Active,
    /// Expires within the warning window.
    ExpiringSoon,
    /// Already expired.
    Expired,
    /// Expiry missing or unparsable.
    Unknown,
}

impl SnoozeState {
    /// Returns a stable label for histogram keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiringSoon => "expiring-soon",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

/// Signature-compliance report folded into the contract verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCompliance {
    /// Verdict.
    pub status: SignatureStatus,
    /// Risk contribution.
    pub risk: RiskLevel,
    /// Per-artifact issue descriptions.
    pub issues: Vec<String>,
    /// Artifacts in scope.
    pub total_artifacts: usize,
    /// Artifacts that verified.
    pub verified_artifacts: usize,
    /// Artifacts that failed or lacked signatures.
    pub failed_artifacts: usize,
    /// Attestation-required artifact names, sorted.
    pub attestation_required: Vec<String>,
    /// Grace period from the policy.
    pub grace_period_days: Option<i64>,
}

impl SignatureCompliance {
    fn base(status: SignatureStatus, risk: RiskLevel, policy: Option<&SignaturePolicy>) -> Self {
        let mut attestation: Vec<String> =
            policy.map(|policy| policy.attestation_required.clone()).unwrap_or_default();
        attestation.sort();
        Self {
            status,
            risk,
            issues: Vec::new(),
            total_artifacts: 0,
            verified_artifacts: 0,
            failed_artifacts: 0,
            attestation_required: attestation,
            grace_period_days: policy.and_then(|policy| policy.grace_period_days),
        }
    }
}

/// Snooze assessment for one exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeAssessment {
    /// Snooze identifier.
    pub id: String,
    /// Expiry verdict.
    pub status: SnoozeState,
    /// Risk contribution.
    pub risk: RiskLevel,
    /// Expiry text as authored.
    pub expires_at: Option<String>,
    /// Days until expiry, when in the future.
    pub days_remaining: Option<i64>,
    /// Days past expiry, when already expired.
    pub days_overdue: Option<i64>,
}

/// Aggregated snooze verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeStatus {
    /// Widest risk across entries (`Safe` when none).
    pub risk: RiskLevel,
    /// Per-entry assessments.
    pub entries: Vec<SnoozeAssessment>,
    /// Histogram of states.
    pub counts: BTreeMap<String, u32>,
}

/// Full contract report folded into the guard assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReport {
    /// Staleness verdict.
    pub status: ContractStatus,
    /// Folded contract risk.
    pub risk: RiskLevel,
    /// Human-readable staleness note.
    pub note: Option<String>,
    /// `last_validated` text as authored.
    pub last_validated: Option<String>,
    /// Whole days since validation, when computable.
    pub age_days: Option<i64>,
    /// Effective review threshold in days.
    pub threshold_days: Option<i64>,
    /// `default_review_days` as authored (defaulted when absent).
    pub default_review_days: Option<i64>,
    /// `[contract].status` as authored.
    pub contract_status: Option<String>,
    /// Signature policy echoed for evidence.
    pub signature_policy: Option<SignaturePolicy>,
    /// Snooze entries echoed for evidence.
    pub snoozes: Vec<SnoozeEntry>,
    /// Signature-compliance sub-verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_compliance: Option<SignatureCompliance>,
    /// Snooze sub-verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snooze_status: Option<SnoozeStatus>,
    /// Environment alignment echoed for evidence.
    pub environment_alignment: Option<EnvironmentAlignment>,
}

// ============================================================================
// SECTION: Staleness
// ============================================================================

/// Evaluates contract staleness against the review cadence.
///
/// `threshold_days = max(default_review_days, 1)`; fresh within the
/// threshold, stale within twice the threshold, expired beyond that.
#[must_use]
pub fn evaluate_contract_metadata(
    metadata: &ContractMetadata,
    now: OffsetDateTime,
) -> ContractReport {
    let default_review_days = metadata.default_review_days.unwrap_or(DEFAULT_REVIEW_DAYS);
    let threshold_days = default_review_days.max(1);
    let block_threshold = threshold_days * 2;

    let validated_at =
        metadata.last_validated.as_deref().and_then(parse_timestamp);

    let (status, risk, note, age_days) = match validated_at {
        None => (
            ContractStatus::Unknown,
            RiskLevel::NeedsReview,
            Some("contract.last_validated missing or invalid".to_string()),
            None,
        ),
        Some(validated_at) => {
            let age = whole_days_between(validated_at, now);
            if age <= threshold_days {
                (
                    ContractStatus::Fresh,
                    RiskLevel::Safe,
                    Some(format!("validated {age} day(s) ago")),
                    Some(age),
                )
            } else if age <= block_threshold {
                (
                    ContractStatus::Stale,
                    RiskLevel::NeedsReview,
                    Some(format!("validated {age} day(s) ago (threshold {threshold_days} day(s))")),
                    Some(age),
                )
            } else {
                (
                    ContractStatus::Expired,
                    RiskLevel::Blocked,
                    Some(format!("validated {age} day(s) ago (threshold {threshold_days} day(s))")),
                    Some(age),
                )
            }
        }
    };

    ContractReport {
        status,
        risk,
        note,
        last_validated: metadata.last_validated.clone(),
        age_days,
        threshold_days: Some(threshold_days),
        default_review_days: Some(default_review_days),
        contract_status: metadata.contract_status.clone(),
        signature_policy: metadata.signature_policy.clone(),
        snoozes: metadata.snoozes.clone(),
        signature_compliance: None,
        snooze_status: None,
        environment_alignment: metadata.environment_alignment.clone(),
    }
}

/// Synthesizes a degraded report when the contract source is missing or
/// unreadable.
#[must_use]
pub fn degraded_contract_report(state: SourceState, message: Option<&str>) -> ContractReport {
    let status = match state {
        SourceState::Missing => ContractStatus::Missing,
        _ => ContractStatus::Error,
    };
    ContractReport {
        status,
        risk: RiskLevel::NeedsReview,
        note: message.map(str::to_string),
        last_validated: None,
        age_days: None,
        threshold_days: None,
        default_review_days: None,
        contract_status: None,
        signature_policy: None,
        snoozes: Vec::new(),
        signature_compliance: None,
        snooze_status: None,
        environment_alignment: None,
    }
}

// ============================================================================
// SECTION: Signature Compliance
// ============================================================================

/// Assesses signature compliance against the mirror audit.
///
/// `require_signature` forces the check even when the policy does not
/// require signatures (the default guard posture).
#[must_use]
pub fn assess_signature_compliance(
    policy: Option<&SignaturePolicy>,
    audit: Option<&MirrorAudit>,
    audit_error: Option<&str>,
    require_signature: bool,
) -> SignatureCompliance {
    let required = policy.is_some_and(|policy| policy.required);
    if !required && !require_signature {
        return SignatureCompliance::base(SignatureStatus::NotRequired, RiskLevel::Safe, policy);
    }

    let Some(audit) = audit else {
        let mut result =
            SignatureCompliance::base(SignatureStatus::Unknown, RiskLevel::NeedsReview, policy);
        result.issues =
            vec![audit_error.unwrap_or("mirror audit not provided").to_string()];
        return result;
    };

    let enforced: Vec<&str> = policy
        .map(|policy| policy.enforced_artifacts.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let in_scope: Vec<_> = audit
        .artifacts
        .iter()
        .filter(|artifact| enforced.is_empty() || enforced.contains(&artifact.name.as_str()))
        .collect();

    if in_scope.is_empty() {
        let mut result = SignatureCompliance::base(
            SignatureStatus::MissingArtifacts,
            RiskLevel::NeedsReview,
            policy,
        );
        result.issues = vec!["no mirror artifacts matched signature policy scope".to_string()];
        return result;
    }

    let failures: Vec<_> = in_scope.iter().filter(|artifact| !artifact.verified()).collect();
    let total = in_scope.len();
    let failed = failures.len();

    if failed > 0 {
        let mut result =
            SignatureCompliance::base(SignatureStatus::Failed, RiskLevel::Blocked, policy);
        result.total_artifacts = total;
        result.failed_artifacts = failed;
        result.verified_artifacts = total - failed;
        result.issues = failures
            .iter()
            .map(|artifact| {
                let reason = artifact
                    .signature
                    .reason
                    .as_deref()
                    .unwrap_or(artifact.signature.status.as_str());
                format!("{}: {reason}", artifact.name)
            })
            .collect();
        return result;
    }

    let mut result =
        SignatureCompliance::base(SignatureStatus::Verified, RiskLevel::Safe, policy);
    result.total_artifacts = total;
    result.verified_artifacts = total;
    result
}

// ============================================================================
// SECTION: Snoozes
// ============================================================================

/// Assesses snooze expiry across all exceptions.
#[must_use]
pub fn assess_snoozes(snoozes: &[SnoozeEntry], now: OffsetDateTime) -> SnoozeStatus {
    let mut status = SnoozeStatus::default();
    for entry in snoozes {
        let assessment = assess_snooze(entry, now);
        status.risk = status.risk.max(assessment.risk);
        *status.counts.entry(assessment.status.as_str().to_string()).or_insert(0) += 1;
        status.entries.push(assessment);
    }
    status
}

fn assess_snooze(entry: &SnoozeEntry, now: OffsetDateTime) -> SnoozeAssessment {
    let expires_at = entry.expires_at.as_deref().and_then(parse_timestamp);
    let (state, risk, days_remaining, days_overdue) = match expires_at {
        None => (SnoozeState::Unknown, RiskLevel::NeedsReview, None, None),
        Some(expires_at) => {
            let days = whole_days_between(now, expires_at);
            if expires_at < now {
                (SnoozeState::Expired, RiskLevel::Blocked, None, Some(days.abs()))
            } else if days <= SNOOZE_WARNING_DAYS {
                (SnoozeState::ExpiringSoon, RiskLevel::NeedsReview, Some(days.max(0)), None)
            } else {
                (SnoozeState::Active, RiskLevel::Safe, Some(days), None)
            }
        }
    };
    SnoozeAssessment {
        id: entry.id.clone(),
        status: state,
        risk,
        expires_at: entry.expires_at.clone(),
        days_remaining,
        days_overdue,
    }
}

// ============================================================================
// SECTION: Enforcement Fold
// ============================================================================

/// Folds signature compliance and snooze verdicts into a contract report.
pub fn apply_contract_enforcements(
    report: &mut ContractReport,
    audit: Option<&MirrorAudit>,
    audit_error: Option<&str>,
    require_signature: bool,
    now: OffsetDateTime,
) {
    let compliance = assess_signature_compliance(
        report.signature_policy.as_ref(),
        audit,
        audit_error,
        require_signature,
    );
    report.risk = report.risk.max(compliance.risk);
    report.signature_compliance = Some(compliance);

    let snooze_status = assess_snoozes(&report.snoozes, now);
    report.risk = report.risk.max(snooze_status.risk);
    report.snooze_status = Some(snooze_status);
}

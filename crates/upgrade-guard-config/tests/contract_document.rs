// crates/upgrade-guard-config/tests/contract_document.rs
// ============================================================================
// Module: Contract Document Tests
// Description: TOML parsing, conversion, limits, and load degradation.
// Purpose: Pin the contract wire format and its fail-closed loading.
// ============================================================================

//! Tests for dependency-contract parsing and loading.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;

use upgrade_guard_config::ContractDocument;
use upgrade_guard_config::MAX_CONTRACT_FILE_SIZE;
use upgrade_guard_config::load_contract;
use upgrade_guard_config::read_contract;
use upgrade_guard_core::SourceState;

const FULL_CONTRACT: &str = r##"
[contract]
status = "active"
last_validated = "2025-05-20T00:00:00Z"
default_review_days = 21

[policies.signatures]
required = true
keyring = "security/keyring.gpg"
enforced_artifacts = ["torch-2.3.0-py3-none-any.whl"]
attestation_required = ["torch-2.3.0-py3-none-any.whl"]
grace_period_days = 7

[policies.updates]
default_update_window_days = 10
minor_update_window_days = 20
major_review_required = true
autoresolver_weight_security = 8

[[policies.updates.package_overrides]]
name = "Django"
stay_on_major = true

[[governance.snoozes]]
id = "SNZ-42"
reason = "waiting on upstream fix"
expires_at = "2025-06-15T00:00:00Z"

[[governance.snoozes]]
reason = "no id, must be dropped"

[environment_alignment]
alert_channel = "#dependencies"
default_sync_window_days = 14

[[environment_alignment.environments]]
name = "production"
profiles = ["runtime"]
requires_signatures = true
"##;

#[test]
fn full_document_converts_to_core_inputs() {
    let document: ContractDocument = toml::from_str(FULL_CONTRACT).unwrap();

    let metadata = document.metadata();
    assert_eq!(metadata.contract_status.as_deref(), Some("active"));
    assert_eq!(metadata.default_review_days, Some(21));
    assert_eq!(metadata.snoozes.len(), 1);
    assert_eq!(metadata.snoozes[0].id, "SNZ-42");
    let policy = metadata.signature_policy.unwrap();
    assert!(policy.required);
    assert_eq!(policy.enforced_artifacts, vec!["torch-2.3.0-py3-none-any.whl".to_string()]);
    let alignment = metadata.environment_alignment.unwrap();
    assert_eq!(alignment.environments.len(), 1);
    assert!(alignment.environments[0].requires_signatures);

    let drift = document.drift_policy();
    assert_eq!(drift.default_update_window_days, 10);
    assert_eq!(drift.minor_update_window_days, 20);
    assert_eq!(drift.weight_security, 8);
    // Absent weights fall back to defaults.
    assert_eq!(drift.weight_recency, 3);
    let entry = drift.package_overrides.get("django").unwrap();
    assert_eq!(entry.name, "Django");
    assert!(entry.stay_on_major);
}

#[test]
fn empty_document_parses_with_defaults() {
    let document: ContractDocument = toml::from_str("").unwrap();
    let metadata = document.metadata();
    assert!(metadata.last_validated.is_none());
    assert!(metadata.snoozes.is_empty());
    assert_eq!(document.drift_policy().default_update_window_days, 14);
}

#[test]
fn absent_path_loads_as_missing() {
    let (summary, document) = load_contract(None);
    assert_eq!(summary.state, SourceState::Missing);
    assert_eq!(summary.message.as_deref(), Some("path not provided"));
    assert!(document.is_none());

    let (summary, document) = load_contract(Some(Path::new("/nonexistent/contract.toml")));
    assert_eq!(summary.state, SourceState::Missing);
    assert_eq!(summary.message.as_deref(), Some("file not found"));
    assert!(document.is_none());
}

#[test]
fn malformed_toml_loads_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.toml");
    fs::write(&path, "[contract\nstatus = broken").unwrap();

    let (summary, document) = load_contract(Some(&path));
    assert_eq!(summary.state, SourceState::Error);
    assert!(summary.message.as_deref().unwrap().contains("contract parse error"));
    assert!(document.is_none());
}

#[test]
fn oversized_contract_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.toml");
    let padding = "# padding\n".repeat(usize::try_from(MAX_CONTRACT_FILE_SIZE / 10).unwrap() + 1);
    fs::write(&path, padding).unwrap();

    let error = read_contract(&path).unwrap_err();
    assert!(error.to_string().contains("invalid contract path"));
}

#[test]
fn valid_contract_loads_ok() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.toml");
    fs::write(&path, FULL_CONTRACT).unwrap();

    let (summary, document) = load_contract(Some(&path));
    assert_eq!(summary.state, SourceState::Ok);
    assert_eq!(summary.raw_path.as_deref(), Some(path.as_path()));
    assert!(document.is_some());
}

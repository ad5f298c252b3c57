// crates/upgrade-guard-snapshot/tests/snapshot_store.rs
// ============================================================================
// Module: Snapshot Store Tests
// Description: Run capture, collision retry, retention, and latest pointer.
// Purpose: Pin the on-disk snapshot layout and its pruning behavior.
// ============================================================================

//! Tests for the filesystem snapshot store.

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

use time::OffsetDateTime;
use time::macros::datetime;
use upgrade_guard_core::GuardData;
use upgrade_guard_core::GuardReport;
use upgrade_guard_core::RiskLevel;
use upgrade_guard_core::SourceSummary;
use upgrade_guard_core::assemble_report;
use upgrade_guard_core::sources::SOURCE_CONTRACT;
use upgrade_guard_core::sources::SOURCE_CVE;
use upgrade_guard_core::sources::SOURCE_DRIFT;
use upgrade_guard_core::sources::SOURCE_PREFLIGHT;
use upgrade_guard_core::sources::SOURCE_RENOVATE;
use upgrade_guard_snapshot::SnapshotOptions;
use upgrade_guard_snapshot::SnapshotRecord;
use upgrade_guard_snapshot::SnapshotStore;

fn fixture() -> (GuardData, GuardReport) {
    let data = GuardData {
        preflight_summary: SourceSummary::missing(SOURCE_PREFLIGHT, "path not provided", None),
        renovate_summary: SourceSummary::missing(SOURCE_RENOVATE, "path not provided", None),
        cve_summary: SourceSummary::missing(SOURCE_CVE, "path not provided", None),
        contract_summary: SourceSummary::missing(SOURCE_CONTRACT, "path not provided", None),
        drift_summary: SourceSummary::missing(SOURCE_DRIFT, "path not provided", None),
        contract_report: None,
        drift_report: None,
    };
    let report = assemble_report(&data, Vec::new(), datetime!(2025-06-01 12:00:00 UTC));
    (data, report)
}

fn store_at(root: &Path, retention_days: i64) -> SnapshotStore {
    SnapshotStore::new(SnapshotOptions {
        root: root.to_path_buf(),
        tag: Some("ci".to_string()),
        retention_days,
    })
}

fn scripted_clock(times: Vec<OffsetDateTime>) -> impl FnMut() -> OffsetDateTime {
    let mut remaining = times;
    remaining.reverse();
    move || remaining.pop().unwrap_or(datetime!(2030-01-01 00:00:00 UTC))
}

#[test]
fn begin_run_claims_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), 30);
    let mut clock = scripted_clock(vec![datetime!(2025-06-01 12:00:00 UTC)]);

    let context = store.begin_run(&mut clock).unwrap();
    assert_eq!(context.run_id, "20250601T120000Z-ci");
    assert!(context.inputs_dir.is_dir());
    assert!(context.reports_dir.is_dir());
    assert!(!context.manifest_path.exists());
}

#[test]
fn collision_advances_to_the_next_clock_reading() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), 30);

    let mut first_clock = scripted_clock(vec![datetime!(2025-06-01 12:00:00 UTC)]);
    let first = store.begin_run(&mut first_clock).unwrap();

    let mut second_clock = scripted_clock(vec![
        datetime!(2025-06-01 12:00:00 UTC),
        datetime!(2025-06-01 12:00:01 UTC),
    ]);
    let second = store.begin_run(&mut second_clock).unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.run_id, "20250601T120001Z-ci");
}

#[test]
fn persist_run_writes_reports_manifest_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), 30);
    let (data, report) = fixture();
    let mut clock = scripted_clock(vec![datetime!(2025-06-01 12:00:00 UTC)]);
    let context = store.begin_run(&mut clock).unwrap();

    let manifest = store
        .persist_run(&context, &report, Some("# Summary\n"), &data, None, RiskLevel::NeedsReview)
        .unwrap();

    assert!(context.manifest_path.is_file());
    assert!(context.reports_dir.join("assessment.json").is_file());
    assert!(context.reports_dir.join("summary.md").is_file());
    assert!(manifest.inputs.values().all(Option::is_none));
    assert_eq!(manifest.fail_threshold, RiskLevel::NeedsReview);
    assert_eq!(manifest.highest_severity, RiskLevel::Safe);

    let index_path = dir.path().join("index").join(format!("{}.json", context.run_id));
    let record: SnapshotRecord =
        serde_json::from_str(&fs::read_to_string(&index_path).unwrap()).unwrap();
    assert_eq!(record.run_id, context.run_id);
    assert_eq!(record.sources.get("preflight").map(String::as_str), Some("missing"));

    let latest: SnapshotRecord = serde_json::from_str(
        &fs::read_to_string(dir.path().join("index").join("latest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(latest.run_id, context.run_id);
}

#[test]
fn retention_prunes_old_runs_and_refreshes_latest() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), 30);
    let (data, report) = fixture();

    // Seed an expired run and a foreign directory retention must ignore.
    let old_run = dir.path().join("20250101T000000Z-ci");
    fs::create_dir_all(&old_run).unwrap();
    let index_dir = dir.path().join("index");
    fs::create_dir_all(&index_dir).unwrap();
    fs::write(index_dir.join("20250101T000000Z-ci.json"), "{}").unwrap();
    let foreign = dir.path().join("lost+found");
    fs::create_dir_all(&foreign).unwrap();

    let mut clock = scripted_clock(vec![datetime!(2025-06-01 12:00:00 UTC)]);
    let context = store.begin_run(&mut clock).unwrap();
    let manifest = store
        .persist_run(&context, &report, None, &data, None, RiskLevel::NeedsReview)
        .unwrap();

    assert_eq!(manifest.pruned_snapshots, vec!["20250101T000000Z-ci".to_string()]);
    assert!(!old_run.exists());
    assert!(!index_dir.join("20250101T000000Z-ci.json").exists());
    assert!(foreign.is_dir());

    let latest: SnapshotRecord = serde_json::from_str(
        &fs::read_to_string(index_dir.join("latest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(latest.run_id, context.run_id);
}

#[test]
fn negative_retention_disables_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), -1);
    let old_run = dir.path().join("20200101T000000Z");
    fs::create_dir_all(&old_run).unwrap();

    let removed = store.prune_runs(datetime!(2025-06-01 12:00:00 UTC)).unwrap();
    assert!(removed.is_empty());
    assert!(old_run.is_dir());
}

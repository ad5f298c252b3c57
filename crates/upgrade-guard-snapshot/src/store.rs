// crates/upgrade-guard-snapshot/src/store.rs
// ============================================================================
// Module: Snapshot Store
// Description: Durable per-run capture of guard inputs, reports, and index.
// Purpose: Give every guard run an auditable, retained on-disk record.
// Dependencies: crate::run_id, serde, serde_json, thiserror, time,
// upgrade-guard-core
// ============================================================================

//! ## Overview
//! Each guard run persists under `<root>/<run_id>/` with copied inputs, the
//! generated reports, and a manifest written last. An `index/` directory
//! holds one record per run plus a `latest.json` pointer rebuilt from the
//! lexicographically last remaining record. Retention pruning deletes whole
//! run directories strictly older than the configured threshold and never
//! touches directories it cannot parse.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use upgrade_guard_core::GuardData;
use upgrade_guard_core::GuardReport;
use upgrade_guard_core::GuardSummary;
use upgrade_guard_core::RiskLevel;
use upgrade_guard_core::clock::format_timestamp;
use upgrade_guard_core::clock::whole_days_between;
use upgrade_guard_core::sources::SOURCE_CONTRACT;
use upgrade_guard_core::sources::SOURCE_CVE;
use upgrade_guard_core::sources::SOURCE_DRIFT;
use upgrade_guard_core::sources::SOURCE_PREFLIGHT;
use upgrade_guard_core::sources::SOURCE_RENOVATE;

use crate::run_id::format_run_id;
use crate::run_id::parse_run_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
/// Attempts to claim a unique run directory before giving up.
const MAX_RUN_ID_ATTEMPTS: u32 = 5;
/// Pause before re-reading the clock when a collision repeats.
const COLLISION_BACKOFF: Duration = Duration::from_millis(1_100);
/// Index file name for the rolling latest pointer.
const LATEST_FILE: &str = "latest.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Snapshot persistence failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem failure at a specific path.
    #[error("snapshot io error at {path}: {message}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Report serialization failure.
    #[error("snapshot serialization error: {0}")]
    Serialize(String),
    /// Could not claim a unique run directory.
    #[error("run id collision persisted after {MAX_RUN_ID_ATTEMPTS} attempts under {0}")]
    RunIdExhausted(PathBuf),
}

fn io_error(path: &Path, error: &std::io::Error) -> SnapshotError {
    SnapshotError::Io { path: path.to_path_buf(), message: error.to_string() }
}

// ============================================================================
// SECTION: Context & Records
// ============================================================================

/// Store configuration for one snapshot root.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Root directory holding run directories and the index.
    pub root: PathBuf,
    /// Optional tag appended to run identifiers.
    pub tag: Option<String>,
    /// Days to retain historical runs; negative disables pruning.
    pub retention_days: i64,
}

/// Claimed directories for one run.
///
/// # Invariants
/// - `run_dir`, `inputs_dir`, and `reports_dir` exist once the context is
///   returned; the manifest is written last during persistence.
#[derive(Debug, Clone)]
pub struct SnapshotContext {
    /// Run identifier.
    pub run_id: String,
    /// Moment the identifier was derived from.
    pub generated_at: OffsetDateTime,
    /// Snapshot root.
    pub root: PathBuf,
    /// This run's directory.
    pub run_dir: PathBuf,
    /// Directory for copied inputs.
    pub inputs_dir: PathBuf,
    /// Directory for generated reports.
    pub reports_dir: PathBuf,
    /// Manifest path, written last.
    pub manifest_path: PathBuf,
}

/// Manifest written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Run identifier.
    pub run_id: String,
    /// Run timestamp (RFC 3339).
    pub generated_at: String,
    /// Input name to copied path; `null` when the copy was skipped.
    pub inputs: BTreeMap<String, Option<String>>,
    /// Report name to written path.
    pub reports: BTreeMap<String, String>,
    /// Retention window applied during this run.
    pub retention_days: i64,
    /// Run identifiers pruned during this run.
    pub pruned_snapshots: Vec<String>,
    /// SBOM age observed by drift, when available.
    pub sbom_age_days: Option<i64>,
    /// SBOM staleness observed by drift, when available.
    pub sbom_stale: Option<bool>,
    /// Fail threshold the run was invoked with.
    pub fail_threshold: RiskLevel,
    /// Widest risk of the run.
    pub highest_severity: RiskLevel,
}

/// Per-run index record mirrored into `latest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Run identifier.
    pub run_id: String,
    /// Run timestamp (RFC 3339).
    pub generated_at: String,
    /// Manifest path.
    pub manifest: String,
    /// Run directory.
    pub root: String,
    /// Report name to written path.
    pub reports: BTreeMap<String, String>,
    /// Guard summary block.
    pub summary: GuardSummary,
    /// Fail threshold the run was invoked with.
    pub fail_threshold: RiskLevel,
    /// Widest risk of the run.
    pub highest_severity: RiskLevel,
    /// Run identifiers pruned during this run.
    pub pruned_snapshots: Vec<String>,
    /// SBOM age block.
    pub sbom: SbomBlock,
    /// Per-source load states.
    pub sources: BTreeMap<String, String>,
}

/// SBOM age block inside an index record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbomBlock {
    /// SBOM age in days, when measurable.
    pub age_days: Option<i64>,
    /// Whether the SBOM exceeded its cadence threshold.
    pub stale: Option<bool>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed snapshot store for guard runs.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    options: SnapshotOptions,
}

impl SnapshotStore {
    /// Creates a store over the configured root.
    #[must_use]
    pub const fn new(options: SnapshotOptions) -> Self {
        Self { options }
    }

    /// Returns the snapshot root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.options.root
    }

    /// Claims a unique run directory, retrying identifier collisions.
    ///
    /// The clock is re-read on every attempt; when the re-read identifier is
    /// unchanged (one-second resolution), the store backs off briefly first.
    ///
    /// # Errors
    /// Returns [`SnapshotError`] on filesystem failures or when 5 attempts
    /// all collide.
    pub fn begin_run(
        &self,
        clock: &mut dyn FnMut() -> OffsetDateTime,
    ) -> Result<SnapshotContext, SnapshotError> {
        fs::create_dir_all(&self.options.root)
            .map_err(|error| io_error(&self.options.root, &error))?;

        let mut previous_id: Option<String> = None;
        for _ in 0..MAX_RUN_ID_ATTEMPTS {
            if previous_id.is_some() {
                let moment = clock();
                let run_id = format_run_id(moment, self.options.tag.as_deref());
                if previous_id.as_deref() == Some(run_id.as_str()) {
                    thread::sleep(COLLISION_BACKOFF);
                    continue;
                }
                if let Some(context) = self.try_claim(run_id.clone(), moment)? {
                    return Ok(context);
                }
                previous_id = Some(run_id);
                continue;
            }
            let moment = clock();
            let run_id = format_run_id(moment, self.options.tag.as_deref());
            if let Some(context) = self.try_claim(run_id.clone(), moment)? {
                return Ok(context);
            }
            previous_id = Some(run_id);
        }
        Err(SnapshotError::RunIdExhausted(self.options.root.clone()))
    }

    fn try_claim(
        &self,
        run_id: String,
        moment: OffsetDateTime,
    ) -> Result<Option<SnapshotContext>, SnapshotError> {
        let run_dir = self.options.root.join(&run_id);
        match fs::create_dir(&run_dir) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(None);
            }
            Err(error) => return Err(io_error(&run_dir, &error)),
        }
        let inputs_dir = run_dir.join("inputs");
        let reports_dir = run_dir.join("reports");
        fs::create_dir_all(&inputs_dir).map_err(|error| io_error(&inputs_dir, &error))?;
        fs::create_dir_all(&reports_dir).map_err(|error| io_error(&reports_dir, &error))?;
        Ok(Some(SnapshotContext {
            run_id,
            generated_at: moment,
            root: self.options.root.clone(),
            manifest_path: run_dir.join("manifest.json"),
            inputs_dir,
            reports_dir,
            run_dir,
        }))
    }

    /// Persists a completed run: inputs, reports, retention, index, manifest.
    ///
    /// Input copies are best-effort; a failed or skipped copy records `null`
    /// in the manifest rather than aborting the run.
    ///
    /// # Errors
    /// Returns [`SnapshotError`] when report or manifest writes fail.
    pub fn persist_run(
        &self,
        context: &SnapshotContext,
        report: &GuardReport,
        markdown: Option<&str>,
        data: &GuardData,
        metadata_path: Option<&Path>,
        fail_threshold: RiskLevel,
    ) -> Result<SnapshotManifest, SnapshotError> {
        let mut inputs: BTreeMap<String, Option<String>> = BTreeMap::new();
        inputs.insert(
            SOURCE_PREFLIGHT.to_string(),
            copy_input(
                data.preflight_summary.raw_path.as_deref(),
                &context.inputs_dir.join("preflight.json"),
            ),
        );
        inputs.insert(
            SOURCE_RENOVATE.to_string(),
            copy_input(
                data.renovate_summary.raw_path.as_deref(),
                &context.inputs_dir.join("renovate.json"),
            ),
        );
        inputs.insert(
            SOURCE_CVE.to_string(),
            copy_input(data.cve_summary.raw_path.as_deref(), &context.inputs_dir.join("cve.json")),
        );
        inputs.insert(
            SOURCE_CONTRACT.to_string(),
            copy_input(
                data.contract_summary.raw_path.as_deref(),
                &context.inputs_dir.join("contract.toml"),
            ),
        );
        inputs.insert(
            SOURCE_DRIFT.to_string(),
            copy_input(
                data.drift_summary.raw_path.as_deref(),
                &context.inputs_dir.join("sbom.json"),
            ),
        );
        inputs.insert(
            "drift_metadata".to_string(),
            copy_input(metadata_path, &context.inputs_dir.join("metadata.json")),
        );

        let reports = self.write_reports(context, report, markdown, data)?;

        let pruned = self.prune_runs(context.generated_at)?;
        self.prune_index(&pruned)?;

        let manifest = SnapshotManifest {
            run_id: context.run_id.clone(),
            generated_at: format_timestamp(context.generated_at),
            inputs,
            reports,
            retention_days: self.options.retention_days,
            pruned_snapshots: pruned,
            sbom_age_days: data.drift_report.as_ref().and_then(|drift| drift.sbom_age_days),
            sbom_stale: data.drift_report.as_ref().map(|drift| drift.sbom_stale),
            fail_threshold,
            highest_severity: report.summary.highest_severity,
        };
        write_json(&context.manifest_path, &manifest)?;
        self.write_index_record(context, &manifest, report, data)?;
        Ok(manifest)
    }

    fn write_reports(
        &self,
        context: &SnapshotContext,
        report: &GuardReport,
        markdown: Option<&str>,
        data: &GuardData,
    ) -> Result<BTreeMap<String, String>, SnapshotError> {
        let mut reports: BTreeMap<String, String> = BTreeMap::new();

        let assessment_path = context.reports_dir.join("assessment.json");
        write_json(&assessment_path, report)?;
        reports.insert("assessment".to_string(), assessment_path.display().to_string());

        if let Some(markdown) = markdown {
            let summary_path = context.reports_dir.join("summary.md");
            fs::write(&summary_path, markdown)
                .map_err(|error| io_error(&summary_path, &error))?;
            reports.insert("summary_markdown".to_string(), summary_path.display().to_string());
        }

        if let Some(contract) = &data.contract_report {
            let contract_path = context.reports_dir.join("contract.json");
            write_json(&contract_path, contract)?;
            reports.insert("contract".to_string(), contract_path.display().to_string());
        }

        if let Some(drift) = &data.drift_report {
            let drift_path = context.reports_dir.join("drift.json");
            write_json(&drift_path, drift)?;
            reports.insert("drift".to_string(), drift_path.display().to_string());
        }

        Ok(reports)
    }

    /// Prunes run directories strictly older than the retention window.
    ///
    /// Directories whose names do not parse as run identifiers are left
    /// untouched.
    ///
    /// # Errors
    /// Returns [`SnapshotError`] when the root cannot be listed.
    pub fn prune_runs(&self, now: OffsetDateTime) -> Result<Vec<String>, SnapshotError> {
        if self.options.retention_days < 0 {
            return Ok(Vec::new());
        }
        let mut removed: Vec<String> = Vec::new();
        let entries = fs::read_dir(&self.options.root)
            .map_err(|error| io_error(&self.options.root, &error))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(parsed) = parse_run_id(&name) else {
                continue;
            };
            if whole_days_between(parsed, now) > self.options.retention_days {
                if fs::remove_dir_all(&path).is_ok() {
                    removed.push(name);
                }
            }
        }
        removed.sort();
        Ok(removed)
    }

    fn prune_index(&self, removed: &[String]) -> Result<(), SnapshotError> {
        if removed.is_empty() {
            return Ok(());
        }
        let index_dir = self.options.root.join("index");
        if !index_dir.exists() {
            return Ok(());
        }
        for run_id in removed {
            let path = index_dir.join(format!("{run_id}.json"));
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(io_error(&path, &error)),
            }
        }
        refresh_latest(&index_dir)
    }

    fn write_index_record(
        &self,
        context: &SnapshotContext,
        manifest: &SnapshotManifest,
        report: &GuardReport,
        data: &GuardData,
    ) -> Result<PathBuf, SnapshotError> {
        let index_dir = self.options.root.join("index");
        fs::create_dir_all(&index_dir).map_err(|error| io_error(&index_dir, &error))?;

        let sources: BTreeMap<String, String> = data
            .summaries()
            .iter()
            .map(|summary| (summary.name.clone(), summary.state.as_str().to_string()))
            .collect();

        let record = SnapshotRecord {
            run_id: context.run_id.clone(),
            generated_at: manifest.generated_at.clone(),
            manifest: context.manifest_path.display().to_string(),
            root: context.run_dir.display().to_string(),
            reports: manifest.reports.clone(),
            summary: report.summary.clone(),
            fail_threshold: manifest.fail_threshold,
            highest_severity: manifest.highest_severity,
            pruned_snapshots: manifest.pruned_snapshots.clone(),
            sbom: SbomBlock { age_days: manifest.sbom_age_days, stale: manifest.sbom_stale },
            sources,
        };

        let index_path = index_dir.join(format!("{}.json", context.run_id));
        write_json(&index_path, &record)?;
        refresh_latest(&index_dir)?;
        Ok(index_path)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rebuilds `latest.json` from the lexicographically last index record.
///
/// Removes the pointer when no records remain.
///
/// # Errors
/// Returns [`SnapshotError`] when the index cannot be listed or written.
pub fn refresh_latest(index_dir: &Path) -> Result<(), SnapshotError> {
    let latest_path = index_dir.join(LATEST_FILE);
    let mut entries: Vec<PathBuf> = Vec::new();
    let listing = fs::read_dir(index_dir).map_err(|error| io_error(index_dir, &error))?;
    for entry in listing.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && name != LATEST_FILE {
            entries.push(path);
        }
    }
    entries.sort();
    let Some(last) = entries.last() else {
        match fs::remove_file(&latest_path) {
            Ok(()) => return Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(io_error(&latest_path, &error)),
        }
    };
    let payload = fs::read_to_string(last).map_err(|error| io_error(last, &error))?;
    fs::write(&latest_path, payload).map_err(|error| io_error(&latest_path, &error))
}

fn copy_input(source: Option<&Path>, destination: &Path) -> Option<String> {
    let source = source?;
    if !source.exists() {
        return None;
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    fs::copy(source, destination).ok()?;
    Some(destination.display().to_string())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|error| SnapshotError::Serialize(error.to_string()))?;
    fs::write(path, format!("{text}\n")).map_err(|error| io_error(path, &error))
}

// crates/upgrade-guard-cli/src/guard.rs
// ============================================================================
// Module: Guard Command
// Description: Source loading, assessment, reporting, and snapshot wiring.
// Purpose: Drive one guard run from CLI flags to artifacts and an exit code.
// Dependencies: clap, upgrade-guard-config, upgrade-guard-core,
// upgrade-guard-snapshot
// ============================================================================

//! ## Overview
//! The guard command is tolerant end to end: every input is optional and a
//! missing or malformed source degrades the verdict instead of aborting the
//! run. Only output-writing failures are fatal. Snapshot persistence is
//! best-effort and warns on stderr rather than changing the verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use clap::ArgAction;
use clap::Args;
use clap::ValueEnum;
use time::OffsetDateTime;
use upgrade_guard_config::load_contract;
use upgrade_guard_core::CveReport;
use upgrade_guard_core::GuardData;
use upgrade_guard_core::GuardReport;
use upgrade_guard_core::MetadataSnapshot;
use upgrade_guard_core::MirrorAudit;
use upgrade_guard_core::PreflightReport;
use upgrade_guard_core::RenovateMetadata;
use upgrade_guard_core::RiskLevel;
use upgrade_guard_core::SbomDocument;
use upgrade_guard_core::SourceState;
use upgrade_guard_core::apply_contract_enforcements;
use upgrade_guard_core::assemble_report;
use upgrade_guard_core::assess_cve;
use upgrade_guard_core::assess_preflight;
use upgrade_guard_core::assess_renovate;
use upgrade_guard_core::degraded_contract_report;
use upgrade_guard_core::determine_exit_code;
use upgrade_guard_core::drift::apply_sbom_age;
use upgrade_guard_core::drift::evaluate_drift;
use upgrade_guard_core::evaluate_contract_metadata;
use upgrade_guard_core::load_optional_json;
use upgrade_guard_core::merge_assessments;
use upgrade_guard_core::render_markdown;
use upgrade_guard_core::sources::SOURCE_CVE;
use upgrade_guard_core::sources::SOURCE_DRIFT;
use upgrade_guard_core::sources::SOURCE_MIRROR;
use upgrade_guard_core::sources::SOURCE_PREFLIGHT;
use upgrade_guard_core::sources::SOURCE_RENOVATE;
use upgrade_guard_core::telemetry::GuardOutcome;
use upgrade_guard_core::telemetry::GuardRunEvent;
use upgrade_guard_core::telemetry::MetricsSink;
use upgrade_guard_core::telemetry::NoopMetricsSink;
use upgrade_guard_snapshot::DEFAULT_RETENTION_DAYS;
use upgrade_guard_snapshot::SnapshotOptions;
use upgrade_guard_snapshot::SnapshotStore;

use crate::CliError;
use crate::CliResult;
use crate::write_text;

// ============================================================================
// SECTION: Command Types
// ============================================================================

/// Fail-threshold selection for the guard verdict.
#[derive(ValueEnum, Copy, Clone, Debug)]
pub(crate) enum FailThresholdArg {
    /// Every verdict at or above safe fails (always non-zero).
    Safe,
    /// Fail on needs-review and blocked.
    NeedsReview,
    /// Fail only on blocked.
    Blocked,
}

impl FailThresholdArg {
    /// Maps the CLI selection onto the risk lattice.
    const fn risk(self) -> RiskLevel {
        match self {
            Self::Safe => RiskLevel::Safe,
            Self::NeedsReview => RiskLevel::NeedsReview,
            Self::Blocked => RiskLevel::Blocked,
        }
    }
}

/// Arguments for `guard`.
#[derive(Args, Debug)]
pub(crate) struct GuardCommand {
    /// Wheel preflight report JSON.
    #[arg(long, value_name = "PATH")]
    preflight: Option<PathBuf>,
    /// Upgrade-bot metadata JSON.
    #[arg(long, value_name = "PATH")]
    renovate: Option<PathBuf>,
    /// CVE advisory report JSON.
    #[arg(long, value_name = "PATH")]
    cve: Option<PathBuf>,
    /// Dependency contract TOML.
    #[arg(long, value_name = "PATH")]
    contract: Option<PathBuf>,
    /// CycloneDX SBOM JSON for drift analysis.
    #[arg(long, value_name = "PATH")]
    sbom: Option<PathBuf>,
    /// Latest-version metadata snapshot JSON.
    #[arg(long, value_name = "PATH")]
    metadata: Option<PathBuf>,
    /// Mirror signature audit JSON.
    #[arg(long = "mirror-audit", value_name = "PATH")]
    mirror_audit: Option<PathBuf>,
    /// SBOM cadence threshold in days.
    #[arg(long = "sbom-max-age-days", value_name = "DAYS", default_value_t = 7)]
    sbom_max_age_days: i64,
    /// Output path for the JSON assessment (defaults to stdout).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Output path for the Markdown summary.
    #[arg(long, value_name = "PATH")]
    markdown: Option<PathBuf>,
    /// Snapshot root directory; omit to disable snapshots.
    #[arg(long = "snapshot-root", value_name = "DIR")]
    snapshot_root: Option<PathBuf>,
    /// Tag appended to the snapshot run identifier.
    #[arg(long = "snapshot-tag", value_name = "TAG")]
    snapshot_tag: Option<String>,
    /// Snapshot retention window in days.
    #[arg(
        long = "snapshot-retention-days",
        value_name = "DAYS",
        default_value_t = DEFAULT_RETENTION_DAYS
    )]
    snapshot_retention_days: i64,
    /// Skip snapshot persistence entirely.
    #[arg(long = "skip-snapshots", action = ArgAction::SetTrue)]
    skip_snapshots: bool,
    /// Require mirror signature verification even when the contract does not
    /// (the default; last flag wins).
    #[arg(
        long = "mirror-require-signature",
        action = ArgAction::SetTrue,
        overrides_with = "mirror_allow_missing"
    )]
    mirror_require_signature: bool,
    /// Tolerate a missing mirror audit despite signature requirements.
    #[arg(
        long = "mirror-allow-missing",
        action = ArgAction::SetTrue,
        overrides_with = "mirror_require_signature"
    )]
    mirror_allow_missing: bool,
    /// Verdict level at which the exit code becomes non-zero.
    #[arg(long = "fail-threshold", value_enum, default_value_t = FailThresholdArg::NeedsReview)]
    fail_threshold: FailThresholdArg,
    /// Print the Markdown summary to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

/// Signature enforcement defaults on; `--mirror-allow-missing` opts out.
const fn require_mirror_signature(command: &GuardCommand) -> bool {
    command.mirror_require_signature || !command.mirror_allow_missing
}

// ============================================================================
// SECTION: Orchestration
// ============================================================================

/// Runs one guard assessment and returns its exit code.
pub(crate) fn run_guard(command: &GuardCommand) -> CliResult<u8> {
    let sink = NoopMetricsSink;
    let now = OffsetDateTime::now_utc();

    let (preflight_summary, preflight) =
        load_optional_json::<PreflightReport>(command.preflight.as_deref(), SOURCE_PREFLIGHT);
    let (renovate_summary, renovate) =
        load_optional_json::<RenovateMetadata>(command.renovate.as_deref(), SOURCE_RENOVATE);
    let (cve_summary, cve) = load_optional_json::<CveReport>(command.cve.as_deref(), SOURCE_CVE);
    let (contract_summary, contract) = load_contract(command.contract.as_deref());
    let (drift_summary, sbom) =
        load_optional_json::<SbomDocument>(command.sbom.as_deref(), SOURCE_DRIFT);
    let (metadata_summary, metadata) =
        load_optional_json::<MetadataSnapshot>(command.metadata.as_deref(), SOURCE_DRIFT);
    let (mirror_summary, mirror) =
        load_optional_json::<MirrorAudit>(command.mirror_audit.as_deref(), SOURCE_MIRROR);

    let assessments = [
        preflight.as_ref().map(|report| assess_preflight(&report.packages)).unwrap_or_default(),
        renovate.as_ref().map(|report| assess_renovate(report.entries())).unwrap_or_default(),
        cve.as_ref().map(|report| assess_cve(report.entries())).unwrap_or_default(),
    ];
    let packages = merge_assessments(assessments);

    let mut contract_report = match &contract {
        Some(document) => evaluate_contract_metadata(&document.metadata(), now),
        None => {
            degraded_contract_report(contract_summary.state, contract_summary.message.as_deref())
        }
    };
    let audit_error = (mirror_summary.state == SourceState::Error)
        .then(|| mirror_summary.message.clone())
        .flatten();
    let require_signature = require_mirror_signature(command);
    apply_contract_enforcements(
        &mut contract_report,
        mirror.as_ref(),
        audit_error.as_deref(),
        require_signature,
        now,
    );

    let policy =
        contract.as_ref().map(|document| document.drift_policy()).unwrap_or_default();
    let drift_report = sbom.as_ref().map(|document| {
        let mut report = evaluate_drift(&document.components, metadata.as_ref(), &policy, now);
        if metadata_summary.state == SourceState::Ok {
            report.metadata_path = metadata_summary.raw_path_string();
        }
        if let Some(sbom_path) = command.sbom.as_deref() {
            apply_sbom_age(&mut report, sbom_path, Some(command.sbom_max_age_days), now);
        }
        report
    });

    let data = GuardData {
        preflight_summary,
        renovate_summary,
        cve_summary,
        contract_summary,
        drift_summary,
        contract_report: Some(contract_report),
        drift_report,
    };
    let report = assemble_report(&data, packages, now);
    let markdown = render_markdown(&report);

    write_outputs(command, &report, &markdown)?;
    if !command.skip_snapshots {
        persist_snapshot(command, &report, &markdown, &data);
    }

    sink.record_guard_run(&GuardRunEvent {
        outcome: GuardOutcome::Verdict(report.summary.highest_severity),
        packages_flagged: report.summary.packages_flagged,
        inputs_missing: report.summary.inputs_missing.len(),
    });
    Ok(determine_exit_code(report.summary.highest_severity, command.fail_threshold.risk()))
}

// ============================================================================
// SECTION: Outputs & Snapshots
// ============================================================================

fn write_outputs(command: &GuardCommand, report: &GuardReport, markdown: &str) -> CliResult<()> {
    let payload = serde_json::to_string_pretty(report)
        .map_err(|error| CliError::new(format!("failed to serialize assessment: {error}")))?;
    match command.output.as_deref() {
        Some(path) => write_text(path, &format!("{payload}\n"))?,
        None => println!("{payload}"),
    }
    if let Some(path) = command.markdown.as_deref() {
        write_text(path, &format!("{markdown}\n"))?;
    }
    if command.verbose {
        eprintln!("{markdown}");
    }
    Ok(())
}

fn persist_snapshot(command: &GuardCommand, report: &GuardReport, markdown: &str, data: &GuardData) {
    let Some(root) = command.snapshot_root.clone() else {
        return;
    };
    let store = SnapshotStore::new(SnapshotOptions {
        root,
        tag: command.snapshot_tag.clone(),
        retention_days: command.snapshot_retention_days,
    });
    let mut clock = OffsetDateTime::now_utc;
    let context = match store.begin_run(&mut clock) {
        Ok(context) => context,
        Err(error) => {
            eprintln!("upgrade-guard: snapshot skipped: {error}");
            return;
        }
    };
    if let Err(error) = store.persist_run(
        &context,
        report,
        Some(markdown),
        data,
        command.metadata.as_deref(),
        command.fail_threshold.risk(),
    ) {
        eprintln!("upgrade-guard: snapshot incomplete: {error}");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use clap::Parser;

    use super::GuardCommand;
    use super::require_mirror_signature;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        command: GuardCommand,
    }

    fn parse(args: &[&str]) -> GuardCommand {
        let mut argv = vec!["upgrade-guard"];
        argv.extend_from_slice(args);
        Harness::parse_from(argv).command
    }

    #[test]
    fn signature_enforcement_is_on_by_default() {
        assert!(require_mirror_signature(&parse(&[])));
        assert!(require_mirror_signature(&parse(&["--mirror-require-signature"])));
    }

    #[test]
    fn allow_missing_disables_enforcement() {
        assert!(!require_mirror_signature(&parse(&["--mirror-allow-missing"])));
    }

    #[test]
    fn later_mirror_flag_wins() {
        assert!(require_mirror_signature(&parse(&[
            "--mirror-allow-missing",
            "--mirror-require-signature",
        ])));
        assert!(!require_mirror_signature(&parse(&[
            "--mirror-require-signature",
            "--mirror-allow-missing",
        ])));
    }
}

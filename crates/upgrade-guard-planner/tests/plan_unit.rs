// crates/upgrade-guard-planner/tests/plan_unit.rs
// ============================================================================
// Module: Plan Generation Tests
// Description: Ranking, verification accounting, skips, and fatal inputs.
// Purpose: Pin end-to-end plan assembly against a scripted resolver.
// ============================================================================

//! Tests for upgrade plan generation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use time::macros::datetime;
use upgrade_guard_core::drift::DriftPolicy;
use upgrade_guard_core::drift::DriftSeverity;
use upgrade_guard_core::telemetry::NoopMetricsSink;
use upgrade_guard_planner::PlannerConfig;
use upgrade_guard_planner::PlannerError;
use upgrade_guard_planner::ResolverClient;
use upgrade_guard_planner::ResolverResult;
use upgrade_guard_planner::ResolverUnavailable;
use upgrade_guard_planner::UpgradeCandidate;
use upgrade_guard_planner::dry_run_command_text;
use upgrade_guard_planner::generate_plan;
use upgrade_guard_planner::render_plan_text;

/// Resolver whose verdicts are scripted per canonical package name.
struct ScriptedResolver {
    verdicts: BTreeMap<String, &'static str>,
}

impl ScriptedResolver {
    fn new(verdicts: &[(&str, &'static str)]) -> Self {
        Self {
            verdicts: verdicts
                .iter()
                .map(|(name, status)| ((*name).to_string(), *status))
                .collect(),
        }
    }
}

impl ResolverClient for ScriptedResolver {
    fn dry_run_update(
        &self,
        candidate: &UpgradeCandidate,
    ) -> Result<ResolverResult, ResolverUnavailable> {
        let status = self.verdicts.get(&candidate.canonical_name).copied().unwrap_or("ok");
        let failed = status == "failed";
        let reason = failed.then(|| "resolver exited with exit status: 1".to_string());
        Ok(ResolverResult {
            status: status.to_string(),
            command: dry_run_command_text(Path::new("uv"), &candidate.canonical_name),
            returncode: Some(i32::from(failed)),
            stdout: String::new(),
            stderr: String::new(),
            reason,
            duration_seconds: Some(0.05),
        })
    }
}

const SBOM: &str = r#"{
  "components": [
    {"name": "requests", "version": "2.31.0"},
    {"name": "urllib3", "version": "1.26.0"},
    {"name": "Django", "version": "4.2.0"},
    {"name": "zlib", "version": "1.3.0"},
    {"version": "0.1.0"}
  ]
}"#;

const METADATA: &str = r#"{
  "packages": {
    "requests": {"latest": "2.32.0"},
    "urllib3": {"latest": "1.26.18"},
    "django": {"latest": "5.0.0"},
    "zlib": {"latest": "1.3.0"}
  }
}"#;

fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    let sbom_path = dir.join("sbom.json");
    let metadata_path = dir.join("metadata.json");
    fs::write(&sbom_path, SBOM).unwrap();
    fs::write(&metadata_path, METADATA).unwrap();
    (sbom_path, metadata_path)
}

fn config(sbom_path: PathBuf, metadata_path: Option<PathBuf>) -> PlannerConfig {
    PlannerConfig {
        sbom_path,
        metadata_path,
        packages: BTreeSet::new(),
        allow_major: true,
        limit: None,
        resolver_command: "uv".to_string(),
        project_root: PathBuf::from("."),
        skip_resolver: false,
        resolver_timeout: Duration::from_secs(120),
    }
}

#[test]
fn plan_ranks_candidates_and_counts_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let (sbom_path, metadata_path) = write_fixtures(dir.path());
    let config = config(sbom_path, Some(metadata_path));
    let resolver = ScriptedResolver::new(&[("requests", "failed")]);
    let now = datetime!(2025-06-01 12:00:00 UTC);

    let result =
        generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now).unwrap();

    let names: Vec<&str> =
        result.attempts.iter().map(|entry| entry.candidate.canonical_name.as_str()).collect();
    assert_eq!(names, vec!["django", "requests", "urllib3"]);
    assert_eq!(result.attempts[0].candidate.name, "Django");
    assert_eq!(result.attempts[0].candidate.severity, DriftSeverity::Major);
    assert_eq!(
        result.attempts[0].candidate.notes,
        vec!["major upgrade available (4.2.0 -> 5.0.0)".to_string()]
    );
    assert_eq!(result.attempts[0].resolver.returncode, Some(0));
    assert_eq!(result.attempts[1].resolver.returncode, Some(1));
    assert_eq!(result.summary.ok, 2);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(result.summary.skipped, 0);
    assert_eq!(
        result.recommended_commands,
        vec!["uv update django".to_string(), "uv update urllib3".to_string()]
    );
    assert_eq!(result.exit_code(), 2);
    assert_eq!(result.generated_at, "2025-06-01T12:00:00Z");

    let text = render_plan_text(&result);
    assert!(text.starts_with("Upgrade plan (3 candidate(s); ok=2 failed=1 skipped=0)"));
    assert!(text.contains("Recommended commands:"));
}

#[test]
fn skipping_the_resolver_skips_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let (sbom_path, metadata_path) = write_fixtures(dir.path());
    let mut config = config(sbom_path, Some(metadata_path));
    config.skip_resolver = true;
    let resolver = ScriptedResolver::new(&[]);
    let now = datetime!(2025-06-01 12:00:00 UTC);

    let result =
        generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now).unwrap();

    assert_eq!(result.summary.skipped, result.attempts.len());
    assert_eq!(result.summary.failed, 0);
    assert!(result.recommended_commands.is_empty());
    assert_eq!(result.exit_code(), 0);
    let first = &result.attempts[0].resolver;
    assert_eq!(first.status, "skipped");
    assert_eq!(first.returncode, None);
    assert_eq!(first.reason.as_deref(), Some("resolver verification skipped"));
    assert_eq!(first.command, "uv update django --dry-run --no-ansi --no-interaction");
}

#[test]
fn majors_are_dropped_without_approval() {
    let dir = tempfile::tempdir().unwrap();
    let (sbom_path, metadata_path) = write_fixtures(dir.path());
    let mut config = config(sbom_path, Some(metadata_path));
    config.allow_major = false;
    let resolver = ScriptedResolver::new(&[]);
    let now = datetime!(2025-06-01 12:00:00 UTC);

    let result =
        generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now).unwrap();
    let names: Vec<&str> =
        result.attempts.iter().map(|entry| entry.candidate.canonical_name.as_str()).collect();
    assert_eq!(names, vec!["requests", "urllib3"]);
}

#[test]
fn package_filter_and_limit_narrow_the_plan() {
    let dir = tempfile::tempdir().unwrap();
    let (sbom_path, metadata_path) = write_fixtures(dir.path());
    let mut config = config(sbom_path, Some(metadata_path));
    config.packages = ["requests".to_string()].into_iter().collect();
    let resolver = ScriptedResolver::new(&[]);
    let now = datetime!(2025-06-01 12:00:00 UTC);

    let result =
        generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now).unwrap();
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.attempts[0].candidate.canonical_name, "requests");
    assert_eq!(result.packages_requested, Some(vec!["requests".to_string()]));

    config.packages = BTreeSet::new();
    config.limit = Some(1);
    let result =
        generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now).unwrap();
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.attempts[0].candidate.canonical_name, "django");
}

#[test]
fn missing_sbom_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path().join("absent.json"), None);
    let resolver = ScriptedResolver::new(&[]);
    let now = datetime!(2025-06-01 12:00:00 UTC);

    let error = generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now)
        .unwrap_err();
    assert!(matches!(error, PlannerError::SbomMissing(_)));
}

#[test]
fn malformed_metadata_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (sbom_path, _) = write_fixtures(dir.path());
    let metadata_path = dir.path().join("broken.json");
    fs::write(&metadata_path, "{not json").unwrap();
    let config = config(sbom_path, Some(metadata_path));
    let resolver = ScriptedResolver::new(&[]);
    let now = datetime!(2025-06-01 12:00:00 UTC);

    let error = generate_plan(&config, &DriftPolicy::default(), &resolver, &NoopMetricsSink, now)
        .unwrap_err();
    assert!(matches!(error, PlannerError::MetadataInvalid { .. }));
}

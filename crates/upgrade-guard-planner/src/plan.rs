// crates/upgrade-guard-planner/src/plan.rs
// ============================================================================
// Module: Plan Generation
// Description: End-to-end upgrade plan assembly and rendering.
// Purpose: Turn an SBOM plus metadata into a ranked, verified upgrade plan.
// Dependencies: crate::{candidates, resolver}, serde, serde_json, thiserror,
// time, upgrade-guard-core
// ============================================================================

//! ## Overview
//! Plan generation is strict where the guard is tolerant: a missing SBOM or
//! an unresolvable resolver executable is a fatal [`PlannerError`], because
//! a plan built on nothing would be worse than no plan. Each ranked
//! candidate is verified through the [`ResolverClient`] seam unless
//! verification is skipped, and every attempt is mirrored to the metrics
//! sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use upgrade_guard_core::MetadataSnapshot;
use upgrade_guard_core::SbomDocument;
use upgrade_guard_core::clock::format_timestamp;
use upgrade_guard_core::drift::DriftPolicy;
use upgrade_guard_core::telemetry::AttemptStatus;
use upgrade_guard_core::telemetry::MetricsSink;
use upgrade_guard_core::telemetry::ResolverAttemptEvent;

use crate::candidates::SelectionOptions;
use crate::candidates::UpgradeCandidate;
use crate::candidates::select_candidates;
use crate::resolver::ResolverClient;
use crate::resolver::ResolverResult;
use crate::resolver::ResolverUnavailable;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal planner setup or verification failures.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// SBOM path does not exist.
    #[error("SBOM file not found: {}", .0.display())]
    SbomMissing(PathBuf),
    /// SBOM present but unreadable or malformed.
    #[error("invalid SBOM at {}: {message}", path.display())]
    SbomInvalid {
        /// SBOM path.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },
    /// Metadata snapshot present but unreadable or malformed.
    #[error("invalid metadata snapshot at {}: {message}", path.display())]
    MetadataInvalid {
        /// Metadata path.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },
    /// Resolver executable could not be located.
    #[error("resolver executable not found: {0}")]
    ResolverNotFound(String),
    /// Resolver could not be invoked mid-plan.
    #[error(transparent)]
    Resolver(#[from] ResolverUnavailable),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Inputs for one planner run.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// CycloneDX SBOM path; must exist.
    pub sbom_path: PathBuf,
    /// Optional latest-version metadata snapshot.
    pub metadata_path: Option<PathBuf>,
    /// Explicit canonical-name filter; empty plans everything.
    pub packages: BTreeSet<String>,
    /// Whether major upgrades may be planned.
    pub allow_major: bool,
    /// Cap on ranked candidates.
    pub limit: Option<usize>,
    /// Resolver command as configured, used in rendered commands.
    pub resolver_command: String,
    /// Working directory for dry runs.
    pub project_root: PathBuf,
    /// Skip resolver verification entirely.
    pub skip_resolver: bool,
    /// Per-attempt dry-run timeout.
    pub resolver_timeout: Duration,
}

// ============================================================================
// SECTION: Result Types
// ============================================================================

/// One verified (or skipped) plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Ranked candidate.
    pub candidate: UpgradeCandidate,
    /// Resolver verdict for the candidate.
    pub resolver: ResolverResult,
}

/// Attempt status histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Dry runs that resolved cleanly.
    pub ok: usize,
    /// Dry runs that failed or timed out.
    pub failed: usize,
    /// Attempts skipped before invocation.
    pub skipped: usize,
}

/// Full planner artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerResult {
    /// Run timestamp (RFC 3339).
    pub generated_at: String,
    /// SBOM path the plan was built from.
    pub sbom_path: String,
    /// Metadata snapshot path, when one was read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    /// Explicit package filter, when one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_requested: Option<Vec<String>>,
    /// Whether major upgrades were allowed.
    pub allow_major: bool,
    /// Whether resolver verification was skipped.
    pub skip_resolver: bool,
    /// Working directory dry runs executed under.
    pub project_root: String,
    /// Attempt status histogram.
    pub summary: PlanSummary,
    /// Ready-to-run commands for cleanly resolved entries, ranked order.
    pub recommended_commands: Vec<String>,
    /// Per-candidate attempts in ranked order.
    pub attempts: Vec<PlanEntry>,
}

impl PlannerResult {
    /// Maps the plan onto a process exit code: 2 when any dry run failed.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.summary.failed > 0 { 2 } else { 0 }
    }
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Generates a ranked, verified upgrade plan.
///
/// # Errors
/// Returns [`PlannerError`] when the SBOM is missing or malformed, when
/// provided metadata is malformed, or when the resolver cannot be invoked.
pub fn generate_plan(
    config: &PlannerConfig,
    policy: &DriftPolicy,
    resolver: &dyn ResolverClient,
    sink: &dyn MetricsSink,
    now: OffsetDateTime,
) -> Result<PlannerResult, PlannerError> {
    let sbom = load_sbom(config)?;
    let metadata = load_metadata(config)?;

    let options = SelectionOptions {
        packages: config.packages.clone(),
        allow_major: config.allow_major,
        skip_resolver: config.skip_resolver,
        limit: config.limit,
    };
    let candidates = select_candidates(&sbom.components, metadata.as_ref(), policy, &options);

    let mut attempts: Vec<PlanEntry> = Vec::with_capacity(candidates.len());
    let mut summary = PlanSummary::default();
    for candidate in candidates {
        let result = evaluate_candidate(config, resolver, &candidate)?;
        match result.attempt_status() {
            AttemptStatus::Ok => summary.ok += 1,
            AttemptStatus::Failed => summary.failed += 1,
            AttemptStatus::Skipped => summary.skipped += 1,
        }
        sink.record_resolver_attempt(&ResolverAttemptEvent {
            package: candidate.canonical_name.clone(),
            status: result.attempt_status(),
            duration: result.duration_seconds.map(Duration::from_secs_f64),
        });
        attempts.push(PlanEntry { candidate, resolver: result });
    }

    let recommended_commands = attempts
        .iter()
        .filter(|entry| entry.resolver.attempt_status() == AttemptStatus::Ok)
        .map(|entry| {
            format!("{} update {}", config.resolver_command, entry.candidate.canonical_name)
        })
        .collect();

    Ok(PlannerResult {
        generated_at: format_timestamp(now),
        sbom_path: config.sbom_path.display().to_string(),
        metadata_path: config
            .metadata_path
            .as_ref()
            .filter(|path| path.exists())
            .map(|path| path.display().to_string()),
        packages_requested: if config.packages.is_empty() {
            None
        } else {
            Some(config.packages.iter().cloned().collect())
        },
        allow_major: config.allow_major,
        skip_resolver: config.skip_resolver,
        project_root: config.project_root.display().to_string(),
        summary,
        recommended_commands,
        attempts,
    })
}

fn evaluate_candidate(
    config: &PlannerConfig,
    resolver: &dyn ResolverClient,
    candidate: &UpgradeCandidate,
) -> Result<ResolverResult, PlannerError> {
    let command = format!(
        "{} update {} --dry-run --no-ansi --no-interaction",
        config.resolver_command, candidate.canonical_name
    );
    if candidate.latest.is_none() {
        return Ok(ResolverResult::skipped(command, "latest version metadata unavailable"));
    }
    if config.skip_resolver {
        return Ok(ResolverResult::skipped(command, "resolver verification skipped"));
    }
    Ok(resolver.dry_run_update(candidate)?)
}

fn load_sbom(config: &PlannerConfig) -> Result<SbomDocument, PlannerError> {
    if !config.sbom_path.exists() {
        return Err(PlannerError::SbomMissing(config.sbom_path.clone()));
    }
    let text = fs::read_to_string(&config.sbom_path).map_err(|error| {
        PlannerError::SbomInvalid { path: config.sbom_path.clone(), message: error.to_string() }
    })?;
    serde_json::from_str(&text).map_err(|error| PlannerError::SbomInvalid {
        path: config.sbom_path.clone(),
        message: error.to_string(),
    })
}

fn load_metadata(config: &PlannerConfig) -> Result<Option<MetadataSnapshot>, PlannerError> {
    let Some(path) = config.metadata_path.as_ref().filter(|path| path.exists()) else {
        return Ok(None);
    };
    let text = fs::read_to_string(path).map_err(|error| PlannerError::MetadataInvalid {
        path: path.clone(),
        message: error.to_string(),
    })?;
    serde_json::from_str(&text).map(Some).map_err(|error| PlannerError::MetadataInvalid {
        path: path.clone(),
        message: error.to_string(),
    })
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a human-readable scoreboard for verbose or output-less runs.
#[must_use]
pub fn render_plan_text(result: &PlannerResult) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "Upgrade plan ({} candidate(s); ok={} failed={} skipped={})",
        result.attempts.len(),
        result.summary.ok,
        result.summary.failed,
        result.summary.skipped
    ));
    for entry in &result.attempts {
        let candidate = &entry.candidate;
        let factors: Vec<String> = candidate
            .score_breakdown
            .iter()
            .map(|(factor, value)| format!("{factor}={value:+.1}"))
            .collect();
        lines.push(format!(
            "  {:<30} {:>5.2}  {:<8} {} -> {}  [{}]",
            candidate.name,
            candidate.score,
            candidate.severity.as_str(),
            candidate.current.as_deref().unwrap_or("?"),
            candidate.latest.as_deref().unwrap_or("?"),
            factors.join(", ")
        ));
        lines.push(format!(
            "    resolver: {}{}",
            entry.resolver.status,
            entry
                .resolver
                .reason
                .as_deref()
                .map(|reason| format!(" ({reason})"))
                .unwrap_or_default()
        ));
    }
    if !result.recommended_commands.is_empty() {
        lines.push("Recommended commands:".to_string());
        for command in &result.recommended_commands {
            lines.push(format!("  {command}"));
        }
    }
    lines.join("\n")
}

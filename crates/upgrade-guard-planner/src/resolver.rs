// crates/upgrade-guard-planner/src/resolver.rs
// ============================================================================
// Module: Planner Resolver Client
// Description: Dry-run verification of upgrade candidates via an external
// resolver.
// Purpose: Isolate subprocess handling behind a trait so plans are testable.
// Dependencies: crate::candidates, serde, thiserror, upgrade-guard-core
// ============================================================================

//! ## Overview
//! The planner never mutates a project; it asks the resolver for a dry run
//! (`<resolver> update <name> --dry-run --no-ansi --no-interaction`) and
//! classifies the exit status. Subprocess handling lives behind
//! [`ResolverClient`] so plan generation can be exercised with scripted
//! results. Timeouts kill the child and classify the attempt as failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use upgrade_guard_core::telemetry::AttemptStatus;

use crate::candidates::UpgradeCandidate;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable overriding the resolver executable.
pub const RESOLVER_ENV_VAR: &str = "UPGRADE_GUARD_RESOLVER";
/// Resolver executable used when nothing else is configured.
pub const DEFAULT_RESOLVER: &str = "uv";
/// Default dry-run timeout.
pub const DEFAULT_RESOLVER_TIMEOUT: Duration = Duration::from_secs(120);
/// Poll interval while waiting on a dry run.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// SECTION: Results
// ============================================================================

/// Outcome of one resolver dry run (or its skip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverResult {
    /// Attempt status label (`ok`, `failed`, `skipped`).
    pub status: String,
    /// Command line that ran or would have run.
    pub command: String,
    /// Resolver exit code, absent for skips and timeouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
    /// Captured stdout, empty when skipped.
    #[serde(default)]
    pub stdout: String,
    /// Captured stderr, empty when skipped.
    #[serde(default)]
    pub stderr: String,
    /// Skip or failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Wall-clock duration in seconds, three decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl ResolverResult {
    /// Builds a skipped result carrying the would-be command.
    #[must_use]
    pub fn skipped(command: String, reason: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Skipped.as_str().to_string(),
            command,
            returncode: None,
            stdout: String::new(),
            stderr: String::new(),
            reason: Some(reason.into()),
            duration_seconds: None,
        }
    }

    /// Returns the status parsed back into its label enum.
    #[must_use]
    pub fn attempt_status(&self) -> AttemptStatus {
        match self.status.as_str() {
            "ok" => AttemptStatus::Ok,
            "skipped" => AttemptStatus::Skipped,
            _ => AttemptStatus::Failed,
        }
    }
}

/// Raised when the resolver executable cannot be invoked at all.
#[derive(Debug, Error)]
#[error("resolver unavailable: {0}")]
pub struct ResolverUnavailable(pub String);

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Dry-run verification seam between plan generation and the resolver.
pub trait ResolverClient {
    /// Runs (or scripts) one dry-run update for the candidate.
    ///
    /// # Errors
    /// Returns [`ResolverUnavailable`] when the resolver cannot be invoked.
    fn dry_run_update(
        &self,
        candidate: &UpgradeCandidate,
    ) -> Result<ResolverResult, ResolverUnavailable>;
}

// ============================================================================
// SECTION: Command Resolver
// ============================================================================

/// Production client that shells out to the configured resolver.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    /// Resolved path to the resolver executable.
    pub resolver_path: PathBuf,
    /// Working directory for dry runs.
    pub project_root: PathBuf,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl CommandResolver {
    /// Creates a client for a resolved executable.
    #[must_use]
    pub const fn new(resolver_path: PathBuf, project_root: PathBuf, timeout: Duration) -> Self {
        Self { resolver_path, project_root, timeout }
    }
}

impl ResolverClient for CommandResolver {
    fn dry_run_update(
        &self,
        candidate: &UpgradeCandidate,
    ) -> Result<ResolverResult, ResolverUnavailable> {
        let command_text = dry_run_command_text(&self.resolver_path, &candidate.canonical_name);
        let started = Instant::now();
        let mut child = Command::new(&self.resolver_path)
            .args(dry_run_args(&candidate.canonical_name))
            .current_dir(&self.project_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|error| {
                ResolverUnavailable(format!(
                    "failed to launch {}: {error}",
                    self.resolver_path.display()
                ))
            })?;

        let deadline = started + self.timeout;
        let mut timed_out = false;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        timed_out = true;
                        let _ = child.kill();
                        break;
                    }
                    thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(error) => {
                    let _ = child.kill();
                    return Err(ResolverUnavailable(format!("failed to await resolver: {error}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|error| ResolverUnavailable(format!("failed to collect output: {error}")))?;
        let duration = round3(started.elapsed().as_secs_f64());
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if timed_out {
            return Ok(ResolverResult {
                status: AttemptStatus::Failed.as_str().to_string(),
                command: command_text,
                returncode: None,
                stdout,
                stderr,
                reason: Some(format!("timed out after {} second(s)", self.timeout.as_secs())),
                duration_seconds: Some(duration),
            });
        }

        let (status, reason) = if output.status.success() {
            (AttemptStatus::Ok, None)
        } else {
            (AttemptStatus::Failed, Some(format!("resolver exited with {}", output.status)))
        };
        Ok(ResolverResult {
            status: status.as_str().to_string(),
            command: command_text,
            returncode: output.status.code(),
            stdout,
            stderr,
            reason,
            duration_seconds: Some(duration),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Argument vector for one dry-run invocation.
#[must_use]
pub fn dry_run_args(name: &str) -> Vec<String> {
    vec![
        "update".to_string(),
        name.to_string(),
        "--dry-run".to_string(),
        "--no-ansi".to_string(),
        "--no-interaction".to_string(),
    ]
}

/// Human-readable command line for one dry-run invocation.
#[must_use]
pub fn dry_run_command_text(resolver_path: &Path, name: &str) -> String {
    let mut parts = vec![resolver_path.display().to_string()];
    parts.extend(dry_run_args(name));
    parts.join(" ")
}

/// Picks the resolver executable name: explicit flag, then the
/// `UPGRADE_GUARD_RESOLVER` environment variable, then the default.
#[must_use]
pub fn resolver_spec(explicit: Option<&str>) -> String {
    if let Some(explicit) = explicit.map(str::trim).filter(|value| !value.is_empty()) {
        return explicit.to_string();
    }
    env::var(RESOLVER_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_RESOLVER.to_string())
}

/// Resolves an executable spec to a path: direct paths as-is, bare names via
/// `PATH`.
#[must_use]
pub fn resolve_executable(spec: &str) -> Option<PathBuf> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }
    let direct = Path::new(spec);
    if direct.components().count() > 1 || direct.is_absolute() {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(spec);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use std::path::Path;

    use super::dry_run_command_text;
    use super::resolve_executable;

    #[test]
    fn command_text_matches_invocation() {
        let text = dry_run_command_text(Path::new("/usr/bin/uv"), "requests");
        assert_eq!(text, "/usr/bin/uv update requests --dry-run --no-ansi --no-interaction");
    }

    #[test]
    fn missing_executable_is_none() {
        assert!(resolve_executable("definitely-not-a-real-resolver-binary").is_none());
        assert!(resolve_executable("").is_none());
    }

    #[test]
    fn direct_path_resolves_when_present() {
        assert_eq!(
            resolve_executable("/bin/sh"),
            Some(Path::new("/bin/sh").to_path_buf())
        );
    }
}

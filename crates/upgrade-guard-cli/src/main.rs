// crates/upgrade-guard-cli/src/main.rs
// ============================================================================
// Module: Upgrade Guard CLI Entry Point
// Description: Command dispatcher for guard assessments and upgrade plans.
// Purpose: Map governed upgrade workflows onto stable process exit codes.
// Dependencies: clap, thiserror, upgrade-guard-config, upgrade-guard-core,
// upgrade-guard-planner, upgrade-guard-snapshot
// ============================================================================

//! ## Overview
//! `upgrade-guard guard` aggregates supply-chain signals into one risk
//! verdict; `upgrade-guard plan` ranks and dry-run-verifies upgrade
//! candidates. Setup failures print to stderr and exit 2. Verdict exit
//! codes follow the fail threshold: 0 below it, 1 for needs-review at or
//! above it, 2 otherwise.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod guard;
mod plan;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

use crate::guard::GuardCommand;
use crate::plan::PlanCommand;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "upgrade-guard", version, about = "Dependency upgrade governance")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate upgrade risk signals into one verdict.
    Guard(GuardCommand),
    /// Rank and dry-run-verify upgrade candidates.
    Plan(PlanCommand),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal CLI setup or output failure.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs an error from a message.
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Writes a text artifact, creating missing parent directories first.
fn write_text(path: &Path, text: &str) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            CliError::new(format!("failed to create {}: {error}", parent.display()))
        })?;
    }
    fs::write(path, text)
        .map_err(|error| CliError::new(format!("failed to write {}: {error}", path.display())))
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("upgrade-guard: {error}");
            ExitCode::from(2)
        }
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Guard(command) => guard::run_guard(&command)?,
        Commands::Plan(command) => plan::run_plan(&command)?,
    };
    Ok(ExitCode::from(code))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::write_text;

    #[test]
    fn write_text_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("plan.json");
        write_text(&path, "{}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }
}

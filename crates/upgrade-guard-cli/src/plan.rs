// crates/upgrade-guard-cli/src/plan.rs
// ============================================================================
// Module: Plan Command
// Description: Planner configuration, resolver wiring, and plan output.
// Purpose: Drive one planner run from CLI flags to a ranked plan artifact.
// Dependencies: clap, upgrade-guard-config, upgrade-guard-core,
// upgrade-guard-planner
// ============================================================================

//! ## Overview
//! Unlike the guard, planning is strict: a missing SBOM, an unreadable
//! contract, or an unresolvable resolver executable aborts with exit 2.
//! When `--contract` is given, the contract's update policy feeds candidate
//! scoring, which is how `stay_on_major` pins penalize major upgrades.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use time::OffsetDateTime;
use upgrade_guard_config::read_contract;
use upgrade_guard_core::drift::DriftPolicy;
use upgrade_guard_core::telemetry::NoopMetricsSink;
use upgrade_guard_planner::CommandResolver;
use upgrade_guard_planner::PlannerConfig;
use upgrade_guard_planner::PlannerError;
use upgrade_guard_planner::canonical_name;
use upgrade_guard_planner::generate_plan;
use upgrade_guard_planner::render_plan_text;
use upgrade_guard_planner::resolve_executable;
use upgrade_guard_planner::resolver_spec;

use crate::CliError;
use crate::CliResult;
use crate::write_text;

// ============================================================================
// SECTION: Command Types
// ============================================================================

/// Arguments for `plan`.
#[derive(Args, Debug)]
pub(crate) struct PlanCommand {
    /// CycloneDX SBOM JSON; must exist.
    #[arg(long, value_name = "PATH")]
    sbom: PathBuf,
    /// Latest-version metadata snapshot JSON.
    #[arg(long, value_name = "PATH")]
    metadata: Option<PathBuf>,
    /// Dependency contract TOML feeding update policy into scoring.
    #[arg(long, value_name = "PATH")]
    contract: Option<PathBuf>,
    /// Restrict planning to these packages (repeatable).
    #[arg(long = "package", value_name = "NAME", action = ArgAction::Append)]
    packages: Vec<String>,
    /// Allow major upgrades into the plan.
    #[arg(long = "allow-major", action = ArgAction::SetTrue)]
    allow_major: bool,
    /// Cap on ranked candidates.
    #[arg(long, value_name = "COUNT")]
    limit: Option<usize>,
    /// Resolver executable (falls back to UPGRADE_GUARD_RESOLVER, then uv).
    #[arg(long, value_name = "COMMAND")]
    resolver: Option<String>,
    /// Working directory for resolver dry runs.
    #[arg(long = "project-root", value_name = "DIR", default_value = ".")]
    project_root: PathBuf,
    /// Skip resolver verification.
    #[arg(long = "skip-resolver", action = ArgAction::SetTrue)]
    skip_resolver: bool,
    /// Per-attempt dry-run timeout in seconds.
    #[arg(long = "resolver-timeout-secs", value_name = "SECS", default_value_t = 120)]
    resolver_timeout_secs: u64,
    /// Output path for the JSON plan (defaults to stdout scoreboard).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Print the plan scoreboard even when writing JSON output.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

// ============================================================================
// SECTION: Orchestration
// ============================================================================

/// Runs one planner pass and returns its exit code.
pub(crate) fn run_plan(command: &PlanCommand) -> CliResult<u8> {
    let sink = NoopMetricsSink;
    let now = OffsetDateTime::now_utc();

    let policy = load_policy(command)?;
    let spec = resolver_spec(command.resolver.as_deref());
    let resolver_path = if command.skip_resolver {
        PathBuf::from(&spec)
    } else {
        resolve_executable(&spec)
            .ok_or_else(|| CliError::new(PlannerError::ResolverNotFound(spec.clone()).to_string()))?
    };

    let packages: BTreeSet<String> = command
        .packages
        .iter()
        .map(|name| canonical_name(name))
        .filter(|name| !name.is_empty())
        .collect();
    let timeout = Duration::from_secs(command.resolver_timeout_secs);
    let config = PlannerConfig {
        sbom_path: command.sbom.clone(),
        metadata_path: command.metadata.clone(),
        packages,
        allow_major: command.allow_major,
        limit: command.limit,
        resolver_command: spec,
        project_root: command.project_root.clone(),
        skip_resolver: command.skip_resolver,
        resolver_timeout: timeout,
    };
    let client = CommandResolver::new(resolver_path, command.project_root.clone(), timeout);

    let result = generate_plan(&config, &policy, &client, &sink, now)
        .map_err(|error| CliError::new(error.to_string()))?;

    match command.output.as_deref() {
        Some(path) => {
            let payload = serde_json::to_string_pretty(&result)
                .map_err(|error| CliError::new(format!("failed to serialize plan: {error}")))?;
            write_text(path, &format!("{payload}\n"))?;
            if command.verbose {
                println!("{}", render_plan_text(&result));
            }
        }
        None => println!("{}", render_plan_text(&result)),
    }

    Ok(result.exit_code())
}

fn load_policy(command: &PlanCommand) -> CliResult<DriftPolicy> {
    let Some(path) = command.contract.as_deref() else {
        return Ok(DriftPolicy::default());
    };
    let document = read_contract(path)
        .map_err(|error| CliError::new(format!("failed to load contract: {error}")))?;
    Ok(document.drift_policy())
}

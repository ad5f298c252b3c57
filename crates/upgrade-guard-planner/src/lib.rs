// crates/upgrade-guard-planner/src/lib.rs
// ============================================================================
// Module: Upgrade Guard Planner Library
// Description: Candidate selection, scoring, and resolver-verified planning.
// Purpose: Produce ranked, dry-run-verified upgrade plans from an SBOM.
// Dependencies: crate::{candidates, plan, resolver}
// ============================================================================

//! ## Overview
//! `upgrade-guard-planner` ranks upgrade candidates from an SBOM plus a
//! latest-version metadata snapshot, verifies each through a resolver dry
//! run behind the [`ResolverClient`] seam, and emits a deterministic plan
//! artifact with ready-to-run commands.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod candidates;
pub mod plan;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use candidates::SelectionOptions;
pub use candidates::UpgradeCandidate;
pub use candidates::canonical_name;
pub use candidates::score_candidate;
pub use candidates::select_candidates;
pub use plan::PlanEntry;
pub use plan::PlanSummary;
pub use plan::PlannerConfig;
pub use plan::PlannerError;
pub use plan::PlannerResult;
pub use plan::generate_plan;
pub use plan::render_plan_text;
pub use resolver::CommandResolver;
pub use resolver::DEFAULT_RESOLVER;
pub use resolver::DEFAULT_RESOLVER_TIMEOUT;
pub use resolver::RESOLVER_ENV_VAR;
pub use resolver::ResolverClient;
pub use resolver::ResolverResult;
pub use resolver::ResolverUnavailable;
pub use resolver::dry_run_args;
pub use resolver::dry_run_command_text;
pub use resolver::resolve_executable;
pub use resolver::resolver_spec;

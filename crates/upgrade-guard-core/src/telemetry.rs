// crates/upgrade-guard-core/src/telemetry.rs
// ============================================================================
// Module: Upgrade Guard Telemetry
// Description: Observability hooks for guard and planner runs.
// Purpose: Provide metric events and stable labels without hard deps.
// Dependencies: crate::risk, serde
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for run counters and
//! resolver latency observations. It is intentionally dependency-light so
//! downstream deployments can plug in Prometheus or OpenTelemetry without
//! redesign. Sinks are constructed by the caller and passed into entry
//! points explicitly; there is no global bootstrap state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::risk::RiskLevel;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Guard run outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum GuardOutcome {
    /// Run completed with the given verdict.
    Verdict(RiskLevel),
    /// Run aborted on a fatal setup error.
    Error,
}

impl GuardOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verdict(risk) => risk.as_str(),
            Self::Error => "error",
        }
    }
}

/// Resolver attempt status classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AttemptStatus {
    /// Dry run resolved cleanly.
    Ok,
    /// Dry run failed or timed out.
    Failed,
    /// Attempt skipped before invocation.
    Skipped,
}

impl AttemptStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

// ============================================================================
// SECTION: Metric Events
// ============================================================================

/// Guard run metric event payload.
#[derive(Debug, Clone)]
pub struct GuardRunEvent {
    /// Run outcome.
    pub outcome: GuardOutcome,
    /// Packages flagged above `Safe`.
    pub packages_flagged: usize,
    /// Number of missing inputs.
    pub inputs_missing: usize,
}

/// Resolver attempt metric event payload.
#[derive(Debug, Clone)]
pub struct ResolverAttemptEvent {
    /// Canonical package name.
    pub package: String,
    /// Attempt status.
    pub status: AttemptStatus,
    /// Wall-clock duration, when the resolver was invoked.
    pub duration: Option<Duration>,
}

// ============================================================================
// SECTION: Sink Interface
// ============================================================================

/// Sink for guard and planner metric events.
///
/// Implementations must be cheap and non-blocking; the engine calls them
/// inline on the run path.
pub trait MetricsSink {
    /// Records a completed guard run.
    fn record_guard_run(&self, event: &GuardRunEvent);
    /// Records one resolver attempt.
    fn record_resolver_attempt(&self, event: &ResolverAttemptEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_guard_run(&self, _event: &GuardRunEvent) {}
    fn record_resolver_attempt(&self, _event: &ResolverAttemptEvent) {}
}

// crates/upgrade-guard-core/src/lib.rs
// ============================================================================
// Module: Upgrade Guard Core Library
// Description: Public API surface for the Upgrade Guard core.
// Purpose: Expose the risk model, assessors, evaluators, and report types.
// Dependencies: crate::{assess, clock, contract, drift, report, risk, sources,
// telemetry, version}
// ============================================================================

//! ## Overview
//! Upgrade Guard core reduces independent supply-chain signals (preflight
//! checks, upgrade-bot metadata, CVE advisories, a dependency contract, SBOM
//! drift, a mirror signature audit) to a single ordered risk verdict per
//! package and per run. It is I/O-light by design: loaders degrade missing
//! or malformed inputs to data, and every evaluator is a pure function over
//! parsed payloads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assess;
pub mod clock;
pub mod contract;
pub mod drift;
pub mod report;
pub mod risk;
pub mod sources;
pub mod telemetry;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assess::assess_cve;
pub use assess::assess_preflight;
pub use assess::assess_renovate;
pub use contract::ContractMetadata;
pub use contract::ContractReport;
pub use contract::ContractStatus;
pub use contract::EnvironmentAlignment;
pub use contract::SignatureCompliance;
pub use contract::SignaturePolicy;
pub use contract::SignatureStatus;
pub use contract::SnoozeEntry;
pub use contract::SnoozeStatus;
pub use contract::apply_contract_enforcements;
pub use contract::degraded_contract_report;
pub use contract::evaluate_contract_metadata;
pub use drift::DriftPolicy;
pub use drift::DriftReport;
pub use drift::DriftSeverity;
pub use drift::PackageDrift;
pub use drift::PackageOverride;
pub use drift::apply_sbom_age;
pub use drift::evaluate_drift;
pub use report::GuardData;
pub use report::GuardReport;
pub use report::GuardSummary;
pub use report::assemble_report;
pub use report::determine_exit_code;
pub use report::render_markdown;
pub use risk::PackageAssessment;
pub use risk::RiskLevel;
pub use risk::SourceState;
pub use risk::SourceSummary;
pub use risk::merge_assessments;
pub use sources::CveReport;
pub use sources::MetadataSnapshot;
pub use sources::MirrorAudit;
pub use sources::PreflightReport;
pub use sources::RenovateMetadata;
pub use sources::SbomDocument;
pub use sources::load_optional_json;
pub use telemetry::MetricsSink;
pub use telemetry::NoopMetricsSink;

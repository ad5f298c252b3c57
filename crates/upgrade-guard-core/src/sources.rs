// crates/upgrade-guard-core/src/sources.rs
// ============================================================================
// Module: Upgrade Guard Input Sources
// Description: Typed schemas and tolerant loaders for every guard input.
// Purpose: Convert optional, possibly malformed files into summaries + payloads.
// Dependencies: crate::risk, serde, serde_json
// ============================================================================

//! ## Overview
//! Each guard input is optional. Loaders return a [`SourceSummary`] plus an
//! optional parsed payload: an absent path or file degrades to `Missing`,
//! malformed JSON degrades to `Error`, and neither ever aborts the run.
//! Schemas are explicit serde types with field aliases covering the wire
//! variants seen in the wild, replacing ad-hoc key probing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::risk::SourceSummary;

// ============================================================================
// SECTION: Source Names
// ============================================================================

/// Source name for the wheel preflight report.
pub const SOURCE_PREFLIGHT: &str = "preflight";
/// Source name for automated-upgrade-bot metadata.
pub const SOURCE_RENOVATE: &str = "renovate";
/// Source name for CVE advisories.
pub const SOURCE_CVE: &str = "cve";
/// Source name for the dependency contract document.
pub const SOURCE_CONTRACT: &str = "contract";
/// Source name for SBOM drift analysis.
pub const SOURCE_DRIFT: &str = "drift";
/// Source name for the mirror signature audit.
pub const SOURCE_MIRROR: &str = "mirror";

// ============================================================================
// SECTION: Preflight Schema
// ============================================================================

/// Wheel preflight report: one entry per checked package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreflightReport {
    /// Checked packages.
    #[serde(default)]
    pub packages: Vec<PreflightEntry>,
}

/// One preflight check result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreflightEntry {
    /// Package name; entries without one are skipped by the assessor.
    #[serde(default)]
    pub name: Option<String>,
    /// Pinned version at check time.
    #[serde(default)]
    pub version: Option<String>,
    /// Status text (`ok`, `warn`, `error`, `allowlisted`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Wheel targets with no matching artifact.
    #[serde(default, alias = "missing")]
    pub missing_targets: Vec<String>,
    /// Whether an sdist fallback was allowlisted for this package.
    #[serde(default)]
    pub allowlisted: bool,
}

// ============================================================================
// SECTION: Renovate Schema
// ============================================================================

/// Upgrade-bot metadata: either a wrapper object or a bare entry list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RenovateMetadata {
    /// `{ "packages": [...] }` wrapper form.
    Wrapped {
        /// Upgrade candidates.
        packages: Vec<RenovateEntry>,
    },
    /// Bare list form.
    Bare(Vec<RenovateEntry>),
}

impl RenovateMetadata {
    /// Returns the entries regardless of wire form.
    #[must_use]
    pub fn entries(&self) -> &[RenovateEntry] {
        match self {
            Self::Wrapped { packages } => packages,
            Self::Bare(packages) => packages,
        }
    }
}

/// One upgrade-bot candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenovateEntry {
    /// Package name; entries without one are skipped by the assessor.
    #[serde(default)]
    pub name: Option<String>,
    /// Currently pinned version.
    #[serde(default, alias = "currentVersion", alias = "current_version")]
    pub version: Option<String>,
    /// Proposed new version.
    #[serde(default, alias = "newVersion", alias = "latest_version")]
    pub latest: Option<String>,
    /// Update type (`major`, `minor`, `patch`, or vendor-specific).
    #[serde(default, alias = "update_type")]
    pub update_type_raw: Option<String>,
}

// ============================================================================
// SECTION: CVE Schema
// ============================================================================

/// CVE advisory report: either a wrapper object or a bare entry list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CveReport {
    /// `{ "packages": [...] }` wrapper form.
    Wrapped {
        /// Affected packages.
        packages: Vec<CveEntry>,
    },
    /// Bare list form.
    Bare(Vec<CveEntry>),
}

impl CveReport {
    /// Returns the entries regardless of wire form.
    #[must_use]
    pub fn entries(&self) -> &[CveEntry] {
        match self {
            Self::Wrapped { packages } => packages,
            Self::Bare(packages) => packages,
        }
    }
}

/// One package's advisory entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CveEntry {
    /// Package name; entries without one are skipped by the assessor.
    #[serde(default)]
    pub name: Option<String>,
    /// Affected version.
    #[serde(default, alias = "current")]
    pub version: Option<String>,
    /// First fixed version, when the advisory names one.
    #[serde(default, alias = "candidate")]
    pub next_version: Option<String>,
    /// Advisory issues for the package.
    #[serde(default)]
    pub issues: Vec<CveIssue>,
}

/// One advisory issue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CveIssue {
    /// Severity string (`critical`, `high`, `medium`, ...).
    #[serde(default)]
    pub severity: Option<String>,
    /// Advisory identifier (CVE/GHSA id).
    #[serde(default, alias = "id")]
    pub identifier: Option<String>,
    /// Short description.
    #[serde(default, alias = "description")]
    pub summary: Option<String>,
}

// ============================================================================
// SECTION: Mirror Audit Schema
// ============================================================================

/// Mirror signature audit produced by the external mirror tooling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorAudit {
    /// Mirror root the audit walked.
    #[serde(default)]
    pub root: Option<String>,
    /// Audit timestamp.
    #[serde(default)]
    pub generated_at: Option<String>,
    /// Audited artifacts.
    #[serde(default)]
    pub artifacts: Vec<MirrorArtifact>,
}

/// One audited mirror artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorArtifact {
    /// Artifact file name.
    pub name: String,
    /// Signature verdict for the artifact.
    #[serde(default)]
    pub signature: MirrorSignature,
}

/// Signature verdict recorded by the audit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorSignature {
    /// Verdict (`verified`, `missing`, `failed`).
    #[serde(default)]
    pub status: String,
    /// Failure detail, when the verdict is not `verified`.
    #[serde(default)]
    pub reason: Option<String>,
}

impl MirrorArtifact {
    /// Returns whether the artifact's signature verified.
    #[must_use]
    pub fn verified(&self) -> bool {
        self.signature.status == "verified"
    }
}

// ============================================================================
// SECTION: Metadata & SBOM Schemas
// ============================================================================

/// Latest-version metadata snapshot keyed by lowercase package name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataSnapshot {
    /// Per-package latest-version records.
    #[serde(default)]
    pub packages: BTreeMap<String, MetadataRecord>,
}

/// Latest-version record for one package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataRecord {
    /// Latest released version.
    #[serde(default)]
    pub latest: Option<String>,
    /// Latest stable version, used when `latest` is absent.
    #[serde(default)]
    pub stable: Option<String>,
}

impl MetadataRecord {
    /// Returns the preferred latest version (`latest`, then `stable`).
    #[must_use]
    pub fn preferred(&self) -> Option<&str> {
        self.latest.as_deref().or(self.stable.as_deref())
    }
}

/// CycloneDX-shaped SBOM document, reduced to the fields drift needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SbomDocument {
    /// Component list.
    #[serde(default)]
    pub components: Vec<SbomComponent>,
}

/// One SBOM component.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SbomComponent {
    /// Component name; nameless components are skipped.
    #[serde(default)]
    pub name: Option<String>,
    /// Pinned version.
    #[serde(default)]
    pub version: Option<String>,
}

// ============================================================================
// SECTION: Loaders
// ============================================================================

/// Loads an optional JSON source into a summary plus parsed payload.
///
/// Absent path or file yields `Missing`; unreadable or malformed JSON yields
/// `Error` with the failure message. Neither aborts the run.
#[must_use]
pub fn load_optional_json<T: DeserializeOwned>(
    path: Option<&Path>,
    source: &str,
) -> (SourceSummary, Option<T>) {
    let Some(path) = path else {
        return (SourceSummary::missing(source, "path not provided", None), None);
    };
    if !path.exists() {
        return (
            SourceSummary::missing(source, "file not found", Some(path.to_path_buf())),
            None,
        );
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            return (
                SourceSummary::error(source, error.to_string(), Some(path.to_path_buf())),
                None,
            );
        }
    };
    match serde_json::from_str::<T>(&text) {
        Ok(payload) => (SourceSummary::ok(source, path.to_path_buf()), Some(payload)),
        Err(error) => (
            SourceSummary::error(
                source,
                format!("invalid JSON in {}: {error}", path.display()),
                Some(path.to_path_buf()),
            ),
            None,
        ),
    }
}

// crates/upgrade-guard-config/src/document.rs
// ============================================================================
// Module: Dependency Contract Document
// Description: TOML schema for the hand-authored dependency contract.
// Purpose: Strict, explicit document model replacing ad-hoc key probing.
// Dependencies: serde, upgrade-guard-core
// ============================================================================

//! ## Overview
//! The dependency contract governs review cadence, signature requirements,
//! update windows, and snooze exceptions. This module is the single source
//! of truth for its TOML shape; conversion into core evaluation inputs
//! happens here so the core never touches the wire format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use upgrade_guard_core::ContractMetadata;
use upgrade_guard_core::DriftPolicy;
use upgrade_guard_core::EnvironmentAlignment;
use upgrade_guard_core::PackageOverride;
use upgrade_guard_core::SignaturePolicy;
use upgrade_guard_core::SnoozeEntry;
use upgrade_guard_core::contract::EnvironmentRecord;

// ============================================================================
// SECTION: Document Types
// ============================================================================

/// Root of the dependency contract document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractDocument {
    /// `[contract]` status block.
    #[serde(default)]
    pub contract: ContractSection,
    /// `[policies]` block.
    #[serde(default)]
    pub policies: PoliciesSection,
    /// `[governance]` block.
    #[serde(default)]
    pub governance: GovernanceSection,
    /// `[environment_alignment]` block.
    #[serde(default)]
    pub environment_alignment: Option<AlignmentSection>,
}

/// `[contract]` status block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractSection {
    /// Authored contract status (`active`, `draft`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Last validation timestamp, ISO-8601 text.
    #[serde(default)]
    pub last_validated: Option<String>,
    /// Review cadence in days.
    #[serde(default)]
    pub default_review_days: Option<i64>,
}

/// `[policies]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoliciesSection {
    /// `[policies.signatures]`.
    #[serde(default)]
    pub signatures: Option<SignaturesSection>,
    /// `[policies.updates]`.
    #[serde(default)]
    pub updates: Option<UpdatesSection>,
}

/// `[policies.signatures]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignaturesSection {
    /// Whether signatures are required.
    #[serde(default)]
    pub required: bool,
    /// Keyring reference.
    #[serde(default)]
    pub keyring: Option<String>,
    /// Artifact names the policy enforces.
    #[serde(default)]
    pub enforced_artifacts: Vec<String>,
    /// Artifact names requiring attestations.
    #[serde(default)]
    pub attestation_required: Vec<String>,
    /// Grace period before unsigned artifacts block.
    #[serde(default)]
    pub grace_period_days: Option<i64>,
    /// Publishers trusted without per-artifact signatures.
    #[serde(default)]
    pub trusted_publishers: Vec<String>,
    /// Profiles allowed to ship unsigned artifacts.
    #[serde(default)]
    pub allow_unsigned_profiles: Vec<String>,
}

/// `[policies.updates]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatesSection {
    /// Days a patch upgrade may wait.
    #[serde(default)]
    pub default_update_window_days: Option<i64>,
    /// Days a minor upgrade may wait.
    #[serde(default)]
    pub minor_update_window_days: Option<i64>,
    /// Whether major upgrades require explicit review.
    #[serde(default)]
    pub major_review_required: Option<bool>,
    /// Whether transitive conflicts are tolerated.
    #[serde(default)]
    pub allow_transitive_conflicts: Option<bool>,
    /// Autoresolver weight for recency.
    #[serde(default)]
    pub autoresolver_weight_recency: Option<i64>,
    /// Autoresolver weight for security signals.
    #[serde(default)]
    pub autoresolver_weight_security: Option<i64>,
    /// Autoresolver weight for contract compliance.
    #[serde(default)]
    pub autoresolver_weight_contract: Option<i64>,
    /// Autoresolver weight for historical success.
    #[serde(default)]
    pub autoresolver_weight_success: Option<i64>,
    /// `[[policies.updates.package_overrides]]` entries.
    #[serde(default)]
    pub package_overrides: Vec<OverrideSection>,
}

/// One `[[policies.updates.package_overrides]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideSection {
    /// Package name as authored.
    pub name: String,
    /// Pin the package to its current major version.
    #[serde(default)]
    pub stay_on_major: bool,
}

/// `[governance]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GovernanceSection {
    /// `[[governance.snoozes]]` entries.
    #[serde(default)]
    pub snoozes: Vec<SnoozeSection>,
}

/// One `[[governance.snoozes]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnoozeSection {
    /// Snooze identifier; entries without one are dropped.
    #[serde(default)]
    pub id: Option<String>,
    /// Scope selectors.
    #[serde(default)]
    pub scope: Option<BTreeMap<String, String>>,
    /// Why the exception exists.
    #[serde(default)]
    pub reason: Option<String>,
    /// Expiry timestamp text.
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Who requested the exception.
    #[serde(default)]
    pub requested_by: Option<String>,
    /// Who approved the exception.
    #[serde(default)]
    pub approver: Option<String>,
}

/// `[environment_alignment]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlignmentSection {
    /// Channel alerted on alignment drift.
    #[serde(default)]
    pub alert_channel: Option<String>,
    /// Default sync window in days.
    #[serde(default)]
    pub default_sync_window_days: Option<i64>,
    /// `[[environment_alignment.environments]]` entries.
    #[serde(default)]
    pub environments: Vec<EnvironmentSection>,
}

/// One `[[environment_alignment.environments]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentSection {
    /// Environment name; entries without one are dropped.
    #[serde(default)]
    pub name: Option<String>,
    /// Dependency profiles the environment tracks.
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Lockfiles the environment pins.
    #[serde(default)]
    pub lockfiles: Vec<String>,
    /// Model registry reference.
    #[serde(default)]
    pub model_registry: Option<String>,
    /// Last successful sync timestamp text.
    #[serde(default)]
    pub last_synced: Option<String>,
    /// Sync window override in days.
    #[serde(default)]
    pub sync_window_days: Option<i64>,
    /// Whether the environment requires signed artifacts.
    #[serde(default)]
    pub requires_signatures: bool,
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl ContractDocument {
    /// Converts the document into core contract-evaluation metadata.
    #[must_use]
    pub fn metadata(&self) -> ContractMetadata {
        ContractMetadata {
            contract_status: self.contract.status.clone(),
            last_validated: self.contract.last_validated.clone(),
            default_review_days: self.contract.default_review_days,
            signature_policy: self.policies.signatures.as_ref().map(SignaturesSection::policy),
            snoozes: self
                .governance
                .snoozes
                .iter()
                .filter_map(SnoozeSection::entry)
                .collect(),
            environment_alignment: self
                .environment_alignment
                .as_ref()
                .map(AlignmentSection::alignment),
        }
    }

    /// Extracts the drift policy from `[policies.updates]`, defaulting any
    /// absent field.
    #[must_use]
    pub fn drift_policy(&self) -> DriftPolicy {
        let defaults = DriftPolicy::default();
        let Some(updates) = &self.policies.updates else {
            return defaults;
        };
        let mut overrides: BTreeMap<String, PackageOverride> = BTreeMap::new();
        for entry in &updates.package_overrides {
            if entry.name.trim().is_empty() {
                continue;
            }
            overrides.insert(
                entry.name.to_lowercase(),
                PackageOverride { name: entry.name.clone(), stay_on_major: entry.stay_on_major },
            );
        }
        DriftPolicy {
            default_update_window_days: updates
                .default_update_window_days
                .unwrap_or(defaults.default_update_window_days),
            minor_update_window_days: updates
                .minor_update_window_days
                .unwrap_or(defaults.minor_update_window_days),
            major_review_required: updates
                .major_review_required
                .unwrap_or(defaults.major_review_required),
            allow_transitive_conflicts: updates
                .allow_transitive_conflicts
                .unwrap_or(defaults.allow_transitive_conflicts),
            weight_recency: updates.autoresolver_weight_recency.unwrap_or(defaults.weight_recency),
            weight_security: updates
                .autoresolver_weight_security
                .unwrap_or(defaults.weight_security),
            weight_contract: updates
                .autoresolver_weight_contract
                .unwrap_or(defaults.weight_contract),
            weight_success: updates.autoresolver_weight_success.unwrap_or(defaults.weight_success),
            package_overrides: overrides,
        }
    }
}

impl SignaturesSection {
    fn policy(&self) -> SignaturePolicy {
        SignaturePolicy {
            required: self.required,
            keyring: self.keyring.clone(),
            enforced_artifacts: self.enforced_artifacts.clone(),
            attestation_required: self.attestation_required.clone(),
            grace_period_days: self.grace_period_days,
            trusted_publishers: self.trusted_publishers.clone(),
            allow_unsigned_profiles: self.allow_unsigned_profiles.clone(),
        }
    }
}

impl SnoozeSection {
    fn entry(&self) -> Option<SnoozeEntry> {
        let id = self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
        Some(SnoozeEntry {
            id: id.to_string(),
            scope: self.scope.clone(),
            reason: self.reason.clone(),
            expires_at: self.expires_at.clone(),
            requested_by: self.requested_by.clone(),
            approver: self.approver.clone(),
        })
    }
}

impl AlignmentSection {
    fn alignment(&self) -> EnvironmentAlignment {
        EnvironmentAlignment {
            alert_channel: self.alert_channel.clone(),
            default_sync_window_days: self.default_sync_window_days,
            environments: self
                .environments
                .iter()
                .filter_map(|environment| {
                    let name = environment
                        .name
                        .as_deref()
                        .map(str::trim)
                        .filter(|name| !name.is_empty())?;
                    Some(EnvironmentRecord {
                        name: name.to_string(),
                        profiles: environment.profiles.clone(),
                        lockfiles: environment.lockfiles.clone(),
                        model_registry: environment.model_registry.clone(),
                        last_synced: environment.last_synced.clone(),
                        sync_window_days: environment.sync_window_days,
                        requires_signatures: environment.requires_signatures,
                    })
                })
                .collect(),
        }
    }
}

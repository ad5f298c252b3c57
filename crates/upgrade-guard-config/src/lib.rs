// crates/upgrade-guard-config/src/lib.rs
// ============================================================================
// Module: Upgrade Guard Config Library
// Description: Dependency-contract document model and fail-closed loading.
// Purpose: Single source of truth for contract TOML semantics.
// Dependencies: serde, toml, upgrade-guard-core
// ============================================================================

//! ## Overview
//! `upgrade-guard-config` defines the dependency contract's TOML shape and
//! converts it into the core's evaluation inputs (contract metadata,
//! signature policy, drift policy). Loading is fail-closed on limits and
//! degrades parse failures to `Error` source summaries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod loader;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::ContractDocument;
pub use loader::ContractLoadError;
pub use loader::MAX_CONTRACT_FILE_SIZE;
pub use loader::load_contract;
pub use loader::read_contract;

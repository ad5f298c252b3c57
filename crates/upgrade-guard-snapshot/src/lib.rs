// crates/upgrade-guard-snapshot/src/lib.rs
// ============================================================================
// Module: Upgrade Guard Snapshot Library
// Description: Run capture, retention pruning, and the snapshot index.
// Purpose: Persist every guard run as an auditable on-disk record.
// Dependencies: crate::{run_id, store}
// ============================================================================

//! ## Overview
//! `upgrade-guard-snapshot` writes one directory per guard run (copied
//! inputs, reports, manifest), maintains a JSON index with a rolling
//! `latest.json` pointer, and prunes runs older than the retention window.
//! Run identifiers are zero-padded UTC timestamps so lexicographic order is
//! chronological order.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod run_id;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use run_id::format_run_id;
pub use run_id::parse_run_id;
pub use store::DEFAULT_RETENTION_DAYS;
pub use store::SnapshotContext;
pub use store::SnapshotError;
pub use store::SnapshotManifest;
pub use store::SnapshotOptions;
pub use store::SnapshotRecord;
pub use store::SnapshotStore;
pub use store::refresh_latest;

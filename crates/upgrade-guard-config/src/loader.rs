// crates/upgrade-guard-config/src/loader.rs
// ============================================================================
// Module: Contract Document Loading
// Description: Fail-closed contract loading with strict size and path limits.
// Purpose: Convert the contract file into a summary + parsed document.
// Dependencies: crate::document, thiserror, toml, upgrade-guard-core
// ============================================================================

//! ## Overview
//! Contract loading follows the guard's degradation model: an absent path or
//! file yields a `Missing` summary, an unreadable or malformed document
//! yields an `Error` summary, and neither aborts the run. Size and path
//! limits fail closed before any parsing happens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use thiserror::Error;
use upgrade_guard_core::SourceSummary;
use upgrade_guard_core::sources::SOURCE_CONTRACT;

use crate::document::ContractDocument;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum contract file size in bytes.
pub const MAX_CONTRACT_FILE_SIZE: u64 = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Contract loading failures surfaced inside `Error` summaries.
#[derive(Debug, Error)]
pub enum ContractLoadError {
    /// I/O failure while reading the document.
    #[error("contract io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("contract parse error: {0}")]
    Parse(String),
    /// Path or size limit violated.
    #[error("invalid contract path: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads the optional contract document into a summary plus parsed payload.
#[must_use]
pub fn load_contract(path: Option<&Path>) -> (SourceSummary, Option<ContractDocument>) {
    let Some(path) = path else {
        return (SourceSummary::missing(SOURCE_CONTRACT, "path not provided", None), None);
    };
    if !path.exists() {
        return (
            SourceSummary::missing(SOURCE_CONTRACT, "file not found", Some(path.to_path_buf())),
            None,
        );
    }
    match read_contract(path) {
        Ok(document) => (SourceSummary::ok(SOURCE_CONTRACT, path.to_path_buf()), Some(document)),
        Err(error) => (
            SourceSummary::error(SOURCE_CONTRACT, error.to_string(), Some(path.to_path_buf())),
            None,
        ),
    }
}

/// Reads and parses the contract document, enforcing limits.
///
/// # Errors
/// Returns [`ContractLoadError`] when a limit is violated, the file is
/// unreadable, or the TOML is malformed.
pub fn read_contract(path: &Path) -> Result<ContractDocument, ContractLoadError> {
    validate_path(path)?;
    let metadata =
        fs::metadata(path).map_err(|error| ContractLoadError::Io(error.to_string()))?;
    if metadata.len() > MAX_CONTRACT_FILE_SIZE {
        return Err(ContractLoadError::Invalid(format!(
            "contract file exceeds {MAX_CONTRACT_FILE_SIZE} bytes"
        )));
    }
    let text =
        fs::read_to_string(path).map_err(|error| ContractLoadError::Io(error.to_string()))?;
    toml::from_str(&text).map_err(|error| ContractLoadError::Parse(error.to_string()))
}

/// Validates the contract path against security limits.
///
/// # Errors
/// Returns [`ContractLoadError::Invalid`] when a limit is violated.
pub fn validate_path(path: &Path) -> Result<(), ContractLoadError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ContractLoadError::Invalid("contract path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ContractLoadError::Invalid(
                "contract path component too long".to_string(),
            ));
        }
    }
    Ok(())
}

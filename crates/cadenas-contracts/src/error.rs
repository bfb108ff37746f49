//! Error types for the Cadenas lock controller.
//!
//! Only malformed input and storage faults are errors. A denied door-open is
//! an expected operational event and is reported through `AccessStatus`, never
//! through `CadenasError`.

use thiserror::Error;

/// The unified error type for every Cadenas crate.
#[derive(Debug, Error)]
pub enum CadenasError {
    /// The request was malformed or missing a required field.
    ///
    /// Always raised before any state is touched.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// No alert carries the requested index.
    #[error("alert {index} not found")]
    NotFound { index: u64 },

    /// The alert has already been marked resolved.
    #[error("alert {index} is already resolved")]
    AlreadyResolved { index: u64 },

    /// The state document could not be durably saved.
    ///
    /// The mutation that triggered the save is reported as failed to the
    /// caller, even though it may have been applied in memory.
    #[error("persistence failure: {reason}")]
    PersistenceFailure { reason: String },

    /// The persisted document is unreadable or structurally invalid.
    ///
    /// Stores recover from this by quarantining the file and starting from
    /// defaults; it is not expected to reach callers of the service.
    #[error("storage corruption: {reason}")]
    StorageCorruption { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An unexpected internal fault (e.g. a poisoned lock).
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl CadenasError {
    /// Stable, machine-readable identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CadenasError::Validation { .. } => "validation_error",
            CadenasError::NotFound { .. } => "not_found",
            CadenasError::AlreadyResolved { .. } => "already_resolved",
            CadenasError::PersistenceFailure { .. } => "persistence_failure",
            CadenasError::StorageCorruption { .. } => "storage_corruption",
            CadenasError::ConfigError { .. } => "config_error",
            CadenasError::Internal { .. } => "internal_error",
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        CadenasError::Validation { reason: reason.into() }
    }
}

/// Convenience alias used throughout the Cadenas crates.
pub type CadenasResult<T> = Result<T, CadenasError>;

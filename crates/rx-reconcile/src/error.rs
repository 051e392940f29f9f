//! Error types for reconciliation

use rx_naming::NamingError;
use thiserror::Error;

/// Result type for reconciler operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// A device source or existence oracle could not answer
///
/// Always recovered where it occurs: the caller logs it and continues with an
/// empty result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("{source_name} is unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("{source_name} timed out")]
    Timeout { source_name: String },
}

impl DiscoveryError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// A bulk create or remove call failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed: {reason}")]
pub struct MutationError {
    pub operation: String,
    pub reason: String,
}

impl MutationError {
    pub fn new(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Scanning one feature failed; its entries were left out of the catalog
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("feature '{feature_id}' could not be scanned: {source}")]
pub struct FeatureScanError {
    pub feature_id: String,
    #[source]
    pub source: NamingError,
}

/// Errors returned by the reconciler itself
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Another pass holds the reconciliation lock
    #[error("a reconciliation pass is already running")]
    Busy,
}

//! Registry errors

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur in the registries
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A legacy device table document could not be read
    #[error("Invalid legacy device table: {0}")]
    InvalidLegacyTable(String),
}

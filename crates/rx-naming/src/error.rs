//! Error types for entity naming

use rx_core::{EntityIdError, TemplateError, TemplateLayout};
use thiserror::Error;

/// Result type for encoding operations
pub type NamingResult<T> = Result<T, NamingError>;

/// Errors raised while encoding an identifier
///
/// These indicate a feature defined with a bad template or fed bad values;
/// callers are expected to surface them rather than skip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The rendered identifier breaks entity-id rules
    #[error("rendered identifier '{identifier}' is invalid: {source}")]
    InvalidIdentifier {
        identifier: String,
        #[source]
        source: EntityIdError,
    },
}

/// Why an identifier could not be decoded
///
/// Failed decodes are routine when scanning mixed identifier sets, so this is
/// returned as a value and callers typically discard it.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum NotParseable {
    #[error("identifier has no '.' separating kind and name")]
    MissingSeparator,

    #[error("identifier has an empty kind or name")]
    EmptyPart,

    #[error("identifier contains no device id")]
    NoDeviceId,

    #[error("layout {0:?} cannot be decoded")]
    UnsupportedLayout(TemplateLayout),
}

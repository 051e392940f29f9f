//! Error types for settings loading

use std::path::PathBuf;

use rx_core::FeatureCatalogError;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading or interpreting the settings document
///
/// Variants raised inside the document carry `key`, the dotted path of the
/// offending value (`device_features.32:153289[0]`), or `(root)`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid YAML: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!include` or `!env_var` applied to something other than a string
    #[error("'{key}': {tag} needs a string, found {found}")]
    BadTagValue {
        key: String,
        tag: String,
        found: String,
    },

    /// The first and last paths are the same file
    #[error("settings include cycle: {}", render_chain(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("'{key}': environment variable '{var}' is not set")]
    EnvVarNotFound { key: String, var: String },

    #[error("'{key}': unsupported tag {tag}")]
    UnsupportedTag { key: String, tag: String },

    #[error("invalid settings value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// A configured feature failed registration
    #[error(transparent)]
    Catalog(#[from] FeatureCatalogError),
}

fn render_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

//! Settings loading for entity reconciliation
//!
//! Reads the YAML settings document (feature enablement, per-device feature
//! lists and extra feature definitions) with `!include` and `!env_var`
//! support, and registers the built-in features.
//!
//! # Example
//!
//! ```ignore
//! use rx_config::ReconcileSettings;
//!
//! let settings = ReconcileSettings::load_or_default("/config")?;
//! let catalog = settings.feature_catalog()?;
//! ```

pub mod builtin;
mod error;
mod loader;
mod settings;

pub use builtin::{builtin_features, register_builtin_features, VENTILATOR_CLASS};
pub use error::{ConfigError, ConfigResult};
pub use loader::read_settings;
pub use settings::{FeatureSettings, ReconcileSettings, SETTINGS_FILE};

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;

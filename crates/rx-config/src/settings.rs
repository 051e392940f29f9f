//! Reconciliation settings
//!
//! Parses the settings document:
//!
//! ```yaml
//! enabled_features:
//!   humidity_control: true
//! device_features:
//!   "32:153289": [humidity_control]
//! features:
//!   boost:
//!     default_enabled: false
//!     allowed_device_classes: [HvacVentilator]
//!     templates:
//!       switch:
//!         boost: "boost_{device_id}"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rx_core::{
    DeviceFeatureMatrix, EntityKind, FeatureCatalog, FeatureDefinition, FeatureEnablementMap,
};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::builtin::register_builtin_features;
use crate::error::{ConfigError, ConfigResult};
use crate::loader::read_settings;

/// Default settings file name inside the config directory
pub const SETTINGS_FILE: &str = "ramses_extras.yaml";

/// An extra feature declared in settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSettings {
    #[serde(default)]
    pub default_enabled: bool,
    #[serde(default)]
    pub allowed_device_classes: Vec<String>,
    /// kind -> (variable name -> template)
    #[serde(default, alias = "resource_templates")]
    pub templates: BTreeMap<EntityKind, BTreeMap<String, String>>,
}

impl FeatureSettings {
    fn into_definition(self, feature_id: &str) -> FeatureDefinition {
        FeatureDefinition {
            feature_id: feature_id.to_string(),
            default_enabled: self.default_enabled,
            resource_templates: self.templates,
            allowed_device_classes: self.allowed_device_classes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    enabled_features: FeatureEnablementMap,
    #[serde(default)]
    device_features: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    features: BTreeMap<String, FeatureSettings>,
}

/// Settings for one reconciliation host
#[derive(Debug, Clone, Default)]
pub struct ReconcileSettings {
    /// Feature enablement as configured
    pub enabled_features: FeatureEnablementMap,
    /// Sparse per-device overrides
    pub device_features: DeviceFeatureMatrix,
    /// Extra features, in id order
    pub features: Vec<FeatureDefinition>,
}

impl ReconcileSettings {
    /// Load `file` from `config_dir`
    pub fn load(config_dir: impl AsRef<Path>, file: impl AsRef<Path>) -> ConfigResult<Self> {
        let yaml = read_settings(&config_dir.as_ref().join(file))?;
        Self::from_yaml(&yaml)
    }

    /// Load [`SETTINGS_FILE`] from `config_dir`, or defaults if it is absent
    pub fn load_or_default(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        if !config_dir.join(SETTINGS_FILE).exists() {
            debug!("No settings file in {:?}, using defaults", config_dir);
            return Ok(Self::default());
        }
        Self::load(config_dir, SETTINGS_FILE)
    }

    /// Parse settings from a YAML value; null means defaults
    pub fn from_yaml(yaml: &Value) -> ConfigResult<Self> {
        if yaml.is_null() {
            return Ok(Self::default());
        }
        if !yaml.is_mapping() {
            return Err(ConfigError::InvalidValue {
                key: "root".to_string(),
                reason: "settings must be a mapping".to_string(),
            });
        }

        let raw: RawSettings =
            serde_yaml::from_value(yaml.clone()).map_err(|e| ConfigError::InvalidValue {
                key: "settings".to_string(),
                reason: e.to_string(),
            })?;

        for (address, features) in &raw.device_features {
            if address.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "device_features".to_string(),
                    reason: "device address cannot be empty".to_string(),
                });
            }
            if features.is_empty() {
                warn!(device = %address, "Device listed without features");
            }
        }

        Ok(Self {
            enabled_features: raw.enabled_features,
            device_features: DeviceFeatureMatrix::from_lists(raw.device_features),
            features: raw
                .features
                .into_iter()
                .map(|(id, settings)| settings.into_definition(&id))
                .collect(),
        })
    }

    /// Built-in features plus the configured ones
    ///
    /// Feature ids referenced by `enabled_features` or `device_features` must
    /// exist in the resulting catalog.
    pub fn feature_catalog(&self) -> ConfigResult<FeatureCatalog> {
        let mut builder = FeatureCatalog::builder();
        register_builtin_features(&mut builder)?;
        for definition in &self.features {
            builder.register(definition.clone())?;
        }
        let catalog = builder.build();

        let mut referenced: Vec<String> = self
            .enabled_features
            .iter()
            .map(|(id, _)| id.to_string())
            .collect();
        referenced.extend(
            self.device_features
                .all_enabled_pairs()
                .into_iter()
                .map(|(_, feature)| feature),
        );
        if let Some(unknown) = referenced.into_iter().find(|id| catalog.get(id).is_none()) {
            return Err(ConfigError::InvalidValue {
                key: unknown,
                reason: "unknown feature".to_string(),
            });
        }

        Ok(catalog)
    }
}

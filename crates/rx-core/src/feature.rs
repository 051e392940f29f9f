//! Feature definitions and the immutable feature catalog
//!
//! Features are registered explicitly at startup through
//! [`FeatureCatalogBuilder::register`]; the resulting [`FeatureCatalog`] is
//! passed by value into catalog building and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::kind::EntityKind;
use crate::template::{Template, TemplateError};

/// Baseline features whose resources are never torn down
pub static ALWAYS_ENABLED_FEATURES: &[&str] = &["default"];

/// Check if a feature is on the always-enabled allow-list
pub fn is_always_enabled(feature_id: &str) -> bool {
    ALWAYS_ENABLED_FEATURES.contains(&feature_id)
}

/// Errors raised while registering features
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeatureCatalogError {
    #[error("feature '{0}' is already registered")]
    Duplicate(String),

    #[error("feature id cannot be empty")]
    EmptyId,

    #[error("feature '{feature_id}' {kind} resource '{variable}': {source}")]
    Template {
        feature_id: String,
        kind: EntityKind,
        variable: String,
        #[source]
        source: TemplateError,
    },
}

/// Raw feature description, as written in code or configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub feature_id: String,
    #[serde(default)]
    pub default_enabled: bool,
    /// kind -> (variable name -> template)
    #[serde(default)]
    pub resource_templates: BTreeMap<EntityKind, BTreeMap<String, String>>,
    /// Device classes (e.g. "HvacVentilator") the feature applies to; empty means all
    #[serde(default)]
    pub allowed_device_classes: Vec<String>,
}

impl FeatureDefinition {
    pub fn new(feature_id: impl Into<String>) -> Self {
        Self {
            feature_id: feature_id.into(),
            ..Default::default()
        }
    }

    pub fn default_enabled(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }

    pub fn device_class(mut self, class: impl Into<String>) -> Self {
        self.allowed_device_classes.push(class.into());
        self
    }

    pub fn template(
        mut self,
        kind: EntityKind,
        variable: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.resource_templates
            .entry(kind)
            .or_default()
            .insert(variable.into(), template.into());
        self
    }
}

/// A validated template belonging to a feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTemplate {
    pub kind: EntityKind,
    pub variable_name: String,
    pub template: Template,
}

/// A registered, validated feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub feature_id: String,
    pub default_enabled: bool,
    pub allowed_device_classes: Vec<String>,
    resources: Vec<ResourceTemplate>,
}

impl Feature {
    fn from_definition(def: FeatureDefinition) -> Result<Self, FeatureCatalogError> {
        if def.feature_id.trim().is_empty() {
            return Err(FeatureCatalogError::EmptyId);
        }

        let mut resources = Vec::new();
        for (kind, variables) in &def.resource_templates {
            for (variable, raw) in variables {
                let wrap = |source| FeatureCatalogError::Template {
                    feature_id: def.feature_id.clone(),
                    kind: *kind,
                    variable: variable.clone(),
                    source,
                };
                let template = Template::parse(raw.as_str()).map_err(wrap)?;
                template.validate_scope(kind.is_device_scoped()).map_err(wrap)?;
                resources.push(ResourceTemplate {
                    kind: *kind,
                    variable_name: variable.clone(),
                    template,
                });
            }
        }

        Ok(Self {
            feature_id: def.feature_id,
            default_enabled: def.default_enabled,
            allowed_device_classes: def.allowed_device_classes,
            resources,
        })
    }

    /// All resource templates, ordered by kind then variable name
    pub fn resources(&self) -> &[ResourceTemplate] {
        &self.resources
    }

    /// Kinds this feature defines resources for
    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = self.resources.iter().map(|r| r.kind).collect();
        kinds.dedup();
        kinds
    }

    pub fn is_always_enabled(&self) -> bool {
        is_always_enabled(&self.feature_id)
    }
}

/// Registration table used at startup
#[derive(Debug, Default)]
pub struct FeatureCatalogBuilder {
    features: BTreeMap<String, Feature>,
}

impl FeatureCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one feature, validating all of its templates
    pub fn register(&mut self, definition: FeatureDefinition) -> Result<&mut Self, FeatureCatalogError> {
        if self.features.contains_key(&definition.feature_id) {
            return Err(FeatureCatalogError::Duplicate(definition.feature_id));
        }
        let feature = Feature::from_definition(definition)?;
        debug!(
            feature_id = %feature.feature_id,
            resources = feature.resources.len(),
            "Registered feature"
        );
        self.features.insert(feature.feature_id.clone(), feature);
        Ok(self)
    }

    pub fn is_registered(&self, feature_id: &str) -> bool {
        self.features.contains_key(feature_id)
    }

    pub fn build(self) -> FeatureCatalog {
        FeatureCatalog {
            features: self.features,
        }
    }
}

/// Immutable catalog of registered features
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureCatalog {
    features: BTreeMap<String, Feature>,
}

impl FeatureCatalog {
    pub fn builder() -> FeatureCatalogBuilder {
        FeatureCatalogBuilder::new()
    }

    pub fn get(&self, feature_id: &str) -> Option<&Feature> {
        self.features.get(feature_id)
    }

    /// The feature's configured default, if the feature is known
    pub fn default_enabled(&self, feature_id: &str) -> Option<bool> {
        self.features.get(feature_id).map(|f| f.default_enabled)
    }

    /// Features in id order
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    pub fn feature_ids(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

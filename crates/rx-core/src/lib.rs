//! Core types for entity reconciliation
//!
//! This crate provides the vocabulary shared by the naming codec, the
//! registries and the reconciliation engine: [`EntityId`], [`EntityKind`],
//! [`DeviceId`], the enablement maps and the [`FeatureCatalog`].

mod device_id;
mod enablement;
mod entity_id;
mod feature;
mod kind;
mod template;

pub use device_id::DeviceId;
pub use enablement::{DeviceFeatureMatrix, FeatureEnablementMap};
pub use entity_id::{EntityId, EntityIdError, IdPart};
pub use feature::{
    is_always_enabled, Feature, FeatureCatalog, FeatureCatalogBuilder, FeatureCatalogError,
    FeatureDefinition, ResourceTemplate, ALWAYS_ENABLED_FEATURES,
};
pub use kind::{EntityKind, UnknownKind, PLATFORM_KINDS};
pub use template::{
    locate_device_id, DeviceIdSpan, Segment, Template, TemplateError, TemplateLayout,
    TemplateResult, DEVICE_PLACEHOLDER, PREFIX_POSITION_THRESHOLD,
};

/// Logical identity of a manageable resource
///
/// `(kind, feature_id, variable_name, device_id)` determines exactly one
/// external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ResourceDescriptor {
    pub kind: EntityKind,
    pub feature_id: String,
    pub variable_name: String,
    /// Absent for feature-global resources such as cards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
}

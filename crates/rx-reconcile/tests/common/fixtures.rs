//! Feature fixtures

use rx_core::{EntityKind, FeatureCatalog, FeatureDefinition};

pub const FAN_CLASS: &str = "HvacVentilator";
pub const REMOTE_CLASS: &str = "HvacRemote";

pub const FAN_1: &str = "32:153289";
pub const FAN_2: &str = "32:153290";
pub const REMOTE: &str = "37:168270";

/// `default` with one sensor and a card
pub fn default_feature() -> FeatureDefinition {
    FeatureDefinition::new("default")
        .default_enabled(true)
        .device_class(FAN_CLASS)
        .template(
            EntityKind::Sensor,
            "indoor_absolute_humidity",
            "indoor_absolute_humidity_{device_id}",
        )
        .template(EntityKind::Card, "hvac_fan_card", "hvac_fan_card")
}

/// `humidity_control` with a single switch
pub fn humidity_control_feature() -> FeatureDefinition {
    FeatureDefinition::new("humidity_control")
        .device_class(FAN_CLASS)
        .template(EntityKind::Switch, "dehumidify", "dehumidify_{device_id}")
}

/// `remote_buttons`, targeting remotes
pub fn remote_feature() -> FeatureDefinition {
    FeatureDefinition::new("remote_buttons")
        .device_class(REMOTE_CLASS)
        .template(EntityKind::Boolean, "button_pressed", "button_pressed_{device_id}")
        .template(EntityKind::Card, "remote_card", "remote_card")
}

pub fn catalog_of(definitions: Vec<FeatureDefinition>) -> FeatureCatalog {
    let mut builder = FeatureCatalog::builder();
    for definition in definitions {
        builder.register(definition).unwrap();
    }
    builder.build()
}

/// The three fixture features
pub fn fixture_catalog() -> FeatureCatalog {
    catalog_of(vec![
        default_feature(),
        humidity_control_feature(),
        remote_feature(),
    ])
}

//! Built-in features
//!
//! Registered at startup before any configured features.

use rx_core::{EntityKind, FeatureCatalogBuilder, FeatureCatalogError, FeatureDefinition};

/// Device class of the ventilation units every built-in feature targets
pub const VENTILATOR_CLASS: &str = "HvacVentilator";

/// Baseline humidity sensors and the fan card
pub fn default_feature() -> FeatureDefinition {
    FeatureDefinition::new("default")
        .default_enabled(true)
        .device_class(VENTILATOR_CLASS)
        .template(
            EntityKind::Sensor,
            "indoor_absolute_humidity",
            "indoor_absolute_humidity_{device_id}",
        )
        .template(
            EntityKind::Sensor,
            "outdoor_absolute_humidity",
            "outdoor_absolute_humidity_{device_id}",
        )
        .template(EntityKind::Card, "hvac_fan_card", "hvac_fan_card")
}

/// Automatic dehumidification through fan speed
pub fn humidity_control_feature() -> FeatureDefinition {
    FeatureDefinition::new("humidity_control")
        .device_class(VENTILATOR_CLASS)
        .template(EntityKind::Switch, "dehumidify", "dehumidify_{device_id}")
        .template(
            EntityKind::Numeric,
            "relative_humidity_minimum",
            "relative_humidity_minimum_{device_id}",
        )
        .template(
            EntityKind::Numeric,
            "relative_humidity_maximum",
            "relative_humidity_maximum_{device_id}",
        )
        .template(
            EntityKind::Numeric,
            "absolute_humidity_offset",
            "absolute_humidity_offset_{device_id}",
        )
        .template(
            EntityKind::Boolean,
            "dehumidifying_active",
            "dehumidifying_active_{device_id}",
        )
        .template(
            EntityKind::Automation,
            "humidity_control",
            "humidity_control_automation",
        )
}

/// Minimal feature exercising every resource kind
pub fn hello_world_feature() -> FeatureDefinition {
    FeatureDefinition::new("hello_world")
        .device_class(VENTILATOR_CLASS)
        .template(
            EntityKind::Switch,
            "hello_world_switch",
            "hello_world_switch_{device_id}",
        )
        .template(
            EntityKind::Boolean,
            "hello_world_status",
            "hello_world_status_{device_id}",
        )
        .template(EntityKind::Card, "hello_world_card", "hello_world_card")
}

/// All built-in definitions in registration order
pub fn builtin_features() -> Vec<FeatureDefinition> {
    vec![
        default_feature(),
        humidity_control_feature(),
        hello_world_feature(),
    ]
}

/// Register every built-in feature
pub fn register_builtin_features(
    builder: &mut FeatureCatalogBuilder,
) -> Result<(), FeatureCatalogError> {
    for definition in builtin_features() {
        builder.register(definition)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rx_core::FeatureCatalog;

    #[test]
    fn test_builtins_register() {
        let mut builder = FeatureCatalog::builder();
        register_builtin_features(&mut builder).unwrap();
        let catalog = builder.build();

        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("default").unwrap().is_always_enabled());
        assert_eq!(catalog.default_enabled("humidity_control"), Some(false));

        let humidity = catalog.get("humidity_control").unwrap();
        assert_eq!(humidity.resources().len(), 6);
        assert_eq!(humidity.allowed_device_classes, vec![VENTILATOR_CLASS]);
    }

    #[test]
    fn test_builtins_twice_is_duplicate() {
        let mut builder = FeatureCatalog::builder();
        register_builtin_features(&mut builder).unwrap();
        assert_eq!(
            register_builtin_features(&mut builder).unwrap_err(),
            FeatureCatalogError::Duplicate("default".to_string())
        );
    }
}

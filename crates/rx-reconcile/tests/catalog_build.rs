//! Catalog building against mock hosts

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::*;
use rx_core::{DeviceFeatureMatrix, DeviceId, EntityId, EntityKind, FeatureEnablementMap};
use rx_reconcile::{CatalogBuilder, DeviceDirectory, PendingEntry};

fn id(s: &str) -> EntityId {
    s.parse().unwrap()
}

fn ids(list: &[&str]) -> BTreeSet<EntityId> {
    list.iter().map(|s| id(s)).collect()
}

fn fans() -> MockDevices {
    MockDevices::new()
        .with_device(FAN_CLASS, FAN_1)
        .with_device(FAN_CLASS, FAN_2)
}

fn builder(devices: MockDevices, oracle: MockOracle) -> CatalogBuilder {
    CatalogBuilder::new(
        DeviceDirectory::new().with_primary(Arc::new(devices)),
        Arc::new(oracle),
    )
}

#[tokio::test]
async fn test_matrix_enables_single_device() {
    init_tracing();
    let features = catalog_of(vec![humidity_control_feature()]);
    let current = FeatureEnablementMap::new().with("humidity_control", true);
    let mut matrix = DeviceFeatureMatrix::new();
    matrix.enable(&DeviceId::new(FAN_1), "humidity_control");

    let mut catalog = builder(fans(), MockOracle::new())
        .build(&features, &current, None)
        .await;
    assert_eq!(catalog.len(), 2);

    catalog.update_targets(&features, &current, Some(&matrix));
    assert_eq!(catalog.to_create(), ids(&["switch.dehumidify_32_153289"]));
    assert!(catalog.to_remove().is_empty());
}

#[tokio::test]
async fn test_failing_oracle_still_builds() {
    let features = fixture_catalog();
    let catalog = builder(fans(), MockOracle::failing())
        .build(&features, &FeatureEnablementMap::new(), None)
        .await;

    // Only `default` is on by default: two sensors and the card
    assert_eq!(catalog.len(), 3);
    assert!(catalog.iter().all(|(_, entry)| !entry.exists_already));
    assert!(catalog.to_remove().is_empty());
    assert_eq!(catalog.to_create().len(), 2);
}

#[tokio::test]
async fn test_existing_ids_mark_rows() {
    let features = fixture_catalog();
    let oracle = MockOracle::new().with_ids(&[
        "sensor.indoor_absolute_humidity_32_153289",
        "card.hvac_fan_card",
        "not an identifier",
    ]);
    let catalog = builder(fans(), oracle)
        .build(&features, &FeatureEnablementMap::new(), None)
        .await;

    assert!(catalog.get(&id("sensor.indoor_absolute_humidity_32_153289")).unwrap().exists_already);
    assert!(!catalog.get(&id("sensor.indoor_absolute_humidity_32_153290")).unwrap().exists_already);
    assert!(catalog.get(&id("card.hvac_fan_card")).unwrap().exists_already);
    assert_eq!(catalog.to_create(), ids(&["sensor.indoor_absolute_humidity_32_153290"]));
}

#[tokio::test]
async fn test_always_enabled_feature_is_never_removed() {
    let features = fixture_catalog();
    let oracle = MockOracle::new().with_ids(&[
        "sensor.indoor_absolute_humidity_32_153289",
        "sensor.indoor_absolute_humidity_32_153290",
    ]);
    let current = FeatureEnablementMap::new().with("default", true);
    let target = FeatureEnablementMap::new().with("default", false);

    let mut catalog = builder(fans(), oracle)
        .build(&features, &current, Some(&target))
        .await;
    catalog.update_targets(&features, &target, None);

    assert!(catalog
        .iter()
        .filter(|(_, e)| e.resource_kind == EntityKind::Sensor)
        .all(|(_, e)| !e.enabled_by_feature));
    assert!(catalog.to_remove().is_empty());
    assert_eq!(catalog.summary().keep_count, 2);
}

#[tokio::test]
async fn test_disabled_feature_rows_are_removed() {
    let features = fixture_catalog();
    let oracle = MockOracle::new().with_ids(&[
        "switch.dehumidify_32_153289",
        "switch.dehumidify_32_153290",
    ]);
    let current = FeatureEnablementMap::new().with("humidity_control", true);
    let target = FeatureEnablementMap::new().with("humidity_control", false);

    let mut catalog = builder(fans(), oracle)
        .build(&features, &current, Some(&target))
        .await;
    catalog.update_targets(&features, &target, None);

    assert_eq!(
        catalog.to_remove(),
        ids(&["switch.dehumidify_32_153289", "switch.dehumidify_32_153290"])
    );
}

#[tokio::test]
async fn test_device_source_failure_is_isolated() {
    let features = fixture_catalog();
    let devices = fans().failing_for(REMOTE_CLASS);
    let current = FeatureEnablementMap::new()
        .with("humidity_control", true)
        .with("remote_buttons", true);

    let catalog = builder(devices, MockOracle::new())
        .build(&features, &current, None)
        .await;

    assert!(catalog.failures().is_empty());
    assert!(catalog.contains(&id("switch.dehumidify_32_153289")));
    assert!(catalog.contains(&id("sensor.indoor_absolute_humidity_32_153290")));
    // The remote feature found no devices but keeps its global card
    assert!(catalog.contains(&id("card.remote_card")));
    assert!(catalog
        .iter()
        .all(|(_, e)| e.resource_kind != EntityKind::Boolean));
}

#[tokio::test]
async fn test_scan_failure_discards_only_that_feature() {
    let features = fixture_catalog();
    let devices = fans().with_device(REMOTE_CLASS, "bad-id");
    let current = FeatureEnablementMap::new()
        .with("humidity_control", true)
        .with("remote_buttons", true);

    let catalog = builder(devices, MockOracle::new())
        .build(&features, &current, None)
        .await;

    assert_eq!(catalog.failures().len(), 1);
    assert_eq!(catalog.failures()[0].feature_id, "remote_buttons");
    assert!(!catalog.contains(&id("card.remote_card")));
    assert!(catalog.contains(&id("switch.dehumidify_32_153290")));
    assert!(catalog.contains(&id("card.hvac_fan_card")));
}

#[tokio::test]
async fn test_devices_queried_once_per_class_filter() {
    let features = fixture_catalog();
    let devices = Arc::new(fans().with_device(REMOTE_CLASS, REMOTE));
    let builder = CatalogBuilder::new(
        DeviceDirectory::new().with_primary(devices.clone()),
        Arc::new(MockOracle::new()),
    );
    let current = FeatureEnablementMap::new()
        .with("humidity_control", true)
        .with("remote_buttons", true);

    let catalog = builder.build(&features, &current, None).await;
    assert!(catalog.contains(&id("binary_sensor.button_pressed_37_168270")));
    // default and humidity_control share the ventilator filter
    assert_eq!(devices.calls(), 2);

    builder.build(&features, &current, None).await;
    assert_eq!(devices.calls(), 4);
}

#[tokio::test]
async fn test_disabled_features_are_not_scanned() {
    let features = fixture_catalog();
    let devices = Arc::new(fans());
    let builder = CatalogBuilder::new(
        DeviceDirectory::new().with_primary(devices.clone()),
        Arc::new(MockOracle::new()),
    );
    let current = FeatureEnablementMap::new().with("default", false);

    let catalog = builder.build(&features, &current, None).await;
    assert!(catalog.is_empty());
    assert_eq!(devices.calls(), 0);
}

#[tokio::test]
async fn test_identifier_scan_fallback() {
    let features = catalog_of(vec![default_feature(), humidity_control_feature()]);
    let existing = Arc::new(MockOracle::new().with_ids(&[
        "switch.dehumidify_32_153289",
        "number.32_153290_param_7c00",
        "light.kitchen",
    ]));
    let directory = DeviceDirectory::new()
        .with_primary(Arc::new(MockDevices::new()))
        .with_identifier_scan(existing.clone());
    let builder = CatalogBuilder::new(directory, existing);
    let current = FeatureEnablementMap::new().with("humidity_control", true);

    let catalog = builder.build(&features, &current, None).await;
    // Scanned devices of unknown class only keep features they already carry
    assert_eq!(
        catalog.ids().cloned().collect::<BTreeSet<_>>(),
        ids(&["card.hvac_fan_card", "switch.dehumidify_32_153289"])
    );
    assert!(catalog.get(&id("switch.dehumidify_32_153289")).unwrap().exists_already);
}

#[tokio::test]
async fn test_identifier_scan_respects_class_filter() {
    let features = catalog_of(vec![humidity_control_feature(), remote_feature()]);
    let existing = Arc::new(MockOracle::new().with_ids(&["switch.dehumidify_32_153289"]));
    let directory = DeviceDirectory::new()
        .with_primary(Arc::new(MockDevices::new().with_device(FAN_CLASS, FAN_1)))
        .with_identifier_scan(existing.clone());
    let builder = CatalogBuilder::new(directory, existing);
    let current = FeatureEnablementMap::new()
        .with("humidity_control", true)
        .with("remote_buttons", true);

    let mut catalog = builder.build(&features, &current, None).await;
    catalog.update_targets(&features, &current, None);

    // The registry has no remotes; the fan seen by the scan must not get one
    assert!(!catalog.contains(&id("binary_sensor.button_pressed_32_153289")));
    assert!(catalog.contains(&id("card.remote_card")));
    assert!(catalog.to_create().is_empty());
    assert!(catalog.to_remove().is_empty());
    assert_eq!(catalog.summary().keep_count, 1);
}

#[tokio::test]
async fn test_ready_hook_sees_each_device_once() {
    let features = fixture_catalog();
    let current = FeatureEnablementMap::new().with("humidity_control", true);
    let mut seen = Vec::new();
    let mut hook = |device: &DeviceId, rows: &mut Vec<PendingEntry>| {
        seen.push((device.clone(), rows.len()));
        if device == &DeviceId::new(FAN_2) {
            rows.clear();
        }
    };

    let catalog = builder(fans(), MockOracle::new())
        .build_with_hook(&features, &current, None, Some(&mut hook))
        .await;

    assert_eq!(
        seen,
        vec![(DeviceId::new(FAN_1), 2), (DeviceId::new(FAN_2), 2)]
    );
    assert!(catalog.contains(&id("switch.dehumidify_32_153289")));
    assert!(!catalog.contains(&id("switch.dehumidify_32_153290")));
    assert!(catalog.contains(&id("card.hvac_fan_card")));
}

#[tokio::test]
async fn test_partition_and_idempotence_on_built_catalog() {
    let features = fixture_catalog();
    let oracle = MockOracle::new().with_ids(&[
        "switch.dehumidify_32_153289",
        "sensor.indoor_absolute_humidity_32_153290",
    ]);
    let current = FeatureEnablementMap::new().with("humidity_control", true);
    let target = FeatureEnablementMap::new().with("humidity_control", false);
    let mut matrix = DeviceFeatureMatrix::new();
    matrix.enable(&DeviceId::new(FAN_2), "humidity_control");

    let mut catalog = builder(fans(), oracle)
        .build(&features, &current, Some(&target))
        .await;
    catalog.update_targets(&features, &target, Some(&matrix));
    let first = (catalog.change_set(), catalog.summary());
    catalog.update_targets(&features, &target, Some(&matrix));
    let second = (catalog.change_set(), catalog.summary());
    assert_eq!(first, second);

    let (changes, summary) = first;
    assert!(changes.to_create.is_disjoint(&changes.to_remove));
    assert_eq!(
        changes.to_create.len() + changes.to_remove.len() + summary.keep_count + summary.inert_count,
        summary.total
    );
    assert_eq!(changes.to_remove, ids(&["switch.dehumidify_32_153289"]));
    assert!(changes.to_create.contains(&id("switch.dehumidify_32_153290")));
}

//! Retargeting and diffing a catalog
//!
//! After [`Catalog::update_targets`] has recomputed which rows the target
//! configuration wants, the diff queries are pure functions of the catalog.
//! Only platform kinds take part; cards and automations are managed elsewhere.

use std::collections::{BTreeMap, BTreeSet};

use rx_core::{
    is_always_enabled, DeviceFeatureMatrix, EntityId, EntityKind, FeatureCatalog,
    FeatureEnablementMap,
};
use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry};

/// Identifiers to create and to remove
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub to_create: BTreeSet<EntityId>,
    pub to_remove: BTreeSet<EntityId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_remove.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_remove.len()
    }
}

/// Counts over the platform rows of a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub keep_count: usize,
    pub remove_count: usize,
    pub create_count: usize,
    /// Absent and not wanted
    pub inert_count: usize,
}

fn should_create(entry: &CatalogEntry) -> bool {
    entry.resource_kind.is_platform() && entry.enabled_by_feature && !entry.exists_already
}

fn should_remove(entry: &CatalogEntry) -> bool {
    entry.resource_kind.is_platform()
        && entry.exists_already
        && !entry.enabled_by_feature
        && !is_always_enabled(&entry.feature_id)
}

impl Catalog {
    /// Recompute `enabled_by_feature` for a target configuration
    ///
    /// With a matrix, device-scoped rows follow the matrix. Always-enabled
    /// features and rows without a device follow `target`, falling back to the
    /// feature's default. Running it twice with the same inputs changes
    /// nothing.
    pub fn update_targets(
        &mut self,
        features: &FeatureCatalog,
        target: &FeatureEnablementMap,
        matrix: Option<&DeviceFeatureMatrix>,
    ) {
        let mut changed = 0usize;
        for (id, entry) in self.iter_mut() {
            let by_target = || {
                let default = features.default_enabled(&entry.feature_id).unwrap_or(false);
                target.is_enabled_or(&entry.feature_id, default)
            };

            let enabled = match (matrix, &entry.device_id) {
                (Some(matrix), Some(device))
                    if entry.resource_kind.is_device_scoped()
                        && !is_always_enabled(&entry.feature_id) =>
                {
                    matrix.is_enabled(device, &entry.feature_id)
                }
                _ => by_target(),
            };

            if entry.enabled_by_feature != enabled {
                debug!(entity_id = %id, enabled, "Target changed");
                entry.enabled_by_feature = enabled;
                changed += 1;
            }
        }
        debug!(changed, "Updated targets");
    }

    /// Platform rows that are wanted but do not exist
    pub fn to_create(&self) -> BTreeSet<EntityId> {
        self.iter()
            .filter(|(_, entry)| should_create(entry))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Platform rows that exist but are no longer wanted
    pub fn to_remove(&self) -> BTreeSet<EntityId> {
        self.iter()
            .filter(|(_, entry)| should_remove(entry))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn change_set(&self) -> ChangeSet {
        ChangeSet {
            to_create: self.to_create(),
            to_remove: self.to_remove(),
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for (_, entry) in self.iter().filter(|(_, e)| e.resource_kind.is_platform()) {
            summary.total += 1;
            if should_create(entry) {
                summary.create_count += 1;
            } else if should_remove(entry) {
                summary.remove_count += 1;
            } else if !entry.exists_already && !entry.enabled_by_feature {
                summary.inert_count += 1;
            }
        }
        summary.keep_count =
            summary.total - summary.create_count - summary.remove_count - summary.inert_count;
        summary
    }

    /// Row counts per kind, platform or not
    pub fn counts_by_kind(&self) -> BTreeMap<EntityKind, usize> {
        let mut counts = BTreeMap::new();
        for (_, entry) in self.iter() {
            *counts.entry(entry.resource_kind).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PendingEntry;
    use rx_core::{DeviceId, FeatureDefinition};

    fn features() -> FeatureCatalog {
        let mut builder = FeatureCatalog::builder();
        builder
            .register(
                FeatureDefinition::new("default")
                    .default_enabled(true)
                    .template(EntityKind::Sensor, "indoor", "indoor_{device_id}"),
            )
            .unwrap()
            .register(
                FeatureDefinition::new("humidity_control")
                    .template(EntityKind::Switch, "dehumidify", "dehumidify_{device_id}")
                    .template(EntityKind::Automation, "control", "humidity_control_automation"),
            )
            .unwrap();
        builder.build()
    }

    fn row(
        id: &str,
        feature: &str,
        kind: EntityKind,
        device: Option<&str>,
        exists: bool,
        enabled: bool,
    ) -> PendingEntry {
        (
            id.parse().unwrap(),
            CatalogEntry {
                exists_already: exists,
                enabled_by_feature: enabled,
                feature_id: feature.to_string(),
                resource_kind: kind,
                variable_name: "v".to_string(),
                device_id: device.map(DeviceId::new),
            },
        )
    }

    fn catalog() -> Catalog {
        vec![
            row("sensor.indoor_32_153289", "default", EntityKind::Sensor, Some("32_153289"), true, true),
            row("switch.dehumidify_32_153289", "humidity_control", EntityKind::Switch, Some("32_153289"), true, true),
            row("switch.dehumidify_37_168270", "humidity_control", EntityKind::Switch, Some("37_168270"), false, true),
            row("automation.humidity_control_automation", "humidity_control", EntityKind::Automation, None, false, true),
        ]
        .into_iter()
        .collect()
    }

    fn id(s: &str) -> EntityId {
        s.parse().unwrap()
    }

    #[test]
    fn test_diff_excludes_non_platform_kinds() {
        let catalog = catalog();
        assert_eq!(
            catalog.to_create(),
            BTreeSet::from([id("switch.dehumidify_37_168270")])
        );
        assert!(catalog.to_remove().is_empty());
    }

    #[test]
    fn test_disabling_feature_removes_but_keeps_default() {
        let mut catalog = catalog();
        let target = FeatureEnablementMap::new()
            .with("humidity_control", false)
            .with("default", false);
        catalog.update_targets(&features(), &target, None);

        assert_eq!(
            catalog.to_remove(),
            BTreeSet::from([id("switch.dehumidify_32_153289")])
        );
        assert!(catalog.to_create().is_empty());

        let summary = catalog.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.remove_count, 1);
        assert_eq!(summary.inert_count, 1);
        assert_eq!(summary.keep_count, 1);
    }

    #[test]
    fn test_update_targets_is_idempotent() {
        let mut matrix = DeviceFeatureMatrix::new();
        matrix.enable(&DeviceId::new("37_168270"), "humidity_control");
        let target = FeatureEnablementMap::new().with("humidity_control", true);

        let mut once = catalog();
        once.update_targets(&features(), &target, Some(&matrix));
        let mut twice = once.clone();
        twice.update_targets(&features(), &target, Some(&matrix));

        assert_eq!(once.change_set(), twice.change_set());
        assert_eq!(once.summary(), twice.summary());
    }

    #[test]
    fn test_matrix_controls_device_rows_only() {
        let mut catalog = catalog();
        let mut matrix = DeviceFeatureMatrix::new();
        matrix.enable(&DeviceId::new("37_168270"), "humidity_control");
        let target = FeatureEnablementMap::new().with("humidity_control", true);
        catalog.update_targets(&features(), &target, Some(&matrix));

        // 32_153289 is not in the matrix, so its switch goes away
        let changes = catalog.change_set();
        assert_eq!(changes.to_remove, BTreeSet::from([id("switch.dehumidify_32_153289")]));
        assert_eq!(changes.to_create, BTreeSet::from([id("switch.dehumidify_37_168270")]));

        // The always-enabled sensor ignores the matrix
        assert!(catalog.get(&id("sensor.indoor_32_153289")).unwrap().enabled_by_feature);
        // Global rows follow the target map
        assert!(catalog
            .get(&id("automation.humidity_control_automation"))
            .unwrap()
            .enabled_by_feature);
    }

    #[test]
    fn test_partition_is_complete() {
        let mut catalog = catalog();
        catalog.update_targets(
            &features(),
            &FeatureEnablementMap::new().with("humidity_control", false),
            None,
        );
        let summary = catalog.summary();
        let changes = catalog.change_set();

        assert!(changes.to_create.is_disjoint(&changes.to_remove));
        assert_eq!(
            summary.create_count + summary.remove_count + summary.keep_count + summary.inert_count,
            summary.total
        );
        assert_eq!(summary.create_count, changes.to_create.len());
        assert_eq!(summary.remove_count, changes.to_remove.len());
    }

    #[test]
    fn test_counts_by_kind() {
        let counts = catalog().counts_by_kind();
        assert_eq!(counts[&EntityKind::Switch], 2);
        assert_eq!(counts[&EntityKind::Automation], 1);
    }
}

//! Resource catalog building
//!
//! A [`Catalog`] lists every identifier the enabled features could manage,
//! with whether it exists and whether its feature wants it. It is built fresh
//! for each pass by [`CatalogBuilder::build`] and discarded afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use rx_core::{
    DeviceId, EntityId, EntityKind, Feature, FeatureCatalog, FeatureEnablementMap,
    ResourceDescriptor,
};
use rx_naming::{NamingCodec, TemplateVars};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::discovery::{DeviceDirectory, Discovered};
use crate::error::FeatureScanError;
use crate::interfaces::ExistenceOracle;

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub exists_already: bool,
    pub enabled_by_feature: bool,
    pub feature_id: String,
    pub resource_kind: EntityKind,
    pub variable_name: String,
    /// Absent for feature-global resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
}

impl CatalogEntry {
    /// A row that does not exist yet, for the resource `descriptor` names
    pub fn pending(descriptor: ResourceDescriptor, enabled_by_feature: bool) -> Self {
        let ResourceDescriptor {
            kind,
            feature_id,
            variable_name,
            device_id,
        } = descriptor;
        Self {
            exists_already: false,
            enabled_by_feature,
            feature_id,
            resource_kind: kind,
            variable_name,
            device_id,
        }
    }

    /// The resource this row stands for
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            kind: self.resource_kind,
            feature_id: self.feature_id.clone(),
            variable_name: self.variable_name.clone(),
            device_id: self.device_id.clone(),
        }
    }
}

/// A pending catalog row, as handed to the ready-for-entities hook
pub type PendingEntry = (EntityId, CatalogEntry);

/// Called once per discovered device with that device's pending rows
///
/// The hook may edit, add or drop rows before they are committed.
pub type ReadyHook<'h> = &'h mut (dyn FnMut(&DeviceId, &mut Vec<PendingEntry>) + Send);

/// All rows from one build pass, keyed by identifier
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    entries: IndexMap<EntityId, CatalogEntry>,
    #[serde(skip)]
    failures: Vec<FeatureScanError>,
}

impl Catalog {
    pub fn get(&self, id: &EntityId) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &CatalogEntry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityId, &mut CatalogEntry)> {
        self.entries.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Features whose scan failed and were left out
    pub fn failures(&self) -> &[FeatureScanError] {
        &self.failures
    }

    /// Insert a row; an existing row for the same identifier is kept
    fn insert(&mut self, id: EntityId, entry: CatalogEntry) {
        if let Some(existing) = self.entries.get(&id) {
            warn!(
                entity_id = %id,
                feature_id = %entry.feature_id,
                owner = %existing.feature_id,
                "Identifier already claimed by another feature"
            );
            return;
        }
        self.entries.insert(id, entry);
    }
}

impl FromIterator<PendingEntry> for Catalog {
    fn from_iter<I: IntoIterator<Item = PendingEntry>>(iter: I) -> Self {
        let mut catalog = Catalog::default();
        for (id, entry) in iter {
            catalog.insert(id, entry);
        }
        catalog
    }
}

/// Builds catalogs from features, devices and the existence oracle
#[derive(Clone)]
pub struct CatalogBuilder {
    directory: DeviceDirectory,
    oracle: Arc<dyn ExistenceOracle>,
    codec: NamingCodec,
}

impl CatalogBuilder {
    pub fn new(directory: DeviceDirectory, oracle: Arc<dyn ExistenceOracle>) -> Self {
        Self {
            directory,
            oracle,
            codec: NamingCodec::new(),
        }
    }

    pub fn with_codec(mut self, codec: NamingCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Build a catalog; `target` defaults to `current`
    pub async fn build(
        &self,
        features: &FeatureCatalog,
        current: &FeatureEnablementMap,
        target: Option<&FeatureEnablementMap>,
    ) -> Catalog {
        self.build_with_hook(features, current, target, None).await
    }

    /// Build a catalog, passing each device's rows through `hook` first
    #[instrument(skip_all, fields(features = features.len()))]
    pub async fn build_with_hook(
        &self,
        features: &FeatureCatalog,
        current: &FeatureEnablementMap,
        target: Option<&FeatureEnablementMap>,
        mut hook: Option<ReadyHook<'_>>,
    ) -> Catalog {
        let target = target.unwrap_or(current);
        let existing = self.existing_ids().await;

        let scanned: Vec<&Feature> = features
            .iter()
            .filter(|feature| {
                let default = feature.default_enabled;
                let wanted = target.is_enabled_or(&feature.feature_id, default)
                    || current.is_enabled_or(&feature.feature_id, default);
                if !wanted {
                    debug!(feature_id = %feature.feature_id, "Feature disabled, not scanned");
                }
                wanted
            })
            .collect();

        let devices = self.enumerate_devices(&scanned).await;

        let mut global: Vec<PendingEntry> = Vec::new();
        let mut per_device: BTreeMap<DeviceId, Vec<PendingEntry>> = BTreeMap::new();
        let mut failures = Vec::new();

        for feature in scanned {
            let enabled = current.is_enabled_or(&feature.feature_id, feature.default_enabled);
            let feature_devices = match devices.get(&class_key(&feature.allowed_device_classes)) {
                Some(found) if !found.is_class_checked(&feature.allowed_device_classes) => {
                    self.owned_devices(feature, &found.devices, &existing)
                }
                Some(found) => found.devices.clone(),
                None => Vec::new(),
            };

            match self.scan_feature(feature, &feature_devices, &existing, enabled) {
                Ok(rows) => {
                    for (id, entry) in rows {
                        match entry.device_id.clone() {
                            Some(device) => per_device.entry(device).or_default().push((id, entry)),
                            None => global.push((id, entry)),
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Skipping feature");
                    failures.push(e);
                }
            }
        }

        let mut catalog: Catalog = global.into_iter().collect();
        for (device, mut rows) in per_device {
            if let Some(hook) = hook.as_deref_mut() {
                hook(&device, &mut rows);
            }
            for (id, entry) in rows {
                catalog.insert(id, entry);
            }
        }
        catalog.failures = failures;

        info!(
            entries = catalog.len(),
            failed_features = catalog.failures.len(),
            "Built resource catalog"
        );
        catalog
    }

    /// Existing identifiers; a failing oracle counts as "nothing exists"
    async fn existing_ids(&self) -> BTreeSet<EntityId> {
        match self.oracle.list_existing().await {
            Ok(ids) => ids
                .into_iter()
                .filter_map(|raw| match raw.parse::<EntityId>() {
                    Ok(id) => Some(id),
                    Err(e) => {
                        debug!(identifier = %raw, error = %e, "Ignoring unparseable identifier");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Existence oracle failed, assuming nothing exists");
                BTreeSet::new()
            }
        }
    }

    /// Devices for every distinct class filter, queried once each
    async fn enumerate_devices(&self, features: &[&Feature]) -> HashMap<Vec<String>, Discovered> {
        let filters: BTreeSet<Vec<String>> = features
            .iter()
            .filter(|feature| feature.resources().iter().any(|r| r.kind.is_device_scoped()))
            .map(|feature| class_key(&feature.allowed_device_classes))
            .collect();

        let results = join_all(filters.iter().map(|classes| self.directory.discover(classes))).await;
        filters.into_iter().zip(results).collect()
    }

    /// Devices that already carry an identifier rendered from one of
    /// `feature`'s templates
    ///
    /// Narrows devices whose class is unknown to those the feature has
    /// provably managed before.
    fn owned_devices(
        &self,
        feature: &Feature,
        devices: &[DeviceId],
        existing: &BTreeSet<EntityId>,
    ) -> Vec<DeviceId> {
        let owned: Vec<DeviceId> = devices
            .iter()
            .filter(|device| {
                let vars = TemplateVars::for_device(device);
                feature
                    .resources()
                    .iter()
                    .filter(|resource| resource.kind.is_device_scoped())
                    .filter_map(|resource| {
                        self.codec
                            .encode(resource.kind, &resource.template, &vars)
                            .ok()
                    })
                    .any(|id| existing.contains(&id))
            })
            .cloned()
            .collect();

        if owned.len() < devices.len() {
            debug!(
                feature_id = %feature.feature_id,
                scanned = devices.len(),
                owned = owned.len(),
                "Dropped scanned devices of unknown class"
            );
        }
        owned
    }

    /// Rows for every resource of `feature`
    ///
    /// All or nothing: an identifier that fails to encode for any device
    /// fails the whole feature, so a half-scanned feature never reaches
    /// the engine. Global rows are withheld too.
    fn scan_feature(
        &self,
        feature: &Feature,
        devices: &[DeviceId],
        existing: &BTreeSet<EntityId>,
        enabled: bool,
    ) -> Result<Vec<PendingEntry>, FeatureScanError> {
        let mut rows = Vec::new();
        let scan_error = |source| FeatureScanError {
            feature_id: feature.feature_id.clone(),
            source,
        };

        for resource in feature.resources() {
            let row = |device_id: Option<DeviceId>| {
                let descriptor = ResourceDescriptor {
                    kind: resource.kind,
                    feature_id: feature.feature_id.clone(),
                    variable_name: resource.variable_name.clone(),
                    device_id,
                };
                CatalogEntry::pending(descriptor, enabled)
            };

            if resource.kind.is_device_scoped() {
                for device in devices {
                    let vars = TemplateVars::for_device(device);
                    let id = self
                        .codec
                        .encode(resource.kind, &resource.template, &vars)
                        .map_err(scan_error)?;
                    rows.push((id, row(Some(device.clone()))));
                }
            } else {
                let id = self
                    .codec
                    .encode(resource.kind, &resource.template, &TemplateVars::new())
                    .map_err(scan_error)?;
                rows.push((id, row(None)));
            }
        }

        for (id, entry) in rows.iter_mut() {
            entry.exists_already = existing.contains(id);
        }

        debug!(
            feature_id = %feature.feature_id,
            devices = devices.len(),
            rows = rows.len(),
            "Scanned feature"
        );
        Ok(rows)
    }
}

/// Sorted class list, so equal filters share one query
fn class_key(classes: &[String]) -> Vec<String> {
    let mut key = classes.to_vec();
    key.sort();
    key.dedup();
    key
}

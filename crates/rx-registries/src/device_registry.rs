//! Device Registry
//!
//! Tracks devices known to the broker with a device-class index. This is the
//! structured registry shape the discovery chain consults first.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rx_core::DeviceId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Reason a device was disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledBy {
    /// Disabled by the integration
    Integration,
    /// Disabled by the user
    User,
}

/// A registered device entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Normalized device address
    pub id: DeviceId,

    /// Device class reported by the broker (e.g. `HvacVentilator`)
    pub device_class: String,

    /// Disabled devices are never offered to features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<DisabledBy>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DeviceEntry {
    pub fn new(id: impl Into<DeviceId>, device_class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_class: device_class.into(),
            disabled_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }
}

/// Device Registry indexed by device id and device class
#[derive(Default)]
pub struct DeviceRegistry {
    /// Primary index: device_id -> entry
    by_id: DashMap<DeviceId, Arc<DeviceEntry>>,

    /// Index: device class -> set of device_ids
    by_class: DashMap<String, HashSet<DeviceId>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_entry(&self, entry: Arc<DeviceEntry>) {
        let device_id = entry.id.clone();

        self.by_class
            .entry(entry.device_class.clone())
            .or_default()
            .insert(device_id.clone());

        self.by_id.insert(device_id, entry);
    }

    fn unindex_entry(&self, entry: &DeviceEntry) {
        if let Some(mut ids) = self.by_class.get_mut(&entry.device_class) {
            ids.remove(&entry.id);
        }

        self.by_id.remove(&entry.id);
    }

    /// Register a device, replacing any entry with the same id
    pub fn register(&self, entry: DeviceEntry) -> Arc<DeviceEntry> {
        if let Some(existing) = self.get(&entry.id) {
            debug!("Replacing device entry: {}", existing.id);
            self.unindex_entry(&existing);
        }

        let arc_entry = Arc::new(entry);
        self.index_entry(Arc::clone(&arc_entry));
        info!(
            device_id = %arc_entry.id,
            device_class = %arc_entry.device_class,
            "Registered device"
        );
        arc_entry
    }

    /// Get or create a device with the given class
    pub fn get_or_create(&self, id: impl Into<DeviceId>, device_class: &str) -> Arc<DeviceEntry> {
        let id = id.into();
        if let Some(existing) = self.get(&id) {
            return existing;
        }
        self.register(DeviceEntry::new(id, device_class))
    }

    pub fn get(&self, id: &DeviceId) -> Option<Arc<DeviceEntry>> {
        self.by_id.get(id).map(|r| Arc::clone(&r))
    }

    /// Enabled device ids whose class is in `classes`, or all enabled devices
    /// when `classes` is empty
    pub fn enabled_device_ids(&self, classes: &[String]) -> BTreeSet<DeviceId> {
        if classes.is_empty() {
            return self
                .by_id
                .iter()
                .filter(|entry| !entry.is_disabled())
                .map(|entry| entry.id.clone())
                .collect();
        }

        classes
            .iter()
            .filter_map(|class| self.by_class.get(class))
            .flat_map(|ids| ids.iter().cloned().collect::<Vec<_>>())
            .filter(|id| self.get(id).is_some_and(|entry| !entry.is_disabled()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

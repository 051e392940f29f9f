//! Entity Registry
//!
//! Tracks registered entities with a device index. The reconciliation core
//! reads it as its existence oracle and writes to it through bulk
//! create/remove.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use rx_core::{DeviceId, EntityId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A registered entity entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Internal ULID
    pub id: String,
    pub entity_id: EntityId,
    /// Integration that provides this entity
    pub platform: String,
    /// Parent device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl EntityEntry {
    pub fn new(entity_id: EntityId, platform: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string().to_lowercase(),
            entity_id,
            platform: platform.into(),
            device_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Entity Registry indexed by entity_id (insertion ordered) and device
///
/// Entries are stored as `Arc<EntityEntry>` to avoid cloning on reads.
#[derive(Default)]
pub struct EntityRegistry {
    /// Primary index: entity_id -> entry
    by_entity_id: RwLock<IndexMap<EntityId, Arc<EntityEntry>>>,

    /// Index: device_id -> set of entity_ids
    by_device_id: DashMap<DeviceId, HashSet<EntityId>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_entry(&self, entry: Arc<EntityEntry>) {
        let entity_id = entry.entity_id.clone();

        if let Some(ref device_id) = entry.device_id {
            self.by_device_id
                .entry(device_id.clone())
                .or_default()
                .insert(entity_id.clone());
        }

        if let Ok(mut idx) = self.by_entity_id.write() {
            idx.insert(entity_id, entry);
        }
    }

    fn unindex_entry(&self, entry: &EntityEntry) {
        let entity_id = &entry.entity_id;

        if let Some(ref device_id) = entry.device_id {
            if let Some(mut ids) = self.by_device_id.get_mut(device_id) {
                ids.remove(entity_id);
            }
        }

        if let Ok(mut idx) = self.by_entity_id.write() {
            idx.shift_remove(entity_id);
        }
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<Arc<EntityEntry>> {
        self.by_entity_id
            .read()
            .ok()
            .and_then(|idx| idx.get(entity_id).cloned())
    }

    /// All entities attached to a device
    pub fn get_by_device_id(&self, device_id: &DeviceId) -> Vec<Arc<EntityEntry>> {
        self.by_device_id
            .get(device_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get or create an entity entry
    pub fn get_or_create(
        &self,
        platform: &str,
        entity_id: &EntityId,
        device_id: Option<&DeviceId>,
    ) -> Arc<EntityEntry> {
        if let Some(existing) = self.get(entity_id) {
            debug!("Found existing entity: {}", entity_id);
            return existing;
        }

        let mut entry = EntityEntry::new(entity_id.clone(), platform);
        entry.device_id = device_id.cloned();

        let arc_entry = Arc::new(entry);
        self.index_entry(Arc::clone(&arc_entry));
        info!("Registered new entity: {}", entity_id);
        arc_entry
    }

    pub fn remove(&self, entity_id: &EntityId) -> Option<Arc<EntityEntry>> {
        let arc_entry = self.get(entity_id)?;
        self.unindex_entry(&arc_entry);
        info!("Removed entity: {}", entity_id);
        Some(arc_entry)
    }

    /// Rendered entity IDs, as the existence oracle reports them
    pub fn entity_id_strings(&self) -> BTreeSet<String> {
        self.by_entity_id
            .read()
            .map(|idx| idx.keys().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_entity_id.read().map(|idx| idx.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity_id
            .read()
            .map(|idx| idx.is_empty())
            .unwrap_or(true)
    }

    pub fn is_registered(&self, entity_id: &EntityId) -> bool {
        self.by_entity_id
            .read()
            .map(|idx| idx.contains_key(entity_id))
            .unwrap_or(false)
    }
}

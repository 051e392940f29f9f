//! Interface implementations for the in-memory registries

use std::collections::BTreeSet;

use async_trait::async_trait;
use rx_core::{DeviceId, EntityId, EntityKind};
use rx_naming::NamingCodec;
use rx_registries::{DeviceRegistry, EntityRegistry, LegacyDeviceTable};
use tracing::debug;

use crate::error::{DiscoveryError, MutationError};
use crate::interfaces::{BulkMutationApi, DeviceSource, ExistenceOracle};

/// Platform name recorded on entities created through the registry
pub const PLATFORM: &str = "ramses_extras";

#[async_trait]
impl ExistenceOracle for EntityRegistry {
    async fn list_existing(&self) -> Result<BTreeSet<String>, DiscoveryError> {
        Ok(self.entity_id_strings())
    }
}

#[async_trait]
impl BulkMutationApi for EntityRegistry {
    async fn create(&self, kind: EntityKind, ids: &[EntityId]) -> Result<(), MutationError> {
        let codec = NamingCodec::new();
        for id in ids {
            if id.domain() != kind.domain() {
                return Err(MutationError::new(
                    "create",
                    format!("{} is not a {} identifier", id, kind),
                ));
            }
            let device_id = codec.decode(&id.to_string()).ok().map(|p| p.device_id);
            self.get_or_create(PLATFORM, id, device_id.as_ref());
        }
        debug!(%kind, count = ids.len(), "Registered entities");
        Ok(())
    }

    async fn remove(&self, kind: EntityKind, ids: &[EntityId]) -> Result<(), MutationError> {
        for id in ids {
            if self.remove(id).is_none() {
                debug!(%kind, entity_id = %id, "Entity already absent");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceSource for DeviceRegistry {
    fn name(&self) -> &str {
        "device registry"
    }

    async fn devices(&self, classes: &[String]) -> Result<Vec<DeviceId>, DiscoveryError> {
        Ok(self.enabled_device_ids(classes).into_iter().collect())
    }
}

#[async_trait]
impl DeviceSource for LegacyDeviceTable {
    fn name(&self) -> &str {
        "legacy device table"
    }

    async fn devices(&self, classes: &[String]) -> Result<Vec<DeviceId>, DiscoveryError> {
        Ok(self.device_ids(classes).into_iter().collect())
    }
}

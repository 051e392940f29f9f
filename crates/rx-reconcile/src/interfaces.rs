//! Narrow interfaces to the host
//!
//! The reconciliation core never talks to the host directly. It asks an
//! [`ExistenceOracle`] what exists, one or more [`DeviceSource`]s which devices
//! exist, and signals changes through a [`BulkMutationApi`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use rx_core::{DeviceId, EntityId, EntityKind};

use crate::error::{DiscoveryError, MutationError};

/// Source of truth for which identifiers currently exist
#[async_trait]
pub trait ExistenceOracle: Send + Sync {
    /// Every identifier the host currently knows, managed or not
    async fn list_existing(&self) -> Result<BTreeSet<String>, DiscoveryError>;
}

/// One way of enumerating devices
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Devices whose class is in `classes`; all devices when `classes` is empty
    async fn devices(&self, classes: &[String]) -> Result<Vec<DeviceId>, DiscoveryError>;
}

/// Bulk creation and removal of resources of one kind
///
/// Creation only signals the host; instantiating the resource is the host's
/// job.
#[async_trait]
pub trait BulkMutationApi: Send + Sync {
    async fn create(&self, kind: EntityKind, ids: &[EntityId]) -> Result<(), MutationError>;

    async fn remove(&self, kind: EntityKind, ids: &[EntityId]) -> Result<(), MutationError>;
}

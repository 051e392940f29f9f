//! Entity reconciliation
//!
//! Works out which feature-owned resources should exist for the current
//! devices and configuration, compares that with what exists, and applies the
//! difference through a bulk create/remove API.
//!
//! A pass has four steps:
//! - [`CatalogBuilder`] lists every candidate identifier and whether it exists
//! - [`Catalog::update_targets`] evaluates the target configuration
//! - [`Catalog::change_set`] and [`Catalog::summary`] diff the catalog
//! - [`ChangeApplier`] sends the changes, grouped by kind
//!
//! [`Reconciler`] runs passes one at a time.

pub mod applier;
pub mod catalog;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod hosts;
pub mod interfaces;
pub mod reconciler;

pub use applier::{ApplyFailure, ApplyReport, ChangeApplier, Operation};
pub use catalog::{Catalog, CatalogBuilder, CatalogEntry, PendingEntry, ReadyHook};
pub use discovery::{DeviceDirectory, DeviceTier, Discovered};
pub use engine::{ChangeSet, Summary};
pub use error::{
    DiscoveryError, FeatureScanError, MutationError, ReconcileError, ReconcileResult,
};
pub use interfaces::{BulkMutationApi, DeviceSource, ExistenceOracle};
pub use reconciler::{Plan, ReconcileOutcome, ReconcileRequest, Reconciler, SharedReadyHook};

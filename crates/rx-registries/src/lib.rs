//! Device and entity registries
//!
//! In-memory registries for hosts that do not bring their own:
//! - Entities (EntityRegistry), the record of which resources exist
//! - Devices (DeviceRegistry), broker-style device entries with classes
//! - Legacy devices (LegacyDeviceTable), the flat address/type schema
//!
//! Storage is left to the host; these types hold state for one process.

pub mod error;

pub mod device_registry;
pub mod entity_registry;
pub mod legacy;

pub use error::{RegistryError, RegistryResult};

pub use device_registry::{DeviceEntry, DeviceRegistry, DisabledBy};
pub use entity_registry::{EntityEntry, EntityRegistry};
pub use legacy::{class_for_type, LegacyDeviceTable};

//! Legacy device table
//!
//! Older gateway installs keep a flat schema of device addresses to type
//! codes instead of broker device entries:
//!
//! ```json
//! { "32:153289": { "type": "FAN" }, "37:168270": "REM" }
//! ```
//!
//! The table maps type codes to the device classes used by features so it can
//! serve as the second discovery tier.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use rx_core::DeviceId;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};

/// Legacy type code -> device class
static TYPE_CLASSES: &[(&str, &str)] = &[
    ("FAN", "HvacVentilator"),
    ("REM", "HvacRemote"),
    ("CO2", "HvacCarbonDioxideSensor"),
    ("HUM", "HvacHumiditySensor"),
    ("DIS", "HvacDisplay"),
];

/// Device class for a legacy type code (case-insensitive)
pub fn class_for_type(type_code: &str) -> Option<&'static str> {
    TYPE_CLASSES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(type_code))
        .map(|(_, class)| *class)
}

/// Address -> type code table
#[derive(Debug, Default)]
pub struct LegacyDeviceTable {
    devices: RwLock<BTreeMap<DeviceId, String>>,
}

impl LegacyDeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a legacy schema document
    ///
    /// Each value is either a type code string or an object with a `type`
    /// (or `_type`) field. Entries without a usable type are skipped.
    pub fn from_json(value: &Value) -> RegistryResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            RegistryError::InvalidLegacyTable("expected an object keyed by address".to_string())
        })?;

        let table = Self::new();
        for (address, entry) in object {
            let type_code = match entry {
                Value::String(code) => Some(code.as_str()),
                Value::Object(fields) => fields
                    .get("type")
                    .or_else(|| fields.get("_type"))
                    .and_then(Value::as_str),
                _ => None,
            };
            match type_code {
                Some(code) => table.insert(address.as_str(), code),
                None => warn!(address = %address, "Skipping legacy device without a type"),
            }
        }
        Ok(table)
    }

    pub fn insert(&self, address: impl Into<DeviceId>, type_code: impl Into<String>) {
        let address = address.into();
        let type_code = type_code.into();
        debug!(device_id = %address, type_code = %type_code, "Legacy device");
        if let Ok(mut devices) = self.devices.write() {
            devices.insert(address, type_code);
        }
    }

    pub fn type_of(&self, id: &DeviceId) -> Option<String> {
        self.devices.read().ok().and_then(|d| d.get(id).cloned())
    }

    /// Device ids whose mapped class is in `classes`, or all when empty
    pub fn device_ids(&self, classes: &[String]) -> BTreeSet<DeviceId> {
        let Ok(devices) = self.devices.read() else {
            return BTreeSet::new();
        };
        devices
            .iter()
            .filter(|(_, code)| {
                classes.is_empty()
                    || class_for_type(code)
                        .is_some_and(|class| classes.iter().any(|c| c == class))
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

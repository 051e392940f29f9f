//! Device discovery with fallback
//!
//! [`DeviceDirectory`] asks up to three tiers in order and stops at the first
//! one that yields any device:
//!
//! 1. the structured device registry
//! 2. the legacy device table
//! 3. a scan of existing identifiers, extracting device ids by decoding them
//!
//! Every tier failure is logged and treated as "no devices". The scan tier has
//! no device class information; its results are tagged with
//! [`DeviceTier::IdentifierScan`] so callers holding a class filter can narrow
//! them further.

use std::collections::BTreeSet;
use std::sync::Arc;

use rx_core::DeviceId;
use rx_naming::NamingCodec;
use tracing::{debug, warn};

use crate::interfaces::{DeviceSource, ExistenceOracle};

/// Tier that answered a discovery query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTier {
    Primary,
    Secondary,
    IdentifierScan,
}

/// Devices found for one class filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// Sorted and de-duplicated
    pub devices: Vec<DeviceId>,
    /// `None` when no tier produced anything
    pub tier: Option<DeviceTier>,
}

impl Discovered {
    /// Whether the class filter was applied by the tier itself
    ///
    /// Scan results never are, unless there was no filter to apply.
    pub fn is_class_checked(&self, classes: &[String]) -> bool {
        classes.is_empty() || self.tier != Some(DeviceTier::IdentifierScan)
    }
}

/// Three-tier device enumeration
#[derive(Clone, Default)]
pub struct DeviceDirectory {
    primary: Option<Arc<dyn DeviceSource>>,
    secondary: Option<Arc<dyn DeviceSource>>,
    scan: Option<Arc<dyn ExistenceOracle>>,
    codec: NamingCodec,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(mut self, source: Arc<dyn DeviceSource>) -> Self {
        self.primary = Some(source);
        self
    }

    pub fn with_secondary(mut self, source: Arc<dyn DeviceSource>) -> Self {
        self.secondary = Some(source);
        self
    }

    /// Scan this oracle's identifiers when both sources come up empty
    pub fn with_identifier_scan(mut self, oracle: Arc<dyn ExistenceOracle>) -> Self {
        self.scan = Some(oracle);
        self
    }

    pub fn with_codec(mut self, codec: NamingCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Sorted, de-duplicated devices from the first tier that has any
    pub async fn devices(&self, classes: &[String]) -> Vec<DeviceId> {
        self.discover(classes).await.devices
    }

    /// Like [`devices`](Self::devices), also reporting which tier answered
    pub async fn discover(&self, classes: &[String]) -> Discovered {
        let sources = [
            (DeviceTier::Primary, &self.primary),
            (DeviceTier::Secondary, &self.secondary),
        ];
        for (tier, source) in sources {
            let Some(source) = source else { continue };
            let found = query_source(source.as_ref(), classes).await;
            if !found.is_empty() {
                debug!(
                    source = source.name(),
                    count = found.len(),
                    ?classes,
                    "Discovered devices"
                );
                return Discovered {
                    devices: found.into_iter().collect(),
                    tier: Some(tier),
                };
            }
        }

        let Some(oracle) = &self.scan else {
            debug!(?classes, "No devices discovered");
            return Discovered::default();
        };

        match oracle.list_existing().await {
            Ok(existing) => {
                let found = self
                    .codec
                    .extract_device_ids(existing.iter().map(String::as_str));
                debug!(
                    count = found.len(),
                    ?classes,
                    "Discovered devices from existing identifiers"
                );
                Discovered {
                    devices: found.into_iter().collect(),
                    tier: Some(DeviceTier::IdentifierScan),
                }
            }
            Err(e) => {
                warn!(error = %e, "Identifier scan failed");
                Discovered::default()
            }
        }
    }
}

async fn query_source(source: &dyn DeviceSource, classes: &[String]) -> BTreeSet<DeviceId> {
    match source.devices(classes).await {
        Ok(devices) => devices
            .into_iter()
            .filter(|device| !device.is_empty())
            .collect(),
        Err(e) => {
            warn!(source = source.name(), error = %e, "Device source failed");
            BTreeSet::new()
        }
    }
}

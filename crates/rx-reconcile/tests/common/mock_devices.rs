//! Mock device source

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rx_core::DeviceId;
use rx_reconcile::{DeviceSource, DiscoveryError};

/// Device source with devices per class and classes that fail
#[derive(Default)]
pub struct MockDevices {
    by_class: BTreeMap<String, Vec<String>>,
    failing_classes: BTreeSet<String>,
    calls: AtomicUsize,
}

impl MockDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, class: &str, address: &str) -> Self {
        self.by_class
            .entry(class.to_string())
            .or_default()
            .push(address.to_string());
        self
    }

    /// Queries that include `class` fail
    pub fn failing_for(mut self, class: &str) -> Self {
        self.failing_classes.insert(class.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceSource for MockDevices {
    fn name(&self) -> &str {
        "mock devices"
    }

    async fn devices(&self, classes: &[String]) -> Result<Vec<DeviceId>, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if classes.iter().any(|c| self.failing_classes.contains(c)) {
            return Err(DiscoveryError::unavailable("mock devices", "class not loaded"));
        }

        let devices = self
            .by_class
            .iter()
            .filter(|(class, _)| classes.is_empty() || classes.contains(class))
            .flat_map(|(_, addresses)| addresses.iter().map(DeviceId::new))
            .collect();
        Ok(devices)
    }
}

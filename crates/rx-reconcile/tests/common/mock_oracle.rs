//! Mock existence oracle

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rx_reconcile::{DiscoveryError, ExistenceOracle};
use tokio::sync::Notify;

/// Existence oracle backed by a fixed identifier set
#[derive(Default)]
pub struct MockOracle {
    ids: Mutex<BTreeSet<String>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(self, ids: &[&str]) -> Self {
        self.ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|s| s.to_string()));
        self
    }

    /// Every call fails
    pub fn failing() -> Self {
        let oracle = Self::default();
        oracle.failing.store(true, Ordering::SeqCst);
        oracle
    }

    /// Signal `entered` on each call, then wait for `release`
    pub fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExistenceOracle for MockOracle {
    async fn list_existing(&self) -> Result<BTreeSet<String>, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DiscoveryError::Timeout {
                source_name: "mock oracle".to_string(),
            });
        }
        Ok(self.ids.lock().unwrap().clone())
    }
}

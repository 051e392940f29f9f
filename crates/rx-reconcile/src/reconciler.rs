//! Serialized reconciliation passes
//!
//! One pass is build, retarget, diff and (for [`Reconciler::reconcile`])
//! apply. Passes never overlap: each holds the pass lock from the first
//! discovery call until the report is returned.

use std::sync::Arc;

use rx_core::{DeviceFeatureMatrix, DeviceId, FeatureCatalog, FeatureEnablementMap};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::applier::{ApplyReport, ChangeApplier};
use crate::catalog::{Catalog, CatalogBuilder, PendingEntry};
use crate::discovery::DeviceDirectory;
use crate::engine::{ChangeSet, Summary};
use crate::error::{ReconcileError, ReconcileResult};
use crate::interfaces::{BulkMutationApi, ExistenceOracle};

/// Shared ready-for-entities hook
pub type SharedReadyHook = Arc<dyn Fn(&DeviceId, &mut Vec<PendingEntry>) + Send + Sync>;

/// Inputs of one pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileRequest {
    /// Enablement the host is currently running with
    pub current: FeatureEnablementMap,
    /// Enablement to move to; `current` when absent
    pub target: Option<FeatureEnablementMap>,
    /// Per-device overrides
    pub matrix: Option<DeviceFeatureMatrix>,
}

impl ReconcileRequest {
    pub fn new(current: FeatureEnablementMap) -> Self {
        Self {
            current,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: FeatureEnablementMap) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_matrix(mut self, matrix: DeviceFeatureMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    fn target(&self) -> &FeatureEnablementMap {
        self.target.as_ref().unwrap_or(&self.current)
    }
}

/// Result of a pass that stopped before applying
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    #[serde(skip)]
    pub catalog: Catalog,
    pub changes: ChangeSet,
    pub summary: Summary,
}

/// Result of a full pass
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    #[serde(flatten)]
    pub plan: Plan,
    pub report: ApplyReport,
}

/// Runs reconciliation passes one at a time
pub struct Reconciler {
    features: Arc<FeatureCatalog>,
    builder: CatalogBuilder,
    applier: ChangeApplier,
    ready_hook: Option<SharedReadyHook>,
    pass_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        features: Arc<FeatureCatalog>,
        directory: DeviceDirectory,
        oracle: Arc<dyn ExistenceOracle>,
        api: Arc<dyn BulkMutationApi>,
    ) -> Self {
        Self {
            features,
            builder: CatalogBuilder::new(directory, oracle),
            applier: ChangeApplier::new(api),
            ready_hook: None,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn with_ready_hook(mut self, hook: SharedReadyHook) -> Self {
        self.ready_hook = Some(hook);
        self
    }

    pub fn features(&self) -> &FeatureCatalog {
        &self.features
    }

    /// Build and diff without applying
    pub async fn plan(&self, request: &ReconcileRequest) -> Plan {
        let _lock = self.pass_lock.lock().await;
        self.plan_locked(request).await
    }

    /// Full pass, waiting for any running pass to finish
    pub async fn reconcile(&self, request: &ReconcileRequest) -> ReconcileOutcome {
        let _lock = self.pass_lock.lock().await;
        self.reconcile_locked(request).await
    }

    /// Full pass, or [`ReconcileError::Busy`] if one is already running
    pub async fn try_reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> ReconcileResult<ReconcileOutcome> {
        let Ok(_lock) = self.pass_lock.try_lock() else {
            info!("Reconcile skipped: another pass is already in progress");
            return Err(ReconcileError::Busy);
        };
        Ok(self.reconcile_locked(request).await)
    }

    async fn reconcile_locked(&self, request: &ReconcileRequest) -> ReconcileOutcome {
        let plan = self.plan_locked(request).await;
        let report = self.applier.apply(&plan.changes).await;
        info!(
            created = report.created_total(),
            removed = report.removed_total(),
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            "Reconciliation applied"
        );
        ReconcileOutcome { plan, report }
    }

    #[instrument(skip_all)]
    async fn plan_locked(&self, request: &ReconcileRequest) -> Plan {
        let mut catalog = match &self.ready_hook {
            Some(hook) => {
                let mut call = |device: &DeviceId, rows: &mut Vec<PendingEntry>| hook(device, rows);
                self.builder
                    .build_with_hook(
                        &self.features,
                        &request.current,
                        request.target.as_ref(),
                        Some(&mut call),
                    )
                    .await
            }
            None => {
                self.builder
                    .build(&self.features, &request.current, request.target.as_ref())
                    .await
            }
        };

        catalog.update_targets(&self.features, request.target(), request.matrix.as_ref());
        let changes = catalog.change_set();
        let summary = catalog.summary();

        info!(
            total = summary.total,
            create = summary.create_count,
            remove = summary.remove_count,
            keep = summary.keep_count,
            inert = summary.inert_count,
            "Reconciliation planned"
        );

        Plan {
            catalog,
            changes,
            summary,
        }
    }
}

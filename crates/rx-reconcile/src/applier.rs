//! Applying a change set through the bulk mutation API
//!
//! Identifiers are grouped by kind and each group is sent in one call.
//! Removals go first. A failed group is recorded and the remaining groups
//! still run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rx_core::{EntityId, EntityKind};
use rx_naming::kind_of;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::engine::ChangeSet;
use crate::interfaces::BulkMutationApi;

/// Which bulk call a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("create"),
            Operation::Remove => f.write_str("remove"),
        }
    }
}

/// One failed group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    pub operation: Operation,
    pub kind: EntityKind,
    pub identifiers: Vec<EntityId>,
    pub error: String,
}

/// Outcome of applying a change set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub created: BTreeMap<EntityKind, usize>,
    pub removed: BTreeMap<EntityKind, usize>,
    pub failures: Vec<ApplyFailure>,
    /// Identifiers whose kind is not managed here
    pub skipped: Vec<EntityId>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn created_total(&self) -> usize {
        self.created.values().sum()
    }

    pub fn removed_total(&self) -> usize {
        self.removed.values().sum()
    }

    /// JSON form for host-side display
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Sends change sets to the host
#[derive(Clone)]
pub struct ChangeApplier {
    api: Arc<dyn BulkMutationApi>,
}

impl ChangeApplier {
    pub fn new(api: Arc<dyn BulkMutationApi>) -> Self {
        Self { api }
    }

    #[instrument(skip_all, fields(create = changes.to_create.len(), remove = changes.to_remove.len()))]
    pub async fn apply(&self, changes: &ChangeSet) -> ApplyReport {
        let mut report = ApplyReport::default();

        let removals = group_by_kind(changes.to_remove.iter(), &mut report.skipped);
        for (kind, ids) in removals {
            match self.api.remove(kind, &ids).await {
                Ok(()) => {
                    info!(%kind, count = ids.len(), "Removed resources");
                    report.removed.insert(kind, ids.len());
                }
                Err(e) => {
                    warn!(%kind, count = ids.len(), error = %e, "Bulk remove failed");
                    report.failures.push(ApplyFailure {
                        operation: Operation::Remove,
                        kind,
                        identifiers: ids,
                        error: e.to_string(),
                    });
                }
            }
        }

        let creations = group_by_kind(changes.to_create.iter(), &mut report.skipped);
        for (kind, ids) in creations {
            match self.api.create(kind, &ids).await {
                Ok(()) => {
                    info!(%kind, count = ids.len(), "Requested resource creation");
                    report.created.insert(kind, ids.len());
                }
                Err(e) => {
                    warn!(%kind, count = ids.len(), error = %e, "Bulk create failed");
                    report.failures.push(ApplyFailure {
                        operation: Operation::Create,
                        kind,
                        identifiers: ids,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

fn group_by_kind<'a>(
    ids: impl Iterator<Item = &'a EntityId>,
    skipped: &mut Vec<EntityId>,
) -> BTreeMap<EntityKind, Vec<EntityId>> {
    let mut groups: BTreeMap<EntityKind, Vec<EntityId>> = BTreeMap::new();
    for id in ids {
        let rendered = id.to_string();
        match kind_of(&rendered).and_then(EntityKind::from_domain) {
            Some(kind) => groups.entry(kind).or_default().push(id.clone()),
            None => {
                warn!(entity_id = %id, "Unmanaged kind, skipping");
                skipped.push(id.clone());
            }
        }
    }
    groups
}

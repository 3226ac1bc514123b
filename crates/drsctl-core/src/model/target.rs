// ── Reconcile targets and change requests ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::behavior::{DrsBehavior, OverrideState};

/// A VM resolved inside its managed cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name the caller asked for (unique within the cluster).
    pub name: String,
    /// Managed object id, e.g. `vm-42`.
    pub vm_id: String,
    /// Owning cluster, e.g. `domain-c8`.
    pub cluster_id: String,
}

/// Whether the change creates a new override or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Add,
    Edit,
}

impl ChangeOperation {
    /// `Add` when no override exists yet, `Edit` otherwise.
    pub fn for_state(current: &OverrideState) -> Self {
        if current.is_unset() {
            Self::Add
        } else {
            Self::Edit
        }
    }
}

/// A single reconfiguration, built at submission time and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub target: Target,
    pub operation: ChangeOperation,
    pub behavior: DrsBehavior,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl ChangeRequest {
    pub fn new(target: Target, current: &OverrideState, behavior: DrsBehavior) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            operation: ChangeOperation::for_state(current),
            behavior,
            enabled: true,
            created_at: Utc::now(),
        }
    }
}

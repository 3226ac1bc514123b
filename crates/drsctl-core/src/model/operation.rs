// ── Remote operation tracking ──

use serde::{Deserialize, Serialize};

/// Status of an in-flight remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OperationStatus {
    Pending,
    Running,
    Succeeded,
    Failed { message: String },
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// Handle to one remote operation, owned by a single reconcile call.
///
/// Latches the first terminal status it observes: once `Succeeded` or
/// `Failed` has been recorded, later observations are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    id: String,
    last: Option<OperationStatus>,
}

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last recorded status, if any poll has completed.
    pub fn status(&self) -> Option<&OperationStatus> {
        self.last.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.last.as_ref().is_some_and(OperationStatus::is_terminal)
    }

    /// Record a polled status and return the effective one.
    pub fn observe(&mut self, status: OperationStatus) -> &OperationStatus {
        if !self.is_terminal() {
            self.last = Some(status);
        }
        self.last.get_or_insert(OperationStatus::Pending)
    }
}

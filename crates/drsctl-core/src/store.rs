// ── StateStore capability ──
//
// The narrow interface the reconciler needs from whatever owns the remote
// state. `VsphereStore` implements it over HTTP; tests implement it with
// scripted doubles.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{ChangeRequest, OperationHandle, OperationStatus, OverrideState, Target};

/// Read and mutate per-VM DRS overrides in a managed cluster.
///
/// Errors are transport-level only: "VM does not exist" is `Ok(None)` from
/// [`find_target`](Self::find_target), and a failed remote task is
/// `Ok(OperationStatus::Failed { .. })` from [`poll_status`](Self::poll_status).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Whether this context may reconfigure clusters (vCenter, not a
    /// standalone host).
    async fn is_authoritative(&self) -> Result<bool, CoreError>;

    /// Resolve a VM by name within its managed cluster.
    async fn find_target(&self, name: &str) -> Result<Option<Target>, CoreError>;

    /// The override currently recorded for `target`.
    async fn current_state(&self, target: &Target) -> Result<OverrideState, CoreError>;

    /// Issue the one reconfiguration call. Returns a handle to the
    /// asynchronous remote operation.
    async fn submit_change(&self, request: &ChangeRequest) -> Result<OperationHandle, CoreError>;

    /// Current status of a submitted operation. Once a terminal status has
    /// been returned, later calls must return the same value.
    async fn poll_status(&self, handle: &OperationHandle) -> Result<OperationStatus, CoreError>;
}

#[async_trait]
impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    async fn is_authoritative(&self) -> Result<bool, CoreError> {
        (**self).is_authoritative().await
    }

    async fn find_target(&self, name: &str) -> Result<Option<Target>, CoreError> {
        (**self).find_target(name).await
    }

    async fn current_state(&self, target: &Target) -> Result<OverrideState, CoreError> {
        (**self).current_state(target).await
    }

    async fn submit_change(&self, request: &ChangeRequest) -> Result<OperationHandle, CoreError> {
        (**self).submit_change(request).await
    }

    async fn poll_status(&self, handle: &OperationHandle) -> Result<OperationStatus, CoreError> {
        (**self).poll_status(handle).await
    }
}

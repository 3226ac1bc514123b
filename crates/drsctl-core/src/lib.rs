//! Idempotent reconciliation of per-VM DRS overrides.
//!
//! This crate owns the decision logic between `drsctl-api` and the CLI:
//!
//! - **[`Reconciler`]** compares a VM's recorded override with the desired
//!   [`DrsBehavior`] and submits at most one change. It then polls the
//!   remote operation under a deadline and a [`CancellationToken`], and
//!   always answers with a [`ReconcileResult`].
//!   [`plan()`](Reconciler::plan) answers the same question without
//!   submitting, and [`inspect()`](Reconciler::inspect) only reads.
//!
//! - **[`StateStore`]** is the narrow capability the reconciler needs
//!   from whatever owns the remote state. [`VsphereStore`] implements it
//!   over the vCenter REST API; tests use scripted doubles.
//!
//! - **Errors**: [`CoreError`] for adapter and connection failures,
//!   [`ReconcileError`] for the classified outcome carried in a result.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod store;
pub mod vsphere;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConnectionConfig, DEFAULT_PORT, TlsVerification};
pub use error::{CoreError, ReconcileError};
pub use model::{
    ChangeOperation, ChangeRequest, DrsBehavior, OperationHandle, OperationStatus, OverrideState,
    Target,
};
pub use reconciler::{Inspection, Plan, PollPolicy, ReconcileResult, Reconciler};
pub use store::StateStore;
pub use vsphere::VsphereStore;

pub use tokio_util::sync::CancellationToken;

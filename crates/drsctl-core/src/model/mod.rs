// ── Domain model ──
//
// Types shared by the reconciler and every `StateStore` adapter.

pub mod behavior;
pub mod operation;
pub mod target;

pub use behavior::{DrsBehavior, OverrideState};
pub use operation::{OperationHandle, OperationStatus};
pub use target::{ChangeOperation, ChangeRequest, Target};

//! Async client for the vCenter endpoints `drsctl` needs.
//!
//! Session login/logout, VM lookup by name, per-VM DRS override read and
//! write, and asynchronous task status. Transport settings (TLS mode,
//! timeouts) come from [`TransportConfig`]; every failure is an [`Error`].

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod vcenter;

pub use client::{SESSION_HEADER, VsphereClient};
pub use error::Error;
pub use models::{
    AboutInfo, DrsVmOverride, DrsVmOverrideSpec, OverrideOperation, TaskInfo, TaskStatus,
    VmSummary,
};
pub use transport::{TlsMode, TransportConfig};

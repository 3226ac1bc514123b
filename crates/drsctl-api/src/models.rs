// Wire types for the vCenter JSON endpoints.
//
// These mirror the server's shapes exactly; `drsctl-core` converts them
// into domain types. Behaviors stay as raw strings here so that an
// unexpected value from the server surfaces in core, not as a decode error.

use serde::{Deserialize, Serialize};

/// `GET /api/about`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutInfo {
    pub name: String,
    pub version: String,
    /// `"VirtualCenter"` for vCenter, `"HostAgent"` for a standalone host.
    pub api_type: String,
}

impl AboutInfo {
    pub const VIRTUAL_CENTER: &'static str = "VirtualCenter";

    /// Only vCenter owns cluster configuration; a host agent is a
    /// delegated view that cannot reconfigure DRS.
    pub fn is_vcenter(&self) -> bool {
        self.api_type == Self::VIRTUAL_CENTER
    }
}

/// One entry of `GET /api/vcenter/vm?names=...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSummary {
    /// Managed object id, e.g. `vm-42`.
    pub vm: String,
    pub name: String,
    #[serde(default)]
    pub power_state: Option<String>,
    /// Cluster the VM's host belongs to (`domain-c8`). `None` for VMs on
    /// standalone hosts.
    #[serde(default)]
    pub cluster: Option<String>,
}

/// `GET /api/vcenter/cluster/{cluster}/drs/vm-overrides/{vm}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrsVmOverride {
    pub vm: String,
    pub enabled: bool,
    pub behavior: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideOperation {
    Add,
    Edit,
}

/// Body of `POST /api/vcenter/cluster/{cluster}/drs/vm-overrides?vmw-task=true`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrsVmOverrideSpec {
    pub operation: OverrideOperation,
    pub vm: String,
    pub enabled: bool,
    pub behavior: String,
}

/// Task lifecycle as reported by `GET /api/cis/tasks/{task}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Blocked,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizableMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub default_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub messages: Vec<LocalizableMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<TaskError>,
}

impl TaskInfo {
    /// Human-readable failure text, joined from every localized message.
    pub fn error_message(&self) -> Option<String> {
        let messages = &self.error.as_ref()?.messages;
        if messages.is_empty() {
            return None;
        }
        Some(
            messages
                .iter()
                .map(|m| m.default_message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

// ── vCenter-backed StateStore ──
//
// Adapts `drsctl_api::VsphereClient` to the `StateStore` capability:
// wire shapes in, domain types out. Holds one authenticated session for
// its lifetime.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use drsctl_api::{
    DrsVmOverrideSpec, OverrideOperation, TaskStatus, TlsMode, TransportConfig, VsphereClient,
};
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{
    ChangeOperation, ChangeRequest, DrsBehavior, OperationHandle, OperationStatus, OverrideState,
    Target,
};
use crate::store::StateStore;

const FAILED_WITHOUT_MESSAGE: &str = "task failed without an error message";

pub struct VsphereStore {
    client: VsphereClient,
}

impl VsphereStore {
    /// Build a client from `config` and log in.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, CoreError> {
        let base_url = config.base_url()?;
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };

        let client = VsphereClient::new(base_url.clone(), &transport)?;
        client.login(&config.username, &config.password).await?;
        info!(url = %base_url, user = %config.username, "connected to vCenter");

        Ok(Self { client })
    }

    /// End the session. Failures are logged, never returned.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        debug!("disconnected");
    }

    /// One-shot: connect, run closure, disconnect.
    pub async fn oneshot<F, Fut, T>(config: &ConnectionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Arc<VsphereStore>) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let store = Arc::new(Self::connect(config).await?);
        let result = f(Arc::clone(&store)).await;
        store.disconnect().await;
        result
    }
}

#[async_trait]
impl StateStore for VsphereStore {
    async fn is_authoritative(&self) -> Result<bool, CoreError> {
        let about = self.client.about().await?;
        debug!(api_type = %about.api_type, version = %about.version, "endpoint identified");
        Ok(about.is_vcenter())
    }

    async fn find_target(&self, name: &str) -> Result<Option<Target>, CoreError> {
        let Some(vm) = self.client.find_vm(name).await? else {
            return Ok(None);
        };
        // Overrides live on a cluster; a VM outside one has nothing to reconcile.
        let Some(cluster_id) = vm.cluster else {
            debug!(name, vm = %vm.vm, "vm is not in a cluster");
            return Ok(None);
        };
        Ok(Some(Target {
            name: vm.name,
            vm_id: vm.vm,
            cluster_id,
        }))
    }

    async fn current_state(&self, target: &Target) -> Result<OverrideState, CoreError> {
        let Some(current) = self
            .client
            .get_vm_override(&target.cluster_id, &target.vm_id)
            .await?
        else {
            return Ok(OverrideState::Unset);
        };

        let behavior: DrsBehavior =
            current
                .behavior
                .parse()
                .map_err(|_| CoreError::InvalidResponse {
                    message: format!(
                        "unknown DRS behavior '{}' on {}",
                        current.behavior, target.vm_id
                    ),
                })?;

        Ok(OverrideState::Set {
            behavior,
            enabled: current.enabled,
        })
    }

    async fn submit_change(&self, request: &ChangeRequest) -> Result<OperationHandle, CoreError> {
        let spec = DrsVmOverrideSpec {
            operation: match request.operation {
                ChangeOperation::Add => OverrideOperation::Add,
                ChangeOperation::Edit => OverrideOperation::Edit,
            },
            vm: request.target.vm_id.clone(),
            enabled: request.enabled,
            behavior: request.behavior.as_str().to_owned(),
        };

        let task = self
            .client
            .set_vm_override(&request.target.cluster_id, &spec)
            .await?;
        debug!(request = %request.id, task = %task, "change request accepted");
        Ok(OperationHandle::new(task))
    }

    async fn poll_status(&self, handle: &OperationHandle) -> Result<OperationStatus, CoreError> {
        let info = self.client.get_task(handle.id()).await?;
        Ok(match info.status {
            TaskStatus::Pending => OperationStatus::Pending,
            TaskStatus::Running | TaskStatus::Blocked => OperationStatus::Running,
            TaskStatus::Succeeded => OperationStatus::Succeeded,
            TaskStatus::Failed => OperationStatus::Failed {
                message: info
                    .error_message()
                    .unwrap_or_else(|| FAILED_WITHOUT_MESSAGE.into()),
            },
        })
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

// vCenter inventory, DRS override, and task endpoints.

use tracing::debug;

use crate::client::VsphereClient;
use crate::error::Error;
use crate::models::{AboutInfo, DrsVmOverride, DrsVmOverrideSpec, TaskInfo, VmSummary};

impl VsphereClient {
    /// Product and API type of the endpoint.
    pub async fn about(&self) -> Result<AboutInfo, Error> {
        let url = self.endpoint(&["api", "about"])?;
        self.get(url).await
    }

    /// Look up a VM by exact name. Returns the first exact match, if any.
    pub async fn find_vm(&self, name: &str) -> Result<Option<VmSummary>, Error> {
        let mut url = self.endpoint(&["api", "vcenter", "vm"])?;
        url.query_pairs_mut().append_pair("names", name);

        let vms: Vec<VmSummary> = self.get(url).await?;
        debug!(name, matches = vms.len(), "vm lookup");
        Ok(vms.into_iter().find(|vm| vm.name == name))
    }

    /// Read the DRS override for a VM. `None` when the VM follows the
    /// cluster default (the server answers 404).
    pub async fn get_vm_override(
        &self,
        cluster: &str,
        vm: &str,
    ) -> Result<Option<DrsVmOverride>, Error> {
        let url = self.endpoint(&[
            "api",
            "vcenter",
            "cluster",
            cluster,
            "drs",
            "vm-overrides",
            vm,
        ])?;
        self.get_optional(url).await
    }

    /// Submit a cluster reconfiguration for one VM override.
    ///
    /// Runs as an asynchronous task; returns the task id to poll with
    /// [`get_task()`](Self::get_task).
    pub async fn set_vm_override(
        &self,
        cluster: &str,
        spec: &DrsVmOverrideSpec,
    ) -> Result<String, Error> {
        let mut url = self.endpoint(&["api", "vcenter", "cluster", cluster, "drs", "vm-overrides"])?;
        url.query_pairs_mut().append_pair("vmw-task", "true");

        let task: String = self.post(url, spec).await?;
        debug!(cluster, vm = %spec.vm, task = %task, "override task submitted");
        Ok(task)
    }

    /// Current status of an asynchronous task.
    pub async fn get_task(&self, task: &str) -> Result<TaskInfo, Error> {
        let url = self.endpoint(&["api", "cis", "tasks", task])?;
        self.get(url).await
    }
}

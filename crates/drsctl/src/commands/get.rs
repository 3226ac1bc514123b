//! `drsctl get`: show a VM's current DRS override.

use tabled::Tabled;

use drsctl_core::{Inspection, OverrideState, Reconciler, VsphereStore};

use crate::cli::{GetArgs, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OverrideRow {
    #[tabled(rename = "VM")]
    vm: String,
    #[tabled(rename = "ID")]
    vm_id: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Behavior")]
    behavior: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&Inspection> for OverrideRow {
    fn from(i: &Inspection) -> Self {
        let (behavior, enabled) = match i.state {
            OverrideState::Unset => ("(cluster default)".into(), "-".into()),
            OverrideState::Set { behavior, enabled } => (behavior.to_string(), enabled.to_string()),
        };
        Self {
            vm: i.target.name.clone(),
            vm_id: i.target.vm_id.clone(),
            cluster: i.target.cluster_id.clone(),
            behavior,
            enabled,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: GetArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let connection = config::build_connection(global, cfg)?;

    let inspection = VsphereStore::oneshot(&connection, |store| async move {
        Ok(Reconciler::new(store).inspect(&args.vm).await)
    })
    .await??;

    let out = output::render_row(config::output_format(global, cfg), &inspection, |i| {
        OverrideRow::from(i)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

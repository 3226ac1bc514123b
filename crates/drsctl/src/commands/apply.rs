//! `drsctl apply`: reconcile one VM's DRS override.

use drsctl_core::{
    CancellationToken, DrsBehavior, PollPolicy, ReconcileError, ReconcileResult, Reconciler,
    VsphereStore,
};

use crate::cli::{ApplyArgs, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Detail view ─────────────────────────────────────────────────────

fn detail(result: &ReconcileResult) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "VM:          {}", result.target);
    let _ = writeln!(out, "Changed:     {}", result.changed);
    let _ = writeln!(
        out,
        "Final state: {}",
        result
            .final_state
            .map_or_else(|| "unknown".into(), |b| b.to_string())
    );
    let _ = write!(out, "Message:     {}", result.msg);
    out
}

fn poll_policy(args: &ApplyArgs) -> PollPolicy {
    match args.max_poll_interval {
        Some(max) => PollPolicy::backoff(args.poll_interval, max),
        None => PollPolicy::fixed(args.poll_interval),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: ApplyArgs,
    global: &GlobalOpts,
    cfg: &Config,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let format = config::output_format(global, cfg);

    // Unknown behaviors are rejected before any connection is made.
    let Ok(behavior) = args.behavior.parse::<DrsBehavior>() else {
        let result =
            ReconcileResult::rejected(&args.vm, ReconcileError::invalid_state(&args.behavior));
        return finish(result, format, global.quiet);
    };

    let wait = config::wait_timeout(args.wait, cfg)?;
    let connection = config::build_connection(global, cfg)?;
    let policy = poll_policy(&args);
    tracing::debug!(vm = %args.vm, %behavior, ?wait, check = args.check, "applying");

    let vm = args.vm.clone();
    let outcome = VsphereStore::oneshot(&connection, |store| async move {
        let reconciler = Reconciler::new(store).with_poll_policy(policy);
        if args.check {
            let plan = reconciler.plan(&args.vm, behavior.as_str()).await;
            return Ok(plan.map_or_else(
                |err| ReconcileResult::rejected(&args.vm, err),
                drsctl_core::Plan::into_result,
            ));
        }
        Ok(reconciler
            .reconcile_behavior(&args.vm, behavior, wait, &cancel)
            .await)
    })
    .await;

    match outcome {
        Ok(result) => finish(result, format, global.quiet),
        // Connection and login failures still produce a result document;
        // the exit status comes from the underlying error.
        Err(err) => {
            let result = ReconcileResult::rejected(&vm, ReconcileError::store(&err));
            emit(&result, format, global.quiet)?;
            Err(err.into())
        }
    }
}

fn emit(result: &ReconcileResult, format: OutputFormat, quiet: bool) -> Result<(), CliError> {
    let out = output::render_single(format, result, detail)?;
    output::print_output(&out, quiet);
    Ok(())
}

/// Print the result, then turn an embedded error into the exit status.
fn finish(result: ReconcileResult, format: OutputFormat, quiet: bool) -> Result<(), CliError> {
    emit(&result, format, quiet)?;
    match result.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn detail_view_lists_outcome() {
        let result = ReconcileResult::rejected(
            "web-01",
            ReconcileError::NotFound {
                target: "web-01".into(),
            },
        );
        let text = detail(&result);
        assert!(text.contains("VM:          web-01"));
        assert!(text.contains("Final state: unknown"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn max_interval_enables_backoff() {
        let mut args = ApplyArgs {
            vm: "web-01".into(),
            behavior: "manual".into(),
            wait: None,
            poll_interval: Duration::from_millis(500),
            max_poll_interval: None,
            check: false,
        };
        assert_eq!(poll_policy(&args).max_interval(), Duration::from_millis(500));

        args.max_poll_interval = Some(Duration::from_secs(4));
        assert_eq!(poll_policy(&args).max_interval(), Duration::from_secs(4));
    }
}

// ── Reconciler ──
//
// Compare-then-correct for one VM's DRS override. Reads fresh state on
// every call, submits at most one change, then waits on the remote task
// with a deadline and the caller's cancellation token. Every exit path
// produces a `ReconcileResult`; nothing is retried here.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::model::{
    ChangeOperation, ChangeRequest, DrsBehavior, OperationHandle, OperationStatus, OverrideState,
    Target,
};
use crate::store::StateStore;

/// Floor for poll intervals so a misconfigured policy cannot spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Stand-in deadline for timeouts too large to add to the clock (~30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

const ALREADY_SET_MSG: &str = "DRS behavior is already set to the desired state.";
const APPLIED_MSG: &str = "DRS override applied successfully.";

// ── Poll policy ──────────────────────────────────────────────────

/// Spacing between status checks of a remote operation.
///
/// The first wait is `interval`; each later wait doubles, capped at
/// `max_interval`. Waits are always clipped to the reconcile deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self::backoff(interval, interval)
    }

    pub fn backoff(initial: Duration, max: Duration) -> Self {
        let interval = initial.max(MIN_POLL_INTERVAL);
        Self {
            interval,
            max_interval: max.max(interval),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

// ── Results ──────────────────────────────────────────────────────

/// Outcome of one reconcile call.
///
/// `final_state` is the behavior known to be in effect after the call:
/// the desired one on success or no-op, the previous one when the remote
/// task failed, and `None` when it cannot be known (timeout, cancellation,
/// precondition failures) or no enabled override existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub target: String,
    pub changed: bool,
    pub final_state: Option<DrsBehavior>,
    pub error: Option<ReconcileError>,
    pub msg: String,
}

impl ReconcileResult {
    fn unchanged(vm_name: &str, behavior: DrsBehavior) -> Self {
        Self {
            target: vm_name.to_owned(),
            changed: false,
            final_state: Some(behavior),
            error: None,
            msg: ALREADY_SET_MSG.into(),
        }
    }

    fn applied(vm_name: &str, behavior: DrsBehavior) -> Self {
        Self {
            target: vm_name.to_owned(),
            changed: true,
            final_state: Some(behavior),
            error: None,
            msg: APPLIED_MSG.into(),
        }
    }

    fn failed(vm_name: &str, error: ReconcileError, final_state: Option<DrsBehavior>) -> Self {
        let msg = error.to_string();
        Self {
            target: vm_name.to_owned(),
            changed: false,
            final_state,
            error: Some(error),
            msg,
        }
    }

    /// Result for a call rejected before any change was attempted.
    pub fn rejected(vm_name: &str, error: ReconcileError) -> Self {
        Self::failed(vm_name, error, None)
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// What a reconcile call would do, computed without submitting anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub target: Target,
    pub current: OverrideState,
    pub desired: DrsBehavior,
    /// `None` when the current state already satisfies `desired`.
    pub action: Option<ChangeOperation>,
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.action.is_none()
    }

    /// Render as a check-mode result: `changed` reports what would change.
    pub fn into_result(self) -> ReconcileResult {
        if self.is_noop() {
            return ReconcileResult::unchanged(&self.target.name, self.desired);
        }
        ReconcileResult {
            target: self.target.name,
            changed: true,
            final_state: Some(self.desired),
            error: None,
            msg: "DRS override would be applied (check mode).".into(),
        }
    }
}

/// A VM and the override currently recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    pub target: Target,
    pub state: OverrideState,
}

enum Outcome {
    Succeeded,
    Failed(String),
}

// ── Reconciler ───────────────────────────────────────────────────

/// Idempotent DRS override reconciler over any [`StateStore`].
pub struct Reconciler<S> {
    store: S,
    poll: PollPolicy,
}

impl<S: StateStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            poll: PollPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Bring `vm_name`'s override to `desired` (a behavior name), waiting up
    /// to `timeout` for the remote task.
    ///
    /// An unknown behavior name is rejected before the store is contacted.
    pub async fn reconcile(
        &self,
        vm_name: &str,
        desired: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ReconcileResult {
        match parse_behavior(desired) {
            Ok(behavior) => {
                self.reconcile_behavior(vm_name, behavior, timeout, cancel)
                    .await
            }
            Err(error) => ReconcileResult::failed(vm_name, error, None),
        }
    }

    /// Typed variant of [`reconcile`](Self::reconcile).
    pub async fn reconcile_behavior(
        &self,
        vm_name: &str,
        desired: DrsBehavior,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ReconcileResult {
        match self.converge(vm_name, desired, timeout, cancel).await {
            Ok(result) => result,
            Err(error) => {
                warn!(vm = vm_name, %error, "reconcile did not converge");
                ReconcileResult::failed(vm_name, error, None)
            }
        }
    }

    /// Report what [`reconcile`](Self::reconcile) would do, without
    /// submitting a change.
    pub async fn plan(&self, vm_name: &str, desired: &str) -> Result<Plan, ReconcileError> {
        let desired = parse_behavior(desired)?;
        validate_name(vm_name)?;

        let target = self.resolve(vm_name).await?;
        let current = self.store.current_state(&target).await?;
        let action = (!current.satisfies(desired)).then(|| ChangeOperation::for_state(&current));

        Ok(Plan {
            target,
            current,
            desired,
            action,
        })
    }

    /// Look up a VM and its current override.
    pub async fn inspect(&self, vm_name: &str) -> Result<Inspection, ReconcileError> {
        validate_name(vm_name)?;

        let target = self
            .store
            .find_target(vm_name)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                target: vm_name.to_owned(),
            })?;
        let state = self.store.current_state(&target).await?;
        Ok(Inspection { target, state })
    }

    async fn converge(
        &self,
        vm_name: &str,
        desired: DrsBehavior,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ReconcileResult, ReconcileError> {
        validate_name(vm_name)?;
        if timeout.is_zero() {
            return Err(ReconcileError::InvalidArgument {
                field: "timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let target = guarded(cancel, self.resolve(vm_name)).await?;
        let current = guarded(cancel, self.store.current_state(&target)).await?;

        if current.satisfies(desired) {
            info!(vm = vm_name, behavior = %desired, "DRS override already in desired state");
            return Ok(ReconcileResult::unchanged(vm_name, desired));
        }

        let request = ChangeRequest::new(target, &current, desired);
        let mut handle = guarded(cancel, self.store.submit_change(&request)).await?;
        info!(
            vm = vm_name,
            vm_id = %request.target.vm_id,
            cluster = %request.target.cluster_id,
            operation = ?request.operation,
            behavior = %desired,
            task = handle.id(),
            "DRS override change submitted"
        );

        match self.wait(&mut handle, timeout, cancel).await? {
            Outcome::Succeeded => {
                info!(vm = vm_name, task = handle.id(), "DRS override applied");
                Ok(ReconcileResult::applied(vm_name, desired))
            }
            Outcome::Failed(message) => {
                warn!(vm = vm_name, task = handle.id(), %message, "DRS override task failed");
                Ok(ReconcileResult::failed(
                    vm_name,
                    ReconcileError::RemoteOperation { message },
                    current.effective_behavior(),
                ))
            }
        }
    }

    /// Find the VM, then confirm this context may reconfigure its cluster.
    async fn resolve(&self, vm_name: &str) -> Result<Target, ReconcileError> {
        let target = self
            .store
            .find_target(vm_name)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                target: vm_name.to_owned(),
            })?;

        if !self.store.is_authoritative().await? {
            return Err(ReconcileError::UnsupportedContext {
                reason: "only vCenter can reconfigure cluster DRS settings".into(),
            });
        }

        debug!(vm = vm_name, vm_id = %target.vm_id, cluster = %target.cluster_id, "resolved target");
        Ok(target)
    }

    /// Poll `handle` until it reaches a terminal status, the deadline
    /// passes, or `cancel` fires. No poll is issued at or after the deadline.
    async fn wait(
        &self,
        handle: &mut OperationHandle,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ReconcileError> {
        let deadline = after(Instant::now(), timeout);
        let mut delay = self.poll.interval;
        let mut polls: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                warn!(task = handle.id(), polls, ?timeout, "operation did not finish in time");
                return Err(ReconcileError::timeout(handle.id(), timeout));
            }

            let polled = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ReconcileError::Cancelled),
                polled = tokio::time::timeout_at(deadline, self.store.poll_status(handle)) => polled,
            };
            let Ok(status) = polled else {
                warn!(task = handle.id(), polls, ?timeout, "status check ran past the deadline");
                return Err(ReconcileError::timeout(handle.id(), timeout));
            };
            polls = polls.saturating_add(1);

            match handle.observe(status?).clone() {
                OperationStatus::Succeeded => return Ok(Outcome::Succeeded),
                OperationStatus::Failed { message } => return Ok(Outcome::Failed(message)),
                status => debug!(task = handle.id(), ?status, polls, "operation in progress"),
            }

            let wake = after(Instant::now(), delay).min(deadline);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ReconcileError::Cancelled),
                () = tokio::time::sleep_until(wake) => {}
            }
            delay = self.poll.next(delay);
        }
    }
}

/// `now + span`, saturating at a far-future instant instead of overflowing.
fn after(now: Instant, span: Duration) -> Instant {
    now.checked_add(span)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn parse_behavior(value: &str) -> Result<DrsBehavior, ReconcileError> {
    value
        .parse()
        .map_err(|_| ReconcileError::invalid_state(value))
}

fn validate_name(vm_name: &str) -> Result<(), ReconcileError> {
    if vm_name.trim().is_empty() {
        return Err(ReconcileError::InvalidArgument {
            field: "target".into(),
            reason: "VM name must not be empty".into(),
        });
    }
    Ok(())
}

/// Run a store call unless `cancel` fires first.
async fn guarded<T, E>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, E>> + Send,
) -> Result<T, ReconcileError>
where
    T: Send,
    E: Into<ReconcileError> + Send,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ReconcileError::Cancelled),
        result = fut => result.map_err(Into::into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_fixed_one_second() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval(), Duration::from_secs(1));
        assert_eq!(policy.next(policy.interval()), Duration::from_secs(1));
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = PollPolicy::backoff(Duration::from_millis(250), Duration::from_secs(1));
        let second = policy.next(policy.interval());
        let third = policy.next(second);
        let fourth = policy.next(third);
        assert_eq!(second, Duration::from_millis(500));
        assert_eq!(third, Duration::from_secs(1));
        assert_eq!(fourth, Duration::from_secs(1));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let policy = PollPolicy::fixed(Duration::ZERO);
        assert_eq!(policy.interval(), MIN_POLL_INTERVAL);
        assert_eq!(policy.max_interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn huge_spans_saturate_instead_of_overflowing() {
        let now = Instant::now();
        assert_eq!(after(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert!(after(now, Duration::MAX) > now);
    }

    #[test]
    fn check_mode_result_reports_pending_change() {
        let plan = Plan {
            target: Target {
                name: "web-01".into(),
                vm_id: "vm-42".into(),
                cluster_id: "domain-c8".into(),
            },
            current: OverrideState::Unset,
            desired: DrsBehavior::Manual,
            action: Some(ChangeOperation::Add),
        };
        let result = plan.into_result();
        assert!(result.changed);
        assert!(result.is_ok());
        assert_eq!(result.final_state, Some(DrsBehavior::Manual));
    }
}

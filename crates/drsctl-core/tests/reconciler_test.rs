#![allow(clippy::unwrap_used)]

// Reconciler behavior against a scripted in-memory store.
//
// All tests run on a paused clock, so poll spacing and deadlines are exact.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

use drsctl_core::{
    CancellationToken, ChangeOperation, ChangeRequest, CoreError, DrsBehavior, OperationHandle,
    OperationStatus, OverrideState, PollPolicy, ReconcileError, Reconciler, StateStore, Target,
};

const LONG: Duration = Duration::from_secs(30);

// ── Scripted store ──────────────────────────────────────────────────

struct ScriptedStore {
    authoritative: bool,
    target: Option<Target>,
    state: Mutex<OverrideState>,
    script: Mutex<VecDeque<Result<OperationStatus, CoreError>>>,
    poll_delay: Duration,
    submits: Mutex<Vec<ChangeRequest>>,
    polls: Mutex<Vec<Instant>>,
    calls: AtomicUsize,
}

impl ScriptedStore {
    fn new(state: OverrideState) -> Self {
        Self {
            authoritative: true,
            target: Some(web01()),
            state: Mutex::new(state),
            script: Mutex::new(VecDeque::new()),
            poll_delay: Duration::ZERO,
            submits: Mutex::new(Vec::new()),
            polls: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_script(self, steps: impl IntoIterator<Item = OperationStatus>) -> Self {
        self.script.lock().unwrap().extend(steps.into_iter().map(Ok));
        self
    }

    fn submits(&self) -> Vec<ChangeRequest> {
        self.submits.lock().unwrap().clone()
    }

    fn polls(&self) -> Vec<Instant> {
        self.polls.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for ScriptedStore {
    async fn is_authoritative(&self) -> Result<bool, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.authoritative)
    }

    async fn find_target(&self, name: &str) -> Result<Option<Target>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.target.clone().filter(|t| t.name == name))
    }

    async fn current_state(&self, _target: &Target) -> Result<OverrideState, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.state.lock().unwrap())
    }

    async fn submit_change(&self, request: &ChangeRequest) -> Result<OperationHandle, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut submits = self.submits.lock().unwrap();
        submits.push(request.clone());
        Ok(OperationHandle::new(format!("task-{}", submits.len())))
    }

    async fn poll_status(&self, _handle: &OperationHandle) -> Result<OperationStatus, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.polls.lock().unwrap().push(Instant::now());
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(OperationStatus::Running));

        if let Ok(OperationStatus::Succeeded) = step {
            let applied = self.submits.lock().unwrap().last().cloned().unwrap();
            *self.state.lock().unwrap() = OverrideState::Set {
                behavior: applied.behavior,
                enabled: applied.enabled,
            };
        }
        step
    }
}

fn web01() -> Target {
    Target {
        name: "web-01".into(),
        vm_id: "vm-42".into(),
        cluster_id: "domain-c8".into(),
    }
}

fn set(behavior: DrsBehavior) -> OverrideState {
    OverrideState::Set {
        behavior,
        enabled: true,
    }
}

fn offsets(start: Instant, polls: &[Instant]) -> Vec<Duration> {
    polls.iter().map(|p| p.duration_since(start)).collect()
}

// ── Idempotence ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn matching_state_is_a_no_op_every_time() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let result = reconciler
            .reconcile("web-01", "manual", LONG, &cancel)
            .await;
        assert!(!result.changed);
        assert_eq!(result.final_state, Some(DrsBehavior::Manual));
        assert_eq!(result.error, None);
        assert_eq!(result.msg, "DRS behavior is already set to the desired state.");
    }
    assert!(reconciler.store().submits().is_empty());
    assert!(reconciler.store().polls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn mismatch_submits_exactly_one_change() {
    let store = ScriptedStore::new(set(DrsBehavior::Manual)).with_script([OperationStatus::Succeeded]);
    let reconciler = Reconciler::new(store);
    let cancel = CancellationToken::new();

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &cancel)
        .await;
    assert!(result.changed);
    assert_eq!(result.final_state, Some(DrsBehavior::FullyAutomated));
    assert_eq!(result.msg, "DRS override applied successfully.");

    let submits = reconciler.store().submits();
    assert_eq!(submits.len(), 1);
    assert_eq!(submits[0].behavior, DrsBehavior::FullyAutomated);
    assert_eq!(submits[0].operation, ChangeOperation::Edit);
    assert!(submits[0].enabled);
    assert_eq!(submits[0].target, web01());

    // Converged: a second call observes the new state and does nothing.
    let again = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &cancel)
        .await;
    assert!(!again.changed);
    assert_eq!(reconciler.store().submits().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_override_is_added() {
    let store = ScriptedStore::new(OverrideState::Unset).with_script([OperationStatus::Succeeded]);
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile("web-01", "manual", LONG, &CancellationToken::new())
        .await;
    assert!(result.changed);
    assert_eq!(
        reconciler.store().submits()[0].operation,
        ChangeOperation::Add
    );
}

#[tokio::test(start_paused = true)]
async fn disabled_override_is_re_enabled() {
    let store = ScriptedStore::new(OverrideState::Set {
        behavior: DrsBehavior::Manual,
        enabled: false,
    })
    .with_script([OperationStatus::Succeeded]);
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile("web-01", "manual", LONG, &CancellationToken::new())
        .await;
    assert!(result.changed);
    let submits = reconciler.store().submits();
    assert_eq!(submits[0].operation, ChangeOperation::Edit);
    assert!(submits[0].enabled);
}

#[tokio::test(start_paused = true)]
async fn behavior_aliases_are_accepted() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::PartiallyAutomated)));

    let result = reconciler
        .reconcile("web-01", "partially-automated", LONG, &CancellationToken::new())
        .await;
    assert!(!result.changed);
    assert_eq!(result.final_state, Some(DrsBehavior::PartiallyAutomated));
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn polls_at_fixed_interval_until_success() {
    let store = ScriptedStore::new(set(DrsBehavior::Manual)).with_script([
        OperationStatus::Running,
        OperationStatus::Running,
        OperationStatus::Succeeded,
    ]);
    let reconciler = Reconciler::new(store);
    let start = Instant::now();

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &CancellationToken::new())
        .await;

    assert!(result.changed);
    assert_eq!(result.final_state, Some(DrsBehavior::FullyAutomated));
    assert_eq!(
        offsets(start, &reconciler.store().polls()),
        [
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(2)
        ]
    );
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn backoff_policy_doubles_up_to_cap() {
    let store = ScriptedStore::new(OverrideState::Unset).with_script([
        OperationStatus::Pending,
        OperationStatus::Running,
        OperationStatus::Running,
        OperationStatus::Running,
        OperationStatus::Succeeded,
    ]);
    let reconciler = Reconciler::new(store).with_poll_policy(PollPolicy::backoff(
        Duration::from_secs(1),
        Duration::from_secs(4),
    ));
    let start = Instant::now();

    let result = reconciler
        .reconcile("web-01", "manual", LONG, &CancellationToken::new())
        .await;

    assert!(result.changed);
    assert_eq!(
        offsets(start, &reconciler.store().polls()),
        [0, 1, 3, 7, 11].map(Duration::from_secs)
    );
}

#[tokio::test(start_paused = true)]
async fn times_out_without_polling_past_the_deadline() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));
    let start = Instant::now();
    let timeout = Duration::from_secs(5);

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", timeout, &CancellationToken::new())
        .await;

    assert!(!result.changed);
    assert_eq!(result.final_state, None);
    assert_eq!(
        result.error,
        Some(ReconcileError::Timeout {
            operation: "task-1".into(),
            timeout_ms: 5000,
        })
    );
    assert_eq!(start.elapsed(), timeout);

    let polls = reconciler.store().polls();
    assert_eq!(polls.len(), 5);
    assert!(polls.iter().all(|p| p.duration_since(start) < timeout));
}

#[tokio::test(start_paused = true)]
async fn slow_status_check_is_cut_off_at_the_deadline() {
    let mut store = ScriptedStore::new(set(DrsBehavior::Manual));
    store.poll_delay = Duration::from_secs(10);
    let reconciler = Reconciler::new(store);
    let start = Instant::now();

    let result = reconciler
        .reconcile(
            "web-01",
            "fullyAutomated",
            Duration::from_secs(3),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result.error, Some(ReconcileError::Timeout { .. })));
    assert_eq!(start.elapsed(), Duration::from_secs(3));
    assert_eq!(reconciler.store().polls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn remote_failure_reports_message_and_previous_state() {
    let store = ScriptedStore::new(set(DrsBehavior::Manual)).with_script([
        OperationStatus::Running,
        OperationStatus::Failed {
            message: "Cluster is locked".into(),
        },
    ]);
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &CancellationToken::new())
        .await;

    assert!(!result.changed);
    assert_eq!(result.final_state, Some(DrsBehavior::Manual));
    assert_eq!(
        result.error,
        Some(ReconcileError::RemoteOperation {
            message: "Cluster is locked".into()
        })
    );
    assert_eq!(result.msg, "Failed to set DRS override: Cluster is locked");
    assert_eq!(reconciler.store().polls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_failure_on_disabled_override_has_no_final_state() {
    let store = ScriptedStore::new(OverrideState::Set {
        behavior: DrsBehavior::Manual,
        enabled: false,
    })
    .with_script([OperationStatus::Failed {
        message: "Cluster is locked".into(),
    }]);
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile("web-01", "manual", LONG, &CancellationToken::new())
        .await;

    assert!(!result.changed);
    assert_eq!(result.final_state, None);
    assert!(matches!(
        result.error,
        Some(ReconcileError::RemoteOperation { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn unbounded_timeout_still_converges() {
    let store = ScriptedStore::new(set(DrsBehavior::Manual))
        .with_script([OperationStatus::Running, OperationStatus::Succeeded]);
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile(
            "web-01",
            "fullyAutomated",
            Duration::MAX,
            &CancellationToken::new(),
        )
        .await;

    assert!(result.changed);
    assert_eq!(result.final_state, Some(DrsBehavior::FullyAutomated));
    assert_eq!(reconciler.store().polls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn huge_poll_interval_is_clipped_to_the_deadline() {
    let store = ScriptedStore::new(set(DrsBehavior::Manual));
    let reconciler = Reconciler::new(store)
        .with_poll_policy(PollPolicy::backoff(Duration::MAX, Duration::MAX));
    let start = Instant::now();

    let result = reconciler
        .reconcile(
            "web-01",
            "fullyAutomated",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result.error, Some(ReconcileError::Timeout { .. })));
    assert_eq!(
        offsets(start, &reconciler.store().polls()),
        vec![Duration::ZERO]
    );
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn status_check_failure_is_a_store_error() {
    let store = ScriptedStore::new(set(DrsBehavior::Manual));
    store
        .script
        .lock()
        .unwrap()
        .push_back(Err(CoreError::Timeout));
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &CancellationToken::new())
        .await;

    assert_eq!(
        result.error,
        Some(ReconcileError::Store {
            message: "Request timed out".into()
        })
    );
    assert_eq!(reconciler.store().polls().len(), 1);
}

// ── Preconditions ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unknown_behavior_never_touches_the_store() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));

    let result = reconciler
        .reconcile("web-01", "automatic", LONG, &CancellationToken::new())
        .await;

    assert!(!result.changed);
    assert_eq!(result.final_state, None);
    assert_eq!(
        result.error,
        Some(ReconcileError::InvalidState {
            value: "automatic".into(),
            allowed: vec![
                "manual".into(),
                "partiallyAutomated".into(),
                "fullyAutomated".into()
            ],
        })
    );
    assert_eq!(reconciler.store().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_vm_is_not_found() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));

    let result = reconciler
        .reconcile("db-07", "manual", LONG, &CancellationToken::new())
        .await;

    assert_eq!(
        result.error,
        Some(ReconcileError::NotFound {
            target: "db-07".into()
        })
    );
    assert_eq!(result.target, "db-07");
    assert!(reconciler.store().submits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn standalone_host_is_unsupported() {
    let mut store = ScriptedStore::new(set(DrsBehavior::Manual));
    store.authoritative = false;
    let reconciler = Reconciler::new(store);

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &CancellationToken::new())
        .await;

    assert!(matches!(
        result.error,
        Some(ReconcileError::UnsupportedContext { .. })
    ));
    assert!(reconciler.store().submits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_name_and_zero_timeout_are_rejected() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));
    let cancel = CancellationToken::new();

    let blank = reconciler.reconcile("  ", "manual", LONG, &cancel).await;
    assert!(matches!(
        blank.error,
        Some(ReconcileError::InvalidArgument { ref field, .. }) if field == "target"
    ));

    let instant = reconciler
        .reconcile("web-01", "manual", Duration::ZERO, &cancel)
        .await;
    assert!(matches!(
        instant.error,
        Some(ReconcileError::InvalidArgument { ref field, .. }) if field == "timeout"
    ));
    assert_eq!(reconciler.store().calls(), 0);
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_submits_nothing() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = reconciler
        .reconcile("web-01", "fullyAutomated", LONG, &cancel)
        .await;

    assert_eq!(result.error, Some(ReconcileError::Cancelled));
    assert_eq!(reconciler.store().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_while_waiting_stops_polling() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let (result, ()) = tokio::join!(
        reconciler.reconcile("web-01", "fullyAutomated", LONG, &cancel),
        async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            cancel.cancel();
        }
    );

    assert!(!result.changed);
    assert_eq!(result.final_state, None);
    assert_eq!(result.error, Some(ReconcileError::Cancelled));
    assert_eq!(start.elapsed(), Duration::from_millis(2500));
    assert_eq!(reconciler.store().submits().len(), 1);
    assert_eq!(reconciler.store().polls().len(), 3);
}

// ── Plan / inspect ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn plan_reports_action_without_submitting() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));

    let plan = reconciler.plan("web-01", "fullyAutomated").await.unwrap();
    assert_eq!(plan.action, Some(ChangeOperation::Edit));
    assert_eq!(plan.current, set(DrsBehavior::Manual));

    let noop = reconciler.plan("web-01", "manual").await.unwrap();
    assert!(noop.is_noop());
    assert!(!noop.into_result().changed);

    assert!(reconciler.store().submits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn plan_rejects_unknown_behavior() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));

    let err = reconciler.plan("web-01", "sometimes").await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidState { .. }));
    assert_eq!(reconciler.store().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn inspect_reads_current_override() {
    let reconciler = Reconciler::new(ScriptedStore::new(OverrideState::Unset));

    let inspection = reconciler.inspect("web-01").await.unwrap();
    assert_eq!(inspection.target, web01());
    assert!(inspection.state.is_unset());

    let missing = reconciler.inspect("db-07").await.unwrap_err();
    assert!(matches!(missing, ReconcileError::NotFound { .. }));
}

// ── Result shape ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn result_serializes_camel_case() {
    let reconciler = Reconciler::new(ScriptedStore::new(set(DrsBehavior::Manual)));

    let result = reconciler
        .reconcile("db-07", "manual", LONG, &CancellationToken::new())
        .await;

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!({
            "target": "db-07",
            "changed": false,
            "finalState": null,
            "error": { "kind": "NotFoundError", "target": "db-07" },
            "msg": "VM 'db-07' not found",
        })
    );
}

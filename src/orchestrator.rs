//! Batch apply orchestrator
//!
//! Drives one "save" of the pending edits through
//! `Idle → Validating → Submitting → Reconciling → (Restarting) → Idle`:
//!
//! 1. Nothing pending: report [`ApplyReport::NothingToSave`], no request.
//! 2. Any invalid edit: report [`ApplyReport::ValidationBlocked`], no request.
//! 3. Otherwise capture the edits by value, pinned to the active scope, and
//!    submit them as one batch while holding the single-flight guard.
//! 4. Invalidate and refetch the snapshot; never merge optimistically.
//! 5. Reconcile the per-parameter outcomes (see [`reconcile`]), restarting
//!    the scope first when any change needs it.
//!
//! The guard and the `Idle` state are restored by drop guards, so every exit
//! path (errors, panics, a dropped future) releases them.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backend::ConfigBackend;
use crate::editor::EditorState;
use crate::pending::ValidationError;
use crate::snapshot::SnapshotStore;
use crate::types::{BatchResponse, OutcomeKind, PendingBatch, Scope};
use crate::{PanelError, Result};

/// Default wait between a restart and the follow-up snapshot refresh.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Phase of the apply state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tauri", derive(specta::Type, serde::Serialize))]
pub enum ApplyState {
    #[default]
    Idle,
    Validating,
    Submitting,
    Reconciling,
    Restarting,
}

/// A parameter the daemon rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedParam {
    pub param: String,
    pub message: String,
}

/// How a batch response was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileKind {
    /// Every change is live
    AllApplied,
    /// At least one change needs a restart
    RestartRequired,
    /// Some changes were rejected
    Partial,
}

/// Result of reconciling a batch response against the pending edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub kind: ReconcileKind,
    pub applied: Vec<String>,
    pub restart_required: Vec<String>,
    pub failed: Vec<FailedParam>,
    /// Pending edits removed from the store
    pub cleared: usize,
    /// The active scope changed while the batch was in flight; the store was
    /// left alone
    pub scope_changed: bool,
}

/// User-facing result of one apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyReport {
    NothingToSave,
    ValidationBlocked { errors: Vec<ValidationError> },
    Applied { count: usize },
    PartiallyApplied { applied: Vec<String>, failed: Vec<FailedParam> },
    Restarted { count: usize, restart_required: Vec<String>, failed: Vec<FailedParam> },
    SavedRestartFailed { restart_required: Vec<String>, failed: Vec<FailedParam>, reason: String },
    ScopeChanged { submitted: Scope, active: Scope, count: usize },
}

/// Notification severity, matching the toast levels of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "tauri", derive(specta::Type, serde::Serialize))]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl ApplyReport {
    /// How prominently the report should be shown.
    pub fn severity(&self) -> Severity {
        match self {
            ApplyReport::NothingToSave | ApplyReport::ScopeChanged { .. } => Severity::Info,
            ApplyReport::ValidationBlocked { .. } => Severity::Error,
            ApplyReport::Applied { .. } => Severity::Success,
            ApplyReport::Restarted { failed, .. } if failed.is_empty() => Severity::Success,
            ApplyReport::Restarted { .. } => Severity::Warning,
            ApplyReport::PartiallyApplied { .. } | ApplyReport::SavedRestartFailed { .. } => {
                Severity::Warning
            }
        }
    }

    /// Message for the notification.
    pub fn message(&self) -> String {
        match self {
            ApplyReport::NothingToSave => "No changes to save".to_string(),
            ApplyReport::ValidationBlocked { .. } => {
                "Please fix validation errors before saving".to_string()
            }
            ApplyReport::Applied { count } => {
                format!("Successfully saved {} setting(s)", count)
            }
            ApplyReport::PartiallyApplied { applied, failed } => {
                format!("Saved {} setting(s); failed: {}", applied.len(), describe(failed))
            }
            ApplyReport::Restarted { count, failed, .. } if failed.is_empty() => {
                format!("Saved {} setting(s) and restarted the camera", count)
            }
            ApplyReport::Restarted { count, failed, .. } => format!(
                "Saved {} setting(s) and restarted the camera; failed: {}",
                count,
                describe(failed)
            ),
            ApplyReport::SavedRestartFailed { restart_required, failed, .. } => {
                let mut message = format!(
                    "Settings saved, but the restart failed. Restart manually to apply: {}",
                    restart_required.join(", ")
                );
                if !failed.is_empty() {
                    message.push_str(&format!("; failed: {}", describe(failed)));
                }
                message
            }
            ApplyReport::ScopeChanged { submitted, count, .. } => {
                format!("Saved {} setting(s) to {}", count, submitted)
            }
        }
    }

    /// Check if the daemon accepted at least part of the batch.
    pub fn saved_anything(&self) -> bool {
        match self {
            ApplyReport::NothingToSave | ApplyReport::ValidationBlocked { .. } => false,
            ApplyReport::PartiallyApplied { applied, .. } => !applied.is_empty(),
            _ => true,
        }
    }
}

fn describe(failed: &[FailedParam]) -> String {
    let names: Vec<String> = failed.iter().map(|f| format!("{} ({})", f.param, f.message)).collect();
    names.join(", ")
}

/// Check whether the editor may submit, capturing the batch if so.
///
/// Returns the report to surface instead when it may not.
pub fn preflight(editor: &EditorState) -> std::result::Result<PendingBatch, ApplyReport> {
    let pending = editor.pending();
    if !pending.is_dirty() {
        return Err(ApplyReport::NothingToSave);
    }
    if pending.has_errors() {
        return Err(ApplyReport::ValidationBlocked { errors: pending.errors() });
    }
    Ok(editor.capture())
}

/// Classify `response` and remove the reconciled edits from `editor`.
///
/// Priority order: no summary (all applied), any restart-required outcome
/// (all cleared), any rejection (only successes cleared), otherwise all
/// applied. An edit made after `batch` was captured is never removed. When
/// the active scope no longer matches `batch.scope` the store is untouched.
pub fn reconcile(
    editor: &mut EditorState,
    batch: &PendingBatch,
    response: &BatchResponse,
) -> Reconciliation {
    let mut applied = Vec::new();
    let mut restart_required = Vec::new();
    let mut failed = Vec::new();
    for outcome in &response.applied {
        match outcome.kind() {
            OutcomeKind::Applied => applied.push(outcome.param.clone()),
            OutcomeKind::RestartRequired => restart_required.push(outcome.param.clone()),
            OutcomeKind::Rejected(message) => failed.push(FailedParam {
                param: outcome.param.clone(),
                message: message.to_string(),
            }),
        }
    }

    let reported_errors = response.summary.map(|s| s.errors).unwrap_or(0);
    let kind = match response.summary {
        None => ReconcileKind::AllApplied,
        Some(_) if !restart_required.is_empty() => ReconcileKind::RestartRequired,
        Some(_) if reported_errors > 0 || !failed.is_empty() => ReconcileKind::Partial,
        Some(_) => ReconcileKind::AllApplied,
    };

    if response.summary.is_none() {
        applied = batch.changes.keys().cloned().collect();
    }

    let scope_changed = editor.scope() != batch.scope;
    let cleared = if scope_changed {
        0
    } else {
        let pending = editor.pending_mut();
        match kind {
            ReconcileKind::AllApplied | ReconcileKind::RestartRequired => {
                pending.remove_submitted(&batch.changes)
            }
            ReconcileKind::Partial => {
                let failed_names: HashSet<&str> = failed.iter().map(|f| f.param.as_str()).collect();
                let succeeded = applied
                    .iter()
                    .chain(&restart_required)
                    .map(String::as_str)
                    .filter(|name| !failed_names.contains(name));
                pending.remove_applied(succeeded, &batch.changes)
            }
        }
    };

    debug!(
        "Reconciled batch for {}: {:?}, {} applied, {} restart, {} failed, {} cleared",
        batch.scope,
        kind,
        applied.len(),
        restart_required.len(),
        failed.len(),
        cleared
    );

    Reconciliation { kind, applied, restart_required, failed, cleared, scope_changed }
}

/// Resets the published state to `Idle` when dropped.
struct IdleOnDrop<'a>(&'a watch::Sender<ApplyState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            let changed = *state != ApplyState::Idle;
            *state = ApplyState::Idle;
            changed
        });
    }
}

/// Single-flight executor for batch applies.
pub struct ApplyOrchestrator<B> {
    backend: B,
    settle_delay: Duration,
    flight: tokio::sync::Mutex<()>,
    state: watch::Sender<ApplyState>,
}

impl<B: ConfigBackend> ApplyOrchestrator<B> {
    /// Create an orchestrator over `backend`.
    pub fn new(backend: B) -> Self {
        let (state, _rx) = watch::channel(ApplyState::Idle);
        Self {
            backend,
            settle_delay: DEFAULT_SETTLE_DELAY,
            flight: tokio::sync::Mutex::new(()),
            state,
        }
    }

    /// Set the wait between a restart and the follow-up refresh.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// The backend this orchestrator submits to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current phase.
    pub fn state(&self) -> ApplyState {
        *self.state.borrow()
    }

    /// Receiver observing phase changes.
    pub fn subscribe(&self) -> watch::Receiver<ApplyState> {
        self.state.subscribe()
    }

    /// Check if an apply is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.flight.try_lock().is_err()
    }

    /// Run one apply of the edits in `editor`.
    ///
    /// # Errors
    ///
    /// - [`PanelError::InFlight`] if another apply is running; it is not
    ///   queued.
    /// - The backend's error if the submit request fails. The pending edits
    ///   are left exactly as they were.
    ///
    /// Remote rejections and restart failures are not errors; they are
    /// reported through [`ApplyReport`].
    pub async fn apply(
        &self,
        editor: &Mutex<EditorState>,
        snapshot: &SnapshotStore,
    ) -> Result<ApplyReport> {
        let _flight = self.flight.try_lock().map_err(|_| {
            debug!("Apply rejected: another apply is in flight");
            PanelError::InFlight
        })?;
        let _idle = IdleOnDrop(&self.state);

        let batch = {
            let editor = lock(editor);
            if editor.pending().is_dirty() {
                self.state.send_replace(ApplyState::Validating);
            }
            match preflight(&editor) {
                Ok(batch) => batch,
                Err(report) => {
                    debug!("Apply skipped: {}", report.message());
                    return Ok(report);
                }
            }
        };

        self.state.send_replace(ApplyState::Submitting);
        info!("Submitting {} change(s) to {}", batch.len(), batch.scope);
        let response = match self.backend.submit_batch(batch.scope, &batch.changes).await {
            Ok(response) => response,
            Err(e) => {
                error!("Batch submit to {} failed: {}", batch.scope, e);
                return Err(e);
            }
        };

        self.state.send_replace(ApplyState::Reconciling);
        self.refresh(snapshot).await;
        let reconciliation = reconcile(&mut lock(editor), &batch, &response);

        let report = match reconciliation.kind {
            ReconcileKind::RestartRequired => {
                self.state.send_replace(ApplyState::Restarting);
                self.restart(&batch, &reconciliation, snapshot).await
            }
            ReconcileKind::Partial => {
                warn!(
                    "{} of {} change(s) rejected by the daemon",
                    reconciliation.failed.len(),
                    batch.len()
                );
                ApplyReport::PartiallyApplied {
                    applied: reconciliation.applied.clone(),
                    failed: reconciliation.failed.clone(),
                }
            }
            ReconcileKind::AllApplied => ApplyReport::Applied { count: batch.len() },
        };

        if reconciliation.scope_changed && report.severity() != Severity::Warning {
            let active = lock(editor).scope();
            info!("Scope changed to {} while {} was being saved", active, batch.scope);
            return Ok(ApplyReport::ScopeChanged {
                submitted: batch.scope,
                active,
                count: batch.len(),
            });
        }
        Ok(report)
    }

    async fn restart(
        &self,
        batch: &PendingBatch,
        reconciliation: &Reconciliation,
        snapshot: &SnapshotStore,
    ) -> ApplyReport {
        let restart_required = reconciliation.restart_required.clone();
        let failed = reconciliation.failed.clone();
        let count = reconciliation.applied.len() + restart_required.len();
        info!("Restarting {} for: {}", batch.scope, restart_required.join(", "));
        if !failed.is_empty() {
            warn!("{} of {} change(s) rejected by the daemon", failed.len(), batch.len());
        }

        match self.backend.apply_restart(batch.scope).await {
            Ok(()) => {
                tokio::time::sleep(self.settle_delay).await;
                self.refresh(snapshot).await;
                ApplyReport::Restarted { count, restart_required, failed }
            }
            Err(e) => {
                warn!("Restart of {} failed after save: {}", batch.scope, e);
                ApplyReport::SavedRestartFailed { restart_required, failed, reason: e.to_string() }
            }
        }
    }

    async fn refresh(&self, snapshot: &SnapshotStore) {
        if let Err(e) = snapshot.refresh(&self.backend).await {
            warn!("Snapshot refresh failed, keeping stale snapshot: {}", e);
        }
    }
}

pub(crate) fn lock(editor: &Mutex<EditorState>) -> MutexGuard<'_, EditorState> {
    editor.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockBackend, fixture_snapshot};
    use crate::types::{ApplyOutcome, ParamValue};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn editor_with(scope: Scope, changes: &[(&str, ParamValue)]) -> EditorState {
        let mut editor = EditorState::new(scope);
        for (name, value) in changes {
            editor.set_change(*name, value.clone());
        }
        editor
    }

    fn setup(
        backend: &Arc<MockBackend>,
        editor: EditorState,
    ) -> (ApplyOrchestrator<Arc<MockBackend>>, Mutex<EditorState>, SnapshotStore) {
        let orchestrator =
            ApplyOrchestrator::new(Arc::clone(backend)).with_settle_delay(Duration::from_secs(2));
        (orchestrator, Mutex::new(editor), SnapshotStore::new(fixture_snapshot()))
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op() {
        let backend = Arc::new(MockBackend::new());
        let (orchestrator, editor, snapshot) = setup(&backend, EditorState::default());

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert_eq!(report, ApplyReport::NothingToSave);
        assert_eq!(backend.submit_count(), 0);
        assert_eq!(backend.fetch_count(), 0);
        assert_eq!(orchestrator.state(), ApplyState::Idle);
    }

    #[tokio::test]
    async fn invalid_edit_blocks_the_whole_batch() {
        let backend = Arc::new(MockBackend::new());
        let editor = editor_with(
            Scope::Default,
            &[("threshold", "abc".into()), ("stream_quality", 80.into())],
        );
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert!(matches!(report, ApplyReport::ValidationBlocked { ref errors } if errors.len() == 1));
        assert_eq!(backend.submit_count(), 0);
        assert!(lock(&editor).pending().has_errors());
        assert_eq!(lock(&editor).pending().len(), 2);
    }

    #[tokio::test]
    async fn full_success_clears_store_and_refetches_once() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![ApplyOutcome::applied(
            "stream_quality",
        )]));
        let editor = editor_with(Scope::Camera(2), &[("stream_quality", 80.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert_eq!(report, ApplyReport::Applied { count: 1 });
        assert!(!lock(&editor).pending().is_dirty());
        assert_eq!(backend.fetch_count(), 1);
        assert_eq!(backend.submitted()[0].0, Scope::Camera(2));
        assert!(!snapshot.is_stale());
    }

    #[tokio::test]
    async fn partial_failure_keeps_rejected_edit_verbatim() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![
            ApplyOutcome::applied("threshold"),
            ApplyOutcome::rejected("target_dir", "bad"),
        ]));
        let editor = editor_with(
            Scope::Default,
            &[("threshold", 2000.into()), ("target_dir", "/mnt/nope".into())],
        );
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert_eq!(report.severity(), Severity::Warning);
        assert!(report.message().contains("target_dir (bad)"));

        let editor = lock(&editor);
        assert_eq!(editor.pending().len(), 1);
        assert_eq!(editor.pending().get("target_dir"), Some(&ParamValue::from("/mnt/nope")));
        // Server errors do not become local validation errors
        assert!(!editor.pending().has_errors());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_required_clears_all_and_refetches_after_settle() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![
            ApplyOutcome::restart_required("movie_container"),
            ApplyOutcome::rejected("threshold", "nope"),
        ]));
        let editor = editor_with(
            Scope::Camera(1),
            &[("movie_container", "mp4".into()), ("threshold", 10.into())],
        );
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let started = tokio::time::Instant::now();
        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();

        assert_eq!(
            report,
            ApplyReport::Restarted {
                count: 1,
                restart_required: vec!["movie_container".to_string()],
                failed: vec![FailedParam { param: "threshold".to_string(), message: "nope".to_string() }],
            }
        );
        assert_eq!(report.severity(), Severity::Warning);
        assert!(report.message().contains("threshold (nope)"));
        assert!(!lock(&editor).pending().is_dirty());
        assert_eq!(backend.restarts(), vec![Scope::Camera(1)]);
        assert_eq!(backend.fetch_count(), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn clean_restart_reports_success() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![
            ApplyOutcome::restart_required("movie_container"),
            ApplyOutcome::applied("threshold"),
        ]));
        let editor = editor_with(
            Scope::Camera(1),
            &[("movie_container", "mp4".into()), ("threshold", 10.into())],
        );
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert!(matches!(report, ApplyReport::Restarted { count: 2, ref failed, .. } if failed.is_empty()));
        assert_eq!(report.severity(), Severity::Success);
    }

    #[tokio::test]
    async fn restart_failure_keeps_rejections_in_report() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![
            ApplyOutcome::restart_required("width"),
            ApplyOutcome::rejected("threshold", "out of range"),
        ]));
        backend.fail_restart("camera busy");
        let editor = editor_with(Scope::Camera(1), &[("width", 1280.into()), ("threshold", 10.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert!(matches!(report, ApplyReport::SavedRestartFailed { ref failed, .. }
            if failed.len() == 1 && failed[0].param == "threshold"));
        assert!(report.message().contains("threshold (out of range)"));
    }

    #[tokio::test]
    async fn no_op_apply_publishes_no_state_change() {
        let backend = Arc::new(MockBackend::new());
        let (orchestrator, editor, snapshot) = setup(&backend, EditorState::default());
        let rx = orchestrator.subscribe();

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert_eq!(report, ApplyReport::NothingToSave);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn restart_failure_does_not_resurrect_edits() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![ApplyOutcome::restart_required(
            "width",
        )]));
        backend.fail_restart("camera busy");
        let editor = editor_with(Scope::Camera(1), &[("width", 1280.into())]);
        let (orchestrator, editor, snapshot) =
            setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert!(matches!(report, ApplyReport::SavedRestartFailed { .. }));
        assert_eq!(report.severity(), Severity::Warning);
        assert!(!lock(&editor).pending().is_dirty());
        assert_eq!(backend.fetch_count(), 1);
        assert_eq!(orchestrator.state(), ApplyState::Idle);
    }

    #[tokio::test]
    async fn missing_summary_means_everything_applied() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::unstructured());
        let editor = editor_with(Scope::Default, &[("a", 1.into()), ("b", 2.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert_eq!(report, ApplyReport::Applied { count: 2 });
        assert!(!lock(&editor).pending().is_dirty());
    }

    #[tokio::test]
    async fn unreported_param_follows_batch_classification() {
        let backend = Arc::new(MockBackend::new());
        backend.push_response(BatchResponse::from_outcomes(vec![ApplyOutcome::applied("a")]));
        backend.push_response(BatchResponse::from_outcomes(vec![
            ApplyOutcome::applied("a"),
            ApplyOutcome::rejected("b", "bad"),
        ]));
        let editor = editor_with(Scope::Default, &[("a", 1.into()), ("c", 3.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        // Clean summary: the unreported "c" is cleared with the rest
        orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert!(!lock(&editor).pending().is_dirty());

        // Partial: only listed successes leave, so "c" stays
        for (name, value) in [("a", 1), ("b", 2), ("c", 3)] {
            lock(&editor).set_change(name, value);
        }
        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert!(matches!(report, ApplyReport::PartiallyApplied { .. }));
        let names: Vec<String> = lock(&editor).pending().snapshot().into_keys().collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn transport_failure_preserves_store_and_releases_lock() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next_submit("connection reset");
        let editor = editor_with(Scope::Default, &[("threshold", 2000.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let err = orchestrator.apply(&editor, &snapshot).await.unwrap_err();
        assert!(matches!(err, PanelError::Transport { .. }));
        assert_eq!(lock(&editor).pending().get("threshold"), Some(&ParamValue::from(2000)));
        assert_eq!(backend.fetch_count(), 0);
        assert!(!orchestrator.is_in_flight());
        assert_eq!(orchestrator.state(), ApplyState::Idle);

        // Next attempt goes through
        backend.push_response(BatchResponse::unstructured());
        let report = orchestrator.apply(&editor, &snapshot).await.unwrap();
        assert_eq!(report, ApplyReport::Applied { count: 1 });
    }

    #[tokio::test]
    async fn second_apply_while_in_flight_is_rejected() {
        let backend = Arc::new(MockBackend::new());
        let gate = backend.hold_submits();
        backend.push_response(BatchResponse::unstructured());
        let editor = editor_with(Scope::Default, &[("threshold", 2000.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let first = orchestrator.apply(&editor, &snapshot);
        let second = async {
            tokio::task::yield_now().await;
            let result = orchestrator.apply(&editor, &snapshot).await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), ApplyReport::Applied { count: 1 });
        assert!(matches!(second, Err(PanelError::InFlight)));
        assert_eq!(backend.submit_count(), 1);
    }

    #[tokio::test]
    async fn scope_switch_during_flight_leaves_new_scope_alone() {
        let backend = Arc::new(MockBackend::new());
        let gate = backend.hold_submits();
        backend.push_response(BatchResponse::unstructured());
        let editor = editor_with(Scope::Camera(1), &[("threshold", 2000.into())]);
        let (orchestrator, editor, snapshot) = setup(&backend, editor);

        let apply = orchestrator.apply(&editor, &snapshot);
        let switch = async {
            tokio::task::yield_now().await;
            let mut guard = lock(&editor);
            guard.switch_scope(Scope::Camera(2));
            guard.set_change("threshold", 3000);
            drop(guard);
            gate.notify_one();
        };
        let (report, ()) = tokio::join!(apply, switch);

        assert_eq!(
            report.unwrap(),
            ApplyReport::ScopeChanged { submitted: Scope::Camera(1), active: Scope::Camera(2), count: 1 }
        );
        assert_eq!(lock(&editor).pending().get("threshold"), Some(&ParamValue::from(3000)));
    }

    proptest! {
        #[test]
        fn any_restart_outcome_empties_the_store(
            n in 1usize..8,
            restart_at in 0usize..8,
            rejected in prop::collection::vec(any::<bool>(), 8),
        ) {
            let restart_at = restart_at % n;
            let mut editor = EditorState::new(Scope::Default);
            let mut outcomes = Vec::new();
            for i in 0..n {
                let name = format!("x_param_{}", i);
                editor.set_change(name.clone(), i as i64);
                outcomes.push(if i == restart_at {
                    ApplyOutcome::restart_required(name)
                } else if rejected[i] {
                    ApplyOutcome::rejected(name, "bad")
                } else {
                    ApplyOutcome::applied(name)
                });
            }
            let batch = editor.capture();
            let result = reconcile(&mut editor, &batch, &BatchResponse::from_outcomes(outcomes));

            prop_assert_eq!(result.kind, ReconcileKind::RestartRequired);
            prop_assert!(!editor.pending().is_dirty());
        }

        #[test]
        fn only_rejected_edits_survive(flags in prop::collection::vec(any::<bool>(), 1..10)) {
            let mut editor = EditorState::new(Scope::Default);
            let mut outcomes = Vec::new();
            for (i, reject) in flags.iter().enumerate() {
                let name = format!("x_param_{}", i);
                editor.set_change(name.clone(), i as i64);
                outcomes.push(if *reject {
                    ApplyOutcome::rejected(name, "bad")
                } else {
                    ApplyOutcome::applied(name)
                });
            }
            let batch = editor.capture();
            reconcile(&mut editor, &batch, &BatchResponse::from_outcomes(outcomes));

            for (i, reject) in flags.iter().enumerate() {
                let name = format!("x_param_{}", i);
                prop_assert_eq!(editor.pending().get(&name).is_some(), *reject);
                if *reject {
                    prop_assert_eq!(editor.pending().get(&name), Some(&ParamValue::from(i as i64)));
                }
            }
        }
    }
}

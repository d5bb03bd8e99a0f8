//! Configuration session: the entry point a settings UI talks to
//!
//! A [`ConfigSession`] owns the published snapshot, the editor state and
//! the apply orchestrator for one daemon. Edits are synchronous; only
//! [`apply`](ConfigSession::apply) and [`refresh`](ConfigSession::refresh)
//! touch the network.
//!
//! ```rust,no_run
//! use motionctl::{HttpBackend, MotionCtl, PanelConfig, Scope};
//!
//! # async fn run() -> motionctl::Result<()> {
//! let config = PanelConfig::new("http://motion.local:8080");
//! let session = MotionCtl::connect(HttpBackend::new(&config)?, &config).await?;
//!
//! session.select_scope(Scope::Camera(1))?;
//! session.set_change("threshold", 2500);
//! let report = session.apply().await?;
//! println!("{}", report.message());
//! # Ok(())
//! # }
//! ```

use futures::Stream;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::backend::ConfigBackend;
use crate::config::PanelConfig;
use crate::debounce::{DebouncedEdit, Debouncer};
use crate::editor::{EditorState, ScopeSwitch};
use crate::orchestrator::{ApplyOrchestrator, ApplyReport, ApplyState, lock};
use crate::pending::ValidationError;
use crate::snapshot::{ConfigSnapshot, SnapshotStore};
use crate::types::{ParamValue, Scope};
use crate::validation::Validation;
use crate::view::EffectiveView;
use crate::{PanelError, Result};

/// Snapshot, editor and apply engine for one daemon.
pub struct ConfigSession<B> {
    editor: Mutex<EditorState>,
    snapshot: SnapshotStore,
    orchestrator: ApplyOrchestrator<B>,
    config: PanelConfig,
}

impl<B: ConfigBackend> ConfigSession<B> {
    /// Fetch the initial snapshot and open a session on the default scope.
    pub async fn connect(backend: B, config: &PanelConfig) -> Result<Self> {
        let initial = backend.fetch_config().await?;
        info!(
            "Connected to {} (daemon {}, {} scope(s))",
            config.base_url,
            initial.version(),
            initial.scopes().len()
        );
        Ok(Self::with_snapshot(backend, initial, config))
    }

    /// Open a session over an already fetched snapshot.
    pub fn with_snapshot(backend: B, snapshot: ConfigSnapshot, config: &PanelConfig) -> Self {
        Self {
            editor: Mutex::new(EditorState::default()),
            snapshot: SnapshotStore::new(snapshot),
            orchestrator: ApplyOrchestrator::new(backend).with_settle_delay(config.settle_delay),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        self.orchestrator.backend()
    }

    /// Active scope.
    pub fn scope(&self) -> Scope {
        lock(&self.editor).scope()
    }

    /// Make `scope` active, discarding every pending edit if it differs.
    ///
    /// # Errors
    ///
    /// [`PanelError::InvalidScope`] if the snapshot has no such camera.
    pub fn select_scope(&self, scope: Scope) -> Result<ScopeSwitch> {
        if !self.snapshot.current().scopes().contains(&scope) {
            return Err(PanelError::InvalidScope { input: scope.to_string() });
        }
        Ok(lock(&self.editor).switch_scope(scope))
    }

    /// Record an edit in the active scope, returning its validation result.
    pub fn set_change(&self, name: impl Into<String>, value: impl Into<ParamValue>) -> Validation {
        lock(&self.editor).set_change(name, value)
    }

    /// Drop one pending edit.
    pub fn clear_change(&self, name: &str) -> Option<ParamValue> {
        lock(&self.editor).clear_change(name)
    }

    /// Throw away every pending edit.
    pub fn discard(&self) -> usize {
        let discarded = lock(&self.editor).discard();
        if discarded > 0 {
            info!("Changes discarded ({})", discarded);
        }
        discarded
    }

    pub fn is_dirty(&self) -> bool {
        lock(&self.editor).pending().is_dirty()
    }

    pub fn has_errors(&self) -> bool {
        lock(&self.editor).pending().has_errors()
    }

    /// Current validation errors, sorted by parameter.
    pub fn errors(&self) -> Vec<ValidationError> {
        lock(&self.editor).pending().errors()
    }

    /// Copy of the pending edits.
    pub fn pending(&self) -> BTreeMap<String, ParamValue> {
        lock(&self.editor).pending().snapshot()
    }

    /// Run `f` against the effective view of the active scope.
    ///
    /// The editor is locked for the duration of `f`; do not call back into
    /// the session from inside it.
    pub fn with_view<R>(&self, f: impl FnOnce(EffectiveView<'_>) -> R) -> R {
        let snapshot = self.snapshot.current();
        let editor = lock(&self.editor);
        f(editor.view(&snapshot))
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot.current()
    }

    /// Submit the pending edits as one batch and reconcile the outcome.
    pub async fn apply(&self) -> Result<ApplyReport> {
        self.orchestrator.apply(&self.editor, &self.snapshot).await
    }

    /// Refetch the snapshot. Pending edits are kept.
    pub async fn refresh(&self) -> Result<Arc<ConfigSnapshot>> {
        self.snapshot.refresh(self.orchestrator.backend()).await
    }

    /// Current apply phase.
    pub fn state(&self) -> ApplyState {
        self.orchestrator.state()
    }

    /// Receiver observing apply phase changes.
    pub fn state_updates(&self) -> watch::Receiver<ApplyState> {
        self.orchestrator.subscribe()
    }

    /// Stream of published snapshots, starting with the current one.
    pub fn snapshot_updates(&self) -> impl Stream<Item = Arc<ConfigSnapshot>> + 'static {
        self.snapshot.updates()
    }

    /// Debouncer using the configured quiet period. Feed its output to
    /// [`commit_debounced`](Self::commit_debounced).
    pub fn debouncer(&self) -> (Debouncer, mpsc::UnboundedReceiver<DebouncedEdit>) {
        Debouncer::new(self.config.debounce)
    }

    /// Record a debounced edit, unless it was made in a scope that is no
    /// longer active.
    pub fn commit_debounced(&self, edit: DebouncedEdit) -> Option<Validation> {
        let mut editor = lock(&self.editor);
        if editor.scope() != edit.scope {
            debug!("Dropping debounced {} from inactive scope {}", edit.name, edit.scope);
            return None;
        }
        Some(editor.set_change(edit.name, edit.value))
    }
}

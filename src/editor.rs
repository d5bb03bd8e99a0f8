//! Editor state and the scope switch guard
//!
//! [`EditorState`] is the owned state behind a settings form: the active
//! scope plus the pending edits made in it. Pending edits are not tagged
//! with a scope, so changing scope discards them before anything for the new
//! scope is displayed. The discard is unconditional and there is no undo.

use tracing::{debug, info};

use crate::pending::PendingChanges;
use crate::snapshot::ConfigSnapshot;
use crate::types::{ParamValue, PendingBatch, Scope};
use crate::validation::Validation;
use crate::view::EffectiveView;

/// Result of a scope change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSwitch {
    /// The requested scope was already active
    Unchanged,
    /// The scope changed and `discarded` pending edits were dropped
    Switched { discarded: usize },
}

/// Active scope plus the pending edits made in it.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    scope: Scope,
    pending: PendingChanges,
}

impl EditorState {
    /// Create an editor on `scope` with no pending edits.
    pub fn new(scope: Scope) -> Self {
        Self { scope, pending: PendingChanges::new() }
    }

    /// Currently active scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Pending edits.
    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    /// Mutable access to pending edits, for reconciliation.
    pub(crate) fn pending_mut(&mut self) -> &mut PendingChanges {
        &mut self.pending
    }

    /// Record an edit in the active scope.
    pub fn set_change(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Validation {
        self.pending.set_change(name, value)
    }

    /// Drop one edit.
    pub fn clear_change(&mut self, name: &str) -> Option<ParamValue> {
        self.pending.clear_change(name)
    }

    /// Make `scope` active, discarding every pending edit and error if it
    /// differs from the current one.
    pub fn switch_scope(&mut self, scope: Scope) -> ScopeSwitch {
        if scope == self.scope {
            return ScopeSwitch::Unchanged;
        }
        let discarded = self.pending.len();
        self.pending.clear_all();
        if discarded > 0 {
            info!("Scope {} -> {}: discarded {} pending change(s)", self.scope, scope, discarded);
        } else {
            debug!("Scope {} -> {}", self.scope, scope);
        }
        self.scope = scope;
        ScopeSwitch::Switched { discarded }
    }

    /// Explicitly throw away every pending edit. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear_all();
        discarded
    }

    /// Capture the pending edits by value, pinned to the active scope.
    pub fn capture(&self) -> PendingBatch {
        PendingBatch { scope: self.scope, changes: self.pending.snapshot() }
    }

    /// View of what the form should display against `snapshot`.
    pub fn view<'a>(&'a self, snapshot: &'a ConfigSnapshot) -> EffectiveView<'a> {
        EffectiveView::new(snapshot, self.scope, &self.pending)
    }
}

//! Batch submission wire types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ParamValue, Scope};

/// A captured set of pending changes, pinned to the scope it was edited in.
///
/// Captured by value at submission time; later edits do not reach it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PendingBatch {
    /// Scope the batch is submitted to
    pub scope: Scope,
    /// Parameter name to edited value
    pub changes: BTreeMap<String, ParamValue>,
}

impl PendingBatch {
    /// Number of parameters in the batch.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if the batch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Request body for the batch endpoint.
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub changes: &'a BTreeMap<String, ParamValue>,
}

/// Aggregate counts reported by the daemon for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: u32,
    pub success: u32,
    pub errors: u32,
}

/// Result for one submitted parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_reload: Option<bool>,
}

/// How a single outcome is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind<'a> {
    /// Accepted and live
    Applied,
    /// Accepted but inert until a restart
    RestartRequired,
    /// Rejected by the daemon with a message
    Rejected(&'a str),
}

impl ApplyOutcome {
    /// An outcome for a parameter that was applied immediately.
    pub fn applied(param: impl Into<String>) -> Self {
        Self { param: param.into(), ..Self::default() }
    }

    /// An outcome for a parameter that needs a restart.
    pub fn restart_required(param: impl Into<String>) -> Self {
        Self { param: param.into(), error: None, hot_reload: Some(false) }
    }

    /// An outcome for a rejected parameter.
    pub fn rejected(param: impl Into<String>, error: impl Into<String>) -> Self {
        Self { param: param.into(), error: Some(error.into()), hot_reload: None }
    }

    /// Classify this outcome. An error always wins over `hot_reload`.
    pub fn kind(&self) -> OutcomeKind<'_> {
        match (&self.error, self.hot_reload) {
            (Some(message), _) => OutcomeKind::Rejected(message),
            (None, Some(false)) => OutcomeKind::RestartRequired,
            (None, _) => OutcomeKind::Applied,
        }
    }
}

/// Response body of the batch endpoint.
///
/// A missing `summary` is a valid response meaning every change succeeded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
    #[serde(default)]
    pub applied: Vec<ApplyOutcome>,
}

impl BatchResponse {
    /// Response with no structured summary.
    pub fn unstructured() -> Self {
        Self::default()
    }

    /// Build a structured response from outcomes, deriving the summary.
    pub fn from_outcomes(applied: Vec<ApplyOutcome>) -> Self {
        let errors = applied.iter().filter(|o| o.error.is_some()).count() as u32;
        let total = applied.len() as u32;
        Self {
            summary: Some(BatchSummary { total, success: total - errors, errors }),
            applied,
        }
    }
}

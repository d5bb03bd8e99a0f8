//! Test utilities: a scripted in-memory backend and snapshot fixtures
//!
//! [`MockBackend`] records every request it receives and answers from a
//! script, so apply flows can be driven without a daemon.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

use crate::backend::ConfigBackend;
use crate::snapshot::ConfigSnapshot;
use crate::types::{BatchResponse, ParamValue, Parameter, Scope};
use crate::{PanelError, Result};

/// Snapshot with a default scope and two cameras, one of them overriding a
/// few detection parameters.
pub fn fixture_snapshot() -> ConfigSnapshot {
    ConfigSnapshot::from_parts(
        [
            Parameter::new("threshold", 1500),
            Parameter::new("stream_quality", 50),
            Parameter::new("movie_container", "mkv"),
            Parameter::new("width", 640),
            Parameter::new("target_dir", "/var/lib/motion"),
        ],
        [
            (1, Vec::new()),
            (2, vec![Parameter::new("threshold", 3000), Parameter::new("width", 1280)]),
        ],
    )
}

/// Snapshot with `count` default parameters, for benchmarks.
pub fn large_snapshot(count: usize, cameras: u32) -> ConfigSnapshot {
    let defaults = (0..count).map(|i| Parameter::new(format!("param_{}", i), i as i64));
    let overrides = (1..=cameras).map(|id| {
        let params = (0..count)
            .step_by(3)
            .map(|i| Parameter::new(format!("param_{}", i), (i as i64) * 10))
            .collect();
        (id, params)
    });
    ConfigSnapshot::from_parts(defaults, overrides)
}

#[derive(Default)]
struct Script {
    snapshot: Option<ConfigSnapshot>,
    responses: VecDeque<BatchResponse>,
    submit_failure: Option<String>,
    fetch_failure: Option<String>,
    restart_failure: Option<String>,
    gate: Option<Arc<Notify>>,
    submitted: Vec<(Scope, BTreeMap<String, ParamValue>)>,
    restarts: Vec<Scope>,
    fetches: usize,
}

/// In-memory [`ConfigBackend`] answering from a script.
///
/// Fetches return [`fixture_snapshot`] unless replaced; submits pop the next
/// scripted response, defaulting to an unstructured success.
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<Script>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `snapshot` from subsequent fetches.
    pub fn set_snapshot(&self, snapshot: ConfigSnapshot) {
        self.script().snapshot = Some(snapshot);
    }

    /// Queue the response for the next submit.
    pub fn push_response(&self, response: BatchResponse) {
        self.script().responses.push_back(response);
    }

    /// Make the next submit fail with a transport error.
    pub fn fail_next_submit(&self, reason: &str) {
        self.script().submit_failure = Some(reason.to_string());
    }

    /// Make the next fetch fail with a transport error.
    pub fn fail_next_fetch(&self, reason: &str) {
        self.script().fetch_failure = Some(reason.to_string());
    }

    /// Make every restart fail.
    pub fn fail_restart(&self, reason: &str) {
        self.script().restart_failure = Some(reason.to_string());
    }

    /// Block submits until the returned handle is notified once per submit.
    pub fn hold_submits(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script().gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn fetch_count(&self) -> usize {
        self.script().fetches
    }

    pub fn submit_count(&self) -> usize {
        self.script().submitted.len()
    }

    /// Every batch submitted so far, in order.
    pub fn submitted(&self) -> Vec<(Scope, BTreeMap<String, ParamValue>)> {
        self.script().submitted.clone()
    }

    /// Every scope restarted so far, in order.
    pub fn restarts(&self) -> Vec<Scope> {
        self.script().restarts.clone()
    }
}

#[async_trait::async_trait]
impl ConfigBackend for MockBackend {
    async fn fetch_config(&self) -> Result<ConfigSnapshot> {
        let mut script = self.script();
        script.fetches += 1;
        if let Some(reason) = script.fetch_failure.take() {
            return Err(PanelError::transport(reason));
        }
        Ok(script.snapshot.clone().unwrap_or_else(fixture_snapshot))
    }

    async fn submit_batch(
        &self,
        scope: Scope,
        changes: &BTreeMap<String, ParamValue>,
    ) -> Result<BatchResponse> {
        let gate = {
            let mut script = self.script();
            script.submitted.push((scope, changes.clone()));
            script.gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut script = self.script();
        if let Some(reason) = script.submit_failure.take() {
            return Err(PanelError::transport(reason));
        }
        Ok(script.responses.pop_front().unwrap_or_else(BatchResponse::unstructured))
    }

    async fn apply_restart(&self, scope: Scope) -> Result<()> {
        let mut script = self.script();
        script.restarts.push(scope);
        match &script.restart_failure {
            Some(reason) => Err(PanelError::restart_failed(scope.to_string(), reason.clone())),
            None => Ok(()),
        }
    }
}

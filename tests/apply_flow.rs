//! End-to-end apply flows through the public session API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use motionctl::{
    ApplyOutcome, ApplyReport, ApplyState, BatchResponse, ConfigBackend, ConfigSession,
    ConfigSnapshot, MotionCtl, PanelConfig, PanelError, ParamValue, Scope, Severity,
};
use tokio::time::Instant;

const DOCUMENT: &str = r#"{
    "csrf_token": "t0",
    "version": "5.0.1",
    "cameras": {
        "count": 2,
        "1": {"id": 1, "name": "Driveway"},
        "2": {"id": 2, "name": "Garden"}
    },
    "configuration": {
        "default": {
            "stream_quality": {"value": 50, "category": 9, "type": "number"},
            "movie_container": {"value": "mkv", "category": 7, "type": "list",
                                "list": ["mkv", "mp4", "webm"]},
            "threshold": {"value": 1500, "category": 5, "type": "number"}
        },
        "cam2": {
            "stream_quality": {"value": 60, "category": 9, "type": "number"}
        }
    }
}"#;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch(Instant),
    Submit(Scope, BTreeMap<String, ParamValue>),
    Restart(Scope),
}

#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<Vec<BatchResponse>>,
}

impl RecordingBackend {
    fn respond_with(&self, response: BatchResponse) {
        self.responses.lock().unwrap().push(response);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn fetches(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fetch(at) => Some(at),
                _ => None,
            })
            .collect()
    }

    fn network_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ConfigBackend for RecordingBackend {
    async fn fetch_config(&self) -> motionctl::Result<ConfigSnapshot> {
        self.calls.lock().unwrap().push(Call::Fetch(Instant::now()));
        ConfigSnapshot::from_json(DOCUMENT)
    }

    async fn submit_batch(
        &self,
        scope: Scope,
        changes: &BTreeMap<String, ParamValue>,
    ) -> motionctl::Result<BatchResponse> {
        self.calls.lock().unwrap().push(Call::Submit(scope, changes.clone()));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(PanelError::transport("no scripted response"));
        }
        Ok(responses.remove(0))
    }

    async fn apply_restart(&self, scope: Scope) -> motionctl::Result<()> {
        self.calls.lock().unwrap().push(Call::Restart(scope));
        Ok(())
    }
}

async fn open(settle_delay: Duration) -> (Arc<RecordingBackend>, ConfigSession<Arc<RecordingBackend>>) {
    let backend = Arc::new(RecordingBackend::default());
    let config = PanelConfig { settle_delay, ..PanelConfig::new("http://motion.test") };
    let session = MotionCtl::connect(Arc::clone(&backend), &config).await.unwrap();
    (backend, session)
}

#[tokio::test]
async fn hot_reload_success_on_camera_scope() {
    let (backend, session) = open(Duration::from_secs(3)).await;
    session.select_scope(Scope::Camera(2)).unwrap();
    assert!(session.set_change("stream_quality", 80).is_valid());

    backend.respond_with(BatchResponse::from_outcomes(vec![ApplyOutcome::applied("stream_quality")]));
    let report = session.apply().await.unwrap();

    assert_eq!(report, ApplyReport::Applied { count: 1 });
    assert_eq!(report.severity(), Severity::Success);
    assert!(!session.is_dirty());

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(&calls[1], Call::Submit(Scope::Camera(2), changes)
        if changes["stream_quality"] == ParamValue::from(80)));
    assert!(matches!(calls[2], Call::Fetch(_)));
}

#[tokio::test(start_paused = true)]
async fn restart_required_change_restarts_and_refetches_after_settle() {
    let settle = Duration::from_secs(3);
    let (backend, session) = open(settle).await;
    session.select_scope(Scope::Camera(1)).unwrap();
    session.set_change("movie_container", "mp4");

    backend.respond_with(BatchResponse::from_outcomes(vec![ApplyOutcome::restart_required(
        "movie_container",
    )]));
    let report = session.apply().await.unwrap();

    assert!(matches!(report, ApplyReport::Restarted { ref restart_required, .. }
        if restart_required == &["movie_container".to_string()]));
    assert!(!session.is_dirty());
    assert!(backend.calls().contains(&Call::Restart(Scope::Camera(1))));

    // Connect fetch, post-submit fetch, post-restart fetch
    let fetches = backend.fetches();
    assert_eq!(fetches.len(), 3);
    assert!(fetches[2] - fetches[1] >= settle);
    assert_eq!(session.state(), ApplyState::Idle);
}

#[tokio::test]
async fn invalid_edit_never_reaches_the_network() {
    let (backend, session) = open(Duration::from_secs(3)).await;
    let before = backend.network_calls();

    assert!(!session.set_change("threshold", "abc").is_valid());
    let report = session.apply().await.unwrap();

    assert!(matches!(report, ApplyReport::ValidationBlocked { .. }));
    assert_eq!(report.message(), "Please fix validation errors before saving");
    assert!(session.has_errors());
    assert_eq!(backend.network_calls(), before);
}

#[tokio::test]
async fn empty_apply_is_a_no_op() {
    let (backend, session) = open(Duration::from_secs(3)).await;
    let before = backend.network_calls();

    let report = session.apply().await.unwrap();
    assert_eq!(report.message(), "No changes to save");
    assert_eq!(backend.network_calls(), before);
}

#[tokio::test]
async fn partial_rejection_keeps_only_the_rejected_edit() {
    let (backend, session) = open(Duration::from_secs(3)).await;
    session.set_change("threshold", 2000);
    session.set_change("stream_quality", 90);

    backend.respond_with(BatchResponse::from_outcomes(vec![
        ApplyOutcome::applied("threshold"),
        ApplyOutcome::rejected("stream_quality", "bad"),
    ]));
    let report = session.apply().await.unwrap();

    assert!(matches!(report, ApplyReport::PartiallyApplied { .. }));
    let pending = session.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending["stream_quality"], ParamValue::from(90));
}

#[tokio::test]
async fn transport_failure_keeps_edits_for_retry() {
    let (backend, session) = open(Duration::from_secs(3)).await;
    session.set_change("threshold", 2000);

    // No scripted response: the backend fails the submit
    let err = session.apply().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.pending()["threshold"], ParamValue::from(2000));

    backend.respond_with(BatchResponse::unstructured());
    assert_eq!(session.apply().await.unwrap(), ApplyReport::Applied { count: 1 });
    assert!(!session.is_dirty());
}

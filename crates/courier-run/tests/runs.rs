//! Submission-to-terminal-state runs over the fake session backend.

use courier_run::{
    work_queue, EvidenceSink, FsEvidenceSink, ListingTarget, Manifest, NullEvidenceSink,
    Orchestrator, Run, RunStatus, RunStore, TerminalNotifier, Worker,
};
use courier_session::{SessionConfig, SessionManager};
use courier_test_utils::{fresh_storage_state, write_artifact, Behavior, FakeBackend};
use courier_workflow::{ErrorCode, PageMap, WorkflowConfig, WorkflowDriver};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn manifest() -> Manifest {
    Manifest {
        listing: ListingTarget {
            edit_url: "https://platform.example/listings/42/edit".to_string(),
            listing_id: Some("42".to_string()),
        },
        floorplan_urls: vec![
            "https://cdn.example.com/plans/ground.pdf".to_string(),
            "https://cdn.example.com/plans/ground.pdf?cache=1".to_string(),
        ],
        file_urls: vec!["https://cdn.example.com/docs/brochure.pdf".to_string()],
        tour_url: Some("https://tours.example.com/42".to_string()),
        deliver_after_attach: true,
        callback: None,
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notified: Mutex<Vec<(String, RunStatus)>>,
}

#[async_trait::async_trait]
impl TerminalNotifier for RecordingNotifier {
    async fn notify(&self, run: &Run) {
        self.notified
            .lock()
            .unwrap()
            .push((run.run_id.to_string(), run.status));
    }
}

struct Harness {
    orchestrator: Orchestrator,
    backend: Arc<FakeBackend>,
    notifier: Arc<RecordingNotifier>,
    _artifact: tempfile::NamedTempFile,
}

fn harness_with(
    behavior: Behavior,
    artifact_path: Option<&Path>,
    evidence: Arc<dyn EvidenceSink>,
) -> Harness {
    let artifact = write_artifact(&fresh_storage_state());
    let path = artifact_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| artifact.path().to_path_buf());

    let backend = Arc::new(FakeBackend::new(behavior));
    let sessions = SessionManager::new(backend.clone(), path, SessionConfig::default());
    let store = RunStore::default();
    let (queue, receiver) = work_queue(16, Duration::from_secs(60));
    let notifier = Arc::new(RecordingNotifier::default());

    let worker = Worker::new(
        store.clone(),
        sessions,
        WorkflowDriver::new(PageMap::default(), WorkflowConfig::fast()),
        evidence,
        notifier.clone(),
    );
    tokio::spawn(worker.run(receiver));

    Harness {
        orchestrator: Orchestrator::new(store, queue),
        backend,
        notifier,
        _artifact: artifact,
    }
}

fn harness(behavior: Behavior) -> Harness {
    harness_with(behavior, None, Arc::new(NullEvidenceSink))
}

async fn wait_terminal(orchestrator: &Orchestrator, run_id: courier_run::RunId) -> Run {
    for _ in 0..1000 {
        if let Some(run) = orchestrator.get(run_id) {
            if run.status.is_terminal() {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run never reached a terminal state");
}

#[tokio::test(start_paused = true)]
async fn successful_run_reaches_succeeded_with_verified_actions() {
    let h = harness(Behavior::default());

    let outcome = h.orchestrator.submit(manifest()).unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.status, RunStatus::Queued);

    let run = wait_terminal(&h.orchestrator, outcome.run_id).await;
    assert_eq!(run.status, RunStatus::Succeeded);
    assert!(run.actions_performed.imported_floorplans);
    assert!(run.actions_performed.imported_files);
    assert!(run.actions_performed.added_tour);
    assert!(run.actions_performed.saved);
    assert!(run.actions_performed.delivered);
    assert!(run.started_at.is_some());
    assert!(run.completed_at.is_some());
    assert!(!run.progress.is_empty());
    assert_eq!(run.error, None);

    let floorplans = run.floorplans.expect("floorplan batch reported");
    assert_eq!(floorplans.duplicates_removed, 1);

    // session always released
    let pages = h.backend.launched();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].was_closed());

    let notified = h.notifier.notified.lock().unwrap();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0], (run.run_id.to_string(), RunStatus::Succeeded));
}

#[tokio::test(start_paused = true)]
async fn workflow_failure_closes_session_and_reports_error() {
    let h = harness(Behavior {
        commit_never_ready: true,
        ..Behavior::default()
    });

    let outcome = h.orchestrator.submit(manifest()).unwrap();
    let run = wait_terminal(&h.orchestrator, outcome.run_id).await;

    assert_eq!(run.status, RunStatus::Failed);
    let error = run.error.expect("structured error");
    assert_eq!(error.code, ErrorCode::ActionFailed);
    assert!(error.retryable);
    assert!(!run.actions_performed.imported_floorplans);

    let pages = h.backend.launched();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].was_closed());

    let notified = h.notifier.notified.lock().unwrap();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].1, RunStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn missing_artifact_fails_with_auth_required() {
    let h = harness_with(
        Behavior::default(),
        Some(Path::new("/nonexistent/state.json")),
        Arc::new(NullEvidenceSink),
    );

    let outcome = h.orchestrator.submit(manifest()).unwrap();
    let run = wait_terminal(&h.orchestrator, outcome.run_id).await;

    assert_eq!(run.status, RunStatus::Failed);
    let error = run.error.expect("structured error");
    assert_eq!(error.code, ErrorCode::AuthRequired);
    assert!(!error.retryable);
    // no session was ever launched
    assert!(h.backend.launched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_artifact_fails_with_auth_required() {
    let artifact = write_artifact(&courier_test_utils::expired_storage_state());
    let h = harness_with(
        Behavior::default(),
        Some(artifact.path()),
        Arc::new(NullEvidenceSink),
    );

    let outcome = h.orchestrator.submit(manifest()).unwrap();
    let run = wait_terminal(&h.orchestrator, outcome.run_id).await;

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error.unwrap().code, ErrorCode::AuthRequired);
}

#[tokio::test(start_paused = true)]
async fn resubmission_during_execution_creates_no_second_job() {
    let h = harness(Behavior::default());

    let first = h.orchestrator.submit(manifest()).unwrap();
    let second = h.orchestrator.submit(manifest()).unwrap();
    assert!(!second.created);
    assert_eq!(second.run_id, first.run_id);

    wait_terminal(&h.orchestrator, first.run_id).await;

    // exactly one session, one notification
    assert_eq!(h.backend.launched().len(), 1);
    assert_eq!(h.notifier.notified.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_evidence_lands_on_disk_and_in_the_run() {
    let evidence_dir = tempfile::tempdir().unwrap();
    let h = harness_with(
        Behavior {
            commit_never_ready: true,
            ..Behavior::default()
        },
        None,
        Arc::new(FsEvidenceSink::new(evidence_dir.path())),
    );

    let outcome = h.orchestrator.submit(manifest()).unwrap();
    let run = wait_terminal(&h.orchestrator, outcome.run_id).await;

    assert_eq!(run.status, RunStatus::Failed);
    assert!(!run.evidence.is_empty());
    for handle in &run.evidence {
        assert!(Path::new(handle).exists(), "missing evidence file {handle}");
    }
}

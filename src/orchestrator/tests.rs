use super::*;
use crate::analysis::{AnalysisStatus, DataSource, StoredAnalysisRecord};
use crate::error::Result as RecapResult;
use crate::remote::TranscriptCleaner;
use crate::store::MemoryAnalysisStore;
use async_trait::async_trait;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;
use tokio::sync::Notify;

// ============================================================================
// Fakes
// ============================================================================

struct FakeRemote {
    transcript: std::result::Result<String, RemoteError>,
    transcript_delay: Option<Duration>,
    metadata: std::result::Result<MediaMetadata, RemoteError>,
    metadata_delay: Option<Duration>,
    analysis: std::result::Result<AnalysisResult, RemoteError>,
    analysis_delay: Option<Duration>,
    hold_analysis: bool,
    analysis_entered: Notify,
    release_analysis: Notify,
    transcript_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl FakeRemote {
    fn new() -> Self {
        Self {
            transcript: Ok("Hello world".to_string()),
            transcript_delay: None,
            metadata: Ok(MediaMetadata {
                original_file_name: Some("meeting.mp3".to_string()),
            }),
            metadata_delay: None,
            analysis: Ok(analysis("S")),
            analysis_delay: None,
            hold_analysis: false,
            analysis_entered: Notify::new(),
            release_analysis: Notify::new(),
            transcript_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn transcript_calls(&self) -> usize {
        self.transcript_calls.load(Ordering::SeqCst)
    }

    fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    fn analysis_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscriptSource for FakeRemote {
    async fn fetch_transcript(&self, _id: &ResourceId) -> std::result::Result<String, RemoteError> {
        self.transcript_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.transcript_delay {
            tokio::time::sleep(delay).await;
        }
        self.transcript.clone()
    }
}

#[async_trait]
impl MetadataSource for FakeRemote {
    async fn fetch_metadata(&self, _id: &ResourceId) -> std::result::Result<MediaMetadata, RemoteError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.metadata_delay {
            tokio::time::sleep(delay).await;
        }
        self.metadata.clone()
    }
}

#[async_trait]
impl AnalysisService for FakeRemote {
    async fn analyze(&self, request: &AnalysisRequest) -> std::result::Result<AnalysisResult, RemoteError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.hold_analysis {
            self.analysis_entered.notify_one();
            self.release_analysis.notified().await;
        }
        if let Some(delay) = self.analysis_delay {
            tokio::time::sleep(delay).await;
        }
        self.analysis.clone()
    }
}

#[derive(Default)]
struct CountingStore {
    inner: MemoryAnalysisStore,
    reads: AtomicUsize,
    upserts: AtomicUsize,
    fail_upserts: bool,
    /// Reads never complete.
    stall_reads: bool,
    upsert_delay: Option<Duration>,
}

impl CountingStore {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisStore for CountingStore {
    async fn read(&self, id: &ResourceId) -> RecapResult<Option<StoredAnalysisRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.stall_reads {
            std::future::pending::<()>().await;
        }
        self.inner.read(id).await
    }

    async fn upsert(&self, id: &ResourceId, fields: AnalysisFields) -> RecapResult<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.upsert_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_upserts {
            return Err(crate::error::RecapError::Store("disk full".to_string()));
        }
        self.inner.upsert(id, fields).await
    }

    async fn list(&self) -> RecapResult<Vec<StoredAnalysisRecord>> {
        self.inner.list().await
    }
}

#[derive(Default)]
struct FakeCleaner {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeCleaner {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptCleaner for FakeCleaner {
    async fn delete_transcript(&self, _id: &ResourceId) -> std::result::Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(RemoteError::Transport("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    remote: Arc<FakeRemote>,
    store: Arc<CountingStore>,
    cleaner: Arc<FakeCleaner>,
    cleanup: CleanupQueue,
    notifier: Notifier,
}

impl Harness {
    fn new(remote: FakeRemote, store: CountingStore, cleaner: FakeCleaner) -> Self {
        let cleaner = Arc::new(cleaner);
        Self {
            remote: Arc::new(remote),
            store: Arc::new(store),
            cleanup: CleanupQueue::start(cleaner.clone()),
            cleaner,
            notifier: Notifier::new(),
        }
    }

    fn with_remote(remote: FakeRemote) -> Self {
        Self::new(remote, CountingStore::default(), FakeCleaner::default())
    }

    fn services(&self) -> Collaborators {
        Collaborators {
            transcripts: self.remote.clone(),
            metadata: self.remote.clone(),
            analysis: self.remote.clone(),
            store: self.store.clone(),
        }
    }

    fn options(authenticated: bool) -> OrchestratorOptions {
        OrchestratorOptions {
            authenticated,
            ..Default::default()
        }
    }

    fn orchestrator(&self, id: &str, authenticated: bool) -> Arc<AnalysisOrchestrator> {
        AnalysisOrchestrator::new(
            ResourceId::new(id),
            self.services(),
            self.cleanup.clone(),
            self.notifier.clone(),
            Self::options(authenticated),
        )
    }

    fn session(&self, authenticated: bool) -> AnalysisSession {
        AnalysisSession::new(
            self.services(),
            self.cleanup.clone(),
            self.notifier.clone(),
            Self::options(authenticated),
        )
    }
}

fn analysis(summary: &str) -> AnalysisResult {
    AnalysisResult {
        summary: summary.to_string(),
        key_points: vec!["K1".to_string()],
        ..Default::default()
    }
}

fn stored(id: &str, summary: &str) -> StoredAnalysisRecord {
    StoredAnalysisRecord {
        resource_id: id.to_string(),
        title: Some("Stored title".to_string()),
        summary: Some(summary.to_string()),
        key_points: Some(vec!["Stored point".to_string()]),
        ..Default::default()
    }
}

// ============================================================================
// Cache reconciliation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stored_analysis_short_circuits_pipeline() {
    let harness = Harness::with_remote(FakeRemote::new());
    harness.store.inner.insert_record(stored("abc123", "Stored summary")).unwrap();

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert_eq!(snapshot.data_source(), DataSource::Database);
    assert_eq!(snapshot.current_step(), 3);
    assert!(snapshot.show_results());
    assert!(!snapshot.processing());

    let result = snapshot.result().unwrap();
    assert_eq!(result.summary, "Stored summary");
    assert_eq!(result.key_points, vec!["Stored point"]);

    assert_eq!(harness.remote.transcript_calls(), 0);
    assert_eq!(harness.remote.metadata_calls(), 0);
    assert_eq!(harness.remote.analysis_calls(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.store.upserts(), 0);
    assert_eq!(harness.cleaner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_waits_for_settle_delay() {
    let harness = Harness::with_remote(FakeRemote::new());
    harness.store.inner.insert_record(stored("abc123", "Stored summary")).unwrap();

    let orchestrator = harness.orchestrator("abc123", false);
    let handle = orchestrator.activate();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Completed);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Ready);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_placeholder_record_runs_pipeline() {
    let harness = Harness::with_remote(FakeRemote::new());
    harness.store.inner.insert_record(stored("abc123", "Processing...")).unwrap();

    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert_eq!(snapshot.data_source(), DataSource::Api);
    assert_eq!(snapshot.result().unwrap().summary, "S");
    assert_eq!(harness.remote.transcript_calls(), 1);
    assert_eq!(harness.remote.analysis_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_stored_summary_runs_pipeline() {
    let harness = Harness::with_remote(FakeRemote::new());
    harness.store.inner.insert_record(stored("abc123", "")).unwrap();

    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    assert_eq!(orchestrator.snapshot().data_source(), DataSource::Api);
    assert_eq!(harness.remote.transcript_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_read_runs_pipeline() {
    let store = CountingStore {
        stall_reads: true,
        ..Default::default()
    };
    let harness = Harness::new(FakeRemote::new(), store, FakeCleaner::default());

    let orchestrator = harness.orchestrator("abc123", false);
    let handle = orchestrator.activate();

    tokio::time::sleep(Duration::from_secs(44)).await;
    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Loading);
    assert_eq!(harness.remote.transcript_calls(), 0);

    handle.await.unwrap();

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert_eq!(snapshot.data_source(), DataSource::Api);
    assert_eq!(harness.store.reads(), 1);
    assert_eq!(harness.remote.transcript_calls(), 1);
    assert_eq!(harness.remote.analysis_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_runs_once() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", false);

    tokio::join!(
        orchestrator.reconcile(),
        orchestrator.reconcile(),
        orchestrator.reconcile()
    );
    orchestrator.reconcile().await;
    orchestrator.activate().await.unwrap();

    assert_eq!(harness.store.reads(), 1);
    assert_eq!(harness.remote.transcript_calls(), 1);
    assert_eq!(harness.remote.analysis_calls(), 1);
    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Ready);
}

// ============================================================================
// Pipeline stages
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_worked_example() {
    let mut remote = FakeRemote::new();
    remote.metadata = Err(RemoteError::Status { status: 500, message: None });
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert_eq!(snapshot.data_source(), DataSource::Api);
    assert_eq!(snapshot.result().unwrap().summary, "S");
    assert_eq!(snapshot.result().unwrap().key_points, vec!["K1"]);
    assert_eq!(snapshot.current_step(), 3);
    assert!(snapshot.error().is_none());

    let requests = harness.remote.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].metadata, None);
    assert_eq!(requests[0].transcript, "Hello world");
    assert_eq!(requests[0].language, "english");
    assert_eq!(requests[0].resource_id.as_str(), "abc123");
}

#[tokio::test(start_paused = true)]
async fn test_metadata_is_forwarded() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    let requests = harness.remote.requests.lock().unwrap();
    assert_eq!(requests[0].original_file_name(), Some("meeting.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_transcript_failure_is_fatal() {
    let mut remote = FakeRemote::new();
    remote.transcript = Err(RemoteError::Status { status: 404, message: None });
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Error);
    assert_eq!(
        snapshot.error(),
        Some("An error occurred during audio analysis: Failed to get transcription. Status: 404")
    );
    assert!(!snapshot.processing());
    assert!(!snapshot.show_results());
    assert!(snapshot.result().is_none());
    assert_eq!(harness.remote.metadata_calls(), 0);
    assert_eq!(harness.remote.analysis_calls(), 0);
    assert_eq!(harness.store.upserts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_transcript_is_fatal() {
    let mut remote = FakeRemote::new();
    remote.transcript = Ok("   ".to_string());
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Error);
    assert_eq!(
        snapshot.error(),
        Some("An error occurred during audio analysis: No transcription found for this audio")
    );
    assert_eq!(harness.remote.analysis_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transcript_timeout_is_fatal() {
    let mut remote = FakeRemote::new();
    remote.transcript_delay = Some(Duration::from_secs(600));
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Error);
    assert_eq!(
        snapshot.error(),
        Some("An error occurred during audio analysis: Timed out getting transcription after 45s")
    );
    assert_eq!(harness.remote.analysis_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_analysis_failure_carries_remote_status() {
    let mut remote = FakeRemote::new();
    remote.analysis = Err(RemoteError::Status {
        status: 502,
        message: Some("model overloaded".to_string()),
    });
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Error);
    assert_eq!(
        snapshot.error(),
        Some("An error occurred during audio analysis: Analysis failed. Status: 502: model overloaded")
    );
    assert_eq!(snapshot.current_step(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.store.upserts(), 0);
    assert_eq!(harness.cleaner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_analysis_timeout_is_fatal() {
    let mut remote = FakeRemote::new();
    remote.analysis_delay = Some(Duration::from_secs(600));
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Error);
    assert_eq!(
        snapshot.error(),
        Some("An error occurred during audio analysis: Analysis failed: timed out after 45s")
    );
    assert!(snapshot.result().is_none());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.store.upserts(), 0);
    assert_eq!(harness.cleaner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_metadata_timeout_is_not_fatal() {
    let mut remote = FakeRemote::new();
    remote.metadata_delay = Some(Duration::from_secs(600));
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert!(snapshot.error().is_none());
    assert_eq!(snapshot.result().unwrap().summary, "S");

    let requests = harness.remote.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].metadata, None);
}

// ============================================================================
// Persistence and cleanup
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_skips_side_effects() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", false);
    orchestrator.reconcile().await;

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Ready);
    assert_eq!(harness.store.upserts(), 0);
    assert_eq!(harness.cleaner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_authenticated_persists_and_cleans_up_once() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Ready);
    assert!(orchestrator.snapshot().persisted());
    assert!(orchestrator.snapshot().cleanup_scheduled());
    assert_eq!(harness.store.upserts(), 1);

    let record = harness.store.inner.read(&ResourceId::new("abc123")).await.unwrap().unwrap();
    assert_eq!(record.summary.as_deref(), Some("S"));
    assert_eq!(record.title.as_deref(), Some("Audio abc123"));

    // Settle took 1.5s of the 5s cleanup delay.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(harness.cleaner.calls(), 0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.cleaner.calls(), 1);

    orchestrator.reconcile().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.store.upserts(), 1);
    assert_eq!(harness.cleaner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_only_notifies() {
    let store = CountingStore {
        fail_upserts: true,
        ..Default::default()
    };
    let harness = Harness::new(FakeRemote::new(), store, FakeCleaner::default());
    let mut notifications = harness.notifier.subscribe();

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert!(snapshot.error().is_none());

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.message, "Failed to save analysis to database");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.store.upserts(), 1);
    assert_eq!(harness.cleaner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistence_timeout_only_notifies() {
    let store = CountingStore {
        upsert_delay: Some(Duration::from_secs(600)),
        ..Default::default()
    };
    let harness = Harness::new(FakeRemote::new(), store, FakeCleaner::default());
    let mut notifications = harness.notifier.subscribe();

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert!(snapshot.error().is_none());
    assert!(snapshot.cleanup_scheduled());

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.message, "Failed to save analysis to database");
    assert!(notifications.try_recv().is_err());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.store.upserts(), 1);
    assert_eq!(harness.cleaner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_closed_cleanup_queue_is_not_marked_scheduled() {
    let harness = Harness::with_remote(FakeRemote::new());
    harness.cleanup.shutdown().await;

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status(), AnalysisStatus::Ready);
    assert!(snapshot.persisted());
    assert!(!snapshot.cleanup_scheduled());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.cleaner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_failure_is_swallowed() {
    let cleaner = FakeCleaner {
        fail: true,
        ..Default::default()
    };
    let harness = Harness::new(FakeRemote::new(), CountingStore::default(), cleaner);
    let mut notifications = harness.notifier.subscribe();

    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(harness.cleaner.calls(), 1);
    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Ready);
    assert!(orchestrator.snapshot().error().is_none());

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Info);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_outlives_instance() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", true);
    orchestrator.reconcile().await;

    orchestrator.dispose();
    drop(orchestrator);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.cleaner.calls(), 1);
}

// ============================================================================
// Liveness and surface
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_disposed_instance_ignores_late_results() {
    let mut remote = FakeRemote::new();
    remote.hold_analysis = true;
    let harness = Harness::with_remote(remote);

    let orchestrator = harness.orchestrator("abc123", true);
    let handle = orchestrator.activate();

    harness.remote.analysis_entered.notified().await;
    let before = orchestrator.snapshot();
    assert_eq!(before.status(), AnalysisStatus::Processing);
    assert_eq!(before.current_step(), 2);

    orchestrator.dispose();
    harness.remote.release_analysis.notify_one();
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(orchestrator.snapshot(), before);
    assert_eq!(harness.store.upserts(), 0);
    assert_eq!(harness.cleaner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_before_activation_does_nothing() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", false);

    orchestrator.dispose();
    orchestrator.reconcile().await;

    assert_eq!(orchestrator.snapshot().status(), AnalysisStatus::Loading);
    assert_eq!(harness.remote.transcript_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_forward_progress() {
    let harness = Harness::with_remote(FakeRemote::new());
    let orchestrator = harness.orchestrator("abc123", false);
    let mut rx = orchestrator.subscribe();

    let collector = tokio::spawn(async move {
        let mut seen = vec![rx.borrow().status()];
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status();
            seen.push(status);
            if status.is_terminal() {
                break;
            }
        }
        seen
    });

    orchestrator.activate().await.unwrap();
    let seen = collector.await.unwrap();

    assert_eq!(seen.first(), Some(&AnalysisStatus::Loading));
    assert_eq!(seen.last(), Some(&AnalysisStatus::Ready));
    for pair in seen.windows(2) {
        assert!(pair[0] == pair[1] || pair[0].can_advance_to(pair[1]), "{:?}", seen);
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_retargets() {
    let harness = Harness::with_remote(FakeRemote::new());
    let mut session = harness.session(false);

    let first = session.open(ResourceId::new("first"));
    let same = session.open(ResourceId::new("first"));
    assert!(Arc::ptr_eq(&first, &same));

    let second = session.open(ResourceId::new("second"));
    assert!(!first.is_alive());
    assert!(second.is_alive());

    let polish = session.open_with_language(ResourceId::new("second"), "polish");
    assert!(!second.is_alive());
    assert_eq!(polish.language(), "polish");

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(polish.snapshot().status(), AnalysisStatus::Ready);
    assert_eq!(first.snapshot().status(), AnalysisStatus::Loading);

    session.close();
    assert!(!polish.is_alive());
    assert!(session.current().is_none());
}

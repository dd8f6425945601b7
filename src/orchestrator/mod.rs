//! Analysis orchestrator.
//!
//! Decides once per instance whether a stored analysis can be reused, and
//! otherwise drives the pipeline: transcript, metadata, analysis,
//! persistence, cleanup scheduling. Progress is published as
//! [`AnalysisSnapshot`] values on a watch channel; nothing outside this module
//! can change them.

mod cleanup;
mod notify;
mod session;
mod state;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupJob, CleanupQueue};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use session::AnalysisSession;
pub use state::{AnalysisSnapshot, Event, ScheduledTransition, Timings};

use crate::analysis::{AnalysisFields, AnalysisResult, MediaMetadata, ResourceId};
use crate::config::Settings;
use crate::error::StageError;
use crate::remote::{AnalysisRequest, AnalysisService, HttpClient, MetadataSource, RemoteError, TranscriptSource};
use crate::store::AnalysisStore;
use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Message surfaced when stage 4 fails.
const PERSISTENCE_FAILED: &str = "Failed to save analysis to database";
const PERSISTENCE_SUCCEEDED: &str = "Analysis saved";

/// The external services an orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub transcripts: Arc<dyn TranscriptSource>,
    pub metadata: Arc<dyn MetadataSource>,
    pub analysis: Arc<dyn AnalysisService>,
    pub store: Arc<dyn AnalysisStore>,
}

impl Collaborators {
    /// Use one HTTP client for every remote collaborator.
    pub fn http(client: Arc<HttpClient>, store: Arc<dyn AnalysisStore>) -> Self {
        Self {
            transcripts: client.clone(),
            metadata: client.clone(),
            analysis: client,
            store,
        }
    }
}

/// Per-instance options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Desired output language.
    pub language: String,
    /// Whether the caller is signed in. Gates persistence and cleanup.
    pub authenticated: bool,
    /// Stored summary value that marks a record as still in progress.
    pub placeholder_summary: String,
    pub timings: Timings,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            language: "english".to_string(),
            authenticated: false,
            placeholder_summary: "Processing...".to_string(),
            timings: Timings::default(),
        }
    }
}

impl OrchestratorOptions {
    /// Build options from settings.
    pub fn from_settings(settings: &Settings, authenticated: bool) -> Self {
        Self {
            language: settings.analysis.language.clone(),
            authenticated,
            placeholder_summary: settings.analysis.placeholder_summary.clone(),
            timings: Timings::from(&settings.analysis),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Orchestrates one analysis for one `(resource, language)` pair.
pub struct AnalysisOrchestrator {
    instance_id: Uuid,
    resource_id: ResourceId,
    options: OrchestratorOptions,
    services: Collaborators,
    cleanup: CleanupQueue,
    notifier: Notifier,
    state: watch::Sender<AnalysisSnapshot>,
    reconciled: AtomicBool,
    alive: AtomicBool,
}

impl AnalysisOrchestrator {
    /// Create an instance. Nothing runs until [`activate`](Self::activate) or
    /// [`reconcile`](Self::reconcile) is called.
    pub fn new(
        resource_id: ResourceId,
        services: Collaborators,
        cleanup: CleanupQueue,
        notifier: Notifier,
        options: OrchestratorOptions,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(AnalysisSnapshot::new(Utc::now()));

        Arc::new(Self {
            instance_id: Uuid::new_v4(),
            resource_id,
            options,
            services,
            cleanup,
            notifier,
            state,
            reconciled: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        })
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn language(&self) -> &str {
        &self.options.language
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Current status, progress and result.
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.state.subscribe()
    }

    /// Stop applying updates. In-flight stages run to completion but their
    /// outcome is dropped and no later stage starts. Already scheduled
    /// cleanup is unaffected.
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Disposed orchestrator {} for {}", self.instance_id, self.resource_id);
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Run [`reconcile`](Self::reconcile) on a background task.
    pub fn activate(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.reconcile().await })
    }

    /// Make the cache-or-compute decision and carry it out.
    ///
    /// Only the first call does anything; later calls return immediately,
    /// however often they happen.
    #[instrument(skip(self), fields(instance = %self.instance_id, resource_id = %self.resource_id))]
    pub async fn reconcile(&self) {
        if self.reconciled.swap(true, Ordering::SeqCst) {
            debug!("Reconciliation already ran for this instance");
            return;
        }

        let cached = match self.bounded(self.services.store.read(&self.resource_id)).await {
            Some(Ok(record)) => record.filter(|r| r.is_complete(&self.options.placeholder_summary)),
            Some(Err(e)) => {
                warn!("Failed to read stored analysis, running pipeline: {}", e);
                None
            }
            None => {
                warn!(
                    "Timed out reading stored analysis after {}, running pipeline",
                    self.timeout_label()
                );
                None
            }
        };

        match cached {
            Some(record) => {
                info!("Using stored analysis for {}", self.resource_id);
                if !self.apply(Event::CacheHit(record.into_result())) {
                    return;
                }
            }
            None => {
                info!("No stored analysis for {}, starting pipeline", self.resource_id);
                self.run_pipeline().await;
            }
        }

        self.run_scheduled_transitions().await;
    }

    async fn run_pipeline(&self) {
        if !self.apply(Event::CacheMiss) {
            return;
        }

        let transcript = match self.fetch_transcript().await {
            Ok(transcript) => transcript,
            Err(e) => return self.fail(e),
        };
        if !self.apply(Event::TranscriptFetched) {
            return;
        }

        let metadata = self.fetch_metadata().await;
        if !self.apply(Event::MetadataResolved) {
            return;
        }

        let request = AnalysisRequest {
            resource_id: self.resource_id.clone(),
            transcript,
            metadata,
            language: self.options.language.clone(),
        };
        let result = match self.request_analysis(&request).await {
            Ok(result) => result,
            Err(e) => return self.fail(e),
        };
        if !self.apply(Event::AnalysisSucceeded(result.clone())) {
            return;
        }

        self.persist(&result).await;
        self.schedule_cleanup();
    }

    /// Stage 1. Fatal on failure or empty transcript. A transcript holding
    /// only whitespace counts as empty.
    async fn fetch_transcript(&self) -> Result<String, StageError> {
        let outcome = self
            .bounded(self.services.transcripts.fetch_transcript(&self.resource_id))
            .await;

        match outcome {
            Some(Ok(transcript)) if transcript.trim().is_empty() => Err(StageError::transcript_empty()),
            Some(Ok(transcript)) => {
                debug!("Fetched transcript ({} chars)", transcript.len());
                Ok(transcript)
            }
            Some(Err(e)) => Err(match e.status() {
                Some(status) => StageError::transcript_status(status),
                None => StageError::TranscriptUnavailable(format!("Failed to get transcription: {}", e)),
            }),
            None => Err(StageError::TranscriptUnavailable(format!(
                "Timed out getting transcription after {}",
                self.timeout_label()
            ))),
        }
    }

    /// Stage 2. Never fails the pipeline.
    async fn fetch_metadata(&self) -> Option<MediaMetadata> {
        let outcome = self
            .bounded(self.services.metadata.fetch_metadata(&self.resource_id))
            .await;

        let err = match outcome {
            Some(Ok(metadata)) => return Some(metadata),
            Some(Err(e)) => StageError::MetadataUnavailable(e.to_string()),
            None => StageError::MetadataUnavailable(format!("timed out after {}", self.timeout_label())),
        };
        debug!("Continuing without metadata: {}", err);
        None
    }

    /// Stage 3. Fatal on failure.
    async fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult, StageError> {
        match self.bounded(self.services.analysis.analyze(request)).await {
            Some(Ok(result)) => Ok(result),
            Some(Err(RemoteError::Status { status, message })) => Err(StageError::AnalysisService {
                status: Some(status),
                message,
            }),
            Some(Err(e)) => Err(StageError::AnalysisService {
                status: None,
                message: Some(e.to_string()),
            }),
            None => Err(StageError::AnalysisService {
                status: None,
                message: Some(format!("timed out after {}", self.timeout_label())),
            }),
        }
    }

    /// Stage 4. Only for signed-in callers; failure becomes a notification.
    async fn persist(&self, result: &AnalysisResult) {
        if !self.options.authenticated {
            debug!("Not authenticated, skipping persistence");
            return;
        }
        if !self.state.borrow().may_persist() {
            return;
        }

        let fields = AnalysisFields::from_result(&self.resource_id, result, Utc::now());
        let failure = match self.bounded(self.services.store.upsert(&self.resource_id, fields)).await {
            Some(Ok(())) => None,
            Some(Err(e)) => Some(StageError::Persistence(e.to_string())),
            None => Some(StageError::Persistence(format!("timed out after {}", self.timeout_label()))),
        };

        if !self.apply(Event::PersistenceAttempted {
            succeeded: failure.is_none(),
        }) {
            return;
        }

        match failure {
            None => {
                info!("Saved analysis for {}", self.resource_id);
                self.notifier
                    .notify(Notification::info(self.resource_id.clone(), PERSISTENCE_SUCCEEDED));
            }
            Some(err) => {
                warn!("{}", err);
                self.notifier
                    .notify(Notification::error(self.resource_id.clone(), PERSISTENCE_FAILED));
            }
        }
    }

    /// Stage 5. Hands the deletion to the background queue and returns.
    fn schedule_cleanup(&self) {
        if !self.options.authenticated {
            debug!("Not authenticated, skipping cleanup");
            return;
        }
        if !self.state.borrow().may_schedule_cleanup() || !self.is_alive() {
            return;
        }

        if self
            .cleanup
            .schedule(self.resource_id.clone(), self.options.timings.cleanup_delay)
        {
            self.apply(Event::CleanupScheduled);
        } else {
            warn!("Transcript cleanup for {} was not scheduled", self.resource_id);
        }
    }

    /// Fire delayed transitions until the machine asks for none.
    async fn run_scheduled_transitions(&self) {
        loop {
            let pending = self.state.borrow().pending_transition();
            let Some(transition) = pending else {
                return;
            };

            tokio::time::sleep(transition.delay(&self.options.timings)).await;
            debug!("Firing {} transition", transition.name());
            if !self.apply(Event::Elapsed(transition)) {
                return;
            }
        }
    }

    fn fail(&self, err: StageError) {
        warn!("Pipeline failed for {}: {}", self.resource_id, err);
        self.apply(Event::StageFailed(err));
    }

    /// Dispatch an event unless the instance has been disposed.
    fn apply(&self, event: Event) -> bool {
        if !self.is_alive() {
            debug!("Dropping {:?} for disposed orchestrator {}", event, self.instance_id);
            return false;
        }

        self.state.send_if_modified(|state| {
            let next = state.dispatch(event);
            if next == *state {
                false
            } else {
                *state = next;
                true
            }
        });
        true
    }

    /// Run a network stage under the stage timeout. `None` means it timed out.
    async fn bounded<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::time::timeout(self.options.timings.stage_timeout, fut).await.ok()
    }

    fn timeout_label(&self) -> String {
        format_timeout(self.options.timings.stage_timeout)
    }
}

fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

//! Orchestrator state machine.
//!
//! [`AnalysisSnapshot`] is both the machine state and the read-only surface
//! handed to callers. Every change goes through [`AnalysisSnapshot::dispatch`],
//! a pure `(state, event) -> state` function. Events that are not legal in the
//! current state leave it untouched.

use crate::analysis::{
    AnalysisResult, AnalysisStatus, DataSource, Step, ANALYSIS_STEPS, FINAL_STEP,
};
use crate::error::StageError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Step shown once the pipeline has started.
const PIPELINE_STEP: usize = 1;
/// Step shown once transcript and metadata are in hand.
const ANALYSIS_STEP: usize = 2;

/// Prefix of every surfaced error message.
const ERROR_PREFIX: &str = "An error occurred during audio analysis";

/// Inputs to the state machine. Each pipeline stage emits one on completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The store held a usable analysis.
    CacheHit(AnalysisResult),
    /// The store held nothing usable; the pipeline starts.
    CacheMiss,
    /// Stage 1 finished. Does not move the display step.
    TranscriptFetched,
    /// Stage 2 finished, with or without metadata.
    MetadataResolved,
    /// Stage 3 returned an analysis.
    AnalysisSucceeded(AnalysisResult),
    /// Stage 4 ran.
    PersistenceAttempted { succeeded: bool },
    /// Stage 5 handed the cleanup job to the background queue.
    CleanupScheduled,
    /// A fatal stage failure.
    StageFailed(StageError),
    /// A scheduled transition fired.
    Elapsed(ScheduledTransition),
}

/// Named, delayed transitions the driver fires on the machine's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledTransition {
    /// `completed -> ready` after the settle delay.
    Settle,
}

impl ScheduledTransition {
    pub fn name(&self) -> &'static str {
        match self {
            ScheduledTransition::Settle => "settle",
        }
    }

    /// How long the driver waits before firing this transition.
    pub fn delay(&self, timings: &Timings) -> Duration {
        match self {
            ScheduledTransition::Settle => timings.settle_delay,
        }
    }
}

/// Delays and bounds used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause between `completed` and `ready`.
    pub settle_delay: Duration,
    /// Delay before the transient transcript is deleted.
    pub cleanup_delay: Duration,
    /// Upper bound for each network stage.
    pub stage_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            cleanup_delay: Duration::from_secs(5),
            stage_timeout: Duration::from_secs(45),
        }
    }
}

impl From<&crate::config::AnalysisSettings> for Timings {
    fn from(settings: &crate::config::AnalysisSettings) -> Self {
        Self {
            settle_delay: settings.settle_delay(),
            cleanup_delay: settings.cleanup_delay(),
            stage_timeout: settings.stage_timeout(),
        }
    }
}

/// Status, progress and result of one orchestrator instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    status: AnalysisStatus,
    current_step: usize,
    result: Option<AnalysisResult>,
    error: Option<String>,
    data_source: DataSource,
    started_at: DateTime<Utc>,
    #[serde(skip)]
    persisted: bool,
    #[serde(skip)]
    cleanup_scheduled: bool,
}

impl AnalysisSnapshot {
    /// Initial state: loading, step 0, nothing in hand.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            status: AnalysisStatus::Loading,
            current_step: 0,
            result: None,
            error: None,
            data_source: DataSource::Api,
            started_at,
            persisted: false,
            cleanup_scheduled: false,
        }
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// The active result, once one has been adopted.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn data_source(&self) -> DataSource {
        self.data_source
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether work is still going on.
    pub fn processing(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether the result is final and may be displayed.
    pub fn show_results(&self) -> bool {
        self.status == AnalysisStatus::Ready
    }

    /// The static step list.
    pub fn steps(&self) -> &'static [Step] {
        &ANALYSIS_STEPS
    }

    /// The step currently shown.
    pub fn step(&self) -> Step {
        ANALYSIS_STEPS[self.current_step.min(FINAL_STEP)]
    }

    /// Percent complete of the current step.
    pub fn progress_percent(&self) -> u8 {
        self.step().progress
    }

    /// Time since the instance was created.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }

    /// Whether stage 4 may still run.
    pub fn may_persist(&self) -> bool {
        self.status == AnalysisStatus::Completed
            && self.data_source == DataSource::Api
            && !self.persisted
    }

    /// Whether stage 5 may still run.
    pub fn may_schedule_cleanup(&self) -> bool {
        self.status == AnalysisStatus::Completed
            && self.data_source == DataSource::Api
            && !self.cleanup_scheduled
    }

    /// Whether stage 4 has run for this instance.
    pub fn persisted(&self) -> bool {
        self.persisted
    }

    /// Whether the transcript deletion was handed to the cleanup queue.
    pub fn cleanup_scheduled(&self) -> bool {
        self.cleanup_scheduled
    }

    /// The transition the driver should fire next, if any.
    pub fn pending_transition(&self) -> Option<ScheduledTransition> {
        (self.status == AnalysisStatus::Completed).then_some(ScheduledTransition::Settle)
    }

    /// Apply an event and return the next state.
    pub fn dispatch(&self, event: Event) -> Self {
        let mut next = self.clone();

        match (self.status, event) {
            (status, event) if status.is_terminal() => {
                debug!("Ignoring {:?} in terminal state {}", event, status);
            }

            (AnalysisStatus::Loading, Event::CacheHit(result)) => {
                next.status = AnalysisStatus::Completed;
                next.data_source = DataSource::Database;
                next.current_step = FINAL_STEP;
                next.result = Some(result);
            }

            (AnalysisStatus::Loading, Event::CacheMiss) => {
                next.status = AnalysisStatus::Processing;
                next.data_source = DataSource::Api;
                next.current_step = PIPELINE_STEP;
            }

            (AnalysisStatus::Processing, Event::TranscriptFetched) => {}

            (AnalysisStatus::Processing, Event::MetadataResolved) => {
                next.current_step = ANALYSIS_STEP;
            }

            (AnalysisStatus::Processing, Event::AnalysisSucceeded(result)) => {
                next.status = AnalysisStatus::Completed;
                next.current_step = FINAL_STEP;
                next.result = Some(result);
            }

            (AnalysisStatus::Completed, Event::PersistenceAttempted { .. }) if self.may_persist() => {
                next.persisted = true;
            }

            (AnalysisStatus::Completed, Event::CleanupScheduled) if self.may_schedule_cleanup() => {
                next.cleanup_scheduled = true;
            }

            (_, Event::StageFailed(err)) if err.is_fatal() => {
                next.status = AnalysisStatus::Error;
                next.error = Some(format!("{}: {}", ERROR_PREFIX, err));
            }

            (AnalysisStatus::Completed, Event::Elapsed(ScheduledTransition::Settle)) => {
                next.status = AnalysisStatus::Ready;
                next.current_step = FINAL_STEP;
            }

            (status, event) => {
                debug!("Ignoring {:?} in state {}", event, status);
            }
        }

        debug_assert!(next.status == self.status || self.status.can_advance_to(next.status));
        next
    }
}

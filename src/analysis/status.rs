//! Orchestrator phase, progress steps and result provenance.

use serde::{Deserialize, Serialize};

/// Orchestrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Waiting for the store lookup.
    #[default]
    Loading,
    /// Pipeline stages are running.
    Processing,
    /// A result is in hand; waiting out the settle delay.
    Completed,
    /// Result is final and ready to display.
    Ready,
    /// A fatal stage failure ended the run.
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Loading => "loading",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Ready => "ready",
            AnalysisStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Ready | AnalysisStatus::Error)
    }

    /// Position along the forward path. `Error` shares the last rank with `Ready`.
    fn rank(&self) -> u8 {
        match self {
            AnalysisStatus::Loading => 0,
            AnalysisStatus::Processing => 1,
            AnalysisStatus::Completed => 2,
            AnalysisStatus::Ready | AnalysisStatus::Error => 3,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Forward moves along `loading -> processing -> completed -> ready` are
    /// allowed, `loading -> completed` covers a cache hit, and any non-terminal
    /// state may divert to `error`.
    pub fn can_advance_to(&self, next: AnalysisStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            AnalysisStatus::Error => true,
            AnalysisStatus::Ready => *self == AnalysisStatus::Completed,
            _ => next.rank() > self.rank(),
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the active result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Fresh pipeline run.
    #[default]
    Api,
    /// Previously stored analysis.
    Database,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Api => write!(f, "api"),
            DataSource::Database => write!(f, "database"),
        }
    }
}

/// A progress display step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    pub name: &'static str,
    /// Percent complete once this step is current (0-100).
    pub progress: u8,
}

/// Ordered steps shown while an analysis runs.
pub const ANALYSIS_STEPS: [Step; 4] = [
    Step { name: "Loading transcription", progress: 10 },
    Step { name: "Processing audio", progress: 40 },
    Step { name: "Analysis completed", progress: 90 },
    Step { name: "Preparing results", progress: 100 },
];

/// Index of the last step.
pub const FINAL_STEP: usize = ANALYSIS_STEPS.len() - 1;

//! Error types for Recap.

use thiserror::Error;

/// Library-level error type for Recap operations.
#[derive(Error, Debug)]
pub enum RecapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Analysis not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Recap operations.
pub type Result<T> = std::result::Result<T, RecapError>;

/// Failure of a single pipeline stage.
///
/// `TranscriptUnavailable` and `AnalysisService` are fatal and end the run in
/// the error state. The rest are caught at their stage boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("{0}")]
    TranscriptUnavailable(String),

    #[error("Failed to get metadata: {0}")]
    MetadataUnavailable(String),

    #[error("{}", analysis_message(.status, .message))]
    AnalysisService {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("Failed to save analysis to database: {0}")]
    Persistence(String),

    #[error("Failed to delete transcript: {0}")]
    Cleanup(String),
}

impl StageError {
    /// Transcript endpoint answered with a non-success status.
    pub fn transcript_status(status: u16) -> Self {
        StageError::TranscriptUnavailable(format!(
            "Failed to get transcription. Status: {}",
            status
        ))
    }

    /// Transcript endpoint answered but carried no text.
    pub fn transcript_empty() -> Self {
        StageError::TranscriptUnavailable("No transcription found for this audio".to_string())
    }

    /// Whether this failure ends the pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StageError::TranscriptUnavailable(_) | StageError::AnalysisService { .. }
        )
    }
}

fn analysis_message(status: &Option<u16>, message: &Option<String>) -> String {
    let mut out = match status {
        Some(code) => format!("Analysis failed. Status: {}", code),
        None => "Analysis failed".to_string(),
    };
    if let Some(msg) = message.as_deref().filter(|m| !m.is_empty()) {
        out.push_str(": ");
        out.push_str(msg);
    }
    out
}

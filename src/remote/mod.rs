//! Remote collaborators.
//!
//! Trait-based interfaces for the services the orchestrator drives: the
//! transcript source, the metadata source, the analysis service and the
//! transient transcript cleaner. [`HttpClient`] implements all four against
//! a single HTTP base URL.

mod http;

pub use http::HttpClient;

use crate::analysis::{AnalysisResult, MediaMetadata, ResourceId};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a remote collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The service answered with a non-success status.
    #[error("Status: {status}")]
    Status { status: u16, message: Option<String> },

    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// HTTP status, when the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Everything the analysis service needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub resource_id: ResourceId,
    pub transcript: String,
    pub metadata: Option<MediaMetadata>,
    pub language: String,
}

impl AnalysisRequest {
    /// Original filename from metadata, if the metadata stage produced one.
    pub fn original_file_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.original_file_name.as_deref())
    }

    /// Title sent with the request.
    pub fn title(&self) -> String {
        match self.original_file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Audio Recording {}", self.resource_id.short()),
        }
    }
}

/// Source of transcript text.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for a resource. An empty string means no transcript exists.
    async fn fetch_transcript(&self, id: &ResourceId) -> Result<String, RemoteError>;
}

/// Source of optional descriptive metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self, id: &ResourceId) -> Result<MediaMetadata, RemoteError>;
}

/// Service that turns a transcript into a structured analysis.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RemoteError>;
}

/// Best-effort deletion of the transient transcript artifact.
#[async_trait]
pub trait TranscriptCleaner: Send + Sync {
    async fn delete_transcript(&self, id: &ResourceId) -> Result<(), RemoteError>;
}

//! HTTP implementation of the remote collaborators.

use super::{
    AnalysisRequest, AnalysisService, MetadataSource, RemoteError, TranscriptCleaner,
    TranscriptSource,
};
use crate::analysis::{AnalysisResult, MediaMetadata, ResourceId};
use crate::config::ApiSettings;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Client for the transcript, metadata, summarize and cleanup endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptBody {
    #[serde(default)]
    transcription: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeBody<'a> {
    audio_id: &'a str,
    audio_details: AudioDetails<'a>,
    transcription: &'a str,
    output_language: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioDetails<'a> {
    title: String,
    original_file_name: Option<&'a str>,
    id: &'a str,
}

impl HttpClient {
    /// Create a client from API settings.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        Self::with_timeout(
            &settings.base_url,
            settings.token().map(str::to_string),
            Duration::from_secs(settings.request_timeout_seconds),
        )
    }

    /// Create a client with an explicit base URL, token and request timeout.
    pub fn with_timeout(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Whether requests carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Pass successful responses through; turn the rest into a status error.
    async fn check(response: Response) -> std::result::Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.is_empty());

        debug!("Remote returned {}: {:?}", status, message);
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TranscriptSource for HttpClient {
    #[instrument(skip(self), fields(resource_id = %id))]
    async fn fetch_transcript(&self, id: &ResourceId) -> std::result::Result<String, RemoteError> {
        let url = self.endpoint(&["api", "get-transcription", id.as_str()])?;
        let response = self.authorize(self.http.get(url)).send().await?;
        let body: TranscriptBody = Self::check(response).await?.json().await?;
        Ok(body.transcription.unwrap_or_default())
    }
}

#[async_trait]
impl MetadataSource for HttpClient {
    #[instrument(skip(self), fields(resource_id = %id))]
    async fn fetch_metadata(&self, id: &ResourceId) -> std::result::Result<MediaMetadata, RemoteError> {
        let url = self.endpoint(&["api", "get-audio-metadata", id.as_str()])?;
        let response = self.authorize(self.http.get(url)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[async_trait]
impl AnalysisService for HttpClient {
    #[instrument(skip(self, request), fields(resource_id = %request.resource_id, language = %request.language))]
    async fn analyze(&self, request: &AnalysisRequest) -> std::result::Result<AnalysisResult, RemoteError> {
        let url = self.endpoint(&["api", "summarize"])?;
        let body = SummarizeBody {
            audio_id: request.resource_id.as_str(),
            audio_details: AudioDetails {
                title: request.title(),
                original_file_name: request.original_file_name(),
                id: request.resource_id.as_str(),
            },
            transcription: &request.transcript,
            output_language: &request.language,
        };

        let response = self.authorize(self.http.post(url)).json(&body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[async_trait]
impl TranscriptCleaner for HttpClient {
    #[instrument(skip(self), fields(resource_id = %id))]
    async fn delete_transcript(&self, id: &ResourceId) -> std::result::Result<(), RemoteError> {
        let url = self.endpoint(&["api", "delete-transcription", id.as_str()])?;
        let response = self.authorize(self.http.delete(url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

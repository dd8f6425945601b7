//! Data models for analyses and their stored form.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp used when a chapter has no bounds.
const ZERO_TIMESTAMP: &str = "00:00:00";

// ============================================================================
// Identity
// ============================================================================

/// Opaque identifier of the audio/video source being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used in fallback titles.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Analysis result (as produced by the analysis service)
// ============================================================================

/// Structured analysis of a transcript.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions_made: Option<Vec<String>>,
    #[serde(default, alias = "videoChapters", skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_quality: Option<PresentationQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_date: Option<String>,
}

/// A chapter of the source media.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Assessment of how clearly the material was presented.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationQuality {
    pub overall_clarity: String,
    pub difficult_segments: Vec<DifficultSegment>,
    pub improvement_suggestions: Vec<String>,
}

/// A stretch of the recording that was hard to follow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultSegment {
    pub start_time: String,
    pub end_time: String,
    pub issue: String,
    pub improvement: String,
}

/// Optional descriptive metadata about the source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default)]
    pub original_file_name: Option<String>,
}

// ============================================================================
// Stored form
// ============================================================================

/// A chapter as persisted; every field is present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRecord {
    pub start_time: String,
    pub end_time: String,
    pub title: String,
    pub description: String,
}

/// Fields written by an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFields {
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub meeting_outcomes: Vec<String>,
    pub chapters: Vec<ChapterRecord>,
    pub presentation_quality: PresentationQuality,
    pub glossary: BTreeMap<String, String>,
    pub analysis_date: String,
}

impl AnalysisFields {
    /// Map a fresh result into store fields, filling the gaps with defaults.
    pub fn from_result(id: &ResourceId, result: &AnalysisResult, analyzed_at: DateTime<Utc>) -> Self {
        let title = result
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Audio {}", id.short()));

        let chapters = result
            .chapters
            .iter()
            .flatten()
            .map(|chapter| ChapterRecord {
                start_time: non_empty_or(&chapter.start_time, ZERO_TIMESTAMP),
                end_time: non_empty_or(&chapter.end_time, ZERO_TIMESTAMP),
                title: chapter.title.clone(),
                description: chapter.description.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            title,
            summary: result.summary.clone(),
            key_points: result.key_points.clone(),
            meeting_outcomes: result.decisions_made.clone().unwrap_or_default(),
            chapters,
            presentation_quality: result.presentation_quality.clone().unwrap_or_default(),
            glossary: result.glossary.clone().unwrap_or_default(),
            analysis_date: analyzed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

fn non_empty_or(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// A record as read back from the store.
///
/// Rows may be partially filled while another writer is still working on
/// them, so every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysisRecord {
    pub resource_id: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub meeting_outcomes: Option<Vec<String>>,
    pub chapters: Option<Vec<ChapterRecord>>,
    pub presentation_quality: Option<PresentationQuality>,
    pub glossary: Option<BTreeMap<String, String>>,
    pub analysis_date: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredAnalysisRecord {
    /// Build the record an upsert of `fields` produces.
    pub fn from_fields(id: &ResourceId, fields: AnalysisFields, updated_at: DateTime<Utc>) -> Self {
        Self {
            resource_id: id.as_str().to_string(),
            title: Some(fields.title),
            summary: Some(fields.summary),
            key_points: Some(fields.key_points),
            meeting_outcomes: Some(fields.meeting_outcomes),
            chapters: Some(fields.chapters),
            presentation_quality: Some(fields.presentation_quality),
            glossary: Some(fields.glossary),
            analysis_date: Some(fields.analysis_date),
            updated_at: Some(updated_at),
        }
    }

    /// A record is usable when it holds a real summary.
    pub fn is_complete(&self, placeholder: &str) -> bool {
        self.summary
            .as_deref()
            .is_some_and(|s| !s.is_empty() && s != placeholder)
    }

    /// Map stored fields into the result shape shown to callers.
    pub fn into_result(self) -> AnalysisResult {
        let chapters = self
            .chapters
            .unwrap_or_default()
            .into_iter()
            .map(|record| Chapter {
                start_time: Some(record.start_time),
                end_time: Some(record.end_time),
                title: record.title,
                description: Some(record.description),
            })
            .collect();

        AnalysisResult {
            title: Some(self.title.unwrap_or_default()),
            summary: self.summary.unwrap_or_default(),
            key_points: self.key_points.unwrap_or_default(),
            action_items: Some(Vec::new()),
            decisions_made: Some(self.meeting_outcomes.unwrap_or_default()),
            chapters: Some(chapters),
            presentation_quality: Some(self.presentation_quality.unwrap_or_default()),
            glossary: Some(self.glossary.unwrap_or_default()),
            analysis_date: self.analysis_date,
        }
    }
}

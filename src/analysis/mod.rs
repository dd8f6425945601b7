//! Analysis data model.
//!
//! Types shared by the orchestrator, the remote collaborators and the store:
//! the analysis result itself, its persisted form, and the status, step and
//! provenance enums that make up the progress surface.

mod models;
mod status;

pub use models::{
    AnalysisFields, AnalysisResult, Chapter, ChapterRecord, DifficultSegment, MediaMetadata,
    PresentationQuality, ResourceId, StoredAnalysisRecord,
};
pub use status::{AnalysisStatus, DataSource, Step, ANALYSIS_STEPS, FINAL_STEP};

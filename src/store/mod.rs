//! Persistent analysis store.
//!
//! Provides a trait-based interface over the store that keeps completed
//! analyses keyed by resource id.

mod memory;
mod sqlite;

pub use memory::MemoryAnalysisStore;
pub use sqlite::SqliteAnalysisStore;

use crate::analysis::{AnalysisFields, ResourceId, StoredAnalysisRecord};
use crate::config::Settings;
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for analysis store implementations.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Read the record for a resource, if one exists.
    async fn read(&self, id: &ResourceId) -> Result<Option<StoredAnalysisRecord>>;

    /// Insert or overwrite the record for a resource.
    async fn upsert(&self, id: &ResourceId, fields: AnalysisFields) -> Result<()>;

    /// List all records, most recently updated first.
    async fn list(&self) -> Result<Vec<StoredAnalysisRecord>>;
}

/// Open the store selected by `store.provider`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn AnalysisStore>> {
    match settings.store.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteAnalysisStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryAnalysisStore::new())),
        other => Err(RecapError::Config(format!("Unknown store provider: {}", other))),
    }
}

//! In-memory analysis store implementation.
//!
//! Useful for testing and one-off runs.

use super::AnalysisStore;
use crate::analysis::{AnalysisFields, ResourceId, StoredAnalysisRecord};
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory analysis store.
pub struct MemoryAnalysisStore {
    records: RwLock<HashMap<String, StoredAnalysisRecord>>,
}

impl MemoryAnalysisStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a raw record, bypassing the upsert mapping.
    pub fn insert_record(&self, record: StoredAnalysisRecord) -> Result<()> {
        let mut records = self.records.write().map_err(lock_error)?;
        records.insert(record.resource_id.clone(), record);
        Ok(())
    }
}

impl Default for MemoryAnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> RecapError {
    RecapError::Store(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn read(&self, id: &ResourceId) -> Result<Option<StoredAnalysisRecord>> {
        let records = self.records.read().map_err(lock_error)?;
        Ok(records.get(id.as_str()).cloned())
    }

    async fn upsert(&self, id: &ResourceId, fields: AnalysisFields) -> Result<()> {
        let record = StoredAnalysisRecord::from_fields(id, fields, Utc::now());
        self.insert_record(record)
    }

    async fn list(&self) -> Result<Vec<StoredAnalysisRecord>> {
        let records = self.records.read().map_err(lock_error)?;
        let mut all: Vec<StoredAnalysisRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }
}

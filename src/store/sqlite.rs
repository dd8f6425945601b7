//! SQLite-based analysis store implementation.
//!
//! List and map fields are stored as JSON text columns.

use super::AnalysisStore;
use crate::analysis::{AnalysisFields, ResourceId, StoredAnalysisRecord};
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS analyses (
        resource_id TEXT PRIMARY KEY,
        title TEXT,
        summary TEXT,
        key_points TEXT,
        meeting_outcomes TEXT,
        chapters TEXT,
        presentation_quality TEXT,
        glossary TEXT,
        analysis_date TEXT,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_analyses_updated_at ON analyses(updated_at);
"#;

const SELECT_COLUMNS: &str = r#"
    SELECT resource_id, title, summary, key_points, meeting_outcomes, chapters,
           presentation_quality, glossary, analysis_date, updated_at
    FROM analyses
"#;

/// SQLite-based analysis store.
pub struct SqliteAnalysisStore {
    conn: Mutex<Connection>,
}

impl SqliteAnalysisStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite analysis store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RecapError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string(value)
            .map_err(|e| RecapError::Store(format!("Failed to serialize column: {}", e)))
    }

    fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
        let raw: Option<String> = row.get(idx)?;
        raw.map(|text| {
            serde_json::from_str(&text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredAnalysisRecord> {
        let updated_at_str: String = row.get(9)?;

        Ok(StoredAnalysisRecord {
            resource_id: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            key_points: Self::json_column(row, 3)?,
            meeting_outcomes: Self::json_column(row, 4)?,
            chapters: Self::json_column(row, 5)?,
            presentation_quality: Self::json_column(row, 6)?,
            glossary: Self::json_column(row, 7)?,
            analysis_date: row.get(8)?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}

#[async_trait]
impl AnalysisStore for SqliteAnalysisStore {
    #[instrument(skip(self), fields(resource_id = %id))]
    async fn read(&self, id: &ResourceId) -> Result<Option<StoredAnalysisRecord>> {
        let conn = self.lock()?;

        let record = conn.query_row(
            &format!("{} WHERE resource_id = ?1", SELECT_COLUMNS),
            params![id.as_str()],
            Self::record_from_row,
        );

        match record {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, fields), fields(resource_id = %id))]
    async fn upsert(&self, id: &ResourceId, fields: AnalysisFields) -> Result<()> {
        let key_points = Self::to_json(&fields.key_points)?;
        let meeting_outcomes = Self::to_json(&fields.meeting_outcomes)?;
        let chapters = Self::to_json(&fields.chapters)?;
        let presentation_quality = Self::to_json(&fields.presentation_quality)?;
        let glossary = Self::to_json(&fields.glossary)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO analyses
            (resource_id, title, summary, key_points, meeting_outcomes, chapters,
             presentation_quality, glossary, analysis_date, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(resource_id) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                key_points = excluded.key_points,
                meeting_outcomes = excluded.meeting_outcomes,
                chapters = excluded.chapters,
                presentation_quality = excluded.presentation_quality,
                glossary = excluded.glossary,
                analysis_date = excluded.analysis_date,
                updated_at = excluded.updated_at
            "#,
            params![
                id.as_str(),
                fields.title,
                fields.summary,
                key_points,
                meeting_outcomes,
                chapters,
                presentation_quality,
                glossary,
                fields.analysis_date,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Upserted analysis for {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<StoredAnalysisRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!("{} ORDER BY updated_at DESC", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], Self::record_from_row)?;

        let records: Vec<StoredAnalysisRecord> = rows.collect::<rusqlite::Result<_>>()?;
        debug!("Listed {} stored analyses", records.len());
        Ok(records)
    }
}

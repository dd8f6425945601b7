//! Recap - Audio Analysis
//!
//! Turns a recording's transcript into a structured analysis (summary, key
//! points, chapters, glossary) and keeps the result so it is computed once.
//!
//! # Overview
//!
//! For a given recording, the [`orchestrator`] checks the analysis store
//! exactly once. A complete stored analysis is shown as is; otherwise the
//! pipeline fetches the transcript, resolves optional metadata, asks the
//! analysis service for a result and, for signed-in callers, saves it and
//! schedules deletion of the transient transcript.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `analysis` - Result, record and status types
//! - `remote` - Remote service traits and their HTTP client
//! - `store` - Analysis store abstraction (SQLite, in-memory)
//! - `orchestrator` - Cache-or-compute state machine and pipeline
//! - `cli` - Command line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use recap::analysis::ResourceId;
//! use recap::config::Settings;
//! use recap::orchestrator::{AnalysisOrchestrator, CleanupQueue, Collaborators, Notifier, OrchestratorOptions};
//! use recap::remote::HttpClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let client = Arc::new(HttpClient::new(&settings.api)?);
//!     let store = recap::store::open_store(&settings)?;
//!
//!     let orchestrator = AnalysisOrchestrator::new(
//!         ResourceId::new("abc123"),
//!         Collaborators::http(client.clone(), store),
//!         CleanupQueue::start(client.clone()),
//!         Notifier::new(),
//!         OrchestratorOptions::from_settings(&settings, client.is_authenticated()),
//!     );
//!     orchestrator.activate().await?;
//!
//!     println!("{:?}", orchestrator.snapshot().status());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod remote;
pub mod store;

pub use error::{Result, RecapError};

//! Background executor for transient transcript deletion.
//!
//! Jobs are delayed, best-effort and detached from whichever orchestrator
//! submitted them: the worker keeps running deletions even after that
//! orchestrator is gone. Failures are logged and otherwise dropped.

use crate::analysis::ResourceId;
use crate::error::StageError;
use crate::remote::TranscriptCleaner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A delayed deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupJob {
    pub resource_id: ResourceId,
    pub delay: Duration,
}

enum Command {
    Delete(CleanupJob),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the cleanup worker. Clones share the same worker.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Delete(job) => f.debug_tuple("Delete").field(job).finish(),
            Command::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

impl CleanupQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(cleaner: Arc<dyn TranscriptCleaner>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, cleaner));
        Self { tx }
    }

    /// Submit a deletion. Returns false if the worker has shut down.
    pub fn schedule(&self, resource_id: ResourceId, delay: Duration) -> bool {
        debug!("Scheduling transcript cleanup for {} in {:?}", resource_id, delay);
        let job = CleanupJob { resource_id, delay };
        match self.tx.send(Command::Delete(job)) {
            Ok(()) => true,
            Err(mpsc::error::SendError(command)) => {
                warn!("Cleanup queue is closed, dropping {:?}", command);
                false
            }
        }
    }

    /// Stop accepting jobs and wait for every accepted deletion to finish.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Command>, cleaner: Arc<dyn TranscriptCleaner>) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Delete(job)) => {
                    tasks.spawn(delete_later(job, cleaner.clone()));
                }
                Some(Command::Shutdown(done)) => {
                    rx.close();
                    while let Some(command) = rx.recv().await {
                        if let Command::Delete(job) = command {
                            tasks.spawn(delete_later(job, cleaner.clone()));
                        }
                    }
                    while tasks.join_next().await.is_some() {}
                    let _ = done.send(());
                    return;
                }
                None => break,
            },
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    // Every handle is gone; finish what was already accepted.
    while tasks.join_next().await.is_some() {}
}

async fn delete_later(job: CleanupJob, cleaner: Arc<dyn TranscriptCleaner>) {
    tokio::time::sleep(job.delay).await;

    match cleaner.delete_transcript(&job.resource_id).await {
        Ok(()) => info!("Deleted transient transcript for {}", job.resource_id),
        Err(e) => warn!("{}", StageError::Cleanup(format!("{} ({})", e, job.resource_id))),
    }
}

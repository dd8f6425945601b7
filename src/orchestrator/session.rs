//! Owner of the current orchestrator.
//!
//! An orchestrator never changes target. When the caller moves to another
//! resource (or language) the session disposes the old instance and starts a
//! fresh one, which re-arms the one-shot reconciliation.

use super::{AnalysisOrchestrator, CleanupQueue, Collaborators, Notifier, OrchestratorOptions};
use crate::analysis::ResourceId;
use std::sync::Arc;
use tracing::info;

/// Keeps at most one live orchestrator.
pub struct AnalysisSession {
    services: Collaborators,
    cleanup: CleanupQueue,
    notifier: Notifier,
    options: OrchestratorOptions,
    current: Option<Arc<AnalysisOrchestrator>>,
}

impl AnalysisSession {
    pub fn new(
        services: Collaborators,
        cleanup: CleanupQueue,
        notifier: Notifier,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            services,
            cleanup,
            notifier,
            options,
            current: None,
        }
    }

    /// Target `resource_id` in the session's default language.
    pub fn open(&mut self, resource_id: ResourceId) -> Arc<AnalysisOrchestrator> {
        let language = self.options.language.clone();
        self.open_with_language(resource_id, &language)
    }

    /// Target `resource_id` in `language`, reusing the running instance when
    /// both already match.
    pub fn open_with_language(&mut self, resource_id: ResourceId, language: &str) -> Arc<AnalysisOrchestrator> {
        if let Some(current) = &self.current {
            if current.resource_id() == &resource_id && current.language() == language {
                return Arc::clone(current);
            }
        }

        self.close();

        info!("Starting analysis for {} ({})", resource_id, language);
        let orchestrator = AnalysisOrchestrator::new(
            resource_id,
            self.services.clone(),
            self.cleanup.clone(),
            self.notifier.clone(),
            self.options.clone().with_language(language),
        );
        // The task ends on its own; dispose() is what stops it from
        // applying anything further.
        drop(orchestrator.activate());

        self.current = Some(Arc::clone(&orchestrator));
        orchestrator
    }

    /// The live orchestrator, if any.
    pub fn current(&self) -> Option<&Arc<AnalysisOrchestrator>> {
        self.current.as_ref()
    }

    /// Dispose the live orchestrator.
    pub fn close(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.dispose();
        }
    }

    /// Passive notifications from every instance this session starts.
    pub fn notifications(&self) -> tokio::sync::broadcast::Receiver<super::Notification> {
        self.notifier.subscribe()
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.close();
    }
}

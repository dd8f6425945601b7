//! Analyze command implementation.

use crate::analysis::{AnalysisStatus, DataSource, ResourceId};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::RecapError;
use crate::orchestrator::{
    AnalysisOrchestrator, AnalysisSnapshot, CleanupQueue, Collaborators, Notification, NotificationLevel, Notifier,
    OrchestratorOptions,
};
use crate::remote::HttpClient;
use crate::store::open_store;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Run the analyze command.
pub async fn run_analyze(
    resource_id: &str,
    lang: Option<String>,
    json: bool,
    anonymous: bool,
    token: Option<String>,
    settings: Settings,
) -> Result<()> {
    let resource_id = ResourceId::new(resource_id.trim());
    if resource_id.as_str().is_empty() {
        Output::error("A recording id is required");
        return Err(RecapError::InvalidInput("empty recording id".to_string()).into());
    }

    let mut api = settings.api.clone();
    if anonymous {
        api.token = None;
    } else if token.is_some() {
        api.token = token;
    }

    let client = Arc::new(HttpClient::new(&api)?);
    let authenticated = client.is_authenticated();
    if !authenticated && !json {
        Output::warning("No API token configured; the analysis will not be saved.");
    }

    let store = open_store(&settings)?;
    let cleanup = CleanupQueue::start(client.clone());
    let notifier = Notifier::new();
    let notifications = notifier.subscribe();

    let mut options = OrchestratorOptions::from_settings(&settings, authenticated);
    if let Some(language) = lang {
        options = options.with_language(language);
    }

    let orchestrator = AnalysisOrchestrator::new(
        resource_id.clone(),
        Collaborators::http(client, store),
        cleanup.clone(),
        notifier,
        options,
    );

    if !json {
        Output::info(&format!("Analyzing {} ({})", resource_id, orchestrator.language()));
    }

    let snapshot = watch_progress(&orchestrator, json).await?;

    // Deletions are delayed; keep the process alive until they finish.
    cleanup.shutdown().await;
    drain_notifications(notifications, json);

    match snapshot.status() {
        AnalysisStatus::Error => {
            let message = snapshot.error().unwrap_or("Analysis failed").to_string();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                Output::error(&message);
            }
            Err(anyhow::anyhow!(message))
        }
        _ => {
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else if let Some(result) = snapshot.result() {
                let source = match snapshot.data_source() {
                    DataSource::Database => "stored analysis",
                    DataSource::Api => "fresh analysis",
                };
                Output::success(&format!("Loaded {} for {}", source, resource_id));
                Output::analysis(result);
            }
            Ok(())
        }
    }
}

/// Drive the orchestrator to a terminal state, rendering each step.
async fn watch_progress(orchestrator: &Arc<AnalysisOrchestrator>, quiet: bool) -> Result<AnalysisSnapshot> {
    let mut rx = orchestrator.subscribe();
    let handle = orchestrator.activate();

    let spinner = (!quiet).then(|| Output::spinner("Checking for a stored analysis..."));

    loop {
        let snapshot = rx.borrow_and_update().clone();
        if let Some(pb) = &spinner {
            let step = snapshot.step();
            pb.set_message(format!("{} ({}%)", step.name, snapshot.progress_percent()));
        }
        if snapshot.status().is_terminal() {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    handle.await?;
    Ok(orchestrator.snapshot())
}

fn drain_notifications(mut rx: broadcast::Receiver<Notification>, quiet: bool) {
    while let Ok(notification) = rx.try_recv() {
        if quiet && notification.level == NotificationLevel::Info {
            continue;
        }
        match notification.level {
            NotificationLevel::Info => Output::info(&notification.message),
            NotificationLevel::Error => Output::warning(&notification.message),
        }
    }
}

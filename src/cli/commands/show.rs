//! Show command implementation.

use crate::analysis::ResourceId;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::RecapError;
use crate::store::open_store;
use anyhow::Result;

/// Run the show command.
pub async fn run_show(resource_id: &str, json: bool, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let id = ResourceId::new(resource_id);

    let Some(record) = store.read(&id).await? else {
        Output::error(&format!("No stored analysis for {}", id));
        return Err(RecapError::NotFound(id.to_string()).into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if !record.is_complete(&settings.analysis.placeholder_summary) {
        Output::warning(&format!("The analysis for {} is still in progress.", id));
        return Ok(());
    }

    if let Some(date) = &record.analysis_date {
        Output::kv("Analyzed", date);
    }
    Output::analysis(&record.into_result());

    Ok(())
}

//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::open_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let placeholder = &settings.analysis.placeholder_summary;

    match store.list().await {
        Ok(records) => {
            if records.is_empty() {
                Output::info("No analyses stored yet. Use 'recap analyze <id>' to create one.");
                return Ok(());
            }

            Output::header(&format!("Stored Analyses ({})", records.len()));
            println!();

            for record in &records {
                Output::record_info(record);
            }

            let pending = records.iter().filter(|r| !r.is_complete(placeholder)).count();
            println!();
            Output::kv("Total", &records.len().to_string());
            if pending > 0 {
                Output::kv("In progress", &pending.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list analyses: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

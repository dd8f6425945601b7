//! CLI output formatting utilities.

use crate::analysis::{AnalysisResult, StoredAnalysisRecord};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one stored analysis as a list row.
    pub fn record_info(record: &StoredAnalysisRecord) {
        let title = record.title.as_deref().unwrap_or("(untitled)");
        let date = record.analysis_date.as_deref().unwrap_or("-");
        println!(
            "  {} {} ({}, {})",
            style("*").cyan(),
            style(title).bold(),
            style(&record.resource_id).dim(),
            date
        );
        if let Some(summary) = &record.summary {
            println!("     {}", style(content_preview(summary, 100)).dim());
        }
    }

    /// Print an analysis result.
    pub fn analysis(result: &AnalysisResult) {
        if let Some(title) = result.title.as_deref().filter(|t| !t.is_empty()) {
            Output::header(title);
        }

        println!("\n{}", result.summary);

        if !result.key_points.is_empty() {
            Output::header("Key points");
            for point in &result.key_points {
                Output::list_item(point);
            }
        }

        if let Some(decisions) = result.decisions_made.as_ref().filter(|d| !d.is_empty()) {
            Output::header("Outcomes");
            for decision in decisions {
                Output::list_item(decision);
            }
        }

        if let Some(actions) = result.action_items.as_ref().filter(|a| !a.is_empty()) {
            Output::header("Action items");
            for action in actions {
                Output::list_item(action);
            }
        }

        if let Some(chapters) = result.chapters.as_ref().filter(|c| !c.is_empty()) {
            Output::header("Chapters");
            for chapter in chapters {
                let start = chapter.start_time.as_deref().unwrap_or("--:--:--");
                println!("  {} {}", style(start).cyan(), chapter.title);
            }
        }

        if let Some(glossary) = result.glossary.as_ref().filter(|g| !g.is_empty()) {
            Output::header("Glossary");
            for (term, definition) in glossary {
                Output::kv(term, definition);
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

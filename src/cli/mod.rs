//! CLI module for Recap.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Recap - Audio Analysis
///
/// Fetches a recording's transcript, runs it through the analysis service and
/// keeps the result, reusing stored analyses whenever one exists.
#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a recording, reusing a stored analysis when available
    Analyze {
        /// Recording identifier
        resource_id: String,

        /// Output language (defaults to analysis.language)
        #[arg(short, long)]
        lang: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Run without credentials: nothing is saved and nothing is cleaned up
        #[arg(long)]
        anonymous: bool,

        /// API bearer token (overrides api.token)
        #[arg(long, env = "RECAP_API_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Show a stored analysis
    Show {
        /// Recording identifier
        resource_id: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored analyses
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}

//! CLI command implementations.

mod analyze;
mod config;
mod list;
mod show;

pub use analyze::run_analyze;
pub use config::run_config;
pub use list::run_list;
pub use show::run_show;

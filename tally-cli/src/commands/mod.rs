//! CLI command implementations

pub mod accounts;
pub mod categories;
pub mod currencies;
pub mod export;
pub mod import;
pub mod logs;
pub mod status;
pub mod transactions;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tally_core::services::LogEvent;
use tally_core::{EntryPoint, LoggingService, TallyContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let tally_dir = get_tally_dir().ok()?;
    std::fs::create_dir_all(&tally_dir).ok()?;
    LoggingService::new(&tally_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "failed to write log event");
        }
    }
}

/// Get the tally directory from environment or default
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tally"))
        .ok_or_else(|| anyhow!("Could not find home directory; set TALLY_DIR"))
}

/// Open the tally context for `user` (the configured user when `None`)
pub fn get_context(user: Option<&str>) -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;
    TallyContext::new(&tally_dir, user).context("Failed to initialize tally context")
}

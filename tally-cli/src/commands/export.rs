//! Export command - write transactions as an importable CSV

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::services::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(user: Option<&str>, from: NaiveDate, to: NaiveDate, output_path: Option<PathBuf>) -> Result<()> {
    let ctx = get_context(user)?;
    let logger = get_logger();

    let summary = match &output_path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            ctx.export_service.export_csv(ctx.user.id, from, to, BufWriter::new(file))?
        }
        None => ctx.export_service.export_csv(ctx.user.id, from, to, io::stdout().lock())?,
    };
    log_event(&logger, LogEvent::new("export_completed").with_command("export"));

    // Keep stdout clean for the CSV itself
    if let Some(path) = output_path {
        output::success(&format!("Exported {} transactions to {}", summary.rows, path.display()));
    } else {
        eprintln!("Exported {} transactions", summary.rows);
    }
    Ok(())
}

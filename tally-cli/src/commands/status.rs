//! Status command - show a summary of the user's data

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::get_context;

pub fn run(user: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context(user)?;
    let status = ctx.status_service.get_status(ctx.user.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{} ({})", "Financial Data Status".bold(), ctx.user.name);
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Accounts", &status.total_accounts.to_string()]);
    table.add_row(vec!["Categories", &status.total_categories.to_string()]);
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);

    println!("{}", table);

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest) {
        println!();
        println!("Date range: {} to {}", earliest, latest);
    }

    Ok(())
}

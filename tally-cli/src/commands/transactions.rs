//! Transactions command - list and delete stored transactions

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;
use tally_core::services::{LogEvent, TransactionQuery, DEFAULT_PAGE_SIZE};
use uuid::Uuid;

use super::{get_context, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List transactions, newest first
    List {
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Only transactions of this account
        #[arg(long)]
        account: Option<String>,
        /// Page size
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a transaction; both legs of a transfer go together
    Delete {
        /// Transaction ID
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(user: Option<&str>, command: TransactionsCommands) -> Result<()> {
    let ctx = get_context(user)?;

    match command {
        TransactionsCommands::List {
            from,
            to,
            account,
            limit,
            offset,
            json,
        } => {
            let query = TransactionQuery {
                date_from: from,
                date_to: to,
                account,
                limit: Some(limit),
                offset,
            };
            let page = ctx.transaction_service.list(ctx.user.id, &query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(());
            }

            if page.transactions.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Date", "Account", "Category", "Amount", "Currency", "Description"]);
            for entry in &page.transactions {
                let category = match (&entry.category, entry.transfer_id) {
                    (Some(label), _) => label.clone(),
                    (None, Some(_)) => "(transfer)".dimmed().to_string(),
                    (None, None) => String::new(),
                };
                table.add_row(vec![
                    Cell::new(entry.id),
                    Cell::new(entry.date),
                    Cell::new(&entry.account),
                    Cell::new(category),
                    output::amount_cell(entry.kind.signed(entry.amount)),
                    Cell::new(&entry.currency),
                    Cell::new(&entry.description),
                ]);
            }
            println!("{}", table);

            let shown_to = page.offset + page.transactions.len();
            println!(
                "{}",
                format!("Showing {}-{} of {}", page.offset + 1, shown_to, page.total).dimmed()
            );
        }
        TransactionsCommands::Delete { id, yes, json } => {
            if !yes && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete transaction {}? Transfers lose both legs.", id))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = ctx.transaction_service.delete(ctx.user.id, id)?;
            log_event(
                &get_logger(),
                LogEvent::new("transaction_deleted").with_command("transactions"),
            );

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} transaction row(s)", deleted));
            }
        }
    }

    Ok(())
}

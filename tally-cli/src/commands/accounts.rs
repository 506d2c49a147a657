//! Accounts command - list balances and create accounts

use anyhow::{anyhow, Result};
use clap::Subcommand;
use rust_decimal::Decimal;
use tally_core::services::NewAccount;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List accounts with their balances
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an account
    Add {
        /// Account name
        name: String,
        /// Currency code
        #[arg(long)]
        currency: String,
        /// Account type
        #[arg(long = "type", default_value = "bank")]
        account_type: String,
        /// Opening balance
        #[arg(long, default_value = "0")]
        opening_balance: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(user: Option<&str>, command: AccountsCommands) -> Result<()> {
    let ctx = get_context(user)?;

    match command {
        AccountsCommands::List { json } => {
            let accounts = ctx.account_service.list(ctx.user.id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                return Ok(());
            }

            if accounts.is_empty() {
                println!("No accounts yet. Import a CSV or run 'tally accounts add'.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Name", "Type", "Currency", "Balance"]);
            for entry in accounts {
                table.add_row(vec![
                    comfy_table::Cell::new(&entry.account.name),
                    comfy_table::Cell::new(&entry.account.account_type),
                    comfy_table::Cell::new(&entry.account.currency),
                    output::amount_cell(entry.balance),
                ]);
            }
            println!("{}", table);
        }
        AccountsCommands::Add {
            name,
            currency,
            account_type,
            opening_balance,
            json,
        } => {
            let opening_balance: Decimal = opening_balance
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid opening balance: {}", opening_balance))?;

            let account = ctx.account_service.create(
                ctx.user.id,
                NewAccount {
                    name,
                    account_type,
                    currency,
                    opening_balance,
                },
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                output::success(&format!("Account '{}' created", account.name));
                println!("  ID: {}", account.id);
                println!("  Currency: {}", account.currency);
            }
        }
    }

    Ok(())
}

//! Currencies command - list and register currencies

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum CurrenciesCommands {
    /// List known currencies
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register a currency
    Add {
        /// Three-letter code
        code: String,
        /// Display name
        name: String,
        /// Symbol used in CSV files
        symbol: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(user: Option<&str>, command: CurrenciesCommands) -> Result<()> {
    let ctx = get_context(user)?;

    match command {
        CurrenciesCommands::List { json } => {
            let currencies = ctx.currency_service.list()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&currencies)?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Code", "Name", "Symbol"]);
            for c in currencies {
                table.add_row(vec![c.code, c.name, c.symbol]);
            }
            println!("{}", table);
        }
        CurrenciesCommands::Add {
            code,
            name,
            symbol,
            json,
        } => {
            let currency = ctx.currency_service.add(&code, &name, &symbol)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&currency)?);
            } else {
                output::success(&format!("Currency {} added", currency.code));
            }
        }
    }

    Ok(())
}

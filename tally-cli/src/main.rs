//! Tally CLI - Personal finance in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tally_core::services::LogEvent;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    accounts, categories, currencies, export, get_logger, import, log_event, logs, status, transactions,
};

/// Tally - personal finance in your terminal
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// User whose data to work with (defaults to the configured user)
    #[arg(long, global = true, env = "TALLY_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of the user's data
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import transactions from a CSV file
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Date format, e.g. dd.MM.yyyy (detected when omitted)
        #[arg(long)]
        date_format: Option<String>,
        /// Decimal separator: "," or "." (detected when omitted)
        #[arg(long)]
        decimal_separator: Option<String>,
        /// Column delimiter (detected when omitted)
        #[arg(long)]
        delimiter: Option<String>,
        /// Map a currency token to a currency code (TOKEN=CODE)
        #[arg(long = "map", value_name = "TOKEN=CODE")]
        mappings: Vec<String>,
        /// Register a currency before importing (CODE:NAME:SYMBOL)
        #[arg(long = "new-currency", value_name = "CODE:NAME:SYMBOL")]
        new_currencies: Vec<String>,
        /// Save currency mappings to settings.json for later imports
        #[arg(long)]
        remember: bool,
        /// Skip prompts
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export transactions to CSV in the import format
    Export {
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List or delete transactions
    Transactions {
        #[command(subcommand)]
        command: transactions::TransactionsCommands,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        command: accounts::AccountsCommands,
    },

    /// Manage currencies
    Currencies {
        #[command(subcommand)]
        command: currencies::CurrenciesCommands,
    },

    /// List categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Import { .. } => "import",
            Commands::Export { .. } => "export",
            Commands::Transactions { .. } => "transactions",
            Commands::Accounts { .. } => "accounts",
            Commands::Currencies { .. } => "currencies",
            Commands::Categories { .. } => "categories",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command(cli.command.name()));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let user = cli.user.as_deref();
    match cli.command {
        Commands::Status { json } => status::run(user, json),
        Commands::Import {
            file,
            date_format,
            decimal_separator,
            delimiter,
            mappings,
            new_currencies,
            remember,
            yes,
            json,
        } => import::run(
            user,
            import::ImportArgs {
                file,
                date_format,
                decimal_separator,
                delimiter,
                mappings,
                new_currencies,
                remember,
                yes,
                json,
            },
        ),
        Commands::Export { from, to, output } => export::run(user, from, to, output),
        Commands::Transactions { command } => transactions::run(user, command),
        Commands::Accounts { command } => accounts::run(user, command),
        Commands::Currencies { command } => currencies::run(user, command),
        Commands::Categories { json } => categories::run(user, json),
        Commands::Logs { command } => logs::run(command),
    }
}

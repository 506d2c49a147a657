//! Tally Core - Business logic for personal finance tracking
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Category, Transaction, etc.)
//! - **ports**: Trait definitions for persistence (Store, StoreTx)
//! - **services**: Business logic orchestration (import, export, ...)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{Account, Category, Currency, Transaction, TransactionKind, User};
pub use domain::result::{Error, OperationResult};
pub use services::{EntryPoint, LoggingService};

/// Database file inside the tally directory
pub const DB_FILENAME: &str = "tally.duckdb";

/// Main context for Tally operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, the active user and all services.
pub struct TallyContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub user: User,
    pub import_service: ImportService,
    pub export_service: ExportService,
    pub account_service: AccountService,
    pub category_service: CategoryService,
    pub currency_service: CurrencyService,
    pub status_service: StatusService,
    pub transaction_service: TransactionService,
}

impl TallyContext {
    /// Open the tally directory for `user` (the configured user when `None`)
    pub fn new(tally_dir: &Path, user: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(tally_dir)
            .with_context(|| format!("Failed to create {}", tally_dir.display()))?;
        let config = Config::load(tally_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&tally_dir.join(DB_FILENAME))?);
        let migrations = repository.ensure_schema()?;
        if !migrations.applied.is_empty() {
            tracing::info!(applied = ?migrations.applied, "applied migrations");
        }

        let user_name = user.unwrap_or(&config.user);
        let user = repository.ensure_user(user_name)?;

        let import_service = ImportService::new(repository.clone(), config.import.settings());
        let export_service = ExportService::new(Arc::clone(&repository));
        let account_service = AccountService::new(Arc::clone(&repository));
        let category_service = CategoryService::new(Arc::clone(&repository));
        let currency_service = CurrencyService::new(Arc::clone(&repository));
        let status_service = StatusService::new(Arc::clone(&repository));
        let transaction_service = TransactionService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            repository,
            user,
            import_service,
            export_service,
            account_service,
            category_service,
            currency_service,
            status_service,
            transaction_service,
        })
    }
}

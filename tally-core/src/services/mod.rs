//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod category;
mod currency;
mod export;
pub mod import;
pub mod logging;
pub mod migration;
mod status;
mod transaction;

pub use account::{AccountBalance, AccountService, NewAccount};
pub use category::{CategoryEntry, CategoryService};
pub use currency::CurrencyService;
pub use export::{ExportService, ExportSummary, EXPORT_DATE_FORMAT};
pub use import::{
    FailedRow, ImportFile, ImportRequest, ImportResult, ImportService, ImportSettings,
    RawImportRow,
};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{DateRange, StatusService, StatusSummary};
pub use transaction::{
    TransactionEntry, TransactionPage, TransactionQuery, TransactionService, DEFAULT_PAGE_SIZE,
};

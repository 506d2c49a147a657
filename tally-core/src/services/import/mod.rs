//! Import service - bulk import of transactions and transfers
//!
//! One call runs inside a single store transaction: new currencies are
//! registered, rows are parsed, transfer legs are paired, accounts and
//! categories are looked up or created, and every surviving row is
//! inserted in batches. Problems with individual rows are reported back;
//! anything else rolls the whole call back.

mod file;
mod pairing;
mod parse;
mod resolve;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Account, Currency, Transaction, TransactionKind, RATE_SCALE};
use crate::ports::{Store, StoreTx};

pub use file::{FormatDetector, FormatHints, ImportFile, DATE_FORMATS, DELIMITERS, HEADER};
pub use parse::{DateFormat, DecimalSeparator, RowError};

use pairing::{pair_transfers, TransferPair};
use parse::{parse_row, ParseContext, ParsedRow};
use resolve::{AccountResolver, CategoryResolver};

/// Rows per insert statement batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 10^16; rates are stored as DECIMAL(24,8)
const MAX_RATE: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// One row as it appears in an import file; every field is free text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImportRow {
    pub date: String,
    pub account: String,
    /// `Parent` or `Parent\Child`
    pub category: String,
    /// Signed amount
    pub total: String,
    /// Code, symbol or a mapped alias
    pub currency: String,
    pub description: String,
    /// The other account of a transfer
    pub transfer: String,
}

/// Everything one import call needs besides the user
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub date_format: DateFormat,
    pub decimal_separator: DecimalSeparator,
    /// Raw currency token -> code, checked before code and symbol matching
    pub currency_mapping: HashMap<String, String>,
    /// Registered before any row is parsed
    pub new_currencies: Vec<Currency>,
    pub rows: Vec<RawImportRow>,
}

/// Service-level settings fixed at construction
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// A row that was not imported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRow {
    /// 1-based position in the request
    pub row_number: usize,
    pub data: RawImportRow,
    pub error: String,
}

/// Summary of a committed import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub currencies_created: Vec<String>,
    pub accounts_created: Vec<String>,
    /// "Parent" or "Parent > Child"
    pub categories_created: Vec<String>,
    pub imported: u64,
    pub failed_rows: Vec<FailedRow>,
}

/// Progress of one import call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Idle,
    CurrenciesApplied,
    RowsParsed,
    TransfersPaired,
    AccountsResolved,
    CurrencyFiltered,
    CategoriesResolved,
    RowsAssembled,
    Inserting,
    Committed,
    Aborted,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CurrenciesApplied => "currencies_applied",
            Self::RowsParsed => "rows_parsed",
            Self::TransfersPaired => "transfers_paired",
            Self::AccountsResolved => "accounts_resolved",
            Self::CurrencyFiltered => "currency_filtered",
            Self::CategoriesResolved => "categories_resolved",
            Self::RowsAssembled => "rows_assembled",
            Self::Inserting => "inserting",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A transaction ready for insertion, remembering where it came from
struct PendingRow {
    row_number: usize,
    transaction: Transaction,
}

/// Import service for bulk imports
pub struct ImportService {
    store: Arc<dyn Store>,
    settings: ImportSettings,
}

impl ImportService {
    pub fn new(store: Arc<dyn Store>, settings: ImportSettings) -> Self {
        Self { store, settings }
    }

    /// Import `request` for `user_id`.
    ///
    /// Returns a summary that may list failed rows, or an error with
    /// nothing written at all.
    pub fn import(&self, user_id: Uuid, request: &ImportRequest) -> Result<ImportResult> {
        let mut tx = self.store.begin().context("failed to begin transaction")?;
        let mut stage = ImportStage::Idle;

        match self.reconcile(tx.as_mut(), user_id, request, &mut stage) {
            Ok(result) => {
                tx.commit().context("failed to commit transaction")?;
                advance(&mut stage, ImportStage::Committed);
                Ok(result)
            }
            Err(e) => {
                // Dropping the handle rolls back
                drop(tx);
                tracing::warn!(stage = %stage, error = %e, "import aborted");
                advance(&mut stage, ImportStage::Aborted);
                Err(e)
            }
        }
    }

    fn reconcile(
        &self,
        tx: &mut dyn StoreTx,
        user_id: Uuid,
        request: &ImportRequest,
        stage: &mut ImportStage,
    ) -> Result<ImportResult> {
        let mut result = ImportResult::default();

        // Currencies
        let mut currencies = tx.list_currencies().context("failed to list currencies")?;
        for currency in &request.new_currencies {
            if let Err(reason) = currency.validate() {
                bail!("invalid currency {}: {}", currency.code, reason);
            }
            tx.create_currency(currency)
                .with_context(|| format!("failed to create currency {}", currency.code))?;
            result.currencies_created.push(currency.code.clone());
            currencies.push(currency.clone());
        }
        advance(stage, ImportStage::CurrenciesApplied);

        // Parsing
        let ctx = ParseContext {
            date_format: &request.date_format,
            decimal_separator: request.decimal_separator,
            currency_mapping: &request.currency_mapping,
            currencies: &currencies,
        };
        let mut parsed = Vec::with_capacity(request.rows.len());
        for (index, row) in request.rows.iter().enumerate() {
            match parse_row(index + 1, row, &ctx) {
                Ok(row) => parsed.push(row),
                Err(e) => fail_row(&mut result, request, index + 1, &e),
            }
        }
        advance(stage, ImportStage::RowsParsed);

        // Transfers
        let (candidates, regular): (Vec<ParsedRow>, Vec<ParsedRow>) =
            parsed.into_iter().partition(ParsedRow::is_transfer_candidate);
        let (pairs, pairing_failures) = pair_transfers(candidates);
        for (row_number, error) in pairing_failures {
            fail_row(&mut result, request, row_number, &error);
        }
        advance(stage, ImportStage::TransfersPaired);

        // Accounts
        let mut accounts = AccountResolver::new(user_id);
        let insertable: Vec<&ParsedRow> = regular
            .iter()
            .chain(pairs.iter().flat_map(|p| [&p.source, &p.dest]))
            .collect();
        accounts.resolve_all(tx, &insertable)?;
        advance(stage, ImportStage::AccountsResolved);

        // Currency consistency
        let mut regular_rows = Vec::with_capacity(regular.len());
        for row in regular {
            match currency_mismatch(&accounts, &row)? {
                Some(error) => fail_row(&mut result, request, row.row_number, &error),
                None => regular_rows.push(row),
            }
        }
        let mut transfer_pairs = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let source_error = currency_mismatch(&accounts, &pair.source)?;
            let dest_error = currency_mismatch(&accounts, &pair.dest)?;
            if source_error.is_none() && dest_error.is_none() {
                match rate_out_of_range(&accounts, &pair)? {
                    Some(error) => {
                        fail_row(&mut result, request, pair.source.row_number, &error);
                        fail_row(&mut result, request, pair.dest.row_number, &error);
                    }
                    None => transfer_pairs.push(pair),
                }
                continue;
            }
            let source_error =
                source_error.unwrap_or(RowError::CounterpartRejected(pair.dest.row_number));
            let dest_error =
                dest_error.unwrap_or(RowError::CounterpartRejected(pair.source.row_number));
            fail_row(&mut result, request, pair.source.row_number, &source_error);
            fail_row(&mut result, request, pair.dest.row_number, &dest_error);
        }
        advance(stage, ImportStage::CurrencyFiltered);

        // Categories
        let mut categories = CategoryResolver::new(user_id);
        for row in regular_rows.iter().filter(|r| !r.category.is_empty()) {
            categories.resolve(tx, &row.category, row.kind)?;
        }
        advance(stage, ImportStage::CategoriesResolved);

        // Assembly
        let mut pending = Vec::with_capacity(regular_rows.len() + transfer_pairs.len() * 2);
        for row in &regular_rows {
            let account = account_for(&accounts, &row.account)?;
            let mut transaction = new_transaction(user_id, account, row);
            if !row.category.is_empty() {
                transaction.category_id = categories.get(&row.category, row.kind);
            }
            pending.push(PendingRow {
                row_number: row.row_number,
                transaction,
            });
        }
        for pair in &transfer_pairs {
            pending.extend(assemble_transfer(&accounts, user_id, pair)?);
        }
        advance(stage, ImportStage::RowsAssembled);

        // Insert
        advance(stage, ImportStage::Inserting);
        tracing::info!(
            total_rows = pending.len(),
            regular = regular_rows.len(),
            transfer_pairs = transfer_pairs.len(),
            "starting batch insert"
        );
        result.imported = self.insert_batches(tx, &pending)?;

        result.accounts_created = accounts.into_created();
        result.categories_created = categories.into_created();
        result.failed_rows.sort_by_key(|f| f.row_number);
        Ok(result)
    }

    fn insert_batches(&self, tx: &mut dyn StoreTx, pending: &[PendingRow]) -> Result<u64> {
        let batch_size = self.settings.batch_size.max(1);
        let mut imported = 0;

        for (index, chunk) in pending.chunks(batch_size).enumerate() {
            let offset = index * batch_size;
            let batch: Vec<Transaction> = chunk.iter().map(|p| p.transaction.clone()).collect();
            match tx.insert_transactions(&batch) {
                Ok(count) => imported += count,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        batch_offset = offset,
                        batch_size = chunk.len(),
                        "batch insert failed"
                    );
                    for row in chunk.iter().take(3) {
                        let t = &row.transaction;
                        tracing::error!(
                            row_number = row.row_number,
                            account_id = %t.account_id,
                            category_id = ?t.category_id,
                            kind = %t.kind,
                            amount = %t.amount,
                            date = %t.date,
                            transfer_id = ?t.transfer_id,
                            exchange_rate = ?t.exchange_rate,
                            "sample failed row"
                        );
                    }
                    return Err(anyhow::Error::new(e)
                        .context(format!("batch insert failed at offset {}", offset)));
                }
            }
        }

        Ok(imported)
    }
}

fn advance(stage: &mut ImportStage, next: ImportStage) {
    tracing::debug!(from = %stage, to = %next, "import stage");
    *stage = next;
}

fn fail_row(result: &mut ImportResult, request: &ImportRequest, row_number: usize, error: &RowError) {
    let data = request
        .rows
        .get(row_number - 1)
        .cloned()
        .unwrap_or_default();
    result.failed_rows.push(FailedRow {
        row_number,
        data,
        error: error.to_string(),
    });
}

fn account_for<'a>(accounts: &'a AccountResolver, name: &str) -> Result<&'a Account> {
    accounts
        .get(name)
        .with_context(|| format!("account {:?} was not resolved", name))
}

fn currency_mismatch(accounts: &AccountResolver, row: &ParsedRow) -> Result<Option<RowError>> {
    let account = account_for(accounts, &row.account)?;
    if account.currency == row.currency {
        return Ok(None);
    }
    Ok(Some(RowError::CurrencyMismatch {
        account: row.account.clone(),
        account_currency: account.currency.clone(),
        row_currency: row.currency.clone(),
    }))
}

fn new_transaction(user_id: Uuid, account: &Account, row: &ParsedRow) -> Transaction {
    let mut transaction = Transaction::new(user_id, account.id, row.kind, row.abs_amount, row.date);
    transaction.description = row.description.clone();
    transaction
}

/// Both legs of a transfer, sharing one transfer id. Legs in different
/// currencies carry the implied rate dest/source.
fn assemble_transfer(
    accounts: &AccountResolver,
    user_id: Uuid,
    pair: &TransferPair,
) -> Result<[PendingRow; 2]> {
    let source_account = account_for(accounts, &pair.source.account)?;
    let dest_account = account_for(accounts, &pair.dest.account)?;

    let transfer_id = Uuid::new_v4();
    let exchange_rate = if source_account.currency != dest_account.currency {
        exchange_rate(pair.source.amount, pair.dest.amount)
    } else {
        None
    };

    let mut source = new_transaction(user_id, source_account, &pair.source);
    source.kind = TransactionKind::Expense;
    source.transfer_id = Some(transfer_id);
    source.exchange_rate = exchange_rate;

    let mut dest = new_transaction(user_id, dest_account, &pair.dest);
    dest.kind = TransactionKind::Income;
    dest.transfer_id = Some(transfer_id);
    dest.exchange_rate = exchange_rate;

    Ok([
        PendingRow {
            row_number: pair.source.row_number,
            transaction: source,
        },
        PendingRow {
            row_number: pair.dest.row_number,
            transaction: dest,
        },
    ])
}

/// A rate that does not fit DECIMAL(24,8)
fn rate_out_of_range(accounts: &AccountResolver, pair: &TransferPair) -> Result<Option<RowError>> {
    let source = account_for(accounts, &pair.source.account)?;
    let dest = account_for(accounts, &pair.dest.account)?;
    if source.currency == dest.currency {
        return Ok(None);
    }
    Ok(exchange_rate(pair.source.amount, pair.dest.amount)
        .filter(|rate| *rate >= MAX_RATE)
        .map(|rate| RowError::ExchangeRateOutOfRange(rate.to_string())))
}

/// |dest| / |source| to eight places; `None` when the source is zero
pub fn exchange_rate(source_amount: Decimal, dest_amount: Decimal) -> Option<Decimal> {
    dest_amount
        .abs()
        .checked_div(source_amount.abs())
        .map(|rate| rate.round_dp(RATE_SCALE))
}

//! DuckDB repository implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::types::{ToSql, Type};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result as StoreResult};
use crate::domain::{Account, Category, Currency, Transaction, TransactionKind, User};
use crate::migrations::MIGRATIONS;
use crate::ports::{Store, StoreTx};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

const ACCOUNT_COLUMNS: &str = "account_id, user_id, name, account_type, currency,
     opening_balance::VARCHAR, created_at::VARCHAR";

const CATEGORY_COLUMNS: &str = "category_id, user_id, parent_id, name, kind, created_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "transaction_id, user_id, account_id, category_id, kind,
     amount::VARCHAR, description, transaction_date::VARCHAR, transfer_id,
     exchange_rate::VARCHAR, created_at::VARCHAR";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    // === User operations ===

    /// Look up a user by name, creating it on first use
    pub fn ensure_user(&self, name: &str) -> Result<User> {
        let conn = self.lock()?;
        let existing = conn.query_row(
            "SELECT user_id, name FROM sys_users WHERE name = ?",
            params![name],
            |row| Ok(User { id: uuid_at(row, 0)?, name: row.get(1)? }),
        );
        match existing {
            Ok(user) => Ok(user),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                let user = User::new(name);
                conn.execute(
                    "INSERT INTO sys_users (user_id, name) VALUES (?, ?)",
                    params![user.id.to_string(), user.name],
                )?;
                Ok(user)
            }
            Err(e) => Err(e.into()),
        }
    }

    // === Currency operations ===

    pub fn get_currencies(&self) -> Result<Vec<Currency>> {
        let conn = self.lock()?;
        Ok(select_currencies(&conn)?)
    }

    pub fn add_currency(&self, currency: &Currency) -> Result<()> {
        let conn = self.lock()?;
        insert_currency(&conn, currency)?;
        Ok(())
    }

    // === Account operations ===

    /// Get all accounts of a user, ordered by name
    pub fn get_accounts(&self, user_id: Uuid) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_accounts WHERE user_id = ? ORDER BY name",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![user_id.to_string()], account_from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    pub fn get_account_by_name(&self, user_id: Uuid, name: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Ok(select_account_by_name(&conn, user_id, name)?)
    }

    pub fn add_account(&self, account: &Account) -> Result<()> {
        let conn = self.lock()?;
        insert_account(&conn, account)?;
        Ok(())
    }

    /// Income and expense totals per account, keyed by account id
    pub fn get_account_totals(&self, user_id: Uuid) -> Result<HashMap<Uuid, AccountTotals>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT account_id,
                    COALESCE(SUM(CASE WHEN kind = 'income' THEN amount END), 0)::VARCHAR,
                    COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount END), 0)::VARCHAR
             FROM sys_transactions
             WHERE user_id = ?
             GROUP BY account_id",
        )?;
        let totals = stmt
            .query_map(params![user_id.to_string()], |row| {
                Ok((
                    uuid_at(row, 0)?,
                    AccountTotals {
                        income: decimal_at(row, 1)?,
                        expense: decimal_at(row, 2)?,
                    },
                ))
            })?
            .collect::<duckdb::Result<HashMap<_, _>>>()?;
        Ok(totals)
    }

    // === Category operations ===

    /// Get all categories of a user, parents before children
    pub fn get_categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_categories WHERE user_id = ?
             ORDER BY parent_id IS NOT NULL, kind, name",
            CATEGORY_COLUMNS
        ))?;
        let categories = stmt
            .query_map(params![user_id.to_string()], category_from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(categories)
    }

    // === Transaction operations ===

    /// Get all transactions of a user, ordered by date
    pub fn get_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_transactions WHERE user_id = ?
             ORDER BY transaction_date, created_at, transaction_id",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![user_id.to_string()], transaction_from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    pub fn get_transaction_count(&self, user_id: Uuid) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_transactions WHERE user_id = ?",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Earliest and latest transaction dates of a user
    pub fn get_transaction_date_range(
        &self,
        user_id: Uuid,
    ) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let conn = self.lock()?;
        let (earliest, latest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(transaction_date)::VARCHAR, MAX(transaction_date)::VARCHAR
             FROM sys_transactions
             WHERE user_id = ?",
            params![user_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((
            earliest.as_deref().and_then(parse_date),
            latest.as_deref().and_then(parse_date),
        ))
    }

    /// One page of a user's transactions, newest first, with account and
    /// category names
    pub fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionListRow>> {
        let (clause, values) = filter.where_clause(user_id);
        let mut sql = format!(
            "SELECT t.transaction_id, t.transaction_date::VARCHAR, a.name, a.currency,
                    c.name, p.name, t.kind, t.amount::VARCHAR, t.description,
                    t.transfer_id, t.exchange_rate::VARCHAR
             FROM sys_transactions t
             JOIN sys_accounts a ON a.account_id = t.account_id
             LEFT JOIN sys_categories c ON c.category_id = t.category_id
             LEFT JOIN sys_categories p ON p.category_id = c.parent_id
             WHERE {}
             ORDER BY t.transaction_date DESC, t.created_at DESC, t.transaction_id",
            clause
        );
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if filter.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", filter.offset));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_values: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        let rows = stmt
            .query_map(param_values.as_slice(), |row| {
                let exchange_rate: Option<String> = row.get(10)?;
                Ok(TransactionListRow {
                    id: uuid_at(row, 0)?,
                    date: date_at(row, 1)?,
                    account_name: row.get(2)?,
                    currency: row.get(3)?,
                    category_name: row.get(4)?,
                    parent_category_name: row.get(5)?,
                    kind: kind_at(row, 6)?,
                    amount: decimal_at(row, 7)?,
                    description: row.get(8)?,
                    transfer_id: optional_uuid_at(row, 9)?,
                    exchange_rate: exchange_rate
                        .map(|raw| Decimal::from_str(&raw).map_err(|e| conversion_error(10, e)))
                        .transpose()?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Number of transactions matching `filter`, ignoring its limit and offset
    pub fn count_transactions(&self, user_id: Uuid, filter: &TransactionFilter) -> Result<i64> {
        let (clause, values) = filter.where_clause(user_id);
        let conn = self.lock()?;
        let param_values: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*)
                 FROM sys_transactions t
                 JOIN sys_accounts a ON a.account_id = t.account_id
                 WHERE {}",
                clause
            ),
            param_values.as_slice(),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a transaction. Deleting either leg of a transfer deletes both.
    /// Returns the number of rows removed; zero when the id is not the user's.
    pub fn delete_transaction(&self, user_id: Uuid, transaction_id: Uuid) -> Result<u64> {
        let conn = self.lock()?;
        let user = user_id.to_string();
        let id = transaction_id.to_string();
        let deleted = conn.execute(
            "DELETE FROM sys_transactions
             WHERE user_id = ?
               AND (transaction_id = ?
                    OR transfer_id = (SELECT transfer_id FROM sys_transactions
                                      WHERE transaction_id = ? AND user_id = ?))",
            params![user, id, id, user],
        )?;
        Ok(deleted as u64)
    }

    /// Transactions in a date range (inclusive) joined with everything the
    /// import file format needs: account, category names and the account
    /// on the other side of a transfer
    pub fn get_export_rows(
        &self,
        user_id: Uuid,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<ExportRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT t.transaction_date::VARCHAR, a.name, c.name, p.name, t.kind,
                    t.amount::VARCHAR, a.currency, t.description, oa.name
             FROM sys_transactions t
             JOIN sys_accounts a ON a.account_id = t.account_id
             LEFT JOIN sys_categories c ON c.category_id = t.category_id
             LEFT JOIN sys_categories p ON p.category_id = c.parent_id
             LEFT JOIN sys_transactions o
                    ON o.transfer_id = t.transfer_id AND o.transaction_id <> t.transaction_id
             LEFT JOIN sys_accounts oa ON oa.account_id = o.account_id
             WHERE t.user_id = ?
               AND t.transaction_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
             ORDER BY t.transaction_date, t.created_at, t.transaction_id",
        )?;
        let rows = stmt
            .query_map(
                params![user_id.to_string(), date_from.to_string(), date_to.to_string()],
                |row| {
                    Ok(ExportRow {
                        date: date_at(row, 0)?,
                        account_name: row.get(1)?,
                        category_name: row.get(2)?,
                        parent_category_name: row.get(3)?,
                        kind: kind_at(row, 4)?,
                        amount: decimal_at(row, 5)?,
                        currency: row.get(6)?,
                        description: row.get(7)?,
                        transfer_account_name: row.get(8)?,
                    })
                },
            )?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl Store for DuckDbRepository {
    fn begin(&self) -> StoreResult<Box<dyn StoreTx + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(Box::new(DuckDbTx { conn, finished: false }))
    }
}

/// An open DuckDB transaction holding the connection for its whole lifetime
struct DuckDbTx<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl StoreTx for DuckDbTx<'_> {
    fn list_currencies(&mut self) -> StoreResult<Vec<Currency>> {
        Ok(select_currencies(&self.conn)?)
    }

    fn create_currency(&mut self, currency: &Currency) -> StoreResult<()> {
        Ok(insert_currency(&self.conn, currency)?)
    }

    fn find_account_by_name(&mut self, user_id: Uuid, name: &str) -> StoreResult<Option<Account>> {
        Ok(select_account_by_name(&self.conn, user_id, name)?)
    }

    fn create_account(&mut self, account: &Account) -> StoreResult<()> {
        Ok(insert_account(&self.conn, account)?)
    }

    fn find_category(
        &mut self,
        user_id: Uuid,
        name: &str,
        kind: TransactionKind,
        parent_id: Option<Uuid>,
    ) -> StoreResult<Option<Category>> {
        let result = match parent_id {
            Some(parent_id) => self.conn.query_row(
                &format!(
                    "SELECT {} FROM sys_categories
                     WHERE user_id = ? AND name = ? AND kind = ? AND parent_id = ?",
                    CATEGORY_COLUMNS
                ),
                params![user_id.to_string(), name, kind.as_str(), parent_id.to_string()],
                category_from_row,
            ),
            None => self.conn.query_row(
                &format!(
                    "SELECT {} FROM sys_categories
                     WHERE user_id = ? AND name = ? AND kind = ? AND parent_id IS NULL",
                    CATEGORY_COLUMNS
                ),
                params![user_id.to_string(), name, kind.as_str()],
                category_from_row,
            ),
        };
        Ok(optional(result)?)
    }

    fn create_category(&mut self, category: &Category) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO sys_categories (category_id, user_id, parent_id, name, kind, created_at)
             VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                category.id.to_string(),
                category.user_id.to_string(),
                category.parent_id.map(|id| id.to_string()),
                category.name,
                category.kind.as_str(),
                format_timestamp(&category.created_at),
            ],
        )?;
        Ok(())
    }

    fn insert_transactions(&mut self, batch: &[Transaction]) -> StoreResult<u64> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO sys_transactions (transaction_id, user_id, account_id, category_id, kind,
                                           amount, description, transaction_date, transfer_id,
                                           exchange_rate, created_at)
             VALUES (?, ?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, CAST(? AS DATE), ?,
                     CAST(? AS DECIMAL(24, 8)), CAST(? AS TIMESTAMP))",
        )?;

        let mut inserted = 0u64;
        for tx in batch {
            inserted += stmt.execute(params![
                tx.id.to_string(),
                tx.user_id.to_string(),
                tx.account_id.to_string(),
                tx.category_id.map(|id| id.to_string()),
                tx.kind.as_str(),
                tx.amount.to_string(),
                tx.description,
                tx.date.to_string(),
                tx.transfer_id.map(|id| id.to_string()),
                tx.exchange_rate.map(|rate| rate.to_string()),
                format_timestamp(&tx.created_at),
            ])? as u64;
        }
        Ok(inserted)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for DuckDbTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "failed to roll back transaction");
            }
        }
    }
}

/// Income/expense sums for one account
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

/// Narrows `list_transactions`; empty filters match everything
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Account name, exact
    pub account: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl TransactionFilter {
    /// WHERE clause over `t` (transactions) and `a` (accounts) with its parameters
    fn where_clause(&self, user_id: Uuid) -> (String, Vec<String>) {
        let mut clauses = vec!["t.user_id = ?".to_string()];
        let mut values = vec![user_id.to_string()];
        if let Some(from) = self.date_from {
            clauses.push("t.transaction_date >= CAST(? AS DATE)".to_string());
            values.push(from.to_string());
        }
        if let Some(to) = self.date_to {
            clauses.push("t.transaction_date <= CAST(? AS DATE)".to_string());
            values.push(to.to_string());
        }
        if let Some(account) = &self.account {
            clauses.push("a.name = ?".to_string());
            values.push(account.clone());
        }
        (clauses.join(" AND "), values)
    }
}

/// One transaction as `tally transactions list` shows it
#[derive(Debug, Clone)]
pub struct TransactionListRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub account_name: String,
    pub currency: String,
    pub category_name: Option<String>,
    pub parent_category_name: Option<String>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub transfer_id: Option<Uuid>,
    pub exchange_rate: Option<Decimal>,
}

/// One transaction as it appears in an export file
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub account_name: String,
    pub category_name: Option<String>,
    pub parent_category_name: Option<String>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub transfer_account_name: Option<String>,
}

// Queries shared by the repository and open transactions

fn select_currencies(conn: &Connection) -> duckdb::Result<Vec<Currency>> {
    let mut stmt = conn.prepare("SELECT code, name, symbol FROM sys_currencies ORDER BY code")?;
    let currencies = stmt
        .query_map([], |row| {
            Ok(Currency {
                code: row.get(0)?,
                name: row.get(1)?,
                symbol: row.get(2)?,
            })
        })?
        .collect();
    currencies
}

fn insert_currency(conn: &Connection, currency: &Currency) -> duckdb::Result<()> {
    conn.execute(
        "INSERT INTO sys_currencies (code, name, symbol) VALUES (?, ?, ?)",
        params![currency.code, currency.name, currency.symbol],
    )?;
    Ok(())
}

fn select_account_by_name(
    conn: &Connection,
    user_id: Uuid,
    name: &str,
) -> duckdb::Result<Option<Account>> {
    optional(conn.query_row(
        &format!(
            "SELECT {} FROM sys_accounts WHERE user_id = ? AND name = ?",
            ACCOUNT_COLUMNS
        ),
        params![user_id.to_string(), name],
        account_from_row,
    ))
}

fn insert_account(conn: &Connection, account: &Account) -> duckdb::Result<()> {
    conn.execute(
        "INSERT INTO sys_accounts (account_id, user_id, name, account_type, currency,
                                   opening_balance, created_at)
         VALUES (?, ?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS TIMESTAMP))",
        params![
            account.id.to_string(),
            account.user_id.to_string(),
            account.name,
            account.account_type,
            account.currency,
            account.opening_balance.to_string(),
            format_timestamp(&account.created_at),
        ],
    )?;
    Ok(())
}

// Row mapping

fn account_from_row(row: &duckdb::Row) -> duckdb::Result<Account> {
    Ok(Account {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        account_type: row.get(3)?,
        currency: row.get(4)?,
        opening_balance: decimal_at(row, 5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

fn category_from_row(row: &duckdb::Row) -> duckdb::Result<Category> {
    Ok(Category {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        parent_id: optional_uuid_at(row, 2)?,
        name: row.get(3)?,
        kind: kind_at(row, 4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn transaction_from_row(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    let exchange_rate: Option<String> = row.get(9)?;
    Ok(Transaction {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        account_id: uuid_at(row, 2)?,
        category_id: optional_uuid_at(row, 3)?,
        kind: kind_at(row, 4)?,
        amount: decimal_at(row, 5)?,
        description: row.get(6)?,
        date: date_at(row, 7)?,
        transfer_id: optional_uuid_at(row, 8)?,
        exchange_rate: exchange_rate
            .map(|raw| Decimal::from_str(&raw).map_err(|e| conversion_error(9, e)))
            .transpose()?,
        created_at: timestamp_at(row, 10)?,
    })
}

// Helper functions

fn optional<T>(result: duckdb::Result<T>) -> duckdb::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_at(row: &duckdb::Row, idx: usize) -> duckdb::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn optional_uuid_at(row: &duckdb::Row, idx: usize) -> duckdb::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn decimal_at(row: &duckdb::Row, idx: usize) -> duckdb::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn date_at(row: &duckdb::Row, idx: usize) -> duckdb::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn kind_at(row: &duckdb::Row, idx: usize) -> duckdb::Result<TransactionKind> {
    let raw: String = row.get(idx)?;
    raw.parse::<TransactionKind>().map_err(|e| {
        conversion_error(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Timestamps are stored as naive UTC
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn timestamp_at(row: &duckdb::Row, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
}

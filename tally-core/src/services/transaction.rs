//! Transaction service - browse and delete stored transactions

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::{DuckDbRepository, TransactionFilter, TransactionListRow};
use crate::domain::result::Error;
use crate::domain::{Category, TransactionKind};

/// Page size when the caller gives none
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may ask for
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct TransactionEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub account: String,
    /// "Parent" or "Parent > Child"
    pub category: Option<String>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub transfer_id: Option<Uuid>,
    pub exchange_rate: Option<Decimal>,
}

impl From<TransactionListRow> for TransactionEntry {
    fn from(row: TransactionListRow) -> Self {
        let category = match (row.parent_category_name, row.category_name) {
            (Some(parent), Some(child)) => Some(Category::label(&parent, Some(&child))),
            (None, Some(name)) => Some(name),
            _ => None,
        };
        Self {
            id: row.id,
            date: row.date,
            account: row.account_name,
            category,
            kind: row.kind,
            amount: row.amount,
            currency: row.currency,
            description: row.description,
            transfer_id: row.transfer_id,
            exchange_rate: row.exchange_rate,
        }
    }
}

/// One page of transactions plus the size of the whole result
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionEntry>,
    pub total: i64,
    pub limit: usize,
    pub offset: usize,
}

/// Which transactions to list
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub account: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

pub struct TransactionService {
    repository: Arc<DuckDbRepository>,
}

impl TransactionService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// A page of a user's transactions, newest first
    pub fn list(&self, user_id: Uuid, query: &TransactionQuery) -> Result<TransactionPage> {
        if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
            if from > to {
                return Err(Error::validation(format!("invalid date range: {} is after {}", from, to)).into());
            }
        }
        if let Some(name) = &query.account {
            if self.repository.get_account_by_name(user_id, name)?.is_none() {
                return Err(Error::not_found(format!("account {:?}", name)).into());
            }
        }

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let filter = TransactionFilter {
            date_from: query.date_from,
            date_to: query.date_to,
            account: query.account.clone(),
            limit: Some(limit),
            offset: query.offset,
        };

        let total = self.repository.count_transactions(user_id, &filter)?;
        let transactions = self
            .repository
            .list_transactions(user_id, &filter)?
            .into_iter()
            .map(TransactionEntry::from)
            .collect();

        Ok(TransactionPage {
            transactions,
            total,
            limit,
            offset: query.offset,
        })
    }

    /// Delete one transaction, or both legs when it belongs to a transfer.
    /// Returns the number of rows removed.
    pub fn delete(&self, user_id: Uuid, transaction_id: Uuid) -> Result<u64> {
        let deleted = self.repository.delete_transaction(user_id, transaction_id)?;
        if deleted == 0 {
            return Err(Error::not_found(format!("transaction {}", transaction_id)).into());
        }
        tracing::info!(%transaction_id, deleted, "deleted transaction");
        Ok(deleted)
    }
}

//! Status service - per-user summary

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;

/// Status service for user summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_status(&self, user_id: Uuid) -> Result<StatusSummary> {
        let accounts = self.repository.get_accounts(user_id)?;
        let categories = self.repository.get_categories(user_id)?;
        let transaction_count = self.repository.get_transaction_count(user_id)?;
        let (earliest, latest) = self.repository.get_transaction_date_range(user_id)?;

        Ok(StatusSummary {
            total_accounts: accounts.len() as i64,
            total_categories: categories.len() as i64,
            total_transactions: transaction_count,
            date_range: DateRange {
                earliest: earliest.map(|d| d.to_string()),
                latest: latest.map(|d| d.to_string()),
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_accounts: i64,
    pub total_categories: i64,
    pub total_transactions: i64,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

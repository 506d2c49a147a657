//! Export service - transactions back out in the import file layout

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::{DuckDbRepository, ExportRow};
use crate::domain::Category;
use crate::services::import::{DateFormat, HEADER};

/// Date pattern written by the exporter
pub const EXPORT_DATE_FORMAT: &str = "dd.MM.yyyy";

#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub rows: usize,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

/// Export service for CSV exports
pub struct ExportService {
    repository: Arc<DuckDbRepository>,
}

impl ExportService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Write a user's transactions dated `date_from..=date_to` to `out`.
    ///
    /// The output is `;`-separated with a header row, dates as dd.MM.yyyy,
    /// signed amounts with two decimals and the other account of each
    /// transfer in the last column, so it can be imported again as is.
    pub fn export_csv<W: Write>(
        &self,
        user_id: Uuid,
        date_from: NaiveDate,
        date_to: NaiveDate,
        out: W,
    ) -> Result<ExportSummary> {
        if date_from > date_to {
            bail!("invalid date range: {} is after {}", date_from, date_to);
        }

        let rows = self
            .repository
            .get_export_rows(user_id, date_from, date_to)
            .context("failed to query transactions")?;

        let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(out);
        writer.write_record(HEADER).context("failed to write CSV header")?;

        let date_format = DateFormat::new(EXPORT_DATE_FORMAT);
        for row in &rows {
            writer
                .write_record(export_record(row, &date_format))
                .context("failed to write CSV row")?;
        }
        writer.flush().context("CSV write error")?;

        tracing::debug!(rows = rows.len(), %date_from, %date_to, "exported transactions");

        Ok(ExportSummary {
            rows: rows.len(),
            date_from,
            date_to,
        })
    }
}

fn export_record(row: &ExportRow, date_format: &DateFormat) -> [String; 7] {
    let category = match (&row.parent_category_name, &row.category_name) {
        (Some(parent), Some(child)) => Category::path(parent, Some(child)),
        (None, Some(name)) => name.clone(),
        _ => String::new(),
    };

    [
        date_format.format(row.date),
        row.account_name.clone(),
        category,
        format!("{:.2}", row.kind.signed(row.amount)),
        row.currency.clone(),
        row.description.clone(),
        row.transfer_account_name.clone().unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionKind;
    use rust_decimal::Decimal;

    fn export_row(kind: TransactionKind, amount: Decimal) -> ExportRow {
        ExportRow {
            date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            account_name: "Wallet".to_string(),
            category_name: Some("Restaurants".to_string()),
            parent_category_name: Some("Food".to_string()),
            kind,
            amount,
            currency: "USD".to_string(),
            description: "lunch; with team".to_string(),
            transfer_account_name: None,
        }
    }

    #[test]
    fn test_export_record_layout() {
        let format = DateFormat::new(EXPORT_DATE_FORMAT);
        let record = export_record(&export_row(TransactionKind::Expense, Decimal::new(125, 1)), &format);
        assert_eq!(record[0], "05.02.2026");
        assert_eq!(record[2], "Food\\Restaurants");
        assert_eq!(record[3], "-12.50");
        assert_eq!(record[6], "");

        let mut income = export_row(TransactionKind::Income, Decimal::new(3000, 0));
        income.parent_category_name = None;
        income.transfer_account_name = Some("Card".to_string());
        let record = export_record(&income, &format);
        assert_eq!(record[2], "Restaurants");
        assert_eq!(record[3], "3000.00");
        assert_eq!(record[6], "Card");
    }
}

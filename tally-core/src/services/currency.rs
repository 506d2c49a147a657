//! Currency service

use std::sync::Arc;

use anyhow::Result;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::Currency;

pub struct CurrencyService {
    repository: Arc<DuckDbRepository>,
}

impl CurrencyService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn list(&self) -> Result<Vec<Currency>> {
        self.repository.get_currencies()
    }

    /// Register a currency; the code must be three letters and unused
    pub fn add(&self, code: &str, name: &str, symbol: &str) -> Result<Currency> {
        let currency = Currency::new(code, name.trim(), symbol.trim());
        currency.validate().map_err(Error::validation)?;

        if self.list()?.iter().any(|c| c.code == currency.code) {
            return Err(Error::validation(format!("currency {} already exists", currency.code)).into());
        }

        self.repository.add_currency(&currency)?;
        Ok(currency)
    }
}

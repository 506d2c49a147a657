//! Account service - listing with balances and manual creation

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Account, Currency};

/// An account together with its current balance
#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    #[serde(flatten)]
    pub account: Account,
    /// Opening balance plus income minus expense
    pub balance: Decimal,
}

/// Fields for a manually created account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub account_type: String,
    pub currency: String,
    pub opening_balance: Decimal,
}

pub struct AccountService {
    repository: Arc<DuckDbRepository>,
}

impl AccountService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// All accounts of a user with computed balances, ordered by name
    pub fn list(&self, user_id: Uuid) -> Result<Vec<AccountBalance>> {
        let accounts = self.repository.get_accounts(user_id)?;
        let totals = self.repository.get_account_totals(user_id)?;

        Ok(accounts
            .into_iter()
            .map(|account| {
                let t = totals.get(&account.id).copied().unwrap_or_default();
                let balance = account.opening_balance + t.income - t.expense;
                AccountBalance { account, balance }
            })
            .collect())
    }

    /// Create an account. The name must be unused for this user and the
    /// currency must already exist.
    pub fn create(&self, user_id: Uuid, new: NewAccount) -> Result<Account> {
        let mut account = Account::new(user_id, new.name.trim(), &new.currency);
        account.account_type = new.account_type.trim().to_string();
        account.opening_balance = new.opening_balance;
        account.validate().map_err(Error::validation)?;

        if self.repository.get_account_by_name(user_id, &account.name)?.is_some() {
            return Err(Error::validation(format!("account {:?} already exists", account.name)).into());
        }
        let known = self.repository.get_currencies()?;
        if !known.iter().any(|c: &Currency| c.code == account.currency) {
            return Err(Error::not_found(format!("currency {}", account.currency)).into());
        }

        self.repository
            .add_account(&account)
            .with_context(|| format!("failed to create account {:?}", account.name))?;
        Ok(account)
    }
}

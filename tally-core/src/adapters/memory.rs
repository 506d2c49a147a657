//! In-memory store for unit tests
//!
//! Writes go to a copy of the committed state and replace it on commit,
//! so an abandoned transaction leaves nothing behind.

use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Category, Currency, Transaction, TransactionKind};
use crate::ports::{Store, StoreTx};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub currencies: Vec<Currency>,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// Zero-based index of the insert call that fails
    fail_batch: Option<usize>,
}

impl MemoryStore {
    pub fn with_currencies(codes: &[(&str, &str)]) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.currencies = codes
                .iter()
                .map(|(code, symbol)| Currency::new(code, *code, *symbol))
                .collect();
        }
        store
    }

    pub fn failing_batch(mut self, index: usize) -> Self {
        self.fail_batch = Some(index);
        self
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Store for MemoryStore {
    fn begin(&self) -> Result<Box<dyn StoreTx + '_>> {
        let working = self
            .state
            .lock()
            .map_err(|e| Error::database(e.to_string()))?
            .clone();
        Ok(Box::new(MemoryTx {
            store: self,
            working,
            batches: 0,
        }))
    }
}

struct MemoryTx<'a> {
    store: &'a MemoryStore,
    working: MemoryState,
    batches: usize,
}

impl StoreTx for MemoryTx<'_> {
    fn list_currencies(&mut self) -> Result<Vec<Currency>> {
        Ok(self.working.currencies.clone())
    }

    fn create_currency(&mut self, currency: &Currency) -> Result<()> {
        if self.working.currencies.iter().any(|c| c.code == currency.code) {
            return Err(Error::database(format!("duplicate currency {}", currency.code)));
        }
        self.working.currencies.push(currency.clone());
        Ok(())
    }

    fn find_account_by_name(&mut self, user_id: Uuid, name: &str) -> Result<Option<Account>> {
        Ok(self
            .working
            .accounts
            .iter()
            .find(|a| a.user_id == user_id && a.name == name)
            .cloned())
    }

    fn create_account(&mut self, account: &Account) -> Result<()> {
        self.working.accounts.push(account.clone());
        Ok(())
    }

    fn find_category(
        &mut self,
        user_id: Uuid,
        name: &str,
        kind: TransactionKind,
        parent_id: Option<Uuid>,
    ) -> Result<Option<Category>> {
        Ok(self
            .working
            .categories
            .iter()
            .find(|c| {
                c.user_id == user_id && c.name == name && c.kind == kind && c.parent_id == parent_id
            })
            .cloned())
    }

    fn create_category(&mut self, category: &Category) -> Result<()> {
        self.working.categories.push(category.clone());
        Ok(())
    }

    fn insert_transactions(&mut self, batch: &[Transaction]) -> Result<u64> {
        let index = self.batches;
        self.batches += 1;
        if self.store.fail_batch == Some(index) {
            return Err(Error::database(format!("injected failure on batch {}", index)));
        }
        self.working.transactions.extend_from_slice(batch);
        Ok(batch.len() as u64)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let store = self.store;
        let mut state = store
            .state
            .lock()
            .map_err(|e| Error::database(e.to_string()))?;
        *state = self.working;
        Ok(())
    }
}

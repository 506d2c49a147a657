//! Account and category resolution with per-import caches

use std::collections::HashMap;

use anyhow::{Context, Result};
use uuid::Uuid;

use super::parse::ParsedRow;
use crate::domain::{Account, Category, TransactionKind};
use crate::ports::StoreTx;

/// Looks up or creates accounts by name for one user
pub struct AccountResolver {
    user_id: Uuid,
    cache: HashMap<String, Account>,
    created: Vec<String>,
}

impl AccountResolver {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            cache: HashMap::new(),
            created: Vec::new(),
        }
    }

    /// Resolve every account named by `rows`, either as the row's own account
    /// or as its transfer target.
    ///
    /// A missing account is created as a zero-balance bank account in the
    /// currency of the first row that names it as its own account.
    pub fn resolve_all(&mut self, tx: &mut dyn StoreTx, rows: &[&ParsedRow]) -> Result<()> {
        for row in rows {
            self.resolve(tx, &row.account, rows)?;
            if row.is_transfer_candidate() {
                self.resolve(tx, &row.transfer, rows)?;
            }
        }
        Ok(())
    }

    fn resolve(&mut self, tx: &mut dyn StoreTx, name: &str, rows: &[&ParsedRow]) -> Result<()> {
        if self.cache.contains_key(name) {
            return Ok(());
        }

        let existing = tx
            .find_account_by_name(self.user_id, name)
            .with_context(|| format!("failed to lookup account {:?}", name))?;

        let account = match existing {
            Some(account) => account,
            None => {
                let currency = rows
                    .iter()
                    .find(|row| row.account == name)
                    .map(|row| row.currency.as_str())
                    .with_context(|| format!("no row carries a currency for account {:?}", name))?;
                let account = Account::new(self.user_id, name, currency);
                tx.create_account(&account)
                    .with_context(|| format!("failed to create account {:?}", name))?;
                tracing::debug!(account = %account.id, currency = %account.currency, "created account");
                self.created.push(name.to_string());
                account
            }
        };

        self.cache.insert(name.to_string(), account);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.cache.get(name)
    }

    /// Names of accounts created so far, in creation order
    pub fn into_created(self) -> Vec<String> {
        self.created
    }
}

/// Looks up or creates categories by path for one user
pub struct CategoryResolver {
    user_id: Uuid,
    /// "path|kind" -> leaf category id
    cache: HashMap<String, Uuid>,
    created: Vec<String>,
}

impl CategoryResolver {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            cache: HashMap::new(),
            created: Vec::new(),
        }
    }

    fn cache_key(path: &str, kind: TransactionKind) -> String {
        format!("{}|{}", path, kind)
    }

    /// Resolve a `Parent` or `Parent\Child` path to the leaf category id.
    ///
    /// Returns `None` for a path with no usable segment.
    pub fn resolve(
        &mut self,
        tx: &mut dyn StoreTx,
        path: &str,
        kind: TransactionKind,
    ) -> Result<Option<Uuid>> {
        let key = Self::cache_key(path, kind);
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(*id));
        }

        let Some((parent_name, child_name)) = Category::split_path(path) else {
            return Ok(None);
        };

        let parent = self
            .find_or_create(tx, parent_name, kind, None)
            .with_context(|| format!("failed to resolve category {:?}", path))?;
        if parent.1 {
            self.created.push(Category::label(parent_name, None));
        }

        let leaf_id = match child_name {
            None => parent.0,
            Some(child_name) => {
                let child = self
                    .find_or_create(tx, child_name, kind, Some(parent.0))
                    .with_context(|| format!("failed to resolve category {:?}", path))?;
                if child.1 {
                    self.created.push(Category::label(parent_name, Some(child_name)));
                }
                child.0
            }
        };

        self.cache.insert(key, leaf_id);
        Ok(Some(leaf_id))
    }

    /// Cached leaf id of an already resolved path
    pub fn get(&self, path: &str, kind: TransactionKind) -> Option<Uuid> {
        self.cache.get(&Self::cache_key(path, kind)).copied()
    }

    /// Returns the category id and whether it was created
    fn find_or_create(
        &self,
        tx: &mut dyn StoreTx,
        name: &str,
        kind: TransactionKind,
        parent_id: Option<Uuid>,
    ) -> Result<(Uuid, bool)> {
        if let Some(existing) = tx.find_category(self.user_id, name, kind, parent_id)? {
            return Ok((existing.id, false));
        }
        let category = Category::new(self.user_id, name, kind, parent_id);
        tx.create_category(&category)?;
        Ok((category.id, true))
    }

    /// Labels of categories created so far ("Parent" or "Parent > Child")
    pub fn into_created(self) -> Vec<String> {
        self.created
    }
}

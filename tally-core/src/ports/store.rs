//! Store port - transactional persistence abstraction used by the import

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Category, Currency, Transaction, TransactionKind};

/// A persistence backend that can open transactions
///
/// Implementations (adapters) provide the actual database access logic.
pub trait Store: Send + Sync {
    /// Begin a transaction. Nothing written through the returned handle is
    /// visible to other callers until [`StoreTx::commit`]; dropping the handle
    /// without committing rolls everything back.
    fn begin(&self) -> Result<Box<dyn StoreTx + '_>>;
}

/// Operations available inside one open transaction
///
/// Lookups return `Ok(None)` when nothing matches. Any `Err` means the
/// transaction can no longer be trusted and the caller should abandon it.
pub trait StoreTx {
    // === Currencies ===

    /// List every known currency
    fn list_currencies(&mut self) -> Result<Vec<Currency>>;

    /// Register a new currency
    fn create_currency(&mut self, currency: &Currency) -> Result<()>;

    // === Accounts ===

    /// Find a user's account by exact name
    fn find_account_by_name(&mut self, user_id: Uuid, name: &str) -> Result<Option<Account>>;

    /// Create an account
    fn create_account(&mut self, account: &Account) -> Result<()>;

    // === Categories ===

    /// Find a user's category by name and kind under `parent_id`
    /// (`None` matches top-level categories only)
    fn find_category(
        &mut self,
        user_id: Uuid,
        name: &str,
        kind: TransactionKind,
        parent_id: Option<Uuid>,
    ) -> Result<Option<Category>>;

    /// Create a category
    fn create_category(&mut self, category: &Category) -> Result<()>;

    // === Transactions ===

    /// Insert a batch of transactions, returning how many rows were written
    fn insert_transactions(&mut self, batch: &[Transaction]) -> Result<u64>;

    // === Lifecycle ===

    /// Make every write in this transaction durable
    fn commit(self: Box<Self>) -> Result<()>;
}

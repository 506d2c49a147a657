//! Integration tests for tally-core services
//!
//! These tests verify import/export behavior end to end using real DuckDB.
//! Store failures are injected at the trait level, never by mocking SQL.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use tally_core::adapters::duckdb::DuckDbRepository;
use tally_core::domain::result::{Error, Result as StoreResult};
use tally_core::domain::{
    Account, Category, Currency, Transaction, TransactionKind, AMOUNT_SCALE, RATE_SCALE,
};
use tally_core::ports::{Store, StoreTx};
use tally_core::services::import::{DateFormat, DecimalSeparator, FormatHints};
use tally_core::services::{
    AccountService, CategoryService, CurrencyService, ExportService, ImportFile, ImportRequest,
    ImportService, ImportSettings, NewAccount, RawImportRow, StatusService, TransactionQuery,
    TransactionService,
};
use tally_core::TallyContext;

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn row(date: &str, account: &str, category: &str, total: &str, currency: &str, transfer: &str) -> RawImportRow {
    RawImportRow {
        date: date.to_string(),
        account: account.to_string(),
        category: category.to_string(),
        total: total.to_string(),
        currency: currency.to_string(),
        description: String::new(),
        transfer: transfer.to_string(),
    }
}

fn request(rows: Vec<RawImportRow>) -> ImportRequest {
    ImportRequest {
        date_format: DateFormat::new("dd.MM.yyyy"),
        decimal_separator: DecimalSeparator::Dot,
        rows,
        ..Default::default()
    }
}

fn import_service(repo: &Arc<DuckDbRepository>) -> ImportService {
    ImportService::new(repo.clone(), ImportSettings::default())
}

/// Delegates to DuckDB but fails one chosen insert batch
struct FailingStore {
    inner: Arc<DuckDbRepository>,
    fail_batch: usize,
}

struct FailingTx<'a> {
    inner: Box<dyn StoreTx + 'a>,
    fail_batch: usize,
    batches: usize,
}

impl Store for FailingStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreTx + '_>> {
        Ok(Box::new(FailingTx {
            inner: self.inner.begin()?,
            fail_batch: self.fail_batch,
            batches: 0,
        }))
    }
}

impl StoreTx for FailingTx<'_> {
    fn list_currencies(&mut self) -> StoreResult<Vec<Currency>> {
        self.inner.list_currencies()
    }

    fn create_currency(&mut self, currency: &Currency) -> StoreResult<()> {
        self.inner.create_currency(currency)
    }

    fn find_account_by_name(&mut self, user_id: Uuid, name: &str) -> StoreResult<Option<Account>> {
        self.inner.find_account_by_name(user_id, name)
    }

    fn create_account(&mut self, account: &Account) -> StoreResult<()> {
        self.inner.create_account(account)
    }

    fn find_category(
        &mut self,
        user_id: Uuid,
        name: &str,
        kind: TransactionKind,
        parent_id: Option<Uuid>,
    ) -> StoreResult<Option<Category>> {
        self.inner.find_category(user_id, name, kind, parent_id)
    }

    fn create_category(&mut self, category: &Category) -> StoreResult<()> {
        self.inner.create_category(category)
    }

    fn insert_transactions(&mut self, batch: &[Transaction]) -> StoreResult<u64> {
        let index = self.batches;
        self.batches += 1;
        if index == self.fail_batch {
            return Err(Error::database("disk full"));
        }
        self.inner.insert_transactions(batch)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit()
    }
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_same_currency_transfer() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();

    let result = import_service(&repo)
        .import(
            user.id,
            &request(vec![
                row("20.02.2026", "A", "", "-1000", "USD", "B"),
                row("20.02.2026", "B", "", "1000", "USD", "A"),
            ]),
        )
        .unwrap();

    assert_eq!(result.imported, 2);
    assert!(result.failed_rows.is_empty());
    assert_eq!(result.accounts_created, vec!["A", "B"]);

    let a = repo.get_account_by_name(user.id, "A").unwrap().unwrap();
    let b = repo.get_account_by_name(user.id, "B").unwrap().unwrap();
    assert_eq!(a.account_type, "bank");
    assert_eq!(a.opening_balance, Decimal::ZERO);

    let transactions = repo.get_transactions(user.id).unwrap();
    assert_eq!(transactions.len(), 2);
    let source = transactions.iter().find(|t| t.account_id == a.id).unwrap();
    let dest = transactions.iter().find(|t| t.account_id == b.id).unwrap();
    assert_eq!(source.kind, TransactionKind::Expense);
    assert_eq!(dest.kind, TransactionKind::Income);
    assert_eq!(source.amount, dec("1000.00"));
    assert!(source.transfer_id.is_some());
    assert_eq!(source.transfer_id, dest.transfer_id);
    assert_eq!(source.exchange_rate, None);
    assert_eq!(dest.exchange_rate, None);
}

#[test]
fn test_cross_currency_transfer_stores_rate() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();

    let result = import_service(&repo)
        .import(
            user.id,
            &request(vec![
                row("20.02.2026", "Rubles", "", "-50000", "₽", "Drams"),
                row("20.02.2026", "Drams", "", "237500", "AMD", "Rubles"),
            ]),
        )
        .unwrap();
    assert_eq!(result.imported, 2);

    let transactions = repo.get_transactions(user.id).unwrap();
    assert_eq!(transactions.len(), 2);
    for t in &transactions {
        assert_eq!(t.exchange_rate, Some(dec("4.75000000")));
        assert_eq!(t.exchange_rate.map(|rate| rate.scale()), Some(RATE_SCALE));
        assert_eq!(t.amount.scale(), AMOUNT_SCALE);
    }
}

#[test]
fn test_categories_created_once_across_imports() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();
    let service = import_service(&repo);

    let rows = vec![
        row("01.02.2026", "Wallet", "Food\\Restaurants", "-10", "USD", ""),
        row("02.02.2026", "Wallet", "Food\\Restaurants", "-20", "USD", ""),
    ];
    let first = service.import(user.id, &request(rows.clone())).unwrap();
    assert_eq!(first.categories_created, vec!["Food", "Food > Restaurants"]);

    let second = service.import(user.id, &request(rows)).unwrap();
    assert!(second.categories_created.is_empty());
    assert!(second.accounts_created.is_empty());

    let categories = repo.get_categories(user.id).unwrap();
    assert_eq!(categories.len(), 2);

    let transactions = repo.get_transactions(user.id).unwrap();
    assert_eq!(transactions.len(), 4);
    let leaf = transactions[0].category_id;
    assert!(leaf.is_some());
    assert!(transactions.iter().all(|t| t.category_id == leaf));
}

#[test]
fn test_users_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let alice = repo.ensure_user("alice").unwrap();
    let bob = repo.ensure_user("bob").unwrap();
    let service = import_service(&repo);

    service
        .import(alice.id, &request(vec![row("01.02.2026", "Wallet", "Food", "-1", "USD", "")]))
        .unwrap();
    let result = service
        .import(bob.id, &request(vec![row("01.02.2026", "Wallet", "Food", "-1", "RUB", "")]))
        .unwrap();

    // Same account name under another user resolves independently
    assert_eq!(result.imported, 1);
    assert_eq!(result.accounts_created, vec!["Wallet"]);
    assert_eq!(result.categories_created, vec!["Food"]);
    assert_eq!(repo.get_accounts(bob.id).unwrap()[0].currency, "RUB");
}

#[test]
fn test_batch_failure_rolls_back_everything() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();

    let store = Arc::new(FailingStore {
        inner: repo.clone(),
        fail_batch: 1,
    });
    let service = ImportService::new(store, ImportSettings { batch_size: 2 });

    let mut req = request(vec![
        row("01.02.2026", "Lari", "Food", "-1", "GEL", ""),
        row("02.02.2026", "Wallet", "Food", "-2", "USD", ""),
        row("03.02.2026", "Wallet", "Rent", "-3", "USD", ""),
        row("04.02.2026", "Wallet", "Salary", "4", "USD", ""),
        row("05.02.2026", "Wallet", "", "-5", "USD", ""),
        row("06.02.2026", "Wallet", "", "-6", "USD", ""),
    ]);
    req.new_currencies.push(Currency::new("XTS", "Test Currency", "¤"));

    let err = service.import(user.id, &req).unwrap_err();
    assert!(err.to_string().contains("batch insert failed at offset 2"));

    assert_eq!(repo.get_transaction_count(user.id).unwrap(), 0);
    assert!(repo.get_accounts(user.id).unwrap().is_empty());
    assert!(repo.get_categories(user.id).unwrap().is_empty());
    assert!(!repo.get_currencies().unwrap().iter().any(|c| c.code == "XTS"));

    // The connection is usable again after the rollback
    let result = import_service(&repo).import(user.id, &req).unwrap();
    assert_eq!(result.imported, 6);
    assert_eq!(result.currencies_created, vec!["XTS"]);
}

#[test]
fn test_concurrent_imports_for_different_users() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                let user = repo.ensure_user(&format!("user{}", i)).unwrap();
                let rows = (1..=20)
                    .map(|day| row(&format!("{:02}.01.2026", day), "Wallet", "Food", "-1", "USD", ""))
                    .collect();
                let result = import_service(&repo).import(user.id, &request(rows)).unwrap();
                (user.id, result.imported)
            })
        })
        .collect();

    for handle in handles {
        let (user_id, imported) = handle.join().unwrap();
        assert_eq!(imported, 20);
        assert_eq!(repo.get_transaction_count(user_id).unwrap(), 20);
        assert_eq!(repo.get_categories(user_id).unwrap().len(), 1);
    }
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_then_import_reproduces_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let alice = repo.ensure_user("alice").unwrap();
    let bob = repo.ensure_user("bob").unwrap();

    let mut lunch = row("05.02.2026", "Wallet", "Food\\Restaurants", "-12.5", "USD", "");
    lunch.description = "lunch; with \"team\"".to_string();
    import_service(&repo)
        .import(
            alice.id,
            &request(vec![
                lunch,
                row("06.02.2026", "Wallet", "Salary", "3000", "USD", ""),
                row("07.02.2026", "Wallet", "", "-100", "USD", "Drams"),
                row("07.02.2026", "Drams", "", "47500", "AMD", "Wallet"),
                row("01.03.2026", "Wallet", "Food", "-1", "USD", ""),
            ]),
        )
        .unwrap();

    let mut buffer = Vec::new();
    let summary = ExportService::new(repo.clone())
        .export_csv(
            alice.id,
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
            &mut buffer,
        )
        .unwrap();
    assert_eq!(summary.rows, 4);

    let content = String::from_utf8(buffer).unwrap();
    assert!(content.starts_with("date;account;category;total;currency;description;transfer"));
    assert!(content.contains("05.02.2026;Wallet;Food\\Restaurants;-12.50;USD;"));
    assert!(content.contains("07.02.2026;Drams;;47500.00;AMD;;Wallet"));

    let file = ImportFile::parse(&content, &FormatHints::default()).unwrap();
    assert_eq!(file.decimal_separator, DecimalSeparator::Dot);
    let result = import_service(&repo)
        .import(
            bob.id,
            &ImportRequest {
                date_format: file.date_format.clone(),
                decimal_separator: file.decimal_separator,
                rows: file.rows.clone(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(result.imported, 4);
    assert!(result.failed_rows.is_empty());

    let project = |user_id: Uuid| {
        let accounts = repo.get_accounts(user_id).unwrap();
        let name = |id: Uuid| accounts.iter().find(|a| a.id == id).unwrap().name.clone();
        let mut view: Vec<_> = repo
            .get_transactions(user_id)
            .unwrap()
            .into_iter()
            .map(|t| {
                let is_transfer = t.is_transfer();
                (t.date, name(t.account_id), t.kind, t.amount, t.description, t.exchange_rate, is_transfer)
            })
            .collect();
        view.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
        view
    };
    let mut original = project(alice.id);
    original.retain(|t| t.0 < NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    assert_eq!(project(bob.id), original);
}

#[test]
fn test_export_rejects_inverted_range() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();

    let result = ExportService::new(repo).export_csv(
        user.id,
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        Vec::new(),
    );
    assert!(result.is_err());
}

#[test]
fn test_oversized_amount_fails_its_row_not_the_import() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();

    let result = import_service(&repo)
        .import(
            user.id,
            &request(vec![
                row("01.02.2026", "Wallet", "", "-10", "USD", ""),
                row("01.02.2026", "Wallet", "", "100000000000000000000", "USD", ""),
                row("02.02.2026", "Wallet", "", "9999999999999999.99", "USD", ""),
            ]),
        )
        .unwrap();

    assert_eq!(result.imported, 2);
    assert_eq!(result.failed_rows.len(), 1);
    assert_eq!(result.failed_rows[0].row_number, 2);
    assert_eq!(repo.get_transaction_count(user.id).unwrap(), 2);
}

// ============================================================================
// Transactions
// ============================================================================

fn seed_transactions(repo: &Arc<DuckDbRepository>, user_id: Uuid) {
    import_service(repo)
        .import(
            user_id,
            &request(vec![
                row("01.02.2026", "Wallet", "Food\\Groceries", "-10", "USD", ""),
                row("02.02.2026", "Wallet", "Salary", "100", "USD", ""),
                row("03.02.2026", "Card", "", "-7.50", "USD", ""),
                row("04.02.2026", "Wallet", "", "-40", "USD", "Card"),
                row("04.02.2026", "Card", "", "40", "USD", "Wallet"),
            ]),
        )
        .unwrap();
}

#[test]
fn test_transaction_list_filters_and_pages() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();
    seed_transactions(&repo, user.id);
    let service = TransactionService::new(repo.clone());

    let all = service.list(user.id, &TransactionQuery::default()).unwrap();
    assert_eq!(all.total, 5);
    assert_eq!(all.transactions.len(), 5);
    assert_eq!(all.transactions[0].date, NaiveDate::from_ymd_opt(2026, 2, 4).unwrap());
    assert_eq!(all.transactions[4].category.as_deref(), Some("Food > Groceries"));
    assert_eq!(all.transactions[4].amount, dec("10.00"));

    let wallet = service
        .list(
            user.id,
            &TransactionQuery {
                account: Some("Wallet".to_string()),
                date_from: NaiveDate::from_ymd_opt(2026, 2, 2),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(wallet.total, 2);
    assert!(wallet.transactions.iter().all(|t| t.account == "Wallet"));

    let page = service
        .list(
            user.id,
            &TransactionQuery {
                limit: Some(2),
                offset: 2,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.limit, 2);
    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page.transactions[0].id, all.transactions[2].id);

    let other = repo.ensure_user("bob").unwrap();
    assert_eq!(service.list(other.id, &TransactionQuery::default()).unwrap().total, 0);
}

#[test]
fn test_transaction_list_rejects_bad_filters() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();
    let service = TransactionService::new(repo);

    let inverted = service.list(
        user.id,
        &TransactionQuery {
            date_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..Default::default()
        },
    );
    assert!(inverted.unwrap_err().to_string().contains("invalid date range"));

    let unknown = service.list(
        user.id,
        &TransactionQuery {
            account: Some("Nowhere".to_string()),
            ..Default::default()
        },
    );
    assert!(unknown.unwrap_err().to_string().contains("Not found"));
}

#[test]
fn test_delete_regular_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();
    seed_transactions(&repo, user.id);
    let service = TransactionService::new(repo.clone());

    let target = repo
        .get_transactions(user.id)
        .unwrap()
        .into_iter()
        .find(|t| !t.is_transfer())
        .unwrap();
    assert_eq!(service.delete(user.id, target.id).unwrap(), 1);
    assert_eq!(repo.get_transaction_count(user.id).unwrap(), 4);

    let again = service.delete(user.id, target.id);
    assert!(again.unwrap_err().to_string().contains("Not found"));
}

#[test]
fn test_delete_transfer_leg_removes_both_legs() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();
    seed_transactions(&repo, user.id);
    let service = TransactionService::new(repo.clone());

    let transactions = repo.get_transactions(user.id).unwrap();
    let legs: Vec<&Transaction> = transactions.iter().filter(|t| t.is_transfer()).collect();
    assert_eq!(legs.len(), 2);

    // Another user cannot delete it
    let bob = repo.ensure_user("bob").unwrap();
    assert!(service.delete(bob.id, legs[1].id).is_err());

    assert_eq!(service.delete(user.id, legs[1].id).unwrap(), 2);
    let left = repo.get_transactions(user.id).unwrap();
    assert_eq!(left.len(), 3);
    assert!(left.iter().all(|t| !t.is_transfer()));
}

// ============================================================================
// Accounts, currencies, categories, status
// ============================================================================

#[test]
fn test_account_balances() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();
    let accounts = AccountService::new(repo.clone());

    accounts
        .create(
            user.id,
            NewAccount {
                name: "Savings".to_string(),
                account_type: "deposit".to_string(),
                currency: "eur".to_string(),
                opening_balance: dec("100.00"),
            },
        )
        .unwrap();

    import_service(&repo)
        .import(
            user.id,
            &request(vec![
                row("01.02.2026", "Savings", "", "50", "EUR", ""),
                row("02.02.2026", "Savings", "", "-30.25", "EUR", ""),
            ]),
        )
        .unwrap();

    let listed = accounts.list(user.id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].account.account_type, "deposit");
    assert_eq!(listed[0].balance, dec("119.75"));

    let duplicate = accounts.create(
        user.id,
        NewAccount {
            name: "Savings".to_string(),
            account_type: "bank".to_string(),
            currency: "EUR".to_string(),
            opening_balance: Decimal::ZERO,
        },
    );
    assert!(duplicate.unwrap_err().to_string().contains("already exists"));

    let unknown_currency = accounts.create(
        user.id,
        NewAccount {
            name: "Other".to_string(),
            account_type: "bank".to_string(),
            currency: "XXX".to_string(),
            opening_balance: Decimal::ZERO,
        },
    );
    assert!(unknown_currency.is_err());
}

#[test]
fn test_currency_add_validates() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let currencies = CurrencyService::new(repo);

    assert!(currencies.list().unwrap().iter().any(|c| c.code == "AMD"));

    let added = currencies.add("thb", "Thai Baht", "฿").unwrap();
    assert_eq!(added.code, "THB");
    assert!(currencies.add("THB", "Thai Baht", "฿").is_err());
    assert!(currencies.add("BAHT", "Thai Baht", "฿").is_err());
}

#[test]
fn test_category_labels_and_status() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let user = repo.ensure_user("alice").unwrap();

    import_service(&repo)
        .import(
            user.id,
            &request(vec![
                row("03.02.2026", "Wallet", "Food\\Groceries", "-10", "USD", ""),
                row("01.02.2026", "Wallet", "Salary", "100", "USD", ""),
            ]),
        )
        .unwrap();

    let labels: Vec<String> = CategoryService::new(repo.clone())
        .list(user.id)
        .unwrap()
        .into_iter()
        .map(|c| format!("{}:{}", c.kind, c.label))
        .collect();
    assert_eq!(labels, vec!["expense:Food", "expense:Food > Groceries", "income:Salary"]);

    let status = StatusService::new(repo).get_status(user.id).unwrap();
    assert_eq!(status.total_accounts, 1);
    assert_eq!(status.total_categories, 3);
    assert_eq!(status.total_transactions, 2);
    assert_eq!(status.date_range.earliest.as_deref(), Some("2026-02-01"));
    assert_eq!(status.date_range.latest.as_deref(), Some("2026-02-03"));
}

#[test]
fn test_context_opens_fresh_directory() {
    let temp_dir = TempDir::new().unwrap();
    let tally_dir = temp_dir.path().join("nested").join(".tally");

    let ctx = TallyContext::new(&tally_dir, Some("carol")).unwrap();
    assert_eq!(ctx.user.name, "carol");
    assert!(tally_dir.join("tally.duckdb").exists());

    let status = ctx.status_service.get_status(ctx.user.id).unwrap();
    assert_eq!(status.total_transactions, 0);
    assert_eq!(status.date_range.earliest, None);
}

//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod category;
mod currency;
mod transaction;
mod user;
pub mod result;

pub use account::Account;
pub use category::Category;
pub use currency::Currency;
pub use transaction::{Transaction, TransactionKind, AMOUNT_SCALE, RATE_SCALE};
pub use user::User;

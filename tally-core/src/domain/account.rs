//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Currency;

/// Account type given to accounts created on demand by an import
pub const DEFAULT_ACCOUNT_TYPE: &str = "bank";

/// A financial account owned by a user
///
/// Names are unique per user. The currency is fixed at creation time and
/// every transaction recorded against the account is in that currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Freeform type: "bank", "cash", "credit", ...
    pub account_type: String,
    /// Currency code, normalized to uppercase
    pub currency: String,
    pub opening_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new bank account with a zero opening balance
    pub fn new(user_id: Uuid, name: impl Into<String>, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            account_type: DEFAULT_ACCOUNT_TYPE.to_string(),
            currency: Currency::normalize_code(currency),
            opening_balance: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("account name cannot be empty");
        }
        if self.currency.trim().is_empty() {
            return Err("currency cannot be empty");
        }
        if self.account_type.trim().is_empty() {
            return Err("account type cannot be empty");
        }
        Ok(())
    }
}

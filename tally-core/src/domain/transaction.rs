//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fractional digits kept for transaction amounts
pub const AMOUNT_SCALE: u32 = 2;

/// Fractional digits kept for transfer exchange rates
pub const RATE_SCALE: u32 = 8;

/// Direction of a transaction relative to its account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Derive the kind from a signed amount: strictly positive is income,
    /// everything else (including zero) is an expense
    pub fn from_amount(amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            Self::Income
        } else {
            Self::Expense
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Apply the kind's sign to an unsigned amount
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown transaction kind: {}", other)),
        }
    }
}

/// A single financial transaction belonging to an account
///
/// The amount is always unsigned; the sign lives in `kind`. Both legs of a
/// transfer share a `transfer_id` and, for cross-currency transfers, the
/// implied `exchange_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub transfer_id: Option<Uuid>,
    pub exchange_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(
        user_id: Uuid,
        account_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            account_id,
            category_id: None,
            kind,
            amount: amount.abs().round_dp(AMOUNT_SCALE),
            description: String::new(),
            date,
            transfer_id: None,
            exchange_rate: None,
            created_at: Utc::now(),
        }
    }

    /// Signed amount (negative for expenses)
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    pub fn is_transfer(&self) -> bool {
        self.transfer_id.is_some()
    }
}

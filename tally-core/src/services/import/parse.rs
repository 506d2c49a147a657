//! Row parsing: raw text cells to typed rows

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::RawImportRow;
use crate::domain::{Currency, TransactionKind, AMOUNT_SCALE};

/// 10^16; amounts are stored as DECIMAL(18,2)
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// Characters removed from amounts before parsing
const AMOUNT_NOISE: &[char] = &['$', '€', '£', '¥', '₽'];

/// A per-row failure. The display string is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid date {0:?}")]
    InvalidDate(String),

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("unresolved currency {0:?}: no matching currency found")]
    UnresolvedCurrency(String),

    #[error("transfer pair not found")]
    TransferPairNotFound,

    #[error("transfer pair has same sign amounts")]
    TransferSameSign,

    #[error("currency mismatch: account {account:?} has currency {account_currency} but row has {row_currency}")]
    CurrencyMismatch {
        account: String,
        account_currency: String,
        row_currency: String,
    },

    #[error("exchange rate {0} out of range")]
    ExchangeRateOutOfRange(String),

    #[error("transfer counterpart row {0} rejected")]
    CounterpartRejected(usize),
}

/// Decimal separator convention of the amount column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalSeparator {
    /// `1,000.50`
    #[default]
    Dot,
    /// `1.000,50`
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(&self) -> char {
        match self {
            Self::Dot => '.',
            Self::Comma => ',',
        }
    }
}

impl FromStr for DecimalSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "." => Ok(Self::Dot),
            "," => Ok(Self::Comma),
            other => Err(format!("decimal separator must be ',' or '.', got {:?}", other)),
        }
    }
}

/// A date pattern written with `yyyy`, `MM` and `dd` tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    chrono: String,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Self {
        let chrono = pattern
            .replace('%', "%%")
            .replace("yyyy", "%Y")
            .replace("MM", "%m")
            .replace("dd", "%d");
        Self {
            pattern: pattern.to_string(),
            chrono,
        }
    }

    /// The pattern as given (`dd.MM.yyyy`)
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parse a date; `yyyy` needs exactly four digits, `MM` and `dd` one or two
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if !fits_widths(&self.pattern, raw) {
            return None;
        }
        NaiveDate::parse_from_str(raw, &self.chrono).ok()
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.format(&self.chrono).to_string()
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self::new("dd.MM.yyyy")
    }
}

fn fits_widths(mut pattern: &str, mut raw: &str) -> bool {
    while let Some(c) = pattern.chars().next() {
        let (token, min, max) = if pattern.starts_with("yyyy") {
            (4, 4, 4)
        } else if pattern.starts_with("MM") || pattern.starts_with("dd") {
            (2, 1, 2)
        } else {
            match raw.strip_prefix(c) {
                Some(rest) => raw = rest,
                None => return false,
            }
            pattern = &pattern[c.len_utf8()..];
            continue;
        };

        let digits = raw.bytes().take_while(u8::is_ascii_digit).take(max).count();
        if digits < min {
            return false;
        }
        raw = &raw[digits..];
        pattern = &pattern[token..];
    }
    raw.is_empty()
}

/// Everything a row needs to be parsed, fixed for one import call
pub struct ParseContext<'a> {
    pub date_format: &'a DateFormat,
    pub decimal_separator: DecimalSeparator,
    pub currency_mapping: &'a HashMap<String, String>,
    pub currencies: &'a [Currency],
}

/// A validated row; never modified after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// 1-based position in the request
    pub row_number: usize,
    pub date: NaiveDate,
    pub account: String,
    pub category: String,
    /// Signed, as written
    pub amount: Decimal,
    /// Unsigned, rounded to cents
    pub abs_amount: Decimal,
    pub currency: String,
    pub description: String,
    /// Empty unless the row is a transfer leg
    pub transfer: String,
    pub kind: TransactionKind,
}

impl ParsedRow {
    pub fn is_transfer_candidate(&self) -> bool {
        !self.transfer.is_empty()
    }
}

/// Parse one raw row, failing on the first violated constraint
pub fn parse_row(
    row_number: usize,
    row: &RawImportRow,
    ctx: &ParseContext<'_>,
) -> Result<ParsedRow, RowError> {
    if row.date.trim().is_empty() {
        return Err(RowError::Missing("date"));
    }
    if row.account.trim().is_empty() {
        return Err(RowError::Missing("account"));
    }
    if row.total.trim().is_empty() {
        return Err(RowError::Missing("amount"));
    }
    if row.currency.trim().is_empty() {
        return Err(RowError::Missing("currency"));
    }

    let date = ctx
        .date_format
        .parse(&row.date)
        .ok_or_else(|| RowError::InvalidDate(row.date.clone()))?;

    let amount = parse_amount(&row.total, ctx.decimal_separator)
        .ok_or_else(|| RowError::InvalidAmount(row.total.clone()))?;

    let currency = resolve_currency(&row.currency, ctx.currency_mapping, ctx.currencies)
        .ok_or_else(|| RowError::UnresolvedCurrency(row.currency.clone()))?;

    Ok(ParsedRow {
        row_number,
        date,
        account: row.account.trim().to_string(),
        category: row.category.trim().to_string(),
        amount,
        abs_amount: amount.abs().round_dp(AMOUNT_SCALE),
        currency,
        description: row.description.trim().to_string(),
        transfer: row.transfer.trim().to_string(),
        kind: TransactionKind::from_amount(amount),
    })
}

/// Parse a signed amount such as `-1.000,50 ₽` or `$1,000.50`
pub fn parse_amount(raw: &str, separator: DecimalSeparator) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !AMOUNT_NOISE.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match separator {
        DecimalSeparator::Comma => cleaned.replace('.', "").replace(',', "."),
        DecimalSeparator::Dot => cleaned.replace(',', ""),
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
        .filter(|amount| amount.abs().round_dp(AMOUNT_SCALE) < MAX_AMOUNT)
}

/// Resolve a raw currency token to a code.
///
/// Priority: caller mapping (exact), then code (case-insensitive), then symbol (exact).
pub fn resolve_currency(
    raw: &str,
    mapping: &HashMap<String, String>,
    currencies: &[Currency],
) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(mapped) = mapping.get(raw) {
        return Some(Currency::normalize_code(mapped));
    }

    currencies
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(raw))
        .or_else(|| currencies.iter().find(|c| c.symbol == raw))
        .map(|c| c.code.clone())
}

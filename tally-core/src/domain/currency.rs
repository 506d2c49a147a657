//! Currency domain model

use serde::{Deserialize, Serialize};

/// A currency known to the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217-style code, normalized to uppercase
    pub code: String,
    pub name: String,
    pub symbol: String,
}

impl Currency {
    pub fn new(code: &str, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            code: Self::normalize_code(code),
            name: name.into(),
            symbol: symbol.into(),
        }
    }

    /// Normalize currency code to uppercase
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Validate currency data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.code.len() != 3 || !self.code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("currency code must be three letters");
        }
        if self.name.trim().is_empty() {
            return Err("currency name cannot be empty");
        }
        Ok(())
    }
}

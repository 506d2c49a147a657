//! Configuration management
//!
//! Settings live in settings.json inside the tally directory:
//! ```json
//! {
//!   "user": "default",
//!   "import": {
//!     "dateFormat": "dd.MM.yyyy",
//!     "decimalSeparator": ",",
//!     "delimiter": ";",
//!     "currencyMapping": { "руб.": "RUB" },
//!     "batchSize": 1000
//!   }
//! }
//! ```
//! Keys the tool does not know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::services::import::{DecimalSeparator, FormatHints, ImportSettings, DEFAULT_BATCH_SIZE};

/// User name used when nothing else is configured
pub const DEFAULT_USER: &str = "default";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default)]
    import: ImportConfig,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Defaults applied to every import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConfig {
    /// Date pattern with yyyy/MM/dd tokens; detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// "," or "."; detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_separator: Option<String>,
    /// Single-character delimiter; detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    /// Raw currency token -> currency code
    #[serde(default)]
    pub currency_mapping: HashMap<String, String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            decimal_separator: None,
            delimiter: None,
            currency_mapping: HashMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            other: HashMap::new(),
        }
    }
}

impl ImportConfig {
    /// Format hints from the configured values
    pub fn format_hints(&self) -> Result<FormatHints> {
        let decimal_separator = self
            .decimal_separator
            .as_deref()
            .map(|s| s.parse::<DecimalSeparator>().map_err(Error::Config))
            .transpose()?;
        let delimiter = self.delimiter.as_deref().map(parse_delimiter).transpose()?;

        Ok(FormatHints {
            delimiter,
            decimal_separator,
            date_format: self.date_format.clone(),
        })
    }

    pub fn settings(&self) -> ImportSettings {
        ImportSettings {
            batch_size: self.batch_size.max(1),
        }
    }
}

/// Parse a one-byte delimiter; `\t` and `tab` mean a tab
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        other => Err(Error::Config(format!("delimiter must be a single character, got {:?}", other)).into()),
    }
}

/// Tally configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub user: String,
    pub import: ImportConfig,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            import: ImportConfig::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the tally directory
    ///
    /// The user can be overridden with the TALLY_USER environment variable.
    pub fn load(tally_dir: &Path) -> Result<Self> {
        let settings_path = tally_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let user = match std::env::var("TALLY_USER").ok() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => raw.user.clone().unwrap_or_else(|| DEFAULT_USER.to_string()),
        };

        Ok(Self {
            user,
            import: raw.import.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the tally directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, tally_dir: &Path) -> Result<()> {
        let settings_path = tally_dir.join(SETTINGS_FILE);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self._raw_settings.clone())
        } else {
            self._raw_settings.clone()
        };

        settings.import.date_format = self.import.date_format.clone();
        settings.import.decimal_separator = self.import.decimal_separator.clone();
        settings.import.delimiter = self.import.delimiter.clone();
        settings.import.currency_mapping = self.import.currency_mapping.clone();
        settings.import.batch_size = self.import.batch_size;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

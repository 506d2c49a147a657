//! Import files: reading the seven-column CSV layout and guessing its format

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use super::parse::{resolve_currency, DateFormat, DecimalSeparator};
use super::RawImportRow;
use crate::domain::Currency;

/// Column count of the import layout:
/// `date;account;category;total;currency;description;transfer`
pub const EXPECTED_COLUMNS: usize = 7;

/// Header written by the exporter
pub const HEADER: [&str; EXPECTED_COLUMNS] = [
    "date",
    "account",
    "category",
    "total",
    "currency",
    "description",
    "transfer",
];

/// Delimiters tried by detection, in order of preference
pub const DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Date patterns tried by detection, in order of preference
pub const DATE_FORMATS: [&str; 4] = ["dd.MM.yyyy", "yyyy-MM-dd", "dd/MM/yyyy", "MM/dd/yyyy"];

/// Lines or values looked at when guessing
const SAMPLE_SIZE: usize = 10;

/// Format hints; anything left as `None` is detected from the file
#[derive(Debug, Clone, Default)]
pub struct FormatHints {
    pub delimiter: Option<u8>,
    pub decimal_separator: Option<DecimalSeparator>,
    pub date_format: Option<String>,
}

/// A loaded import file with its resolved format
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub rows: Vec<RawImportRow>,
    pub delimiter: u8,
    pub decimal_separator: DecimalSeparator,
    pub date_format: DateFormat,
}

impl ImportFile {
    /// Read `path`, filling in whatever `hints` leave open
    pub fn load(path: &Path, hints: &FormatHints) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read import file {}", path.display()))?;
        Self::parse(&content, hints)
    }

    pub fn parse(content: &str, hints: &FormatHints) -> Result<Self> {
        let detector = FormatDetector::new()?;

        let delimiter = hints
            .delimiter
            .unwrap_or_else(|| detector.detect_delimiter(content));
        let rows = read_rows(content, delimiter)?;

        let decimal_separator = hints.decimal_separator.unwrap_or_else(|| {
            let amounts: Vec<&str> = rows.iter().map(|r| r.total.as_str()).collect();
            detector.detect_decimal_separator(&amounts)
        });
        let date_format = match &hints.date_format {
            Some(pattern) => DateFormat::new(pattern),
            None => {
                let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
                DateFormat::new(detector.detect_date_format(&dates))
            }
        };

        tracing::debug!(
            rows = rows.len(),
            delimiter = %(delimiter as char).escape_default(),
            decimal_separator = %decimal_separator.as_char(),
            date_format = date_format.pattern(),
            "loaded import file"
        );

        Ok(Self {
            rows,
            delimiter,
            decimal_separator,
            date_format,
        })
    }

    /// Distinct currency tokens (in file order) that match nothing known
    pub fn unresolved_currencies(
        &self,
        mapping: &HashMap<String, String>,
        currencies: &[Currency],
    ) -> Vec<String> {
        let mut unresolved: Vec<String> = Vec::new();
        for row in &self.rows {
            let token = row.currency.trim();
            if token.is_empty() || unresolved.iter().any(|t| t == token) {
                continue;
            }
            if resolve_currency(token, mapping, currencies).is_none() {
                unresolved.push(token.to_string());
            }
        }
        unresolved
    }
}

/// Parse CSV content into raw rows. The first line is a header and is
/// skipped; blank lines are skipped; missing trailing cells are empty.
pub fn read_rows(content: &str, delimiter: u8) -> Result<Vec<RawImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV line {}", index + 2))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(RawImportRow {
            date: cell(0),
            account: cell(1),
            category: cell(2),
            total: cell(3),
            currency: cell(4),
            description: cell(5),
            transfer: cell(6),
        });
    }
    Ok(rows)
}

/// Guesses the delimiter, decimal separator and date pattern of a file
pub struct FormatDetector {
    comma_decimal: Regex,
    dot_decimal: Regex,
    amount_noise: Regex,
    iso_date: Regex,
    dotted_date: Regex,
    slashed_date: Regex,
}

impl FormatDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            comma_decimal: Regex::new(r",\d{2}$")?,
            dot_decimal: Regex::new(r"\.\d{2}$")?,
            amount_noise: Regex::new(r"[^\d.,-]")?,
            iso_date: Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$")?,
            dotted_date: Regex::new(r"^(\d{2})\.(\d{2})\.(\d{4})$")?,
            slashed_date: Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$")?,
        })
    }

    /// The first delimiter that splits every sampled line into exactly the
    /// expected column count; otherwise the one that does so most often.
    pub fn detect_delimiter(&self, content: &str) -> u8 {
        let lines: Vec<&str> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(SAMPLE_SIZE)
            .collect();

        let mut best = DELIMITERS[0];
        let mut best_score = 0;

        for delimiter in DELIMITERS {
            let counts: Vec<usize> = lines
                .iter()
                .map(|line| line.split(delimiter as char).count())
                .collect();
            if !counts.is_empty() && counts.iter().all(|&c| c == EXPECTED_COLUMNS) {
                return delimiter;
            }
            let score = counts.iter().filter(|&&c| c == EXPECTED_COLUMNS).count();
            if score > best_score {
                best_score = score;
                best = delimiter;
            }
        }

        best
    }

    /// When both separators appear, the later one is the decimal point
    /// (strong vote); a lone separator followed by exactly two trailing
    /// digits is a weak vote. Comma needs a strictly higher score.
    pub fn detect_decimal_separator(&self, amounts: &[&str]) -> DecimalSeparator {
        let mut comma_score = 0;
        let mut dot_score = 0;

        for raw in amounts {
            let cleaned = self.amount_noise.replace_all(raw, "");
            if cleaned.is_empty() {
                continue;
            }
            match (cleaned.rfind(','), cleaned.rfind('.')) {
                (Some(comma), Some(dot)) => {
                    if comma > dot {
                        comma_score += 2;
                    } else {
                        dot_score += 2;
                    }
                }
                (Some(_), None) if self.comma_decimal.is_match(&cleaned) => comma_score += 1,
                (None, Some(_)) if self.dot_decimal.is_match(&cleaned) => dot_score += 1,
                _ => {}
            }
        }

        if comma_score > dot_score {
            DecimalSeparator::Comma
        } else {
            DecimalSeparator::Dot
        }
    }

    /// The first pattern every sampled date fits. `MM/dd/yyyy` loses to
    /// `dd/MM/yyyy` once any leading field is above 12.
    pub fn detect_date_format(&self, dates: &[&str]) -> &'static str {
        let samples: Vec<&str> = dates
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .take(SAMPLE_SIZE)
            .collect();
        if samples.is_empty() {
            return DATE_FORMATS[0];
        }

        for format in DATE_FORMATS {
            if !samples.iter().all(|d| self.is_plausible_date(d, format)) {
                continue;
            }
            if format == "MM/dd/yyyy" {
                let high_first = samples.iter().any(|d| {
                    d.split('/')
                        .next()
                        .and_then(|first| first.parse::<u32>().ok())
                        .is_some_and(|first| first > 12)
                });
                if high_first {
                    continue;
                }
            }
            return format;
        }

        DATE_FORMATS[0]
    }

    fn is_plausible_date(&self, value: &str, format: &str) -> bool {
        match self.split_date(value, format) {
            Some((year, month, day)) => {
                (1..=12).contains(&month) && (1..=31).contains(&day) && (1900..=2100).contains(&year)
            }
            None => false,
        }
    }

    /// (year, month, day) of `value` read with `format`
    fn split_date(&self, value: &str, format: &str) -> Option<(u32, u32, u32)> {
        let (regex, year, month, day) = match format {
            "yyyy-MM-dd" => (&self.iso_date, 1, 2, 3),
            "dd.MM.yyyy" => (&self.dotted_date, 3, 2, 1),
            "dd/MM/yyyy" => (&self.slashed_date, 3, 2, 1),
            "MM/dd/yyyy" => (&self.slashed_date, 3, 1, 2),
            _ => return None,
        };
        let caps = regex.captures(value)?;
        let field = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        Some((field(year)?, field(month)?, field(day)?))
    }
}

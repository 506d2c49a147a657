//! Import command - import transactions from CSV

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};
use tally_core::config::parse_delimiter;
use tally_core::services::import::{DecimalSeparator, FormatHints, ImportResult};
use tally_core::services::{ImportFile, ImportRequest, LogEvent};
use tally_core::{Currency, OperationResult};

use super::{get_context, get_logger, get_tally_dir, log_event};
use crate::output;

/// Options of `tally import`
pub struct ImportArgs {
    pub file: PathBuf,
    pub date_format: Option<String>,
    pub decimal_separator: Option<String>,
    pub delimiter: Option<String>,
    pub mappings: Vec<String>,
    pub new_currencies: Vec<String>,
    pub remember: bool,
    pub yes: bool,
    pub json: bool,
}

/// What to do with a currency token nothing matches
enum Resolution {
    Map(String),
    Create(Currency),
    Skip,
}

pub fn run(user: Option<&str>, args: ImportArgs) -> Result<()> {
    let mut ctx = get_context(user)?;
    let logger = get_logger();
    let interactive = !args.yes && !args.json && atty::is(atty::Stream::Stdin);

    let mut hints = ctx.config.import.format_hints()?;
    merge_hints(&mut hints, &args)?;
    let file = ImportFile::load(&args.file, &hints)?;

    // CLI mappings win over configured ones
    let mut cli_mapping = HashMap::new();
    for raw in &args.mappings {
        let (token, code) = parse_mapping(raw)?;
        cli_mapping.insert(token, code);
    }
    let mut mapping = ctx.config.import.currency_mapping.clone();
    mapping.extend(cli_mapping.clone());

    let mut known = ctx.currency_service.list()?;
    let mut new_currencies = Vec::with_capacity(args.new_currencies.len());
    for raw in &args.new_currencies {
        let currency = parse_new_currency(raw, &known)?;
        known.push(currency.clone());
        new_currencies.push(currency);
    }
    for (token, code) in &cli_mapping {
        if !known.iter().any(|c| &c.code == code) {
            bail!("cannot map {:?} to unknown currency {}", token, code);
        }
    }

    let unresolved = file.unresolved_currencies(&mapping, &known);
    for token in &unresolved {
        if !interactive {
            output::warning(&format!(
                "Unresolved currency {:?}: rows using it will fail (use --map or --new-currency)",
                token
            ));
            continue;
        }
        match resolve_interactively(token, &known)? {
            Resolution::Map(code) => {
                cli_mapping.insert(token.clone(), code.clone());
                mapping.insert(token.clone(), code);
            }
            Resolution::Create(currency) => {
                cli_mapping.insert(token.clone(), currency.code.clone());
                mapping.insert(token.clone(), currency.code.clone());
                known.push(currency.clone());
                new_currencies.push(currency);
            }
            Resolution::Skip => {}
        }
    }

    if interactive {
        let prompt = format!(
            "Import {} rows from {} for user {}?",
            file.rows.len(),
            args.file.display(),
            ctx.user.name
        );
        if !Confirm::new().with_prompt(prompt).default(true).interact()? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let request = ImportRequest {
        date_format: file.date_format.clone(),
        decimal_separator: file.decimal_separator,
        currency_mapping: mapping,
        new_currencies,
        rows: file.rows,
    };

    let result = match ctx.import_service.import(ctx.user.id, &request) {
        Ok(result) => result,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_failed")
                    .with_command("import")
                    .with_error(e.root_cause().to_string()),
            );
            if args.json {
                let failed: OperationResult<ImportResult> = OperationResult::fail(format!("{:#}", e));
                println!("{}", serde_json::to_string_pretty(&failed)?);
            }
            return Err(e);
        }
    };
    log_event(&logger, LogEvent::new("import_completed").with_command("import"));

    if args.remember && !cli_mapping.is_empty() {
        ctx.config.import.currency_mapping.extend(cli_mapping);
        ctx.config.save(&get_tally_dir()?)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(result))?);
        return Ok(());
    }

    print_summary(&result);
    Ok(())
}

fn merge_hints(hints: &mut FormatHints, args: &ImportArgs) -> Result<()> {
    if let Some(format) = &args.date_format {
        hints.date_format = Some(format.clone());
    }
    if let Some(separator) = &args.decimal_separator {
        hints.decimal_separator = Some(separator.parse::<DecimalSeparator>().map_err(|e| anyhow!(e))?);
    }
    if let Some(delimiter) = &args.delimiter {
        hints.delimiter = Some(parse_delimiter(delimiter)?);
    }
    Ok(())
}

/// Parse `TOKEN=CODE`
fn parse_mapping(raw: &str) -> Result<(String, String)> {
    match raw.rsplit_once('=') {
        Some((token, code)) if !token.trim().is_empty() && !code.trim().is_empty() => {
            Ok((token.trim().to_string(), Currency::normalize_code(code)))
        }
        _ => bail!("invalid mapping {:?}, expected TOKEN=CODE", raw),
    }
}

/// Parse `CODE:NAME:SYMBOL`; the symbol defaults to the code.
/// Codes that already exist are rejected in favour of `--map`.
fn parse_new_currency(raw: &str, known: &[Currency]) -> Result<Currency> {
    let mut parts = raw.splitn(3, ':').map(str::trim);
    let code = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    let symbol = parts.next().filter(|s| !s.is_empty()).unwrap_or(code);
    if code.is_empty() || name.is_empty() {
        bail!("invalid currency {:?}, expected CODE:NAME:SYMBOL", raw);
    }
    let currency = Currency::new(code, name, symbol);
    currency
        .validate()
        .map_err(|reason| anyhow!("invalid currency {:?}: {}", raw, reason))?;
    if is_known_code(&currency.code, known) {
        bail!(
            "currency {} already exists, use --map TOKEN={} instead",
            currency.code,
            currency.code
        );
    }
    Ok(currency)
}

fn is_known_code(code: &str, known: &[Currency]) -> bool {
    let code = Currency::normalize_code(code);
    known.iter().any(|c| c.code == code)
}

/// Validation for the interactive "new currency" code prompt
fn check_new_code(input: &str, known: &[Currency]) -> Result<(), String> {
    Currency::new(input, "-", "-").validate().map_err(str::to_string)?;
    if is_known_code(input, known) {
        return Err(format!(
            "{} already exists, choose \"An existing currency\" to map to it",
            Currency::normalize_code(input)
        ));
    }
    Ok(())
}

fn resolve_interactively(token: &str, known: &[Currency]) -> Result<Resolution> {
    println!();
    output::info(&format!("Currency {:?} does not match any known currency", token));

    let choice = Select::new()
        .with_prompt("What should it be?")
        .items(&[
            "An existing currency",
            "A new currency",
            "Skip (rows using it will fail)",
        ])
        .default(0)
        .interact()?;

    match choice {
        0 => {
            let labels: Vec<String> = known
                .iter()
                .map(|c| format!("{} - {} ({})", c.code, c.name, c.symbol))
                .collect();
            let index = Select::new()
                .with_prompt(format!("Map {:?} to", token))
                .items(&labels)
                .default(0)
                .interact()?;
            Ok(Resolution::Map(known[index].code.clone()))
        }
        1 => {
            let code: String = Input::new()
                .with_prompt("Code (3 letters)")
                .validate_with(|input: &String| check_new_code(input, known))
                .interact_text()?;
            let name: String = Input::new().with_prompt("Name").interact_text()?;
            let symbol: String = Input::new()
                .with_prompt("Symbol")
                .default(token.to_string())
                .interact_text()?;
            Ok(Resolution::Create(Currency::new(&code, name.trim(), symbol.trim())))
        }
        _ => Ok(Resolution::Skip),
    }
}

fn print_summary(result: &ImportResult) {
    if result.failed_rows.is_empty() {
        output::success("Import complete");
    } else {
        output::warning("Import complete with failed rows");
    }

    println!();
    println!("  Imported: {}", result.imported);
    let created = [
        ("Currencies created", &result.currencies_created),
        ("Accounts created", &result.accounts_created),
        ("Categories created", &result.categories_created),
    ];
    for (label, names) in created {
        if !names.is_empty() {
            println!("  {}: {}", label, names.join(", "));
        }
    }
    println!("  Failed: {}", result.failed_rows.len());

    if result.failed_rows.is_empty() {
        return;
    }

    println!();
    println!("{}", "Failed rows".red().bold());
    let mut table = output::create_table();
    table.set_header(vec!["Row", "Date", "Account", "Total", "Currency", "Error"]);
    for failed in &result.failed_rows {
        table.add_row(vec![
            failed.row_number.to_string(),
            failed.data.date.clone(),
            failed.data.account.clone(),
            failed.data.total.clone(),
            failed.data.currency.clone(),
            failed.error.clone(),
        ]);
    }
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        assert_eq!(parse_mapping("руб.=rub").unwrap(), ("руб.".to_string(), "RUB".to_string()));
        assert_eq!(parse_mapping("a=b=usd").unwrap().0, "a=b");
        assert!(parse_mapping("USD").is_err());
        assert!(parse_mapping("=USD").is_err());
    }

    fn known() -> Vec<Currency> {
        vec![
            Currency::new("USD", "US Dollar", "$"),
            Currency::new("RUB", "Russian Ruble", "₽"),
        ]
    }

    #[test]
    fn test_parse_new_currency() {
        let known = known();
        let thb = parse_new_currency("thb:Thai Baht:฿", &known).unwrap();
        assert_eq!(thb.code, "THB");
        assert_eq!(thb.name, "Thai Baht");
        assert_eq!(thb.symbol, "฿");

        assert_eq!(parse_new_currency("XTS:Test", &known).unwrap().symbol, "XTS");
        assert!(parse_new_currency("BAHT:Thai Baht:฿", &known).is_err());
        assert!(parse_new_currency("THB", &known).is_err());
    }

    #[test]
    fn test_existing_code_is_not_a_new_currency() {
        let known = known();
        let err = parse_new_currency("rub:Ruble:руб.", &known).unwrap_err();
        assert_eq!(err.to_string(), "currency RUB already exists, use --map TOKEN=RUB instead");

        assert!(check_new_code("THB", &known).is_ok());
        assert!(check_new_code("rub", &known).unwrap_err().contains("RUB already exists"));
        assert!(check_new_code("RUBLE", &known).is_err());
    }

    #[test]
    fn test_cli_hints_override_config() {
        let mut hints = FormatHints {
            delimiter: Some(b';'),
            decimal_separator: Some(DecimalSeparator::Dot),
            date_format: None,
        };
        let args = ImportArgs {
            file: PathBuf::from("x.csv"),
            date_format: Some("yyyy-MM-dd".to_string()),
            decimal_separator: Some(",".to_string()),
            delimiter: Some("tab".to_string()),
            mappings: Vec::new(),
            new_currencies: Vec::new(),
            remember: false,
            yes: true,
            json: false,
        };
        merge_hints(&mut hints, &args).unwrap();
        assert_eq!(hints.delimiter, Some(b'\t'));
        assert_eq!(hints.decimal_separator, Some(DecimalSeparator::Comma));
        assert_eq!(hints.date_format.as_deref(), Some("yyyy-MM-dd"));
    }
}

//! Statement import.
//!
//! Rows are evaluated independently: a row missing its date or amount is
//! skipped, a row whose date or amount is present but unreadable is an error.
//! The batch is persisted only when no row produced an error.

use crate::db::repository;
use crate::error::{AppError, Result};
use crate::models::transaction::{Transaction, TransactionWithBucket};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use regex::Regex;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

const DATE_ALIASES: &[&str] = &["date"];
const DESCRIPTION_ALIASES: &[&str] = &["description"];
const AMOUNT_ALIASES: &[&str] = &["amount", "debit"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]").expect("valid regex"));
static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").expect("valid regex"));

/// One statement row after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub transactions: Vec<ParsedRow>,
    pub errors: Vec<String>,
}

impl ParsedStatement {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Column positions for each logical field, in alias preference order.
struct ColumnMap {
    date: Vec<usize>,
    description: Vec<usize>,
    amount: Vec<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let resolve = |aliases: &[&str]| -> Vec<usize> {
            aliases
                .iter()
                .flat_map(|alias| {
                    normalized
                        .iter()
                        .enumerate()
                        .filter(move |(_, header)| header.as_str() == *alias)
                        .map(|(idx, _)| idx)
                })
                .collect()
        };

        Self {
            date: resolve(DATE_ALIASES),
            description: resolve(DESCRIPTION_ALIASES),
            amount: resolve(AMOUNT_ALIASES),
        }
    }
}

/// First non-empty value among the candidate columns.
fn first_value<'r>(record: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|&idx| record.get(idx))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

pub fn parse_statement(text: &str) -> ParsedStatement {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut parsed = ParsedStatement::default();

    let columns = match reader.headers() {
        Ok(headers) => ColumnMap::from_headers(headers),
        Err(e) => {
            parsed.errors.push(format!("Malformed header: {}", e));
            return parsed;
        }
    };

    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                // header is line 1
                parsed.errors.push(format!("Malformed row {}: {}", index + 2, e));
                continue;
            }
        };

        match parse_row(&columns, &record) {
            Ok(Some(row)) => parsed.transactions.push(row),
            Ok(None) => {}
            Err(message) => parsed.errors.push(message),
        }
    }

    parsed
}

fn parse_row(columns: &ColumnMap, record: &StringRecord) -> std::result::Result<Option<ParsedRow>, String> {
    let date = first_value(record, &columns.date);
    let amount = first_value(record, &columns.amount);
    let description = first_value(record, &columns.description).unwrap_or("");

    let (Some(date), Some(amount)) = (date, amount) else {
        return Ok(None);
    };

    let parsed_date = parse_date_value(date).ok_or_else(|| format!("Invalid date: {}", date))?;
    let parsed_amount = parse_amount_value(amount).map_err(|e| e.message(amount))?;

    Ok(Some(ParsedRow {
        date: parsed_date,
        description: description.to_string(),
        amount: parsed_amount.abs(),
    }))
}

/// Reads a calendar date from the formats bank exports commonly use.
/// Years outside 1000..=9999 are rejected: stored dates must stay
/// fixed-width for text range comparisons.
pub fn parse_date_value(raw: &str) -> Option<NaiveDate> {
    read_date(raw.trim()).filter(|date| (1000..=9999).contains(&date.year()))
}

fn read_date(raw: &str) -> Option<NaiveDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
    {
        return Some(date);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|ts| ts.date())
}

/// Why a raw amount could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    /// Nothing numeric left after stripping.
    NotNumeric,
    /// A number, but beyond what `Decimal` holds (about 28 significant digits).
    OutOfRange,
}

impl AmountError {
    pub fn message(self, raw: &str) -> String {
        match self {
            AmountError::NotNumeric => format!("Invalid amount: {}", raw),
            AmountError::OutOfRange => format!("Amount out of range: {}", raw),
        }
    }
}

/// Signed amount after dropping everything except digits, '.' and '-'.
/// The longest numeric prefix of what remains is used, so "1,234.50 CR"
/// reads as 1234.50 and "12-34" as 12.
pub fn parse_amount_value(raw: &str) -> std::result::Result<Decimal, AmountError> {
    let stripped = NON_NUMERIC.replace_all(raw, "");
    let number = NUMERIC_PREFIX
        .find(&stripped)
        .ok_or(AmountError::NotNumeric)?
        .as_str();
    let number = number.trim_end_matches('.');
    Decimal::from_str(number).map_err(|_| AmountError::OutOfRange)
}

/// Parses `text` and, when every row is clean, stores each row as a new
/// unassigned transaction.
pub fn import_statement(conn: &Connection, text: &str) -> Result<Vec<TransactionWithBucket>> {
    let parsed = parse_statement(text);
    if !parsed.is_clean() {
        log::warn!(
            "Statement rejected: {} row error(s), {} valid row(s) discarded",
            parsed.errors.len(),
            parsed.transactions.len()
        );
        return Err(AppError::StatementParse(parsed.errors));
    }

    let mut saved = Vec::with_capacity(parsed.transactions.len());
    for row in parsed.transactions {
        let transaction = Transaction::new(
            Uuid::new_v4().to_string(),
            row.date,
            row.description,
            row.amount,
            None,
            Utc::now(),
        );
        repository::add_transaction(conn, &transaction)?;
        saved.push(TransactionWithBucket {
            transaction,
            bucket: None,
        });
    }

    log::info!("Imported {} transactions from statement", saved.len());
    Ok(saved)
}

pub fn import_file(conn: &Connection, path: &Path) -> Result<Vec<TransactionWithBucket>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::invalid("file", format!("Failed to open file '{}': {}", path.display(), e))
    })?;
    import_statement(conn, &text)
}

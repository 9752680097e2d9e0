//! Financial cell classification and normalization.
//!
//! A read-only annotation pass over extracted tables: cells are typed
//! as amounts, dates, account numbers, or plain numbers, normalized to
//! machine-friendly forms, and range-checked. Classification never
//! mutates the table itself.

use std::str::FromStr;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Table;

lazy_static! {
    static ref AMOUNT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"^₪?\s*\d{1,3}(,\d{3})*(\.\d{2})?$").unwrap(),
        Regex::new(r"^\d{1,3}(,\d{3})*(\.\d{2})?\s*₪?$").unwrap(),
        Regex::new(r"^\(\s*\d{1,3}(,\d{3})*(\.\d{2})?\s*\)$").unwrap(),
        Regex::new(r"^-\s*\d{1,3}(,\d{3})*(\.\d{2})?$").unwrap(),
    ];
    static ref DATE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}$").unwrap(),
        Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{2,4}$").unwrap(),
        Regex::new(r"^\d{1,2}-\d{1,2}-\d{2,4}$").unwrap(),
        Regex::new(r"^\d{2,4}/\d{1,2}/\d{1,2}$").unwrap(),
        Regex::new(r"^\d{2,4}\.\d{1,2}\.\d{1,2}$").unwrap(),
    ];
    static ref ACCOUNT_PLAIN: Regex = Regex::new(r"^\d{3,6}$").unwrap();
    static ref ACCOUNT_DASHED: Regex = Regex::new(r"^\d{1,3}-\d{1,3}-\d{1,3}$").unwrap();
    static ref ACCOUNT_DOTTED: Regex = Regex::new(r"^\d{1,4}\.\d{1,4}$").unwrap();
    static ref NUMERIC_PLAIN: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
    static ref NUMERIC_GROUPED: Regex = Regex::new(r"^\d{1,3}(,\d{3})*(\.\d+)?$").unwrap();
    static ref NON_AMOUNT_CHARS: Regex = Regex::new(r"[^\d,.\-()]").unwrap();
    static ref NON_DATE_CHARS: Regex = Regex::new(r"[^\d/\-.]").unwrap();
    static ref NON_ACCOUNT_CHARS: Regex = Regex::new(r"[^\d\-.]").unwrap();
    static ref DATE_SHAPE: Regex = Regex::new(r"^\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}$").unwrap();
    static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x1F\x7F]").unwrap();
}

/// Hebrew financial header keywords; a row carrying at least two is
/// treated as a header.
const HEADER_KEYWORDS: &[&str] = &[
    "חשבון",
    "תיאור",
    "סכום",
    "יתרה",
    "זכות",
    "חובה",
    "תאריך",
    "מספר",
    "פרטים",
    "סה\"כ",
    "יתרות",
    "הכנסות",
    "הוצאות",
    "נכסים",
    "התחייבויות",
    "הון",
];

/// Inferred cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Amount,
    Date,
    Account,
    Numeric,
    Text,
}

/// A classified and normalized cell value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialCell {
    pub kind: CellKind,
    /// Original cell content.
    pub raw: String,
    /// Normalized form; equal to `raw` when normalization does not
    /// apply or validation fails.
    pub normalized: String,
}

/// Classifies and normalizes financial table cells.
#[derive(Debug, Default)]
pub struct FinancialCellClassifier;

impl FinancialCellClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one cell by shape.
    pub fn classify_cell(&self, cell: &str) -> CellKind {
        let trimmed = cell.trim();
        if is_amount(trimmed) {
            CellKind::Amount
        } else if is_date(trimmed) {
            CellKind::Date
        } else if is_account_number(trimmed) {
            CellKind::Account
        } else if is_numeric(trimmed) {
            CellKind::Numeric
        } else {
            CellKind::Text
        }
    }

    /// A column's kind is the strict majority (> 0.6) kind of its
    /// non-empty samples; anything less decisive stays text.
    pub fn column_types(&self, table: &Table) -> Vec<CellKind> {
        let columns = table.max_columns();
        let mut types = Vec::with_capacity(columns);

        for col in 0..columns {
            let samples: Vec<&str> = table
                .rows()
                .iter()
                .filter_map(|row| row.get(col))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect();
            types.push(self.majority_kind(&samples));
        }
        types
    }

    fn majority_kind(&self, samples: &[&str]) -> CellKind {
        if samples.is_empty() {
            return CellKind::Text;
        }

        let mut amounts = 0usize;
        let mut dates = 0usize;
        let mut accounts = 0usize;
        let mut numerics = 0usize;

        for sample in samples {
            match self.classify_cell(sample) {
                // Amounts are numeric too; mirror that in the tally.
                CellKind::Amount => {
                    amounts += 1;
                    numerics += 1;
                }
                CellKind::Date => dates += 1,
                CellKind::Account => accounts += 1,
                CellKind::Numeric => numerics += 1,
                CellKind::Text => {}
            }
        }

        let total = samples.len() as f32;
        if amounts as f32 / total > 0.6 {
            CellKind::Amount
        } else if dates as f32 / total > 0.6 {
            CellKind::Date
        } else if accounts as f32 / total > 0.6 {
            CellKind::Account
        } else if numerics as f32 / total > 0.6 {
            CellKind::Numeric
        } else {
            CellKind::Text
        }
    }

    /// Classify, normalize, and validate one cell. Values that fail
    /// validation keep their raw form.
    pub fn annotate(&self, cell: &str) -> FinancialCell {
        let raw = cell.to_string();
        let trimmed = cell.trim();
        let kind = self.classify_cell(trimmed);

        let normalized = match kind {
            CellKind::Amount => {
                let n = normalize_amount(trimmed);
                if validate_amount(&n) { n } else { raw.clone() }
            }
            CellKind::Date => {
                let n = normalize_date(trimmed);
                if validate_date(&n) { n } else { raw.clone() }
            }
            CellKind::Account => {
                let n = normalize_account_number(trimmed);
                if validate_account_number(&n) {
                    n
                } else {
                    raw.clone()
                }
            }
            CellKind::Numeric => normalize_number(trimmed),
            CellKind::Text => CONTROL_CHARS.replace_all(trimmed, "").into_owned(),
        };

        FinancialCell {
            kind,
            raw,
            normalized,
        }
    }

    /// Annotate every cell of a table, column-typed where the column
    /// has a decisive majority.
    pub fn annotate_table(&self, table: &Table) -> Vec<Vec<FinancialCell>> {
        let column_types = self.column_types(table);
        debug!("column types: {:?}", column_types);

        table
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| self.annotate(cell)).collect())
            .collect()
    }
}

/// A row with at least two Hebrew financial keywords is a header.
pub fn is_financial_header_row(row: &[String]) -> bool {
    let joined = row.join(" ");
    let count = HEADER_KEYWORDS
        .iter()
        .filter(|keyword| joined.contains(*keyword))
        .count();
    count >= 2
}

pub fn is_amount(value: &str) -> bool {
    let trimmed = value.trim();
    AMOUNT_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

pub fn is_date(value: &str) -> bool {
    let trimmed = value.trim();
    DATE_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

/// Israeli account shapes: 3-6 plain digits, dash triplets, or a
/// dotted pair.
pub fn is_account_number(value: &str) -> bool {
    let trimmed = value.trim();
    ACCOUNT_PLAIN.is_match(trimmed)
        || ACCOUNT_DASHED.is_match(trimmed)
        || ACCOUNT_DOTTED.is_match(trimmed)
}

pub fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    NUMERIC_PLAIN.is_match(trimmed) || NUMERIC_GROUPED.is_match(trimmed)
}

/// Strip currency marks and grouping, turn parenthesized amounts into
/// negatives. Values that stop parsing as numbers come back unchanged.
pub fn normalize_amount(amount: &str) -> String {
    let mut normalized = NON_AMOUNT_CHARS.replace_all(amount, "").trim().to_string();

    if normalized.starts_with('(') && normalized.ends_with(')') {
        normalized = format!("-{}", &normalized[1..normalized.len() - 1]);
    }
    normalized = normalized.replace(',', "");

    if Decimal::from_str(&normalized).is_err() {
        return amount.to_string();
    }
    normalized
}

/// Unify date separators to `/`.
pub fn normalize_date(date: &str) -> String {
    let cleaned = NON_DATE_CHARS.replace_all(date, "");
    if DATE_SHAPE.is_match(&cleaned) {
        cleaned.replace(['-', '.'], "/")
    } else {
        date.to_string()
    }
}

pub fn normalize_account_number(account: &str) -> String {
    NON_ACCOUNT_CHARS.replace_all(account, "").into_owned()
}

pub fn normalize_number(number: &str) -> String {
    let no_commas = number.replace(',', "");
    no_commas
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Amounts must parse and stay below ten billion in magnitude.
pub fn validate_amount(normalized: &str) -> bool {
    match Decimal::from_str(normalized) {
        Ok(value) => value.abs() <= Decimal::from(10_000_000_000i64),
        Err(_) => false,
    }
}

/// Day/month/year parts must be individually plausible and form a
/// real calendar date when the year is four digits.
pub fn validate_date(normalized: &str) -> bool {
    let parts: Vec<&str> = normalized.split('/').collect();
    if parts.len() != 3 {
        return false;
    }
    let (Ok(day), Ok(month), Ok(year)) = (
        parts[0].parse::<i32>(),
        parts[1].parse::<i32>(),
        parts[2].parse::<i32>(),
    ) else {
        return false;
    };

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(1900..=2100).contains(&year) {
        return false;
    }
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).is_some()
}

pub fn validate_account_number(normalized: &str) -> bool {
    let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
    (3..=15).contains(&digits)
}

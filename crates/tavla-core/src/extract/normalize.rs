//! Table normalization, validation, and Hebrew OCR artifact cleanup.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use super::quality::is_hebrew;
use crate::models::Table;

lazy_static! {
    static ref QUOTE_GLYPHS: Regex = Regex::new("[`'\"״׳]").unwrap();
    static ref DASH_GLYPHS: Regex = Regex::new(r"[־–—]").unwrap();
    static ref SHEKEL_GLYPHS: Regex = Regex::new(r"[₪＄]").unwrap();
    static ref SPACED_DIGITS: Regex = Regex::new(r"(\d)\s+(\d)").unwrap();
    static ref PADDED_PUNCT: Regex = Regex::new(r"\s*([,.])\s*").unwrap();
    static ref PAREN_AMOUNT: Regex =
        Regex::new(r"\(\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s*\)").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Pads, repairs, and validates parsed tables.
#[derive(Debug, Clone)]
pub struct TableNormalizer {
    /// Minimum non-empty cells a row needs to survive validation.
    min_row_cells: usize,
}

impl Default for TableNormalizer {
    fn default() -> Self {
        Self { min_row_cells: 1 }
    }
}

impl TableNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_row_cells(mut self, min: usize) -> Self {
        self.min_row_cells = min;
        self
    }

    /// Drop rows with no content, then pad every remaining row to the
    /// maximum observed column count. Idempotent.
    pub fn normalize(&self, table: Table) -> Table {
        let mut rows: Vec<Vec<String>> = table
            .into_rows()
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();

        let max_columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        for row in &mut rows {
            while row.len() < max_columns {
                row.push(String::new());
            }
        }
        Table::from_rows(rows)
    }

    /// Repair headers that OCR split across two visual lines.
    ///
    /// For each of the first three row pairs: if the rows' non-empty
    /// cells mostly complement each other (empty in exactly one of the
    /// pair) and rarely collide, fold the second row into the first,
    /// non-empty cell winning and collisions joining with a space.
    /// Hebrew content lowers the bar to 0.4/0.4 from 0.5/0.3. Expects
    /// a normalized table.
    pub fn merge_header_rows(&self, table: Table) -> Table {
        let mut rows = table.into_rows();
        let mut i = 0;
        let mut pairs_checked = 0;

        while pairs_checked < 3 && i + 1 < rows.len() {
            pairs_checked += 1;
            let columns = rows[i].len().max(rows[i + 1].len());
            if columns == 0 {
                i += 1;
                continue;
            }

            let mut complementary = 0usize;
            let mut overlap = 0usize;
            for c in 0..columns {
                let a = rows[i].get(c).map(|s| !s.trim().is_empty()).unwrap_or(false);
                let b = rows[i + 1]
                    .get(c)
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false);
                if a != b {
                    complementary += 1;
                } else if a && b {
                    overlap += 1;
                }
            }

            let complementary_ratio = complementary as f32 / columns as f32;
            let overlap_ratio = overlap as f32 / columns as f32;

            let has_hebrew = rows[i]
                .iter()
                .chain(rows[i + 1].iter())
                .any(|cell| cell.chars().any(is_hebrew));
            let (min_complementary, max_overlap) =
                if has_hebrew { (0.4, 0.4) } else { (0.5, 0.3) };

            if complementary_ratio > min_complementary && overlap_ratio < max_overlap {
                debug!(
                    "merging split header rows {} and {} (complementary {:.2}, overlap {:.2})",
                    i,
                    i + 1,
                    complementary_ratio,
                    overlap_ratio
                );
                let second = rows.remove(i + 1);
                let first = &mut rows[i];
                for (c, cell) in second.into_iter().enumerate() {
                    if cell.trim().is_empty() {
                        continue;
                    }
                    match first.get_mut(c) {
                        Some(target) if target.trim().is_empty() => *target = cell,
                        Some(target) => {
                            target.push(' ');
                            target.push_str(&cell);
                        }
                        None => first.push(cell),
                    }
                }
            } else {
                i += 1;
            }
        }

        Table::from_rows(rows)
    }

    /// Drop rows without enough meaningful cells; reject the whole
    /// table when nothing in it is longer than 2 characters.
    pub fn validate(&self, table: Table) -> Table {
        if table.is_empty() {
            return table;
        }

        let rows: Vec<Vec<String>> = table
            .into_rows()
            .into_iter()
            .filter(|row| {
                row.iter().filter(|cell| !cell.trim().is_empty()).count() >= self.min_row_cells
            })
            .collect();

        let has_content = rows
            .iter()
            .any(|row| row.iter().any(|cell| cell.trim().chars().count() > 2));
        if !has_content {
            warn!("table validation failed: no meaningful content");
            return Table::new();
        }

        Table::from_rows(rows)
    }
}

/// Unify glyphs Hebrew OCR commonly confuses and tighten number and
/// punctuation spacing.
pub fn clean_hebrew_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cleaned = QUOTE_GLYPHS.replace_all(text, "\"");
    let cleaned = DASH_GLYPHS.replace_all(&cleaned, "-");
    let cleaned = SHEKEL_GLYPHS.replace_all(&cleaned, "₪");
    let cleaned = PAREN_AMOUNT.replace_all(&cleaned, "($1)");
    let cleaned = SPACED_DIGITS.replace_all(&cleaned, "$1$2");
    let cleaned = PADDED_PUNCT.replace_all(&cleaned, "$1");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_pads_to_max_columns() {
        let table = Table::from_rows(vec![row(&["א", "ב", "ג"]), row(&["ד"])]);
        let normalized = TableNormalizer::new().normalize(table);
        assert!(normalized.rows().iter().all(|r| r.len() == 3));
        assert_eq!(normalized.rows()[1], row(&["ד", "", ""]));
    }

    #[test]
    fn test_normalize_drops_empty_rows() {
        let table = Table::from_rows(vec![row(&["", " ", ""]), row(&["נתון"])]);
        let normalized = TableNormalizer::new().normalize(table);
        assert_eq!(normalized.row_count(), 1);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = Table::from_rows(vec![row(&["א", "ב"]), row(&["ג"]), row(&["", ""])]);
        let normalizer = TableNormalizer::new();
        let once = normalizer.normalize(table);
        let twice = normalizer.normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_empty_table() {
        let normalized = TableNormalizer::new().normalize(Table::new());
        assert!(normalized.is_empty());
    }

    #[test]
    fn test_merge_complementary_header_rows() {
        // OCR split one header across two lines.
        let table = Table::from_rows(vec![
            row(&["תאריך", "", "סכום", ""]),
            row(&["", "תיאור", "", "יתרה"]),
            row(&["01/01/2024", "העברה", "100", "500"]),
        ]);
        let merged = TableNormalizer::new().merge_header_rows(table);
        assert_eq!(merged.row_count(), 2);
        assert_eq!(merged.rows()[0], row(&["תאריך", "תיאור", "סכום", "יתרה"]));
    }

    #[test]
    fn test_merge_leaves_distinct_data_rows_alone() {
        let table = Table::from_rows(vec![
            row(&["תאריך", "תיאור", "סכום"]),
            row(&["01/01/2024", "העברה", "100"]),
            row(&["02/01/2024", "משיכה", "50"]),
        ]);
        let merged = TableNormalizer::new().merge_header_rows(table.clone());
        assert_eq!(merged, table);
    }

    #[test]
    fn test_validate_rejects_table_without_content() {
        let table = Table::from_rows(vec![row(&["א", "ב"]), row(&["1", "2"])]);
        let validated = TableNormalizer::new().validate(table);
        assert!(validated.is_empty());
    }

    #[test]
    fn test_validate_keeps_meaningful_table() {
        let table = Table::from_rows(vec![row(&["חשבון", "סכום"]), row(&["123", "456"])]);
        let validated = TableNormalizer::new().validate(table);
        assert_eq!(validated.row_count(), 2);
    }

    #[test]
    fn test_validate_drops_sparse_rows() {
        let table = Table::from_rows(vec![row(&["חשבון", "סכום"]), row(&["", ""])]);
        let validated = TableNormalizer::new().with_min_row_cells(1).validate(table);
        assert_eq!(validated.row_count(), 1);
    }

    #[test]
    fn test_clean_hebrew_text_unifies_glyphs() {
        assert_eq!(clean_hebrew_text("סה״כ"), "סה\"כ");
        assert_eq!(clean_hebrew_text("א–ב"), "א-ב");
    }

    #[test]
    fn test_clean_hebrew_text_joins_spaced_digits() {
        assert_eq!(clean_hebrew_text("1 234"), "1234");
    }

    #[test]
    fn test_clean_hebrew_text_tightens_punctuation() {
        assert_eq!(clean_hebrew_text("1 , 234 . 56"), "1,234.56");
    }
}

//! OCR text to table parsing.
//!
//! Raw OCR output is cleaned, split into lines, and parsed with a
//! strategy chosen by the page's content kind. Hebrew lines with no
//! clear separators go through a pattern-based cell splitter keyed on
//! digits, currency marks, and dates.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use super::normalize::TableNormalizer;
use crate::models::Table;
use crate::ocr::ContentKind;

lazy_static! {
    static ref VERTICAL_BARS: Regex = Regex::new(r"[|│║▌▐█]").unwrap();
    static ref HORIZONTAL_BARS: Regex = Regex::new(r"[─━═]").unwrap();
    static ref CORNER_GLYPHS: Regex = Regex::new(r"[┌┐└┘├┤┬┴┼]").unwrap();
    static ref BULLET_GLYPHS: Regex = Regex::new(r"[•◦▪▫]").unwrap();
    static ref WIDE_GAP: Regex = Regex::new(r"\s{3,}").unwrap();
    static ref TAB_RUNS: Regex = Regex::new(r"\t+").unwrap();
    static ref LINE_TRAIL: Regex = Regex::new(r"(?m)[ \t]+$").unwrap();
    static ref LINE_LEAD: Regex = Regex::new(r"(?m)^[ \t]+").unwrap();
    static ref CELL_SEPARATOR: Regex = Regex::new(r"\s{2,}|\t").unwrap();
    static ref HAS_SEPARATOR: Regex = Regex::new(r"\t|\s{2,}").unwrap();
    static ref CURRENCY_PUNCT: Regex = Regex::new(r"[₪$€£,.\-]").unwrap();
    static ref DATE_TOKEN: Regex = Regex::new(r"\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}").unwrap();
    static ref CURRENCY_MARK: Regex = Regex::new(r"[₪$€£]").unwrap();
}

/// Parsing strategy, derived from the content classification plus the
/// degraded-retry profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseProfile {
    /// Pattern-filtered table rows.
    Table,
    /// Running Hebrew text, simple separator splits.
    Hebrew,
    /// Conservative split-only parsing for degraded retries.
    Fallback,
    /// Pick table vs Hebrew parsing by line statistics.
    Advanced,
}

impl From<ContentKind> for ParseProfile {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Table => Self::Table,
            ContentKind::HebrewText => Self::Hebrew,
            ContentKind::Mixed => Self::Advanced,
        }
    }
}

/// Converts raw OCR text into a normalized, validated table.
#[derive(Debug, Default)]
pub struct OcrTextParser {
    normalizer: TableNormalizer,
}

impl OcrTextParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse OCR text with the given profile. Unparseable input yields
    /// an empty table, never an error.
    pub fn parse(&self, text: &str, profile: ParseProfile) -> Table {
        if text.trim().is_empty() {
            warn!("no text received from OCR");
            return Table::new();
        }

        debug!("parsing OCR text ({:?}): {} characters", profile, text.len());

        let cleaned = clean_ocr_text(text);
        let lines: Vec<&str> = cleaned.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            warn!("no valid lines found after cleaning");
            return Table::new();
        }

        let rows = match profile {
            ParseProfile::Table => parse_table_structure(&lines),
            ParseProfile::Hebrew => parse_hebrew_text(&lines),
            ParseProfile::Fallback => parse_basic_structure(&lines),
            ParseProfile::Advanced => parse_advanced_structure(&lines),
        };

        let table = self.normalizer.normalize(Table::from_rows(rows));
        let table = self.normalizer.validate(table);
        debug!(
            "parsed {} rows with average {:.1} columns",
            table.row_count(),
            table.average_columns()
        );
        table
    }
}

/// Strip table-drawing and bullet glyphs, collapse wide gaps to tabs,
/// and trim line edges.
pub fn clean_ocr_text(text: &str) -> String {
    let text = VERTICAL_BARS.replace_all(text, " ");
    let text = HORIZONTAL_BARS.replace_all(&text, " ");
    let text = CORNER_GLYPHS.replace_all(&text, " ");
    let text = BULLET_GLYPHS.replace_all(&text, " ");
    let text = WIDE_GAP.replace_all(&text, "\t");
    let text = TAB_RUNS.replace_all(&text, "\t");
    let text = LINE_TRAIL.replace_all(&text, "");
    let text = LINE_LEAD.replace_all(&text, "");
    text.trim().to_string()
}

fn parse_table_structure(lines: &[&str]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for line in lines {
        if is_table_row(line) {
            let cells = extract_table_cells(line);
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
    }
    rows
}

/// A table row has multiple words plus at least one of: an explicit
/// separator, a digit, or financial punctuation.
pub fn is_table_row(line: &str) -> bool {
    let has_numbers = line.chars().any(|c| c.is_ascii_digit());
    let has_multiple_words = line.split_whitespace().count() > 1;
    let has_separator = HAS_SEPARATOR.is_match(line);
    let has_special = CURRENCY_PUNCT.is_match(line);

    has_multiple_words && (has_separator || has_numbers || has_special)
}

/// Split a row: tabs first, then wide spaces, then the Hebrew-aware
/// word grouper.
fn extract_table_cells(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line
        .split('\t')
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .collect();

    if cells.len() < 2 {
        cells = CELL_SEPARATOR
            .split(line)
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .collect();
    }

    if cells.len() < 2 {
        cells = smart_split_hebrew_line(line);
    }

    cells
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Group words into cells: a word starts a new cell when it leads with
/// a digit (and the current cell has content), carries a currency
/// mark, or looks like a date.
pub fn smart_split_hebrew_line(line: &str) -> Vec<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() <= 1 {
        return words.iter().map(|w| w.to_string()).collect();
    }

    let mut cells = Vec::new();
    let mut current = String::new();

    for word in words {
        if is_new_cell_indicator(word, &current) {
            if !current.trim().is_empty() {
                cells.push(current.trim().to_string());
            }
            current = word.to_string();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }

    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }

    cells
}

fn is_new_cell_indicator(word: &str, current_cell: &str) -> bool {
    if word.chars().next().is_some_and(|c| c.is_ascii_digit()) && !current_cell.trim().is_empty() {
        return true;
    }
    if CURRENCY_MARK.is_match(word) {
        return true;
    }
    DATE_TOKEN.is_match(word)
}

fn parse_hebrew_text(lines: &[&str]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for line in lines {
        let cells = parse_hebrew_line(line);
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    rows
}

/// Split on explicit separators; a line with none stays one cell.
fn parse_hebrew_line(line: &str) -> Vec<String> {
    let cleaned = line.trim();
    if cleaned.is_empty() {
        return Vec::new();
    }

    let parts: Vec<String> = CELL_SEPARATOR
        .split(cleaned)
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().to_string())
        .collect();

    if parts.len() > 1 {
        parts
    } else {
        vec![cleaned.to_string()]
    }
}

fn parse_basic_structure(lines: &[&str]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for line in lines {
        let cells: Vec<String> = CELL_SEPARATOR
            .split(line)
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.trim().to_string())
            .collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    rows
}

/// Table parsing when most lines look tabular, Hebrew parsing
/// otherwise.
fn parse_advanced_structure(lines: &[&str]) -> Vec<Vec<String>> {
    let table_like = lines.iter().filter(|l| is_table_row(l)).count();
    if (table_like as f32) > lines.len() as f32 * 0.5 {
        parse_table_structure(lines)
    } else {
        parse_hebrew_text(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_profile_splits_on_double_space() {
        let text = "תאריך   01/01/2024\nסכום   1,234.56 ₪";
        let table = OcrTextParser::new().parse(text, ParseProfile::Table);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows()[0],
            vec!["תאריך".to_string(), "01/01/2024".to_string()]
        );
        assert_eq!(
            table.rows()[1],
            vec!["סכום".to_string(), "1,234.56 ₪".to_string()]
        );
    }

    #[test]
    fn test_empty_text_gives_empty_table() {
        let parser = OcrTextParser::new();
        assert!(parser.parse("", ParseProfile::Table).is_empty());
        assert!(parser.parse("   \n  ", ParseProfile::Advanced).is_empty());
    }

    #[test]
    fn test_clean_strips_box_drawing() {
        let cleaned = clean_ocr_text("│סכום│  1,234│");
        assert!(!cleaned.contains('│'));
        assert!(cleaned.contains("סכום"));
    }

    #[test]
    fn test_clean_converts_wide_gaps_to_tabs() {
        let cleaned = clean_ocr_text("אחד    שתיים");
        assert_eq!(cleaned, "אחד\tשתיים");
    }

    #[test]
    fn test_is_table_row() {
        assert!(is_table_row("חשבון 12345"));
        assert!(is_table_row("יתרה  5,000.00"));
        // Single word, no separators.
        assert!(!is_table_row("שלום"));
        // Multiple words but no digits, separators, or punctuation.
        assert!(!is_table_row("שלום עולם"));
    }

    #[test]
    fn test_smart_split_on_leading_digit() {
        let cells = smart_split_hebrew_line("העברה בנקאית 1,500.00");
        assert_eq!(
            cells,
            vec!["העברה בנקאית".to_string(), "1,500.00".to_string()]
        );
    }

    #[test]
    fn test_smart_split_on_currency() {
        let cells = smart_split_hebrew_line("משכורת ₪8,000");
        assert_eq!(cells, vec!["משכורת".to_string(), "₪8,000".to_string()]);
    }

    #[test]
    fn test_smart_split_on_date() {
        let cells = smart_split_hebrew_line("הפקדה 15/03/2024");
        assert_eq!(cells, vec!["הפקדה".to_string(), "15/03/2024".to_string()]);
    }

    #[test]
    fn test_hebrew_profile_keeps_unseparated_line_whole() {
        let table = OcrTextParser::new().parse("שורת טקסט רציפה בעברית", ParseProfile::Hebrew);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows()[0].len(), 1);
    }

    #[test]
    fn test_advanced_profile_prefers_table_when_majority_tabular() {
        let text = "תאריך  סכום\n01/01/2024  100.00\n02/01/2024  250.50";
        let table = OcrTextParser::new().parse(text, ParseProfile::Advanced);
        assert_eq!(table.row_count(), 3);
        assert!(table.rows().iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_fallback_profile_basic_split() {
        let text = "אחד  שתיים\nשלוש";
        let table = OcrTextParser::new().parse(text, ParseProfile::Fallback);
        assert_eq!(table.row_count(), 2);
        // Normalization pads the short row.
        assert_eq!(table.rows()[1].len(), 2);
    }
}

//! Table data model and extraction result types.

use serde::{Deserialize, Serialize};

/// A rectangular table of string cells.
///
/// Rows are ordered top to bottom, cells left to right. After
/// normalization all rows share the same column count; before
/// normalization rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table(pub Vec<Vec<String>>);

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a table from raw rows.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self(rows)
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.0.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Widest row, in cells.
    pub fn max_columns(&self) -> usize {
        self.0.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Narrowest row, in cells.
    pub fn min_columns(&self) -> usize {
        self.0.iter().map(|r| r.len()).min().unwrap_or(0)
    }

    /// Mean row width, in cells. Zero for an empty table.
    pub fn average_columns(&self) -> f32 {
        if self.0.is_empty() {
            return 0.0;
        }
        let total: usize = self.0.iter().map(|r| r.len()).sum();
        total as f32 / self.0.len() as f32
    }

    /// Borrow the rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.0
    }

    /// Mutably borrow the rows.
    pub fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.0
    }

    /// Consume into raw rows.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.0
    }

    /// Iterate over rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Vec<String>> {
        self.0.iter()
    }
}

impl From<Vec<Vec<String>>> for Table {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self(rows)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Vec<String>;
    type IntoIter = std::slice::Iter<'a, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which extraction strategy produced a page's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Text layer only, no OCR.
    Direct,
    /// Text layer merged with an OCR pass.
    Hybrid,
    /// OCR only, no usable text layer.
    OcrOnly,
    /// OCR retried after a page-level failure.
    FallbackOcr,
}

impl ExtractionMethod {
    /// Stable string tag, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Hybrid => "hybrid",
            Self::OcrOnly => "ocr_only",
            Self::FallbackOcr => "fallback_ocr",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of processing one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted table (possibly empty).
    pub table: Table,

    /// Strategy that produced the table.
    pub method: ExtractionMethod,
}

impl ExtractionResult {
    /// An empty result tagged with the given method.
    pub fn empty(method: ExtractionMethod) -> Self {
        Self {
            table: Table::new(),
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_stats() {
        let table = Table::from_rows(vec![row(&["a", "b", "c"]), row(&["d"]), row(&["e", "f"])]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.max_columns(), 3);
        assert_eq!(table.min_columns(), 1);
        assert_eq!(table.average_columns(), 2.0);
    }

    #[test]
    fn test_empty_table_stats() {
        let table = Table::new();
        assert!(table.is_empty());
        assert_eq!(table.max_columns(), 0);
        assert_eq!(table.average_columns(), 0.0);
    }

    #[test]
    fn test_method_tags() {
        assert_eq!(ExtractionMethod::Direct.as_str(), "direct");
        assert_eq!(ExtractionMethod::Hybrid.as_str(), "hybrid");
        assert_eq!(ExtractionMethod::OcrOnly.as_str(), "ocr_only");
        assert_eq!(ExtractionMethod::FallbackOcr.as_str(), "fallback_ocr");

        let json = serde_json::to_string(&ExtractionMethod::OcrOnly).unwrap();
        assert_eq!(json, "\"ocr_only\"");
    }
}

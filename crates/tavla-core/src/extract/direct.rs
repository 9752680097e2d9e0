//! Direct table reconstruction from positioned text runs.

use tracing::debug;

use crate::models::Table;
use crate::pdf::TextRun;

/// Reconstructs tables from a PDF text layer without OCR.
///
/// Runs cluster into rows by y coordinate, then into cells by
/// horizontal gaps: a gap wider than the row's threshold starts a new
/// cell, narrower runs join with a space.
#[derive(Debug, Clone)]
pub struct DirectTextExtractor {
    /// Vertical tolerance when matching a run to an existing row.
    row_tolerance: f32,
    /// Lower clamp on the per-row gap threshold.
    min_column_gap: f32,
    /// Upper clamp on the per-row gap threshold.
    max_column_gap: f32,
}

impl Default for DirectTextExtractor {
    fn default() -> Self {
        Self {
            row_tolerance: 8.0,
            min_column_gap: 8.0,
            max_column_gap: 30.0,
        }
    }
}

impl DirectTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.row_tolerance = tolerance;
        self
    }

    pub fn with_column_gap_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_column_gap = min;
        self.max_column_gap = max;
        self
    }

    /// Cluster runs into a raw, pre-normalization table.
    pub fn extract(&self, runs: &[TextRun]) -> Table {
        let rows = self.cluster_rows(runs);
        debug!("direct extraction: {} runs -> {} rows", runs.len(), rows.len());

        let mut table_rows = Vec::with_capacity(rows.len());
        for row_runs in rows {
            let cells = self.split_cells(&row_runs);
            if !cells.is_empty() {
                table_rows.push(cells);
            }
        }
        Table::from_rows(table_rows)
    }

    /// One run per cell, no gap clustering. Kept as a degraded path
    /// for text layers whose widths are unusable.
    pub fn extract_naive(&self, runs: &[TextRun]) -> Table {
        let rows = self.cluster_rows(runs);
        let mut table_rows = Vec::with_capacity(rows.len());
        for row_runs in rows {
            let cells: Vec<String> = row_runs
                .iter()
                .map(|r| r.text.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !cells.is_empty() {
                table_rows.push(cells);
            }
        }
        Table::from_rows(table_rows)
    }

    /// Group runs into rows by y within the tolerance, ordered top to
    /// bottom (descending y, PDF y-up), then left to right within a
    /// row. Both sorts are stable so equal coordinates keep their
    /// source order.
    fn cluster_rows(&self, runs: &[TextRun]) -> Vec<Vec<TextRun>> {
        let mut buckets: Vec<(f32, Vec<TextRun>)> = Vec::new();

        for run in runs {
            match buckets
                .iter_mut()
                .find(|(y, _)| (run.y - *y).abs() <= self.row_tolerance)
            {
                Some((_, bucket)) => bucket.push(run.clone()),
                None => buckets.push((run.y, vec![run.clone()])),
            }
        }

        buckets.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        buckets
            .into_iter()
            .map(|(_, mut bucket)| {
                bucket.sort_by(|a, b| {
                    a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
                });
                bucket
            })
            .collect()
    }

    /// Split one row of x-sorted runs into cells at significant gaps.
    ///
    /// The threshold is 1.5x the row's mean gap, clamped to the
    /// configured bounds; the relative form alone can exceed every gap
    /// when columns are uniformly spaced.
    fn split_cells(&self, row_runs: &[TextRun]) -> Vec<String> {
        let texts: Vec<&str> = row_runs.iter().map(|r| r.text.trim()).collect();
        if row_runs.len() <= 1 {
            return texts
                .into_iter()
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        let gaps: Vec<f32> = row_runs
            .windows(2)
            .map(|w| (w[1].x - w[0].right()).max(0.0))
            .collect();
        let mean_gap = gaps.iter().sum::<f32>() / gaps.len() as f32;
        let threshold = (1.5 * mean_gap).clamp(self.min_column_gap, self.max_column_gap);

        let mut cells = Vec::new();
        let mut current = String::new();

        for (i, text) in texts.iter().enumerate() {
            if i > 0 && gaps[i - 1] > threshold {
                if !current.trim().is_empty() {
                    cells.push(current.trim().to_string());
                }
                current.clear();
            }
            if !text.is_empty() {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(text);
            }
        }
        if !current.trim().is_empty() {
            cells.push(current.trim().to_string());
        }

        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str, x: f32, y: f32) -> TextRun {
        TextRun::new(text, x, y, 0.0, 12.0)
    }

    fn run_w(text: &str, x: f32, y: f32, width: f32) -> TextRun {
        TextRun::new(text, x, y, width, 12.0)
    }

    #[test]
    fn test_wide_gaps_split_into_three_cells() {
        let runs = vec![
            run("סכום", 10.0, 100.0),
            run("1,234.56", 200.0, 100.0),
            run("₪", 350.0, 100.0),
        ];
        let table = DirectTextExtractor::new().extract(&runs);
        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.rows()[0],
            vec!["סכום".to_string(), "1,234.56".to_string(), "₪".to_string()]
        );
    }

    #[test]
    fn test_close_runs_merge_into_one_cell() {
        // Gaps of 2 and 200: the small gap joins, the large one splits.
        let runs = vec![
            run_w("יתרת", 10.0, 50.0, 30.0),
            run_w("פתיחה", 42.0, 50.0, 35.0),
            run_w("5,000", 277.0, 50.0, 30.0),
        ];
        let table = DirectTextExtractor::new().extract(&runs);
        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.rows()[0],
            vec!["יתרת פתיחה".to_string(), "5,000".to_string()]
        );
    }

    #[test]
    fn test_rows_ordered_top_to_bottom() {
        // PDF y grows upward, so higher y renders first.
        let runs = vec![
            run("תחתונה", 10.0, 100.0),
            run("עליונה", 10.0, 700.0),
            run("אמצעית", 10.0, 400.0),
        ];
        let table = DirectTextExtractor::new().extract(&runs);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows()[0][0], "עליונה");
        assert_eq!(table.rows()[1][0], "אמצעית");
        assert_eq!(table.rows()[2][0], "תחתונה");
    }

    #[test]
    fn test_y_tolerance_groups_wobbly_baselines() {
        let runs = vec![
            run("ימין", 10.0, 100.0),
            run("שמאל", 300.0, 105.0), // within the 8px tolerance
        ];
        let table = DirectTextExtractor::new().extract(&runs);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows()[0].len(), 2);
    }

    #[test]
    fn test_empty_runs_give_empty_table() {
        let table = DirectTextExtractor::new().extract(&[]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_naive_extraction_one_run_per_cell() {
        let runs = vec![
            run_w("א", 10.0, 50.0, 5.0),
            run_w("ב", 17.0, 50.0, 5.0),
        ];
        let table = DirectTextExtractor::new().extract_naive(&runs);
        assert_eq!(table.rows()[0], vec!["א".to_string(), "ב".to_string()]);
    }

    #[test]
    fn test_stable_order_for_equal_y() {
        let runs = vec![
            run("ראשון", 10.0, 100.0),
            run("שני", 10.0, 60.0),
            run("שלישי", 10.0, 60.0),
        ];
        let table = DirectTextExtractor::new().extract(&runs);
        // The two y=60 runs share a row and keep source order at equal x.
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1][0], "שני שלישי");
    }
}

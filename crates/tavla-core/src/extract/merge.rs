//! Table scoring and competing-result merging.

use tracing::debug;

use super::quality::is_hebrew;
use crate::models::Table;

/// Score a table on volume, column consistency, and content richness.
///
/// Weights: 0.3 row volume (capped at 10 rows), 0.3 column
/// consistency, 0.4 content ratio where cells longer than one
/// character count 1, digits add 0.5 and Hebrew adds 0.3. Clamped to
/// [0, 1]; an empty table scores 0.
pub fn score_table(table: &Table) -> f32 {
    if table.is_empty() {
        return 0.0;
    }

    let mut score = 0.0f32;

    score += (table.row_count() as f32 / 10.0).min(0.3);

    let column_counts: Vec<usize> = table.rows().iter().map(|r| r.len()).collect();
    let avg_columns = table.average_columns();
    let max = *column_counts.iter().max().unwrap_or(&0) as f32;
    let min = *column_counts.iter().min().unwrap_or(&0) as f32;
    let consistency = 1.0 - (max - min) / if avg_columns > 0.0 { avg_columns } else { 1.0 };
    score += consistency * 0.3;

    let mut meaningful = 0.0f32;
    let mut total_cells = 0usize;
    for row in table.rows() {
        for cell in row {
            total_cells += 1;
            if cell.trim().chars().count() > 1 {
                meaningful += 1.0;
                if cell.chars().any(|c| c.is_ascii_digit()) {
                    meaningful += 0.5;
                }
                if cell.chars().any(is_hebrew) {
                    meaningful += 0.3;
                }
            }
        }
    }
    let content_ratio = if total_cells > 0 {
        meaningful / total_cells as f32
    } else {
        0.0
    };
    score += content_ratio * 0.4;

    score.clamp(0.0, 1.0)
}

/// Pick between a direct-text table and an OCR table.
///
/// An empty side yields to the other. A side winning by more than 20%
/// relative score takes the result outright; close scores fall back to
/// whichever side has more columns on average.
pub fn merge_results(direct: Table, ocr: Table) -> Table {
    debug!(
        "merging results: {} direct rows, {} OCR rows",
        direct.row_count(),
        ocr.row_count()
    );

    if direct.is_empty() {
        return ocr;
    }
    if ocr.is_empty() {
        return direct;
    }

    let direct_score = score_table(&direct);
    let ocr_score = score_table(&ocr);
    debug!("table scores: direct {:.3}, OCR {:.3}", direct_score, ocr_score);

    if direct_score > ocr_score * 1.2 {
        direct
    } else if ocr_score > direct_score * 1.2 {
        ocr
    } else if direct.average_columns() > ocr.average_columns() {
        direct
    } else {
        ocr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn rich_table(rows: usize) -> Table {
        Table::from_rows(
            (0..rows)
                .map(|i| row(&["תיאור", &format!("1,00{}", i), "₪50"]))
                .collect(),
        )
    }

    #[test]
    fn test_empty_table_scores_zero() {
        assert_eq!(score_table(&Table::new()), 0.0);
    }

    #[test]
    fn test_score_within_bounds() {
        let tables = vec![
            rich_table(1),
            rich_table(20),
            Table::from_rows(vec![row(&["", ""])]),
            Table::from_rows(vec![row(&["א"]), row(&["א", "ב", "ג", "ד", "ה"])]),
        ];
        for table in &tables {
            let score = score_table(table);
            assert!((0.0..=1.0).contains(&score), "score {} out of bounds", score);
        }
    }

    #[test]
    fn test_rich_consistent_table_outscores_sparse_one() {
        let rich = rich_table(8);
        let sparse = Table::from_rows(vec![row(&["x", ""]), row(&["", ""])]);
        assert!(score_table(&rich) > score_table(&sparse));
    }

    #[test]
    fn test_merge_identity_on_empty_inputs() {
        let table = rich_table(3);
        assert_eq!(merge_results(table.clone(), Table::new()), table);
        assert_eq!(merge_results(Table::new(), table.clone()), table);
    }

    #[test]
    fn test_merge_prefers_clear_winner() {
        let strong = rich_table(10);
        let weak = Table::from_rows(vec![row(&["??", ""])]);
        let merged = merge_results(strong.clone(), weak);
        assert_eq!(merged, strong);
    }

    #[test]
    fn test_merge_tie_breaks_on_average_columns() {
        // Same content quality, different widths.
        let narrow = Table::from_rows(vec![
            row(&["תיאור", "1,000"]),
            row(&["תיאור", "2,000"]),
        ]);
        let wide = Table::from_rows(vec![
            row(&["תיאור", "1,000", "₪12"]),
            row(&["תיאור", "2,000", "₪15"]),
        ]);
        let merged = merge_results(narrow, wide.clone());
        assert_eq!(merged, wide);
    }
}

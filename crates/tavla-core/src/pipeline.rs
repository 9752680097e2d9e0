//! Document-level processing pipeline.
//!
//! Pages run strictly sequentially through the page orchestrator; a
//! failed page never aborts the document. The pipeline finishes with
//! an optional financial normalization pass over every extracted
//! table.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PdfError, Result, TavlaError};
use crate::extract::financial::FinancialCellClassifier;
use crate::extract::PageOrchestrator;
use crate::models::{ExtractionResult, TavlaConfig, Table};
use crate::ocr::OcrBackend;
use crate::pdf::PageSource;

/// The outcome and timing of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based page number.
    pub page: u32,
    pub result: ExtractionResult,
    pub elapsed_ms: u64,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub pages: Vec<PageReport>,
    pub total_elapsed_ms: u64,
}

impl DocumentResult {
    /// How many pages each extraction method handled.
    pub fn method_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for report in &self.pages {
            *counts.entry(report.result.method.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Total extracted rows across all pages.
    pub fn total_rows(&self) -> usize {
        self.pages
            .iter()
            .map(|r| r.result.table.row_count())
            .sum()
    }

    /// Pages that produced a non-empty table.
    pub fn tables(&self) -> impl Iterator<Item = (u32, &Table)> {
        self.pages
            .iter()
            .filter(|r| !r.result.table.is_empty())
            .map(|r| (r.page, &r.result.table))
    }

    /// All pages' rows concatenated, in page order.
    pub fn combined_table(&self) -> Table {
        let rows: Vec<Vec<String>> = self
            .tables()
            .flat_map(|(_, table)| table.rows().iter().cloned())
            .collect();
        Table::from_rows(rows)
    }

    /// Mean per-page processing time in milliseconds.
    pub fn average_page_ms(&self) -> f64 {
        if self.pages.is_empty() {
            return 0.0;
        }
        let total: u64 = self.pages.iter().map(|r| r.elapsed_ms).sum();
        total as f64 / self.pages.len() as f64
    }
}

/// Processes a whole document page by page.
pub struct DocumentPipeline<'a> {
    backend: &'a dyn OcrBackend,
    config: TavlaConfig,
    classifier: FinancialCellClassifier,
}

impl<'a> DocumentPipeline<'a> {
    pub fn new(backend: &'a dyn OcrBackend, config: TavlaConfig) -> Self {
        Self {
            backend,
            config,
            classifier: FinancialCellClassifier::new(),
        }
    }

    /// Process every page of a document.
    ///
    /// Page-level failures degrade to empty fallback results inside the
    /// orchestrator; the only hard error is a document with no pages.
    pub fn process(&self, source: &dyn PageSource) -> Result<DocumentResult> {
        let page_count = source.page_count();
        if page_count == 0 {
            return Err(TavlaError::Pdf(PdfError::NoPages));
        }

        let limit = if self.config.pdf.max_pages > 0 {
            (self.config.pdf.max_pages as u32).min(page_count)
        } else {
            page_count
        };
        info!("processing {} of {} pages", limit, page_count);

        let orchestrator = PageOrchestrator::new(self.backend, &self.config);
        let started = Instant::now();
        let mut pages = Vec::with_capacity(limit as usize);

        for page in 1..=limit {
            let page_started = Instant::now();
            let mut result = orchestrator.extract_page(source, page);

            if self.config.extraction.classify_financial_cells {
                result.table = self.normalize_financial(result.table);
            }

            let elapsed_ms = page_started.elapsed().as_millis() as u64;
            debug!(
                "page {}/{}: {} rows via {} in {}ms",
                page,
                limit,
                result.table.row_count(),
                result.method,
                elapsed_ms
            );
            pages.push(PageReport {
                page,
                result,
                elapsed_ms,
            });
        }

        let document = DocumentResult {
            pages,
            total_elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "document done: {} rows, methods {:?}, {}ms",
            document.total_rows(),
            document.method_counts(),
            document.total_elapsed_ms
        );
        Ok(document)
    }

    /// Replace cells with their normalized financial forms and drop
    /// rows left with no content.
    fn normalize_financial(&self, table: Table) -> Table {
        let rows: Vec<Vec<String>> = table
            .into_rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|cell| self.classifier.annotate(cell).normalized)
                    .collect::<Vec<String>>()
            })
            .filter(|row: &Vec<String>| row.iter().any(|c| !c.trim().is_empty()))
            .collect();
        Table::from_rows(rows)
    }
}

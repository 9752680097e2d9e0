//! Core library for Hebrew financial PDF table extraction.
//!
//! This crate provides:
//! - PDF processing (positioned text runs and page rendering)
//! - Content classification and OCR-oriented image preprocessing
//! - Multi-strategy table extraction (direct text layer, OCR, hybrid)
//! - Multi-pass OCR retry with result voting
//! - Financial cell typing for Israeli bank statements
//! - CSV and JSON export with right-to-left support

pub mod error;
pub mod export;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use error::{Result, TavlaError};
pub use export::{exporter_for, CsvExporter, ExportedFile, Exporter, JsonExporter};
pub use extract::{
    DirectTextExtractor, FinancialCellClassifier, OcrTextParser, PageOrchestrator,
    TableNormalizer, TextQualityAssessor,
};
pub use models::{ExtractionMethod, ExtractionResult, Table, TavlaConfig};
pub use ocr::{ContentClassifier, ImagePreprocessor, MultiPassOcr, NoOcr, OcrBackend};
pub use pdf::{LopdfSource, PageSource, TextRun};
pub use pipeline::{DocumentPipeline, DocumentResult, PageReport};

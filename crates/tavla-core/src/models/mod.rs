//! Data models shared across the extraction pipeline.

pub mod config;
pub mod table;

pub use config::{ExportConfig, ExtractionConfig, OcrConfig, PdfConfig, TavlaConfig};
pub use table::{ExtractionMethod, ExtractionResult, Table};

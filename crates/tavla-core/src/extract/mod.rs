//! Table extraction: strategy gating, direct text-layer
//! reconstruction, OCR text parsing, normalization, merging, financial
//! typing, and the per-page orchestrator.

pub mod direct;
pub mod financial;
pub mod merge;
pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod quality;

pub use direct::DirectTextExtractor;
pub use financial::{CellKind, FinancialCell, FinancialCellClassifier};
pub use merge::{merge_results, score_table};
pub use normalize::{clean_hebrew_text, TableNormalizer};
pub use orchestrator::PageOrchestrator;
pub use parser::{OcrTextParser, ParseProfile};
pub use quality::{Strategy, TextQuality, TextQualityAssessor};

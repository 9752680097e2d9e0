//! Error types for the tavla-core library.

use thiserror::Error;

/// Main error type for the tavla library.
#[derive(Error, Debug)]
pub enum TavlaError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Table extraction error.
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Export error.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract positioned text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to render a page to pixels.
    #[error("failed to render page: {0}")]
    Render(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
///
/// Clonable so failed attempts can be recorded alongside retries.
#[derive(Error, Debug, Clone)]
pub enum OcrError {
    /// The OCR backend failed to initialize or is not wired in.
    #[error("OCR backend unavailable: {0}")]
    Unavailable(String),

    /// Recognition call failed.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// A recognition attempt exceeded its time budget.
    #[error("recognition timed out after {0} ms")]
    Timeout(u64),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to table extraction and cell typing.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A page produced no usable rows.
    #[error("no table data found on page {0}")]
    EmptyPage(u32),

    /// Cell value failed validation.
    #[error("validation failed for cell at row {row}, column {col}: {reason}")]
    CellValidation {
        row: usize,
        col: usize,
        reason: String,
    },

    /// Failed to parse a cell value.
    #[error("failed to parse {kind} value: {value}")]
    Parse { kind: String, value: String },
}

/// Errors related to table export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The requested output format is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Serialization to the target format failed.
    #[error("failed to write {format}: {reason}")]
    Write { format: String, reason: String },
}

/// Result type for the tavla library.
pub type Result<T> = std::result::Result<T, TavlaError>;

//! PDF page access: positioned text runs and page rendering.

mod source;

pub use source::LopdfSource;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::PdfError;

/// A positioned fragment of text from a PDF text layer.
///
/// Coordinates are in PDF user space: origin bottom-left, y grows
/// upward. `width`/`height` are estimates derived from the font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Decoded text content.
    pub text: String,
    /// Left edge.
    pub x: f32,
    /// Baseline y.
    pub y: f32,
    /// Estimated advance width.
    pub width: f32,
    /// Estimated glyph height.
    pub height: f32,
}

impl TextRun {
    /// Create a run with the given text and position.
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge of the run.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Access to the pages of a loaded PDF document.
///
/// Implementations own the parsed document; the extraction pipeline
/// only ever sees pages through this trait.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Positioned text runs for a page (1-indexed).
    ///
    /// An image-only page yields an empty vector, not an error.
    fn text_runs(&self, page: u32) -> Result<Vec<TextRun>, PdfError>;

    /// Render a page (1-indexed) to pixels at the given scale factor.
    fn render(&self, page: u32, scale: f32) -> Result<RgbaImage, PdfError>;
}

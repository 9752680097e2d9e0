//! OCR engine invocation.
//!
//! The engine itself is an external service behind [`OcrBackend`].
//! Every call carries a self-contained [`OcrRequest`], so no engine
//! parameter state is shared or mutated between calls.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::classify::{ContentAnalysis, ContentKind};
use crate::error::OcrError;

/// Character whitelist for tabular content: Hebrew, digits, financial
/// punctuation, percent.
pub const WHITELIST_TABLE: &str = "אבגדהוזחטיכלמנסעפצקרשת0123456789.,()-+=₪$€£% ";

/// Whitelist for running Hebrew text, including Latin capitals.
pub const WHITELIST_HEBREW_TEXT: &str =
    "אבגדהוזחטיכלמנסעפצקרשתABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,()-+=₪$€£ ";

/// Widest whitelist, for mixed or unclassified pages.
pub const WHITELIST_MIXED: &str =
    "אבגדהוזחטיכלמנסעפצקרשתABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,()-+=₪$€£% ";

/// Conservative whitelist for degraded retries.
pub const WHITELIST_FALLBACK: &str = "אבגדהוזחטיכלמנסעפצקרשת0123456789.,()-+=₪$€£ ";

/// OCR engine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Neural LSTM engine.
    Lstm,
    /// Legacy shape-based engine, used in degraded retries.
    Legacy,
}

impl EngineMode {
    /// Tesseract `tessedit_ocr_engine_mode` code.
    pub fn as_code(&self) -> u8 {
        match self {
            Self::Lstm => 1,
            Self::Legacy => 0,
        }
    }
}

/// Page segmentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Automatic segmentation with orientation/script detection.
    AutoOsd,
    /// Fully automatic segmentation.
    Auto,
    /// Single uniform block of text.
    UniformBlock,
    /// Single word, for sparse or degraded content.
    SingleWord,
}

impl PageSegMode {
    /// Tesseract `tessedit_pageseg_mode` code.
    pub fn as_code(&self) -> u8 {
        match self {
            Self::AutoOsd => 1,
            Self::Auto => 3,
            Self::UniformBlock => 6,
            Self::SingleWord => 8,
        }
    }
}

/// One self-contained recognition request.
#[derive(Debug, Clone)]
pub struct OcrRequest<'a> {
    /// Image to recognize; preprocessing has already happened.
    pub image: &'a RgbaImage,
    /// Recognition languages, e.g. "heb+eng".
    pub lang: &'a str,
    pub engine_mode: EngineMode,
    pub page_seg_mode: PageSegMode,
    pub whitelist: &'static str,
}

impl<'a> OcrRequest<'a> {
    /// Parameters for a classified page.
    ///
    /// Two overrides apply after the base mapping: strong ruled-line
    /// structure forces uniform-block segmentation, and very sparse
    /// pages (density < 0.1) force single-word mode.
    pub fn for_content(image: &'a RgbaImage, lang: &'a str, analysis: &ContentAnalysis) -> Self {
        let (mut page_seg_mode, whitelist) = match analysis.kind {
            ContentKind::Table => (PageSegMode::UniformBlock, WHITELIST_TABLE),
            ContentKind::HebrewText => (PageSegMode::Auto, WHITELIST_HEBREW_TEXT),
            ContentKind::Mixed => (PageSegMode::AutoOsd, WHITELIST_MIXED),
        };

        if analysis.has_strong_line_structure() {
            page_seg_mode = PageSegMode::UniformBlock;
        }
        if analysis.metrics.text_density < 0.1 {
            page_seg_mode = PageSegMode::SingleWord;
        }

        Self {
            image,
            lang,
            engine_mode: EngineMode::Lstm,
            page_seg_mode,
            whitelist,
        }
    }

    /// Conservative parameters for degraded retries.
    pub fn fallback(image: &'a RgbaImage, lang: &'a str) -> Self {
        Self {
            image,
            lang,
            engine_mode: EngineMode::Lstm,
            page_seg_mode: PageSegMode::SingleWord,
            whitelist: WHITELIST_FALLBACK,
        }
    }

    /// Replace the image, keeping all parameters.
    pub fn with_image(mut self, image: &'a RgbaImage) -> Self {
        self.image = image;
        self
    }

    pub fn with_engine_mode(mut self, mode: EngineMode) -> Self {
        self.engine_mode = mode;
        self
    }

    pub fn with_page_seg_mode(mut self, mode: PageSegMode) -> Self {
        self.page_seg_mode = mode;
        self
    }
}

/// Recognized text plus the engine's mean confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub text: String,
    /// Engine confidence, 0-100.
    pub confidence: f32,
}

/// External OCR engine.
///
/// Implementations are not assumed safe for concurrent `recognize`
/// calls; the pipeline invokes them strictly sequentially. The
/// per-attempt time budget is the implementation's responsibility:
/// return [`OcrError::Timeout`] and the caller treats it as a failed
/// attempt.
pub trait OcrBackend {
    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrOutcome, OcrError>;
}

/// Backend used when no OCR engine is wired in.
///
/// Text-layer extraction still works; any OCR path reports the engine
/// as unavailable.
#[derive(Debug, Default)]
pub struct NoOcr;

impl OcrBackend for NoOcr {
    fn recognize(&self, _request: &OcrRequest<'_>) -> Result<OcrOutcome, OcrError> {
        Err(OcrError::Unavailable(
            "no OCR backend configured".to_string(),
        ))
    }
}

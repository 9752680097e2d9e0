//! OCR pipeline: content classification, image preprocessing, engine
//! invocation, and multi-pass retry with result voting.

pub mod classify;
pub mod engine;
pub mod multipass;
pub mod preprocess;

pub use classify::{ContentAnalysis, ContentClassifier, ContentKind, ContentMetrics};
pub use engine::{
    EngineMode, NoOcr, OcrBackend, OcrOutcome, OcrRequest, PageSegMode,
};
pub use multipass::{AttemptKind, MultiPassOcr, OcrAttempt};
pub use preprocess::{EnhanceOptions, ImagePreprocessor};

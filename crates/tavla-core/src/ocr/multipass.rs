//! Multi-pass OCR with result voting.
//!
//! Four attempts with progressively different preprocessing and engine
//! parameters run sequentially over the same page; each attempt's text
//! is parsed to a table and scored, and the best composite score wins.
//! A failed attempt is recorded as a zero-score entry rather than
//! aborting the ladder.

use std::time::Instant;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classify::ContentAnalysis;
use super::engine::{
    EngineMode, OcrBackend, OcrRequest, PageSegMode, WHITELIST_MIXED,
};
use super::preprocess::{EnhanceOptions, ImagePreprocessor};
use crate::extract::merge::score_table;
use crate::extract::parser::{OcrTextParser, ParseProfile};
use crate::models::Table;

/// Per-attempt time budget used in the speed term of the composite
/// score.
const ATTEMPT_BUDGET_MS: f32 = 30_000.0;

/// Which rung of the retry ladder produced an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    /// Preprocessed image with content-tuned parameters.
    Enhanced,
    /// Conservative re-enhancement with fallback parameters.
    Conservative,
    /// Original image through the legacy engine.
    Legacy,
    /// Aggressive 4x upscale of the original.
    HighScale,
}

impl AttemptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::Conservative => "conservative",
            Self::Legacy => "legacy",
            Self::HighScale => "high_scale",
        }
    }
}

/// One completed (or failed) OCR attempt.
#[derive(Debug, Clone)]
pub struct OcrAttempt {
    pub kind: AttemptKind,
    pub text: String,
    /// Engine confidence, 0-100; 0 for failed attempts.
    pub confidence: f32,
    pub table: Table,
    pub table_score: f32,
    pub elapsed_ms: u64,
    /// Recognized text length in characters.
    pub text_length: usize,
}

impl OcrAttempt {
    /// Zero-score placeholder for an attempt that errored out.
    fn failed(kind: AttemptKind) -> Self {
        Self {
            kind,
            text: String::new(),
            confidence: 0.0,
            table: Table::new(),
            table_score: 0.0,
            elapsed_ms: 0,
            text_length: 0,
        }
    }
}

/// Composite attempt score: engine confidence 40%, parsed-table quality
/// 35%, text volume 15% (capped at 500 characters), speed 10%, plus a
/// flat bonus for tables past 5 rows.
pub fn selection_score(attempt: &OcrAttempt) -> f32 {
    let mut score = 0.0f32;
    score += (attempt.confidence / 100.0) * 0.4;
    score += attempt.table_score * 0.35;
    score += (attempt.text_length as f32 / 500.0).min(1.0) * 0.15;
    score += (1.0 - attempt.elapsed_ms as f32 / ATTEMPT_BUDGET_MS).max(0.0) * 0.10;
    if attempt.table.row_count() > 5 {
        score += 0.1;
    }
    score
}

/// Index of the best attempt. Ties keep the earliest attempt, so the
/// ladder's cheaper rungs win when scores are equal.
pub fn select_best(attempts: &[OcrAttempt]) -> usize {
    let mut best = 0;
    let mut best_score = f32::MIN;
    for (i, attempt) in attempts.iter().enumerate() {
        let score = selection_score(attempt);
        debug!(
            "attempt {} ({}): confidence {:.1}, table score {:.3}, composite {:.3}",
            i + 1,
            attempt.kind.as_str(),
            attempt.confidence,
            attempt.table_score,
            score
        );
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}

/// Runs the four-attempt OCR ladder and picks a winner.
#[derive(Debug, Default)]
pub struct MultiPassOcr {
    preprocessor: ImagePreprocessor,
    parser: OcrTextParser,
}

impl MultiPassOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all four attempts over a page.
    ///
    /// `original` is the page as rendered; `processed` is the already
    /// preprocessed image the first attempt reuses. Returns the winning
    /// attempt; when every attempt fails the winner is an empty
    /// zero-confidence attempt.
    pub fn run(
        &self,
        backend: &dyn OcrBackend,
        original: &RgbaImage,
        processed: &RgbaImage,
        lang: &str,
        analysis: &ContentAnalysis,
    ) -> OcrAttempt {
        let content_profile = ParseProfile::from(analysis.kind);
        let mut attempts = Vec::with_capacity(4);

        // Attempt 1: the already-enhanced image with content-tuned
        // engine parameters.
        let request = OcrRequest::for_content(processed, lang, analysis);
        attempts.push(self.attempt(backend, AttemptKind::Enhanced, &request, content_profile));

        // Attempt 2: conservative re-enhancement of the original,
        // fallback engine parameters.
        let conservative = self.preprocessor.enhance_for_ocr(
            original,
            &EnhanceOptions {
                scale: 2.0,
                noise_reduction: false,
                contrast_enhancement: true,
                sharpen: false,
                binary_threshold: true,
            },
        );
        let request = OcrRequest::fallback(&conservative, lang);
        attempts.push(self.attempt(
            backend,
            AttemptKind::Conservative,
            &request,
            ParseProfile::Fallback,
        ));

        // Attempt 3: the untouched original through the legacy engine
        // as a uniform block.
        let request = OcrRequest {
            image: original,
            lang,
            engine_mode: EngineMode::Legacy,
            page_seg_mode: PageSegMode::UniformBlock,
            whitelist: WHITELIST_MIXED,
        };
        attempts.push(self.attempt(
            backend,
            AttemptKind::Legacy,
            &request,
            ParseProfile::Advanced,
        ));

        // Attempt 4: aggressive upscale of the original, content-tuned
        // parameters restored.
        let upscaled = self.preprocessor.enhance_for_ocr(
            original,
            &EnhanceOptions {
                scale: 4.0,
                ..EnhanceOptions::default()
            },
        );
        let request = OcrRequest::for_content(&upscaled, lang, analysis);
        attempts.push(self.attempt(backend, AttemptKind::HighScale, &request, content_profile));

        let best = select_best(&attempts);
        let winner = attempts.swap_remove(best);
        info!(
            "multi-pass OCR selected attempt {} ({}) with confidence {:.1}",
            best + 1,
            winner.kind.as_str(),
            winner.confidence
        );
        winner
    }

    fn attempt(
        &self,
        backend: &dyn OcrBackend,
        kind: AttemptKind,
        request: &OcrRequest<'_>,
        profile: ParseProfile,
    ) -> OcrAttempt {
        let started = Instant::now();
        match backend.recognize(request) {
            Ok(outcome) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let table = self.parser.parse(&outcome.text, profile);
                let table_score = score_table(&table);
                debug!(
                    "attempt {} finished in {}ms: {} chars, {} rows",
                    kind.as_str(),
                    elapsed_ms,
                    outcome.text.len(),
                    table.row_count()
                );
                let text_length = outcome.text.chars().count();
                OcrAttempt {
                    kind,
                    text: outcome.text,
                    confidence: outcome.confidence,
                    table,
                    table_score,
                    elapsed_ms,
                    text_length,
                }
            }
            Err(err) => {
                warn!("OCR attempt {} failed: {}", kind.as_str(), err);
                OcrAttempt::failed(kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::classify::{ContentAnalysis, ContentKind, ContentMetrics};
    use crate::ocr::engine::OcrOutcome;
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Backend that replays scripted outcomes in call order.
    struct Scripted {
        outcomes: RefCell<VecDeque<Result<OcrOutcome, OcrError>>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<OcrOutcome, OcrError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
            }
        }
    }

    impl OcrBackend for Scripted {
        fn recognize(&self, _request: &OcrRequest<'_>) -> Result<OcrOutcome, OcrError> {
            self.outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(OcrError::Unavailable("script exhausted".to_string())))
        }
    }

    fn analysis() -> ContentAnalysis {
        ContentAnalysis {
            kind: ContentKind::Table,
            confidence: 0.9,
            metrics: ContentMetrics {
                text_density: 0.15,
                horizontal_line_ratio: 0.002,
                vertical_line_ratio: 0.001,
                text_block_ratio: 3.0,
                structured_content_ratio: 0.1,
            },
        }
    }

    fn img() -> RgbaImage {
        RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]))
    }

    fn attempt(kind: AttemptKind, confidence: f32, table_score: f32) -> OcrAttempt {
        OcrAttempt {
            kind,
            text: "a".repeat(200),
            confidence,
            table: Table::from_rows(vec![vec!["תא".to_string(), "100".to_string()]]),
            table_score,
            elapsed_ms: 1_000,
            text_length: 200,
        }
    }

    #[test]
    fn test_selection_favors_data_quality_over_confidence() {
        // Attempt confidences 20/15/60/40 with table scores
        // 0.1/0.05/0.8/0.3: the third attempt's table quality and
        // confidence together beat the rest.
        let attempts = vec![
            attempt(AttemptKind::Enhanced, 20.0, 0.1),
            attempt(AttemptKind::Conservative, 15.0, 0.05),
            attempt(AttemptKind::Legacy, 60.0, 0.8),
            attempt(AttemptKind::HighScale, 40.0, 0.3),
        ];
        assert_eq!(select_best(&attempts), 2);
    }

    #[test]
    fn test_ties_keep_earliest_attempt() {
        let attempts = vec![
            attempt(AttemptKind::Enhanced, 50.0, 0.5),
            attempt(AttemptKind::Conservative, 50.0, 0.5),
        ];
        assert_eq!(select_best(&attempts), 0);
    }

    #[test]
    fn test_large_table_bonus() {
        let small = attempt(AttemptKind::Enhanced, 50.0, 0.5);
        let mut large = small.clone();
        large.table = Table::from_rows(vec![
            vec!["א".to_string(), "1".to_string()];
            6
        ]);
        let diff = selection_score(&large) - selection_score(&small);
        assert!((diff - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_run_survives_failing_attempts() {
        let text = "תאריך  סכום\n01/01/2024  1,500.00\n02/01/2024  2,000.00";
        let backend = Scripted::new(vec![
            Err(OcrError::Recognition("blank".to_string())),
            Err(OcrError::Timeout(30_000)),
            Ok(OcrOutcome {
                text: text.to_string(),
                confidence: 60.0,
            }),
            Err(OcrError::Recognition("blank".to_string())),
        ]);

        let original = img();
        let processed = img();
        let winner =
            MultiPassOcr::new().run(&backend, &original, &processed, "heb+eng", &analysis());
        assert_eq!(winner.kind, AttemptKind::Legacy);
        assert_eq!(winner.confidence, 60.0);
        assert_eq!(winner.table.row_count(), 3);
    }

    #[test]
    fn test_all_attempts_failing_yields_empty_winner() {
        let backend = Scripted::new(vec![
            Err(OcrError::Unavailable("down".to_string())),
            Err(OcrError::Unavailable("down".to_string())),
            Err(OcrError::Unavailable("down".to_string())),
            Err(OcrError::Unavailable("down".to_string())),
        ]);

        let original = img();
        let processed = img();
        let winner =
            MultiPassOcr::new().run(&backend, &original, &processed, "heb+eng", &analysis());
        assert!(winner.table.is_empty());
        assert_eq!(winner.confidence, 0.0);
        assert!(winner.text.is_empty());
    }
}

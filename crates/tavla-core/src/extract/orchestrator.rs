//! Per-page extraction orchestration.
//!
//! Each page walks an explicit state machine: assess the text layer,
//! pick a strategy, run direct and/or OCR extraction, then normalize
//! and validate. Any PDF-level failure drops into a one-shot fallback
//! OCR attempt so a bad page degrades to an empty table instead of
//! failing the document.

use tracing::{debug, info, warn};

use super::direct::DirectTextExtractor;
use super::merge::merge_results;
use super::normalize::{clean_hebrew_text, TableNormalizer};
use super::parser::{OcrTextParser, ParseProfile};
use super::quality::{Strategy, TextQualityAssessor};
use crate::error::PdfError;
use crate::models::{ExtractionMethod, ExtractionResult, TavlaConfig, Table};
use crate::ocr::{
    ContentAnalysis, ContentClassifier, ContentKind, EnhanceOptions, ImagePreprocessor,
    MultiPassOcr, OcrBackend, OcrRequest,
};
use crate::pdf::{PageSource, TextRun};
use image::RgbaImage;

/// Page extraction states. Data flows through the variants so each
/// transition owns exactly what the next step needs.
enum PageState {
    Start,
    AssessText(Vec<TextRun>),
    Direct(Vec<TextRun>),
    Hybrid(Vec<TextRun>),
    OcrOnly,
    Normalize(Table, ExtractionMethod),
    Validate(Table, ExtractionMethod),
    Done(ExtractionResult),
    ErrorFallback,
}

/// Drives one page through strategy selection, extraction, and
/// cleanup.
pub struct PageOrchestrator<'a> {
    backend: &'a dyn OcrBackend,
    config: &'a TavlaConfig,
    classifier: ContentClassifier,
    preprocessor: ImagePreprocessor,
    assessor: TextQualityAssessor,
    direct: DirectTextExtractor,
    parser: OcrTextParser,
    normalizer: TableNormalizer,
    multipass: MultiPassOcr,
}

impl<'a> PageOrchestrator<'a> {
    pub fn new(backend: &'a dyn OcrBackend, config: &'a TavlaConfig) -> Self {
        Self {
            backend,
            config,
            classifier: ContentClassifier::new(),
            preprocessor: ImagePreprocessor::new(),
            assessor: TextQualityAssessor::new(),
            direct: DirectTextExtractor::new()
                .with_row_tolerance(config.extraction.row_tolerance)
                .with_column_gap_bounds(
                    config.extraction.min_column_gap,
                    config.extraction.max_column_gap,
                ),
            parser: OcrTextParser::new(),
            normalizer: TableNormalizer::new().with_min_row_cells(config.extraction.min_row_cells),
            multipass: MultiPassOcr::new(),
        }
    }

    /// Extract one page. Never fails: unrecoverable pages come back as
    /// an empty fallback-OCR result.
    pub fn extract_page(&self, source: &dyn PageSource, page: u32) -> ExtractionResult {
        let mut state = PageState::Start;
        loop {
            state = match state {
                PageState::Start => match source.text_runs(page) {
                    Ok(runs) => PageState::AssessText(runs),
                    Err(err) => {
                        warn!("page {}: text layer unreadable: {}", page, err);
                        PageState::ErrorFallback
                    }
                },

                PageState::AssessText(runs) => {
                    let total_len: usize =
                        runs.iter().map(|r| r.text.chars().count()).sum();
                    if total_len < self.config.pdf.min_text_length {
                        debug!("page {}: text layer too short ({} chars)", page, total_len);
                        PageState::OcrOnly
                    } else {
                        let quality = self.assessor.assess(&runs);
                        info!(
                            "page {}: text quality {:.2} ({})",
                            page, quality.score, quality.reason
                        );
                        match quality.strategy() {
                            Strategy::DirectOnly => PageState::Direct(runs),
                            Strategy::Hybrid => PageState::Hybrid(runs),
                            Strategy::OcrOnly => PageState::OcrOnly,
                        }
                    }
                }

                PageState::Direct(runs) => PageState::Normalize(
                    self.direct.extract(&runs),
                    ExtractionMethod::Direct,
                ),

                PageState::Hybrid(runs) => {
                    let direct_table = self.direct.extract(&runs);
                    match self.ocr_table(source, page) {
                        Ok(ocr_table) => PageState::Normalize(
                            merge_results(direct_table, ocr_table),
                            ExtractionMethod::Hybrid,
                        ),
                        Err(err) => {
                            warn!("page {}: OCR side of hybrid failed: {}", page, err);
                            PageState::ErrorFallback
                        }
                    }
                }

                PageState::OcrOnly => match self.ocr_table(source, page) {
                    Ok(table) => PageState::Normalize(table, ExtractionMethod::OcrOnly),
                    Err(err) => {
                        warn!("page {}: OCR extraction failed: {}", page, err);
                        PageState::ErrorFallback
                    }
                },

                PageState::Normalize(table, method) => {
                    let table = self.normalizer.normalize(table);
                    let table = self.normalizer.merge_header_rows(table);
                    PageState::Validate(table, method)
                }

                PageState::Validate(table, method) => PageState::Done(ExtractionResult {
                    table: self.normalizer.validate(table),
                    method,
                }),

                PageState::Done(result) => {
                    debug!(
                        "page {}: {} rows via {}",
                        page,
                        result.table.row_count(),
                        result.method
                    );
                    return result;
                }

                PageState::ErrorFallback => return self.fallback(source, page),
            };
        }
    }

    /// Render, classify, preprocess, and recognize a page. Engine
    /// failures and low confidence escalate to the multi-pass ladder;
    /// only PDF rendering errors propagate.
    fn ocr_table(&self, source: &dyn PageSource, page: u32) -> Result<Table, PdfError> {
        let original = source.render(page, self.config.pdf.render_scale)?;
        let analysis = self.classifier.classify(&original);
        debug!(
            "page {}: classified {:?} (confidence {:.2})",
            page, analysis.kind, analysis.confidence
        );

        let processed = self.preprocess_for(&original, &analysis);
        let lang = &self.config.ocr.languages;
        let request = OcrRequest::for_content(&processed, lang, &analysis);
        let profile = ParseProfile::from(analysis.kind);

        let table = match self.backend.recognize(&request) {
            Ok(outcome)
                if outcome.confidence >= self.config.ocr.multipass_confidence_threshold
                    || !self.config.ocr.enable_multipass =>
            {
                self.parser.parse(&outcome.text, profile)
            }
            Ok(outcome) => {
                info!(
                    "page {}: confidence {:.1} below {:.1}, escalating to multi-pass",
                    page, outcome.confidence, self.config.ocr.multipass_confidence_threshold
                );
                self.multipass
                    .run(self.backend, &original, &processed, lang, &analysis)
                    .table
            }
            Err(err) if self.config.ocr.enable_multipass => {
                warn!("page {}: OCR failed ({}), escalating to multi-pass", page, err);
                self.multipass
                    .run(self.backend, &original, &processed, lang, &analysis)
                    .table
            }
            Err(err) => {
                warn!("page {}: OCR failed: {}", page, err);
                Table::new()
            }
        };

        Ok(clean_cells(table))
    }

    /// Content-specific preprocessing; stage aggressiveness follows the
    /// classification confidence.
    fn preprocess_for(&self, image: &RgbaImage, analysis: &ContentAnalysis) -> RgbaImage {
        match analysis.kind {
            ContentKind::Table => {
                let lined = self.preprocessor.preprocess_table(image);
                self.preprocessor.enhance_for_ocr(
                    &lined,
                    &EnhanceOptions {
                        scale: if analysis.confidence > 0.7 { 1.0 } else { 1.2 },
                        noise_reduction: true,
                        contrast_enhancement: true,
                        sharpen: analysis.confidence > 0.5,
                        binary_threshold: true,
                    },
                )
            }
            ContentKind::HebrewText => {
                let tuned = self.preprocessor.optimize_for_hebrew(image);
                self.preprocessor.enhance_for_ocr(
                    &tuned,
                    &EnhanceOptions {
                        scale: 1.3,
                        noise_reduction: analysis.confidence < 0.5,
                        contrast_enhancement: true,
                        sharpen: false,
                        binary_threshold: true,
                    },
                )
            }
            ContentKind::Mixed => self.preprocessor.enhance_for_ocr(
                image,
                &EnhanceOptions {
                    scale: if analysis.confidence > 0.6 { 1.2 } else { 1.5 },
                    noise_reduction: true,
                    contrast_enhancement: true,
                    sharpen: analysis.confidence > 0.4,
                    binary_threshold: true,
                },
            ),
        }
    }

    /// Last-resort path for pages whose normal extraction errored: one
    /// conservative OCR attempt, then give up with an empty table.
    fn fallback(&self, source: &dyn PageSource, page: u32) -> ExtractionResult {
        warn!("page {}: attempting fallback OCR", page);

        let image = match source.render(page, self.config.pdf.render_scale) {
            Ok(image) => image,
            Err(err) => {
                warn!("page {}: fallback render failed: {}", page, err);
                return ExtractionResult::empty(ExtractionMethod::FallbackOcr);
            }
        };

        let request = OcrRequest::fallback(&image, &self.config.ocr.languages);
        match self.backend.recognize(&request) {
            Ok(outcome) => {
                let table = self.parser.parse(&outcome.text, ParseProfile::Fallback);
                ExtractionResult {
                    table: clean_cells(table),
                    method: ExtractionMethod::FallbackOcr,
                }
            }
            Err(err) => {
                warn!("page {}: fallback OCR failed: {}", page, err);
                ExtractionResult::empty(ExtractionMethod::FallbackOcr)
            }
        }
    }
}

/// Run every cell through the Hebrew OCR glyph cleanup.
fn clean_cells(table: Table) -> Table {
    Table::from_rows(
        table
            .into_rows()
            .into_iter()
            .map(|row| row.into_iter().map(|c| clean_hebrew_text(&c)).collect())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::engine::OcrOutcome;
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct MockSource {
        runs: Vec<TextRun>,
        fail_text: bool,
        fail_render: bool,
    }

    impl MockSource {
        fn with_runs(runs: Vec<TextRun>) -> Self {
            Self {
                runs,
                fail_text: false,
                fail_render: false,
            }
        }
    }

    impl PageSource for MockSource {
        fn page_count(&self) -> u32 {
            1
        }

        fn text_runs(&self, _page: u32) -> Result<Vec<TextRun>, PdfError> {
            if self.fail_text {
                Err(PdfError::TextExtraction("damaged stream".to_string()))
            } else {
                Ok(self.runs.clone())
            }
        }

        fn render(&self, _page: u32, _scale: f32) -> Result<RgbaImage, PdfError> {
            if self.fail_render {
                Err(PdfError::Render("no raster".to_string()))
            } else {
                Ok(RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255])))
            }
        }
    }

    /// Backend replaying scripted outcomes; repeats the last entry when
    /// exhausted.
    struct Scripted {
        outcomes: RefCell<VecDeque<Result<OcrOutcome, OcrError>>>,
        calls: RefCell<usize>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<OcrOutcome, OcrError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
                calls: RefCell::new(0),
            }
        }

        fn constant(text: &str, confidence: f32) -> Self {
            Self::new(vec![Ok(OcrOutcome {
                text: text.to_string(),
                confidence,
            })])
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl OcrBackend for Scripted {
        fn recognize(&self, _request: &OcrRequest<'_>) -> Result<OcrOutcome, OcrError> {
            *self.calls.borrow_mut() += 1;
            let mut outcomes = self.outcomes.borrow_mut();
            if outcomes.len() > 1 {
                outcomes.pop_front().unwrap()
            } else {
                outcomes
                    .front()
                    .cloned()
                    .map_or_else(|| Err(OcrError::Unavailable("empty".to_string())), |o| o)
            }
        }
    }

    fn run(text: &str, x: f32, y: f32) -> TextRun {
        TextRun::new(text, x, y, 30.0, 12.0)
    }

    fn rich_runs() -> Vec<TextRun> {
        vec![
            run("תאריך", 10.0, 700.0),
            run("תיאור", 200.0, 700.0),
            run("סכום", 400.0, 700.0),
            run("15/03/2024", 10.0, 650.0),
            run("העברה בנקאית", 200.0, 650.0),
            run("1,234.56 ₪", 400.0, 650.0),
            run("16/03/2024", 10.0, 600.0),
            run("משכורת חודשית", 200.0, 600.0),
            run("8,000.00 ₪", 400.0, 600.0),
        ]
    }

    const OCR_TEXT: &str = "תאריך  סכום\n01/01/2024  1,500.00\n02/01/2024  2,000.00";

    #[test]
    fn test_rich_text_layer_goes_direct_without_ocr() {
        let config = TavlaConfig::default();
        let backend = Scripted::new(vec![]);
        let source = MockSource::with_runs(rich_runs());

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::Direct);
        assert_eq!(result.table.row_count(), 3);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_garbage_text_layer_routes_ocr_only() {
        let config = TavlaConfig::default();
        let backend = Scripted::constant(OCR_TEXT, 80.0);
        // Enough characters to pass the length gate, none of them
        // readable words.
        let source = MockSource::with_runs(vec![run("~~~~ #### ~~~~", 10.0, 100.0)]);

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::OcrOnly);
        assert_eq!(result.table.row_count(), 3);
        assert!(backend.calls() >= 1);
    }

    #[test]
    fn test_short_text_layer_skips_assessment() {
        let config = TavlaConfig::default();
        let backend = Scripted::constant(OCR_TEXT, 80.0);
        let source = MockSource::with_runs(vec![run("אב", 10.0, 100.0)]);

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::OcrOnly);
    }

    #[test]
    fn test_medium_quality_runs_hybrid() {
        let config = TavlaConfig::default();
        // OCR contributes nothing, so the direct table must win the
        // merge; the method still records the hybrid path.
        let backend = Scripted::constant("", 80.0);
        let source = MockSource::with_runs(vec![
            run("שלום", 10.0, 100.0),
            run("עולם", 200.0, 100.0),
            run("טוב", 10.0, 60.0),
            run("מאוד", 200.0, 60.0),
        ]);

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::Hybrid);
        assert_eq!(result.table.row_count(), 2);
    }

    #[test]
    fn test_low_confidence_escalates_to_multipass() {
        let config = TavlaConfig::default();
        let backend = Scripted::new(vec![
            // Initial single pass: confidence below the threshold.
            Ok(OcrOutcome {
                text: "שטויות".to_string(),
                confidence: 10.0,
            }),
            // Ladder attempt 1 wins.
            Ok(OcrOutcome {
                text: OCR_TEXT.to_string(),
                confidence: 85.0,
            }),
            Err(OcrError::Recognition("blank".to_string())),
            Err(OcrError::Recognition("blank".to_string())),
            Err(OcrError::Recognition("blank".to_string())),
        ]);
        let source = MockSource::with_runs(vec![run("~~~~ #### ~~~~", 10.0, 100.0)]);

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::OcrOnly);
        assert_eq!(result.table.row_count(), 3);
        // One single-pass call plus four ladder attempts.
        assert_eq!(backend.calls(), 5);
    }

    #[test]
    fn test_unreadable_text_layer_falls_back_to_ocr() {
        let config = TavlaConfig::default();
        let backend = Scripted::constant(OCR_TEXT, 70.0);
        let mut source = MockSource::with_runs(vec![]);
        source.fail_text = true;

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::FallbackOcr);
        assert_eq!(result.table.row_count(), 3);
    }

    #[test]
    fn test_totally_broken_page_gives_empty_result() {
        let config = TavlaConfig::default();
        let backend = Scripted::new(vec![]);
        let mut source = MockSource::with_runs(vec![]);
        source.fail_text = true;
        source.fail_render = true;

        let result = PageOrchestrator::new(&backend, &config).extract_page(&source, 1);
        assert_eq!(result.method, ExtractionMethod::FallbackOcr);
        assert!(result.table.is_empty());
    }
}

//! Page content classification from pixel statistics.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grayscale threshold below which a pixel counts as ink.
const INK_THRESHOLD: f32 = 128.0;

/// What kind of content dominates a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Ruled or strongly structured tabular content.
    Table,
    /// Running Hebrew text.
    HebrewText,
    /// Sparse, mixed, or unclassified content.
    Mixed,
}

/// Normalized pixel statistics backing a classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    /// Ink pixels over total pixels.
    pub text_density: f32,
    /// Horizontal-line ink pixels over total pixels.
    pub horizontal_line_ratio: f32,
    /// Vertical-line run count over total pixels.
    pub vertical_line_ratio: f32,
    /// Short ink runs per hundredth of the page area.
    pub text_block_ratio: f32,
    /// Line ink over all ink.
    pub structured_content_ratio: f32,
}

/// Classification result for one rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub kind: ContentKind,
    pub confidence: f32,
    pub metrics: ContentMetrics,
}

impl ContentAnalysis {
    /// Strong ruled-line structure, used to force table segmentation
    /// even when the page classified otherwise.
    pub fn has_strong_line_structure(&self) -> bool {
        self.metrics.horizontal_line_ratio > 0.001 && self.metrics.vertical_line_ratio > 0.0005
    }
}

/// Classifies rendered pages as table, Hebrew text, or mixed content.
///
/// The thresholds are empirically tuned against scanned Israeli bank
/// statements and must not drift; they pair with the PSM mapping in
/// [`crate::ocr::OcrRequest::for_content`].
#[derive(Debug, Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a page image and decide its content kind.
    pub fn classify(&self, image: &RgbaImage) -> ContentAnalysis {
        let width = image.width() as usize;
        let height = image.height() as usize;

        let mut black_pixels = 0u64;
        let mut horizontal_line_pixels = 0u64;
        let mut vertical_line_pixels = 0u64;
        let mut text_blocks = 0u64;

        let h_line_run = width as f32 * 0.15;
        let text_run_cap = width as f32 * 0.1;
        let v_line_run = height as f32 * 0.1;

        // Horizontal scan: ink pixels past the line-run threshold count
        // as line ink; short ink runs bounded by whitespace count as
        // text blocks. Edge row/column excluded, matching the tuned
        // thresholds.
        for y in 0..height.saturating_sub(1) {
            let mut consecutive_black = 0u32;
            for x in 0..width.saturating_sub(1) {
                if is_ink(image, x as u32, y as u32) {
                    black_pixels += 1;
                    consecutive_black += 1;
                    if consecutive_black as f32 > h_line_run {
                        horizontal_line_pixels += 1;
                    }
                } else {
                    if consecutive_black > 0 && (consecutive_black as f32) < text_run_cap {
                        text_blocks += 1;
                    }
                    consecutive_black = 0;
                }
            }
        }

        // Vertical scan counts completed long runs, not pixels.
        for x in 0..width.saturating_sub(1) {
            let mut consecutive_black = 0u32;
            for y in 0..height.saturating_sub(1) {
                if is_ink(image, x as u32, y as u32) {
                    consecutive_black += 1;
                } else {
                    if consecutive_black as f32 > v_line_run {
                        vertical_line_pixels += 1;
                    }
                    consecutive_black = 0;
                }
            }
        }

        let total_pixels = (width * height) as f32;
        let text_density = black_pixels as f32 / total_pixels;
        let horizontal_line_ratio = horizontal_line_pixels as f32 / total_pixels;
        let vertical_line_ratio = vertical_line_pixels as f32 / total_pixels;
        let text_block_ratio = text_blocks as f32 / (total_pixels / 100.0);
        let structured_content_ratio = if black_pixels > 0 {
            (horizontal_line_pixels + vertical_line_pixels) as f32 / black_pixels as f32
        } else {
            0.0
        };

        let metrics = ContentMetrics {
            text_density,
            horizontal_line_ratio,
            vertical_line_ratio,
            text_block_ratio,
            structured_content_ratio,
        };

        let (kind, confidence) = if (horizontal_line_ratio > 0.001 && vertical_line_ratio > 0.0005)
            || structured_content_ratio > 0.3
        {
            (
                ContentKind::Table,
                ((horizontal_line_ratio + vertical_line_ratio) * 1000.0).min(1.0),
            )
        } else if text_density > 0.05 && text_density < 0.25 && text_block_ratio > 2.0 {
            (ContentKind::HebrewText, (text_block_ratio / 10.0).min(1.0))
        } else if text_density < 0.02 {
            (ContentKind::Mixed, 0.3)
        } else {
            (ContentKind::Mixed, 0.0)
        };

        debug!(
            "content analysis: {:?} (conf {:.3}) density={:.4} h-lines={:.4} v-lines={:.4} blocks={:.2}",
            kind, confidence, text_density, horizontal_line_ratio, vertical_line_ratio,
            text_block_ratio
        );

        ContentAnalysis {
            kind,
            confidence,
            metrics,
        }
    }
}

fn is_ink(image: &RgbaImage, x: u32, y: u32) -> bool {
    let p = image.get_pixel(x, y);
    let gray = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
    gray < INK_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    }

    fn paint_rect(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..(y0 + h).min(img.height()) {
            for x in x0..(x0 + w).min(img.width()) {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }

    #[test]
    fn test_blank_page_is_sparse_mixed() {
        let img = blank(100, 100);
        let analysis = ContentClassifier::new().classify(&img);
        assert_eq!(analysis.kind, ContentKind::Mixed);
        assert_eq!(analysis.confidence, 0.3);
        assert_eq!(analysis.metrics.text_density, 0.0);
    }

    #[test]
    fn test_ruled_grid_classifies_as_table() {
        let mut img = blank(200, 200);
        // Full-width horizontal rules.
        for i in 0..5 {
            paint_rect(&mut img, 0, 20 + i * 35, 200, 2);
        }
        // Vertical rules in two long segments each, ending on white so
        // the run counter registers them.
        for i in 0..6 {
            paint_rect(&mut img, 10 + i * 30, 5, 2, 80);
            paint_rect(&mut img, 10 + i * 30, 95, 2, 80);
        }
        let analysis = ContentClassifier::new().classify(&img);
        assert_eq!(analysis.kind, ContentKind::Table);
        assert!(analysis.confidence > 0.0);
        assert!(analysis.has_strong_line_structure());
    }

    #[test]
    fn test_short_run_texture_classifies_as_text() {
        let mut img = blank(200, 200);
        // Many short word-like blobs: density in (0.05, 0.25) and a
        // high short-run count.
        for row in 0..20 {
            for col in 0..12 {
                paint_rect(&mut img, col * 16, row * 10, 9, 4);
            }
        }
        let analysis = ContentClassifier::new().classify(&img);
        assert_eq!(analysis.kind, ContentKind::HebrewText);
        assert!(analysis.metrics.text_density > 0.05);
        assert!(analysis.metrics.text_block_ratio > 2.0);
    }

    #[test]
    fn test_confidence_within_bounds() {
        let mut img = blank(120, 120);
        paint_rect(&mut img, 0, 60, 120, 6);
        paint_rect(&mut img, 60, 0, 6, 120);
        let analysis = ContentClassifier::new().classify(&img);
        assert!(analysis.confidence >= 0.0 && analysis.confidence <= 1.0);
    }
}

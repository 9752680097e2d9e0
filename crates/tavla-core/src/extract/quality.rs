//! Text-layer quality assessment and strategy gating.

use crate::pdf::TextRun;

/// Quality score above which the text layer is used on its own.
pub const DIRECT_THRESHOLD: f32 = 0.7;

/// Quality score above which the text layer is combined with OCR.
/// At or below it, OCR runs alone.
pub const HYBRID_THRESHOLD: f32 = 0.3;

/// Extraction strategy chosen from the text-layer quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DirectOnly,
    Hybrid,
    OcrOnly,
}

/// A 0-1 quality score with a human-readable explanation.
#[derive(Debug, Clone)]
pub struct TextQuality {
    pub score: f32,
    pub reason: String,
}

impl TextQuality {
    /// Route by score: strictly above 0.7 is direct, strictly above
    /// 0.3 is hybrid, anything else is OCR-only. A score of exactly
    /// 0.7 therefore lands in the hybrid band.
    pub fn strategy(&self) -> Strategy {
        if self.score > DIRECT_THRESHOLD {
            Strategy::DirectOnly
        } else if self.score > HYBRID_THRESHOLD {
            Strategy::Hybrid
        } else {
            Strategy::OcrOnly
        }
    }
}

/// Scores a PDF text layer on how usable it is without OCR.
///
/// The score rewards readable words, Hebrew content, digits (financial
/// reports are digit-heavy) and currency punctuation, with capped
/// contributions of 0.4 / 0.3 / 0.2 / 0.1.
#[derive(Debug, Default)]
pub struct TextQualityAssessor;

impl TextQualityAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, runs: &[TextRun]) -> TextQuality {
        if runs.is_empty() {
            return TextQuality {
                score: 0.0,
                reason: "no text content".to_string(),
            };
        }

        let mut total_text = String::new();
        let mut hebrew_chars = 0usize;
        let mut english_chars = 0usize;
        let mut number_chars = 0usize;
        let mut special_chars = 0usize;

        for run in runs {
            total_text.push_str(&run.text);
            total_text.push(' ');

            for c in run.text.chars() {
                if is_hebrew(c) {
                    hebrew_chars += 1;
                } else if c.is_ascii_alphabetic() {
                    english_chars += 1;
                } else if c.is_ascii_digit() {
                    number_chars += 1;
                } else if matches!(c, '₪' | '$' | '€' | '£' | ',' | '.' | '-' | '(' | ')') {
                    special_chars += 1;
                }
            }
        }

        let readable_words = total_text
            .split_whitespace()
            .filter(|w| w.chars().count() > 1 && w.chars().any(is_word_char))
            .count();

        let total_chars = hebrew_chars + english_chars + number_chars + special_chars;
        let mut score = 0.0f32;

        if total_chars > 0 {
            score += (readable_words as f32 / 10.0).min(0.4);
            if hebrew_chars > 0 {
                score += (hebrew_chars as f32 / total_chars as f32).min(0.3);
            }
            if number_chars > 0 {
                score += (number_chars as f32 / total_chars as f32 * 2.0).min(0.2);
            }
            if special_chars > 0 {
                score += (special_chars as f32 / total_chars as f32 * 3.0).min(0.1);
            }
        }

        TextQuality {
            score: score.min(1.0),
            reason: format!(
                "{} words, {} Hebrew chars, {} numbers",
                readable_words, hebrew_chars, number_chars
            ),
        }
    }
}

/// True for characters in the Hebrew Unicode block.
pub fn is_hebrew(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || is_hebrew(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> TextRun {
        TextRun::new(text, 0.0, 0.0, 10.0, 12.0)
    }

    #[test]
    fn test_empty_runs_score_zero() {
        let quality = TextQualityAssessor::new().assess(&[]);
        assert_eq!(quality.score, 0.0);
        assert_eq!(quality.strategy(), Strategy::OcrOnly);
    }

    #[test]
    fn test_rich_hebrew_financial_text_routes_direct() {
        let runs: Vec<TextRun> = [
            "חשבון", "תיאור", "סכום", "יתרה", "תאריך", "1,234.56", "₪", "15/03/2024",
            "העברה", "בנקאית", "משכורת", "חודשית",
        ]
        .iter()
        .map(|t| run(t))
        .collect();
        let quality = TextQualityAssessor::new().assess(&runs);
        assert!(quality.score > 0.7, "score {} too low", quality.score);
        assert_eq!(quality.strategy(), Strategy::DirectOnly);
    }

    #[test]
    fn test_garbage_text_routes_ocr_only() {
        let runs = vec![run("~"), run("#")];
        let quality = TextQualityAssessor::new().assess(&runs);
        assert!(quality.score <= 0.3);
        assert_eq!(quality.strategy(), Strategy::OcrOnly);
    }

    #[test]
    fn test_score_clamped_to_one() {
        let runs: Vec<TextRun> = (0..50)
            .map(|i| run(&format!("שורה{} 123.45 ₪", i)))
            .collect();
        let quality = TextQualityAssessor::new().assess(&runs);
        assert!(quality.score <= 1.0);
    }

    #[test]
    fn test_boundary_exactly_direct_threshold_is_hybrid() {
        let quality = TextQuality {
            score: DIRECT_THRESHOLD,
            reason: String::new(),
        };
        assert_eq!(quality.strategy(), Strategy::Hybrid);
    }

    #[test]
    fn test_boundary_exactly_hybrid_threshold_is_ocr_only() {
        let quality = TextQuality {
            score: HYBRID_THRESHOLD,
            reason: String::new(),
        };
        assert_eq!(quality.strategy(), Strategy::OcrOnly);
    }

    #[test]
    fn test_strategy_is_deterministic() {
        let runs = vec![run("שלום"), run("123")];
        let assessor = TextQualityAssessor::new();
        let first = assessor.assess(&runs);
        let second = assessor.assess(&runs);
        assert_eq!(first.score, second.score);
        assert_eq!(first.strategy(), second.strategy());
    }
}

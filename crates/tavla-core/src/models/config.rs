//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the tavla pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TavlaConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Table extraction configuration.
    pub extraction: ExtractionConfig,

    /// Export configuration.
    pub export: ExportConfig,
}

/// OCR invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition languages passed to the backend (e.g. "heb+eng").
    pub languages: String,

    /// Retry with the multi-pass ladder when confidence drops below this.
    pub multipass_confidence_threshold: f32,

    /// Enable the multi-pass retry ladder.
    pub enable_multipass: bool,

    /// Per-attempt time budget in milliseconds, enforced by the backend.
    pub attempt_timeout_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "heb+eng".to_string(),
            multipass_confidence_threshold: 30.0,
            enable_multipass: true,
            attempt_timeout_ms: 30_000,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Scale factor for rendering pages to pixels.
    pub render_scale: f32,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,

    /// Minimum text-layer length to bother assessing quality.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            max_pages: 0,
            min_text_length: 10,
        }
    }
}

/// Table extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Vertical tolerance in pixels when grouping text runs into rows.
    pub row_tolerance: f32,

    /// Lower clamp for the column-gap threshold, in pixels.
    pub min_column_gap: f32,

    /// Upper clamp for the column-gap threshold, in pixels.
    pub max_column_gap: f32,

    /// Minimum non-empty cells for a row to survive validation.
    pub min_row_cells: usize,

    /// Annotate financial cell types on the final table.
    pub classify_financial_cells: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 8.0,
            min_column_gap: 8.0,
            max_column_gap: 30.0,
            min_row_cells: 1,
            classify_financial_cells: true,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// CSV field delimiter.
    pub delimiter: char,

    /// Prepend a UTF-8 BOM so Excel opens Hebrew CSV correctly.
    pub bom: bool,

    /// Reverse column order for right-to-left presentation.
    pub rtl: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            bom: true,
            rtl: false,
        }
    }
}

impl TavlaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TavlaConfig::default();
        assert_eq!(config.ocr.languages, "heb+eng");
        assert_eq!(config.ocr.multipass_confidence_threshold, 30.0);
        assert_eq!(config.extraction.row_tolerance, 8.0);
        assert_eq!(config.extraction.max_column_gap, 30.0);
        assert!(config.export.bom);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TavlaConfig =
            serde_json::from_str(r#"{"ocr": {"languages": "heb"}}"#).unwrap();
        assert_eq!(config.ocr.languages, "heb");
        assert_eq!(config.ocr.attempt_timeout_ms, 30_000);
        assert_eq!(config.pdf.render_scale, 2.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tavla.json");

        let mut config = TavlaConfig::default();
        config.ocr.languages = "heb".to_string();
        config.save(&path).unwrap();

        let loaded = TavlaConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ocr.languages, "heb");
        assert_eq!(loaded.pdf.render_scale, config.pdf.render_scale);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = TavlaConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TavlaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.extraction.row_tolerance, config.extraction.row_tolerance);
        assert_eq!(parsed.export.delimiter, config.export.delimiter);
    }
}

//! CSV export.

use csv::WriterBuilder;
use tracing::debug;

use super::Exporter;
use crate::error::ExportError;
use crate::models::{ExportConfig, Table};

/// UTF-8 byte order mark; Excel needs it to detect Hebrew CSV
/// encoding.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Exports tables as delimited text.
///
/// With `rtl` set, each row's cells are written in reverse so the
/// visually rightmost column lands first, matching how the source
/// statements read.
#[derive(Debug, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn serialize(&self, table: &Table, options: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        if !options.delimiter.is_ascii() {
            return Err(ExportError::Write {
                format: "csv".to_string(),
                reason: format!("delimiter {:?} is not ASCII", options.delimiter),
            });
        }

        let mut buffer = Vec::new();
        if options.bom {
            buffer.extend_from_slice(UTF8_BOM);
        }

        let mut writer = WriterBuilder::new()
            .delimiter(options.delimiter as u8)
            .flexible(true)
            .from_writer(buffer);

        for row in table.rows() {
            let record: Vec<&str> = if options.rtl {
                row.iter().rev().map(String::as_str).collect()
            } else {
                row.iter().map(String::as_str).collect()
            };
            writer.write_record(&record).map_err(|e| ExportError::Write {
                format: "csv".to_string(),
                reason: e.to_string(),
            })?;
        }

        let bytes = writer.into_inner().map_err(|e| ExportError::Write {
            format: "csv".to_string(),
            reason: e.to_string(),
        })?;
        debug!("CSV export: {} rows, {} bytes", table.row_count(), bytes.len());
        Ok(bytes)
    }
}

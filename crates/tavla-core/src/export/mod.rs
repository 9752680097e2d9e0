//! Table export to CSV and JSON.

mod csv;
mod json;

pub use csv::CsvExporter;
pub use json::JsonExporter;

use crate::error::ExportError;
use crate::models::{ExportConfig, Table};

/// An exported table, ready to be written out.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub format: &'static str,
    pub bytes: Vec<u8>,
}

/// Serializes a table to one output format.
pub trait Exporter {
    /// Format tag, doubling as the file extension.
    fn format(&self) -> &'static str;

    fn serialize(&self, table: &Table, options: &ExportConfig) -> Result<Vec<u8>, ExportError>;

    /// Serialize a table under `<stem>.<extension>`.
    fn export(
        &self,
        table: &Table,
        stem: &str,
        options: &ExportConfig,
    ) -> Result<ExportedFile, ExportError> {
        Ok(ExportedFile {
            file_name: format!("{}.{}", stem, self.format()),
            format: self.format(),
            bytes: self.serialize(table, options)?,
        })
    }
}

/// Look up an exporter by format name.
pub fn exporter_for(format: &str) -> Result<Box<dyn Exporter>, ExportError> {
    match format {
        "csv" => Ok(Box::new(CsvExporter)),
        "json" => Ok(Box::new(JsonExporter)),
        other => Err(ExportError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_lookup() {
        assert_eq!(exporter_for("csv").unwrap().format(), "csv");
        assert_eq!(exporter_for("json").unwrap().format(), "json");
        assert!(matches!(
            exporter_for("xlsx"),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_export_names_file_by_stem_and_format() {
        let table = Table::from_rows(vec![vec!["א".to_string()]]);
        let exported = CsvExporter
            .export(&table, "statement-page-1", &ExportConfig::default())
            .unwrap();
        assert_eq!(exported.file_name, "statement-page-1.csv");
        assert_eq!(exported.format, "csv");
    }
}

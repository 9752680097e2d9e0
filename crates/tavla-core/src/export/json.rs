//! JSON export.

use super::Exporter;
use crate::error::ExportError;
use crate::models::{ExportConfig, Table};

/// Exports tables as a JSON array of row arrays.
///
/// Data order is preserved regardless of the RTL flag; RTL is a
/// presentation concern left to whoever renders the JSON.
#[derive(Debug, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, table: &Table, _options: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        serde_json::to_vec_pretty(table.rows()).map_err(|e| ExportError::Write {
            format: "json".to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_rows_as_arrays() {
        let table = Table::from_rows(vec![
            vec!["תאריך".to_string(), "סכום".to_string()],
            vec!["01/01/2024".to_string(), "100".to_string()],
        ]);
        let bytes = JsonExporter
            .serialize(&table, &ExportConfig::default())
            .unwrap();
        let parsed: Vec<Vec<String>> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, table.into_rows());
    }

    #[test]
    fn test_empty_table_is_empty_array() {
        let bytes = JsonExporter
            .serialize(&Table::new(), &ExportConfig::default())
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "[]");
    }
}

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{ConditionRecord, Error, Result};

/// Condition file (TOML).
///
/// Example `config/conditions.toml`:
/// ```toml
/// # positional rows in wire order
/// conditions = [
///     ["dip", 0, "1h", "All", "BollingerBands", "length=20, stddev=2", "Lower Band", ">", "price"],
/// ]
///
/// [[condition]]
/// timeframe = "5m"
/// symbol = "BTCUSDT"
/// indicator = "RSI"
/// params = "length=14"
/// detail = "RSI Value"
/// operator = "<"
/// value = "30"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConditionFile {
    #[serde(rename = "condition", default)]
    pub tables: Vec<ConditionRecord>,
    #[serde(rename = "conditions", default)]
    pub rows: Vec<ConditionRecord>,
}

impl ConditionFile {
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_from(content, "condition file")
    }

    /// Load from a TOML file on disk.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file = Self::parse_from(&content, path)?;
        debug!(path, tables = file.tables.len(), rows = file.rows.len(), "Parsed condition file");
        Ok(file)
    }

    fn parse_from(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid {origin}: {e}")))
    }

    /// Every record, tables first, in file order.
    pub fn into_records(self) -> Vec<ConditionRecord> {
        self.tables.into_iter().chain(self.rows).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_tables_and_rows() {
        let file = ConditionFile::parse(
            r#"
            conditions = [
                ["dip", 1, "1h", "All", "BollingerBands", "length=20", "Lower Band", ">", "price"],
            ]

            [[condition]]
            timeframe = "5m"
            symbol = "BTCUSDT"
            indicator = "RSI"
            params = "length=14"
            detail = "RSI Value"
            operator = "<"
            value = "30"
            "#,
        )
        .unwrap();

        let records = file.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].indicator, "RSI");
        assert_eq!(records[0].group, "");
        assert_eq!(records[1].group, "dip");
        assert_eq!(records[1].shift, 1);
    }

    #[test]
    fn empty_file_has_no_conditions() {
        assert!(ConditionFile::parse("").unwrap().into_records().is_empty());
    }

    #[test]
    fn missing_required_field_is_config_error() {
        let err = ConditionFile::parse("[[condition]]\ntimeframe = \"5m\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

// Tabular input rows.
//
// Readers hand the mappers `RawRow`s: one decoded CSV record with its header
// names and the line it came from. Field access is strict. A blank cell is
// treated as missing so gaps in the source data stop ingestion instead of
// silently turning into zeros.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: u64,
    columns: Arc<HashMap<String, usize>>,
    record: csv::StringRecord,
}

impl RawRow {
    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs(line: u64, pairs: &[(&str, &str)]) -> Self {
        let columns = pairs
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_string(), i))
            .collect();
        let record = pairs.iter().map(|(_, value)| *value).collect();
        Self {
            line,
            columns: Arc::new(columns),
            record,
        }
    }

    pub fn text(&self, field: &str) -> Result<&str> {
        self.columns
            .get(field)
            .and_then(|&i| self.record.get(i))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::MissingField {
                field: field.to_string(),
                line: self.line,
            })
    }

    pub fn number(&self, field: &str) -> Result<f64> {
        let text = self.text(field)?;
        text.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| Error::InvalidNumber {
                field: field.to_string(),
                line: self.line,
                value: text.to_string(),
            })
    }
}

/// Decode every record of a headed CSV stream.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect();
    let columns = Arc::new(columns);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        rows.push(RawRow {
            line,
            columns: columns.clone(),
            record,
        });
    }
    Ok(rows)
}

pub fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    let rows = read_rows(File::open(path)?)?;
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

//! Image metadata table loading.
//!
//! The metadata CSV provides per-image attributes (sensor, capture context,
//! spectral parameters) keyed by file name. Columns are free-form apart from
//! the required `file_name`; every cell is parsed into a typed [`MetaValue`]
//! so the values survive into the output JSON as numbers and booleans rather
//! than strings.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::TreedError;

/// A single metadata cell value.
///
/// Metadata columns are not typed by the table itself, so each cell is
/// parsed on load: booleans first, then numbers, with strings as the
/// fallback. Serialized without a tag so the output JSON stays flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Boolean cell ("true"/"false").
    Bool(bool),
    /// Numeric cell.
    Number(f64),
    /// Anything else.
    String(String),
}

impl MetaValue {
    /// Parses a raw CSV cell. Empty cells carry no value.
    pub fn parse(cell: &str) -> Option<MetaValue> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }

        if cell.eq_ignore_ascii_case("true") {
            return Some(MetaValue::Bool(true));
        }
        if cell.eq_ignore_ascii_case("false") {
            return Some(MetaValue::Bool(false));
        }

        if let Ok(v) = cell.parse::<f64>() {
            if v.is_finite() {
                return Some(MetaValue::Number(v));
            }
        }

        Some(MetaValue::String(cell.to_string()))
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(v) => Some(*v),
            MetaValue::String(s) => s.parse().ok(),
            MetaValue::Bool(_) => None,
        }
    }

    /// String view of the value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One row of the metadata table, keyed by column name.
///
/// Cells that were empty in the table are absent from the map.
pub type MetadataRow = HashMap<String, MetaValue>;

/// Lookup from image file name to its metadata row.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    rows: HashMap<String, MetadataRow>,
}

impl MetadataIndex {
    /// Loads the metadata table from a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<MetadataIndex, TreedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("image metadata CSV {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Loads the metadata table from CSV text.
    ///
    /// Fails if the `file_name` column is missing. Duplicate file names are
    /// not rejected; the last row wins.
    pub fn from_reader(reader: impl Read) -> Result<MetadataIndex, TreedError> {
        let mut csv = csv::Reader::from_reader(reader);

        let headers = csv.headers()?.clone();
        let file_name_idx = headers
            .iter()
            .position(|h| h == "file_name")
            .ok_or_else(|| {
                TreedError::Schema("image metadata CSV must contain a 'file_name' column".into())
            })?;

        let mut rows = HashMap::new();
        for record in csv.records() {
            let record = record?;
            let Some(file_name) = record.get(file_name_idx).map(str::trim) else {
                continue;
            };
            if file_name.is_empty() {
                continue;
            }

            let mut row = MetadataRow::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if let Some(value) = MetaValue::parse(cell) {
                    row.insert(header.to_string(), value);
                }
            }

            rows.insert(file_name.to_string(), row);
        }

        log::info!("Loaded image metadata with {} entries", rows.len());
        Ok(MetadataIndex { rows })
    }

    /// Metadata row for the given image file name.
    pub fn get(&self, file_name: &str) -> Option<&MetadataRow> {
        self.rows.get(file_name)
    }

    /// Number of indexed images.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

//! Final CSV / JSON export of scraped records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::store::DEFAULT_FIELDNAMES;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize record for {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {index} for {path} is not a JSON object")]
    NotAnObject { path: String, index: usize },
}

/// Write records as CSV with a header row.
///
/// Columns come from `fieldnames`, or [`DEFAULT_FIELDNAMES`] when `None`.
/// Record fields not named in the header are ignored; named fields a record
/// lacks are written empty. Rows end in `\r\n`, the csv crate's default.
/// Returns the number of rows written.
///
/// An empty `records` slice logs a warning and creates no file.
///
/// # Errors
///
/// Returns [`OutputError`] if a record does not serialize to a JSON object or
/// the file cannot be written.
pub fn save_to_csv<T: Serialize>(
    records: &[T],
    path: &Path,
    fieldnames: Option<&[&str]>,
) -> Result<usize, OutputError> {
    if records.is_empty() {
        tracing::warn!(path = %path.display(), "no stores to save");
        return Ok(0);
    }

    let shown = path.display().to_string();
    let fieldnames = fieldnames.unwrap_or(&DEFAULT_FIELDNAMES);
    let csv_err = |source: csv::Error| OutputError::Csv {
        path: shown.clone(),
        source,
    };

    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(fieldnames).map_err(csv_err)?;

    for (index, record) in records.iter().enumerate() {
        let value = serde_json::to_value(record).map_err(|e| OutputError::Serialize {
            path: shown.clone(),
            source: e,
        })?;
        let Value::Object(map) = value else {
            return Err(OutputError::NotAnObject {
                path: shown.clone(),
                index,
            });
        };
        let row = fieldnames
            .iter()
            .map(|name| map.get(*name).map(csv_cell).unwrap_or_default());
        writer.write_record(row).map_err(csv_err)?;
    }

    writer.flush().map_err(|e| OutputError::Io {
        path: shown.clone(),
        source: e,
    })?;

    tracing::info!(count = records.len(), path = %shown, "saved stores to CSV");
    Ok(records.len())
}

/// Write records as a pretty-printed JSON array (two-space indent, UTF-8,
/// non-ASCII kept verbatim). Returns the number of records written.
///
/// An empty `records` slice logs a warning and creates no file.
///
/// # Errors
///
/// Returns [`OutputError`] if serialization or the file write fails.
pub fn save_to_json<T: Serialize>(records: &[T], path: &Path) -> Result<usize, OutputError> {
    if records.is_empty() {
        tracing::warn!(path = %path.display(), "no stores to save");
        return Ok(0);
    }

    let shown = path.display().to_string();
    let io_err = |source: std::io::Error| OutputError::Io {
        path: shown.clone(),
        source,
    };

    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|e| OutputError::Serialize {
        path: shown.clone(),
        source: e,
    })?;
    writer.flush().map_err(io_err)?;

    tracing::info!(count = records.len(), path = %shown, "saved stores to JSON");
    Ok(records.len())
}

fn ensure_parent_dir(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| OutputError::CreateDir {
                path: parent.display().to_string(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

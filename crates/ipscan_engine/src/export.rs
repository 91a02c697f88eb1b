use std::path::{Path, PathBuf};

use ipscan_core::{FieldValue, ResultRow};
use ipscan_logging::scan_info;
use serde_json::{Map, Number, Value};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub row_count: usize,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `rows` as CSV. The header is every field name in first-seen order;
/// rows lacking a field leave that cell empty. No rows means an empty file.
pub fn export_csv(
    dir: &Path,
    filename: &str,
    rows: &[ResultRow],
) -> Result<ExportSummary, ExportError> {
    let header = header_fields(rows);
    let mut buffer = String::new();
    if !header.is_empty() {
        push_record(&mut buffer, header.iter().map(|name| name.to_string()));
    }
    for row in rows {
        push_record(
            &mut buffer,
            header.iter().map(|name| row.get(name).to_string()),
        );
    }

    let path = AtomicFileWriter::new(dir).write(filename, buffer.as_bytes())?;
    scan_info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(ExportSummary {
        row_count: rows.len(),
        path,
    })
}

/// Writes `rows` as a pretty-printed JSON array, each object keeping the
/// field order it was received in.
pub fn export_json(
    dir: &Path,
    filename: &str,
    rows: &[ResultRow],
) -> Result<ExportSummary, ExportError> {
    let records: Vec<Value> = rows.iter().map(row_to_json).collect();
    let mut content = serde_json::to_string_pretty(&records)?;
    content.push('\n');

    let path = AtomicFileWriter::new(dir).write(filename, content.as_bytes())?;
    scan_info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(ExportSummary {
        row_count: rows.len(),
        path,
    })
}

fn header_fields(rows: &[ResultRow]) -> Vec<&str> {
    let mut header: Vec<&str> = Vec::new();
    for row in rows {
        for (name, _) in row.fields() {
            if !header.contains(&name) {
                header.push(name);
            }
        }
    }
    header
}

fn push_record(buffer: &mut String, cells: impl Iterator<Item = String>) {
    for (index, cell) in cells.enumerate() {
        if index > 0 {
            buffer.push(',');
        }
        buffer.push_str(&quote(&cell));
    }
    buffer.push_str("\r\n");
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn row_to_json(row: &ResultRow) -> Value {
    let object: Map<String, Value> = row
        .fields()
        .map(|(name, value)| (name.to_string(), field_to_json(value)))
        .collect();
    Value::Object(object)
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Missing => Value::Null,
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            Value::Number(Number::from(*n as i64))
        }
        FieldValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_follows_rfc_4180() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn header_is_union_in_first_seen_order() {
        let rows = vec![
            ResultRow::default().with("ip", "1.1.1.1").with("country", "US"),
            ResultRow::default().with("ip", "2.2.2.2").with("error", "timeout"),
        ];
        assert_eq!(header_fields(&rows), vec!["ip", "country", "error"]);
    }

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(field_to_json(&FieldValue::Number(42.0)), serde_json::json!(42));
        assert_eq!(field_to_json(&FieldValue::Number(0.5)), serde_json::json!(0.5));
        assert_eq!(field_to_json(&FieldValue::Number(f64::NAN)), Value::Null);
    }
}

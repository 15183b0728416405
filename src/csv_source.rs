use crate::error::ImportError;
use crate::record::Record;
use serde_json::Value;
use std::path::Path;

/// Reads a CSV export (header row + data rows) into the same loose records
/// the JSON document carries. Empty cells are left out so defaults apply.
pub fn read_csv_records(path: &Path) -> Result<Vec<Value>, ImportError> {
    if !path.is_file() {
        return Err(ImportError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // Spreadsheet exports are not always UTF-8; keep going on bad bytes.
    let text = String::from_utf8_lossy(&bytes);
    Ok(parse_csv_records(&text)?)
}

pub fn parse_csv_records(text: &str) -> Result<Vec<Value>, csv::Error> {
    let text = text.trim_start_matches('\u{feff}');
    let Some(header_line) = text.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        let mut rec = Record::new();
        for (name, cell) in header.iter().zip(row.iter()) {
            let cell = cell.trim();
            if name.is_empty() || cell.is_empty() {
                continue;
            }
            rec.insert(name.clone(), Value::String(cell.to_string()));
        }
        // whitespace-only lines
        if rec.is_empty() {
            continue;
        }
        rows.push(Value::Object(rec));
    }
    Ok(rows)
}

fn detect_delimiter(header: &str) -> u8 {
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

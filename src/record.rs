use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};
use thiserror::Error;

/// One loosely-typed input record as it arrives from JSON or CSV.
pub type Record = Map<String, Value>;

/// Why a single record could not be written. Never aborts the run.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing key field `{0}`")]
    MissingKey(&'static str),

    #[error("key field `{0}` must be text or a number, got a boolean")]
    InvalidKey(&'static str),

    #[error("field `{0}` holds a nested array or object")]
    Nested(String),

    #[error("{0}")]
    Store(#[from] rusqlite::Error),
}

pub fn as_record(value: &Value) -> Result<&Record, RecordError> {
    value.as_object().ok_or(RecordError::NotAnObject)
}

/// A null field counts as absent, the same as a missing one.
pub fn field<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| !v.is_null())
}

fn to_sql(key: &str, v: &Value) -> Result<SqlValue, RecordError> {
    Ok(match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => return Err(RecordError::Nested(key.to_string())),
    })
}

pub fn sql(record: &Record, key: &str) -> Result<SqlValue, RecordError> {
    match field(record, key) {
        Some(v) => to_sql(key, v),
        None => Ok(SqlValue::Null),
    }
}

pub fn sql_or(record: &Record, key: &str, default: &str) -> Result<SqlValue, RecordError> {
    match field(record, key) {
        Some(v) => to_sql(key, v),
        None => Ok(SqlValue::Text(default.to_string())),
    }
}

/// Natural keys (barcodes, batch numbers) are compared as text, so a numeric
/// batch number `7` and `"7"` address the same row.
pub fn key_text(record: &Record, key: &'static str) -> Result<String, RecordError> {
    let text = match field(record, key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => {
            return Err(RecordError::Nested(key.to_string()))
        }
        Some(Value::Bool(_)) => return Err(RecordError::InvalidKey(key)),
        Some(Value::Null) | None => String::new(),
    };
    if text.is_empty() {
        return Err(RecordError::MissingKey(key));
    }
    Ok(text)
}

/// Human-readable identifier for log lines about a record.
pub fn describe(value: &Value, keys: &[&str]) -> String {
    let Some(record) = value.as_object() else {
        return "<non-object>".to_string();
    };
    keys.iter()
        .find_map(|k| field(record, k).map(|v| format!("{k}={v}")))
        .unwrap_or_else(|| "<no key>".to_string())
}

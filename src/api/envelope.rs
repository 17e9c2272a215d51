//! List responses arrive either as a bare array or wrapped as
//! `{ "data": [...], ... }`. Everything downstream only ever sees the array.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;

/// Records decoded from a list body, plus how many were unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listed<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// Accept a list body and return its records, or report a shape error.
pub fn normalize_list(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut fields) => match fields.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(ApiError::Shape("`data` is not an array")),
            None => Err(ApiError::Shape("object without a `data` field")),
        },
        Value::Null => Err(ApiError::Shape("empty body")),
        _ => Err(ApiError::Shape("neither an array nor an object")),
    }
}

/// Normalize a list body and decode it record by record. A record that does
/// not decode is skipped and counted; only a bad envelope fails the list.
pub fn decode_list<T: DeserializeOwned>(body: Value) -> Result<Listed<T>, ApiError> {
    let mut listed = Listed {
        records: Vec::new(),
        skipped: 0,
    };
    for record in normalize_list(body)? {
        let id = record.get("id").cloned();
        match serde_json::from_value(record) {
            Ok(decoded) => listed.records.push(decoded),
            Err(err) => {
                warn!(error = %err, id = ?id, "skipping unreadable record");
                listed.skipped += 1;
            }
        }
    }
    Ok(listed)
}

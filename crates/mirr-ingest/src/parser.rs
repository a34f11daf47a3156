//! Comment document parser
//!
//! Turns one regulations.gov comment document into a [`CommentRecord`]:
//!
//! ```json
//! {
//!   "data": {
//!     "id": "WHD-2023-0001-0002",
//!     "links": { "self": "https://api.regulations.gov/v4/comments/WHD-2023-0001-0002" },
//!     "attributes": { "comment": "...", "postedDate": "2023-03-17T04:00:00Z", ... }
//!   }
//! }
//! ```
//!
//! Only attributes listed in [`COMMENT_FIELDS`] are kept. Values are coerced to
//! their column kind here so that a single odd document is rejected on its own
//! instead of failing the whole batch insert later.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};
use crate::record::{CommentRecord, FieldValue};
use crate::schema::{ColumnKind, FieldSpec, COMMENT_FIELDS};

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Deserialize)]
struct Document {
    data: DocumentData,
}

#[derive(Deserialize)]
struct DocumentData {
    id: String,
    links: Links,
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct Links {
    #[serde(rename = "self")]
    self_url: String,
}

/// Parse raw document bytes into a record.
///
/// Fails with [`IngestError::MalformedRecord`] when the bytes are not JSON,
/// when `data.id` or `data.links.self` is missing, or when a recognized
/// attribute holds a value that does not fit its column.
pub fn parse_comment(bytes: &[u8]) -> Result<CommentRecord> {
    let document: Document =
        serde_json::from_slice(bytes).map_err(|e| IngestError::malformed(e.to_string()))?;

    let DocumentData { id, links, attributes } = document.data;
    let mut attributes = attributes.unwrap_or_default();

    let fields = COMMENT_FIELDS
        .iter()
        .map(|field| match attributes.remove(field.name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => coerce(field, &value).map(Some),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CommentRecord::new(id, links.self_url, fields))
}

fn coerce(field: &FieldSpec, value: &Value) -> Result<FieldValue> {
    let coerced = match field.kind {
        ColumnKind::Text => Some(FieldValue::Text(match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })),
        ColumnKind::Integer => integer(value).map(FieldValue::Integer),
        ColumnKind::Timestamp => timestamp(value).map(FieldValue::Timestamp),
        ColumnKind::Boolean => boolean(value).map(FieldValue::Boolean),
    };

    coerced.ok_or_else(|| {
        IngestError::malformed(format!(
            "attribute `{}` is not a valid {}: {}",
            field.name, field.kind, value
        ))
    })
}

fn integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?.trim();

    // wall-clock time is kept and the offset dropped, as a TIMESTAMP column would
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

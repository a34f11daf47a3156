//! Normalized comment record

use chrono::NaiveDateTime;

use crate::schema::{field_index, FieldSpec, COMMENT_FIELDS, FIELD_COUNT};

/// A typed attribute value, already coerced to its column kind
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i32),
    Timestamp(NaiveDateTime),
    Boolean(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// One row of the `comments` table.
///
/// Built only by the parser; attribute values are stored positionally in
/// [`COMMENT_FIELDS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    id: String,
    apiurl: String,
    fields: Vec<Option<FieldValue>>,
}

impl CommentRecord {
    pub(crate) fn new(id: String, apiurl: String, fields: Vec<Option<FieldValue>>) -> Self {
        debug_assert_eq!(fields.len(), FIELD_COUNT);
        Self { id, apiurl, fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The document's `data.links.self` URL
    pub fn apiurl(&self) -> &str {
        &self.apiurl
    }

    /// Value of a recognized attribute; `None` when absent, null, or not a
    /// recognized attribute name at all.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        field_index(name).and_then(|index| self.fields.get(index)?.as_ref())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Every recognized attribute paired with its value, in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldSpec, Option<&FieldValue>)> + '_ {
        COMMENT_FIELDS
            .iter()
            .zip(self.fields.iter().map(Option::as_ref))
    }

    pub fn present_fields(&self) -> usize {
        self.fields.iter().filter(|value| value.is_some()).count()
    }
}

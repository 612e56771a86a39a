//! The decoded value tree.
//!
//! Raw model output decodes into a `Value` tree shaped by the schema. The
//! tree is deliberately loose: it can hold an explicit absent marker (a field
//! the model declined or a filtered-out value) and, mid-pass, a reask marker
//! standing in for an invalid value that is pending regeneration.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_json::{Number, Value as JsonValue};

use crate::outcome::Reask;

/// A node of the decoded value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicitly absent: the model returned `none`/null for an optional
    /// field, or a `filter` action removed the value.
    Absent,
    /// A boolean.
    Bool(bool),
    /// A whole number.
    Integer(i64),
    /// A floating-point number.
    Float(f64),
    /// Text (also carries `url`-kind values).
    Str(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A sequence.
    List(Vec<Value>),
    /// An insertion-ordered key-value container.
    Object(IndexMap<String, Value>),
    /// A field flagged for regeneration, holding its marker.
    Reask(Box<Reask>),
}

impl Value {
    /// Whether this node is the absent marker.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether this node is a reask marker.
    pub fn is_reask(&self) -> bool {
        matches!(self, Self::Reask(_))
    }

    /// A short name for the node's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Date(_) => "date",
            Self::List(_) => "list",
            Self::Object(_) => "object",
            Self::Reask(_) => "reask",
        }
    }

    /// Element/character/field count, where it makes sense.
    ///
    /// Strings count characters, lists elements, objects fields.
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(s.chars().count()),
            Self::List(items) => Some(items.len()),
            Self::Object(fields) => Some(fields.len()),
            _ => None,
        }
    }

    /// Best-effort conversion from a JSON value, with no schema to guide it.
    ///
    /// Used for elements of a list that declared no element type.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Absent,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Self::Str(s.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(fields) => Self::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render the tree as JSON.
    ///
    /// Absent object fields are omitted; absent list elements and scalars
    /// render as null. A reask marker renders as its original invalid value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Absent => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Str(s) => JsonValue::String(s.clone()),
            Self::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Self::List(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .filter(|(_, v)| !v.is_absent())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Reask(reask) => reask.incorrect_value.to_json(),
        }
    }

    /// Borrow the string content, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the object fields, if this is an object.
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Borrow the list elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

//! # railguard-decoder
//!
//! Turns raw generation text into a typed value tree shaped by a schema.
//!
//! Decoding has two stages:
//!
//! 1. **Extraction** ([`extract_json`]): find the structured document inside
//!    the raw text. Strict parsing is tried first; failing that, a boundary
//!    scan strips leading/trailing prose (and markdown fences) around the
//!    first `{`/`[` and its matching close.
//! 2. **Coercion** ([`coerce`]): walk the JSON against the schema tree and
//!    coerce each leaf to its declared kind. Coercion never fails: a leaf
//!    that cannot be coerced becomes a reask marker in place, and a missing
//!    required field likewise.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod coerce;
pub mod extract;

pub use coerce::coerce;
pub use extract::extract_json;

use railguard_core::{DecodeError, Value};
use railguard_schema::SchemaNode;

/// Extract and coerce in one step.
///
/// Returns `DecodeError` only when no structured document can be found at
/// all; every finer-grained problem becomes a reask marker inside the tree.
pub fn decode(raw: &str, schema: &SchemaNode) -> Result<Value, DecodeError> {
    let json = extract_json(raw)?;
    Ok(coerce(&json, schema))
}

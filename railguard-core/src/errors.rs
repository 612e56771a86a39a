//! Error types for railguard.
//!
//! Each stage of the pipeline has its own error type; `GuardError` is the
//! umbrella returned by a guarded call. Field-level validation failures are
//! recovered locally per their on-fail action and never appear here; only
//! `exception`-tagged failures surface as `ValidationError`.

use std::time::Duration;

use thiserror::Error;

use crate::path::FieldPath;

/// Fatal error while compiling a RAIL schema. Aborts guard construction.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The markup itself could not be parsed.
    #[error("malformed rail document: {0}")]
    Malformed(String),

    /// The rail file could not be read.
    #[error("failed to read rail file: {0}")]
    Io(#[from] std::io::Error),

    /// The document has no `<output>` element.
    #[error("rail document has no <output> element")]
    MissingOutput,

    /// An element tag is not a recognized kind.
    #[error("unknown element tag <{tag}>")]
    UnknownTag {
        /// The offending tag.
        tag: String,
    },

    /// An object child is missing its `name` attribute.
    #[error("element <{tag}> inside an object is missing a name attribute")]
    MissingName {
        /// Tag of the unnamed element.
        tag: String,
    },

    /// Two fields in one object share a name.
    #[error("duplicate field name '{name}' within one object")]
    DuplicateField {
        /// The duplicated name.
        name: String,
    },

    /// A list element declared more than one child.
    #[error("list '{name}' must have at most one child element")]
    ListArity {
        /// Name of the list field.
        name: String,
    },

    /// A scalar element declared children.
    #[error("scalar element <{tag}> must not have children")]
    ScalarWithChildren {
        /// Tag of the scalar element.
        tag: String,
    },

    /// An `on-fail` attribute named an unknown action.
    #[error("unknown on-fail action '{value}'")]
    UnknownOnFail {
        /// The unrecognized action name.
        value: String,
    },

    /// A directive's parameters could not be understood by its validator.
    #[error("invalid parameters for directive '{directive}': {reason}")]
    InvalidDirectiveParams {
        /// The directive name.
        directive: String,
        /// Why the parameters were rejected.
        reason: String,
    },
}

impl SchemaError {
    /// Create a malformed-document error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create an invalid-parameters error.
    pub fn invalid_params(directive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDirectiveParams {
            directive: directive.into(),
            reason: reason.into(),
        }
    }
}

/// Raw model output could not be decoded into the schema's shape.
///
/// Field-level decode problems become implicit reasks; this error only
/// surfaces when the whole output is unparsable and the retry budget is
/// spent.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No structured document could be found in the output.
    #[error("unparsable output: {reason}")]
    Unparsable {
        /// What the boundary scan / strict parse reported.
        reason: String,
    },
}

impl DecodeError {
    /// Create an unparsable-output error.
    pub fn unparsable(reason: impl Into<String>) -> Self {
        Self::Unparsable {
            reason: reason.into(),
        }
    }
}

/// A directive with on-fail action `exception` failed.
///
/// Fatal for the whole call: no partial result is returned.
#[derive(Debug, Error)]
#[error("validation failed at {path}: {message}")]
pub struct ValidationError {
    /// Path of the failing field.
    pub path: FieldPath,
    /// The validator's error message.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// The caller-supplied generation function failed.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The generation call itself returned an error.
    #[error("generation call failed: {0}")]
    Failed(String),

    /// The generation call returned something unusable.
    #[error("generation call returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Create a failed-call error.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create an invalid-response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// Umbrella error for a guarded call.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Schema compilation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Output stayed unparsable after exhausting retries.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An `exception`-tagged directive failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The generation function failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The generation call exceeded its timeout and no retry budget remains.
    #[error("generation call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the call.
    #[error("call cancelled")]
    Cancelled,
}

/// Result alias used across railguard.
pub type Result<T, E = GuardError> = std::result::Result<T, E>;

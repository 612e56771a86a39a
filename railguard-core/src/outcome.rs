//! Validation pass outcomes.
//!
//! Transient types produced by one validation pass: per-field states, reask
//! markers, and the batch that collects markers across the pass. None of
//! these are retained past the pass that produced them.

use serde_json::{json, Value as JsonValue};

use crate::path::FieldPath;
use crate::value::Value;

/// Marker for a field that failed validation with action `reask`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reask {
    /// Where in the tree the failure happened.
    pub path: FieldPath,
    /// The invalid value as decoded.
    pub incorrect_value: Value,
    /// The validator's error message, fed back to the model.
    pub error_message: String,
    /// The validator's proposed fix, if it had one.
    pub fix_value: Option<Value>,
}

impl Reask {
    /// Create a marker without a fix value.
    pub fn new(path: FieldPath, incorrect_value: Value, error_message: impl Into<String>) -> Self {
        Self {
            path,
            incorrect_value,
            error_message: error_message.into(),
            fix_value: None,
        }
    }

    /// Attach a proposed fix value.
    #[must_use]
    pub fn with_fix(mut self, fix: Value) -> Self {
        self.fix_value = Some(fix);
        self
    }

    /// JSON view shown to the model in a reask prompt.
    pub fn to_feedback_json(&self) -> JsonValue {
        json!({
            "incorrect_value": self.incorrect_value.to_json(),
            "error_message": self.error_message,
        })
    }
}

/// All reask markers collected during one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaskBatch {
    markers: Vec<Reask>,
}

impl ReaskBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker.
    pub fn push(&mut self, reask: Reask) {
        self.markers.push(reask);
    }

    /// Whether no field was flagged.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Number of flagged fields.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// The collected markers.
    pub fn markers(&self) -> &[Reask] {
        &self.markers
    }

    /// Paths of all flagged fields.
    pub fn paths(&self) -> Vec<FieldPath> {
        self.markers.iter().map(|r| r.path.clone()).collect()
    }
}

impl IntoIterator for ReaskBatch {
    type Item = Reask;
    type IntoIter = std::vec::IntoIter<Reask>;

    fn into_iter(self) -> Self::IntoIter {
        self.markers.into_iter()
    }
}

/// Terminal state of one field after a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// Every directive passed.
    Valid,
    /// A directive failed; the value was kept and the error logged.
    InvalidNoop,
    /// A directive failed; the value was dropped from its container.
    InvalidFiltered,
    /// A directive failed; the validator's fix value was substituted.
    InvalidFixed,
    /// A directive failed; the field is flagged for regeneration.
    InvalidReask,
    /// A directive failed with action `exception`; the pass was aborted.
    InvalidFatal,
}

/// Per-field record of how a validation pass went.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    /// The field's path.
    pub path: FieldPath,
    /// Terminal state.
    pub state: FieldState,
    /// Error message, for any non-valid state.
    pub error: Option<String>,
}

impl FieldOutcome {
    /// Record a valid field.
    pub fn valid(path: FieldPath) -> Self {
        Self {
            path,
            state: FieldState::Valid,
            error: None,
        }
    }

    /// Record a failed field.
    pub fn invalid(path: FieldPath, state: FieldState, error: impl Into<String>) -> Self {
        Self {
            path,
            state,
            error: Some(error.into()),
        }
    }
}

/// Everything one validation pass produced.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Per-field outcomes, in visit order.
    pub outcomes: Vec<FieldOutcome>,
    /// The reask markers collected during the pass.
    pub batch: ReaskBatch,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes that are not `Valid`.
    pub fn failures(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state != FieldState::Valid)
    }
}

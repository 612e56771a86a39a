//! Per-call audit trail.
//!
//! Every round of a guarded call is logged: the exact prompt sent, the raw
//! text that came back, and what decoding and validation made of it. The
//! history rides along on the final [`GuardOutput`](crate::GuardOutput) so
//! callers can inspect how a result was reached.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use railguard_core::{Reask, Value};

use crate::reask::gather_reasks;

/// Record of one prompt/response round.
#[derive(Debug, Clone)]
pub struct CallLog {
    /// Unique id for this round.
    pub id: Uuid,
    /// When the round started.
    pub timestamp: DateTime<Utc>,
    /// The fully rendered prompt sent to the model.
    pub prompt: String,
    /// Raw model text, before any decoding.
    pub raw_output: String,
    /// The decoded tree, if the output was parsable.
    pub decoded: Option<Value>,
    /// The tree after validation and merging, if the output was parsable.
    pub validated: Option<Value>,
    /// How many fields were still flagged for reask after this round.
    pub reask_count: usize,
}

impl CallLog {
    /// Start a log entry for a round.
    pub fn new(prompt: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            prompt: prompt.into(),
            raw_output: raw_output.into(),
            decoded: None,
            validated: None,
            reask_count: 0,
        }
    }

    /// The markers still present in this round's validated tree.
    pub fn failed_validations(&self) -> Vec<Reask> {
        self.validated
            .as_ref()
            .map(gather_reasks)
            .unwrap_or_default()
    }
}

/// The ordered rounds of one guarded call.
#[derive(Debug, Clone, Default)]
pub struct CallHistory {
    rounds: Vec<CallLog>,
}

impl CallHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a round.
    pub fn push(&mut self, log: CallLog) {
        self.rounds.push(log);
    }

    /// Number of rounds taken, including the initial call.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether no round was taken.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// The most recent round.
    pub fn last(&self) -> Option<&CallLog> {
        self.rounds.last()
    }

    /// Iterate rounds oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CallLog> {
        self.rounds.iter()
    }

    /// The validated tree of the most recent parsable round.
    pub fn latest_validated(&self) -> Option<&Value> {
        self.rounds
            .iter()
            .rev()
            .find_map(|log| log.validated.as_ref())
    }

    /// Total fields flagged for reask across all rounds.
    pub fn total_reasks(&self) -> usize {
        self.rounds.iter().map(|log| log.reask_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use railguard_core::FieldPath;

    #[test]
    fn history_tracks_rounds_in_order() {
        let mut history = CallHistory::new();
        assert!(history.is_empty());

        let mut first = CallLog::new("ask", "{bad");
        first.reask_count = 1;
        history.push(first);

        let mut second = CallLog::new("reask", "{\"ok\": true}");
        second.validated = Some(Value::Bool(true));
        history.push(second);

        assert_eq!(history.len(), 2);
        assert_eq!(history.total_reasks(), 1);
        assert_eq!(history.latest_validated(), Some(&Value::Bool(true)));
        assert_eq!(history.last().map(|l| l.prompt.as_str()), Some("reask"));
    }

    #[test]
    fn failed_validations_come_from_the_validated_tree() {
        let mut log = CallLog::new("ask", "raw");
        assert!(log.failed_validations().is_empty());

        log.validated = Some(Value::Reask(Box::new(Reask::new(
            FieldPath::root().key("pet"),
            Value::Str("dog".into()),
            "not two words",
        ))));
        let failures = log.failed_validations();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path.to_string(), "pet");
    }
}

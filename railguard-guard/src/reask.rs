//! Working with reask markers between rounds.
//!
//! A round that ends with markers in the tree produces three artifacts for
//! the next round: the list of markers, a pruned feedback JSON showing the
//! model only what failed, and (after the next response) a merge of the
//! corrections back into the prior tree at their original positions.

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use railguard_core::{Reask, Value};

/// Collects every reask marker left in the tree, in visit order.
pub fn gather_reasks(value: &Value) -> Vec<Reask> {
    let mut markers = Vec::new();
    collect(value, &mut markers);
    markers
}

fn collect(value: &Value, markers: &mut Vec<Reask>) {
    match value {
        Value::Reask(marker) => markers.push((**marker).clone()),
        Value::Object(map) => {
            for child in map.values() {
                collect(child, markers);
            }
        }
        Value::List(items) => {
            for item in items {
                collect(item, markers);
            }
        }
        _ => {}
    }
}

/// Renders the failing portion of the tree as feedback JSON.
///
/// Passing fields are omitted entirely; only markers and the containers
/// leading to them survive. Returns `None` when the tree holds no markers.
pub fn prune_for_feedback(value: &Value) -> Option<JsonValue> {
    match value {
        Value::Reask(marker) => Some(marker.to_feedback_json()),
        Value::Object(map) => {
            let mut kept = Map::new();
            for (name, child) in map {
                if let Some(pruned) = prune_for_feedback(child) {
                    kept.insert(name.clone(), pruned);
                }
            }
            (!kept.is_empty()).then(|| JsonValue::Object(kept))
        }
        Value::List(items) => {
            let kept: Vec<JsonValue> = items.iter().filter_map(prune_for_feedback).collect();
            (!kept.is_empty()).then(|| JsonValue::Array(kept))
        }
        _ => None,
    }
}

/// Splices a corrected tree from a reask round back into the prior tree.
///
/// Corrections land exactly where their markers sit; fields that were
/// already valid are untouched. Objects merge by key. Lists of equal length
/// merge position-wise; otherwise the corrected elements fill the marker
/// slots in order, which is the shape a pruned reask response comes back in.
pub fn merge_corrected(prior: &mut Value, corrected: &Value) {
    match (&mut *prior, corrected) {
        (Value::Reask(prior_marker), Value::Reask(corrected_marker)) => {
            // A still-failing correction keeps the fresher marker, but a
            // correction round that omitted the field entirely must not
            // erase the value the prior marker still holds.
            let mut fresh = (**corrected_marker).clone();
            if fresh.incorrect_value.is_absent() {
                fresh.incorrect_value = prior_marker.incorrect_value.clone();
            }
            *prior = Value::Reask(Box::new(fresh));
        }
        (Value::Reask(_), replacement) => {
            *prior = replacement.clone();
        }
        (Value::Object(prior_map), Value::Object(corrected_map)) => {
            for (name, prior_child) in prior_map.iter_mut() {
                if let Some(corrected_child) = corrected_map.get(name) {
                    merge_corrected(prior_child, corrected_child);
                }
            }
        }
        (Value::List(prior_items), Value::List(corrected_items)) => {
            if prior_items.len() == corrected_items.len() {
                for (prior_item, corrected_item) in
                    prior_items.iter_mut().zip(corrected_items.iter())
                {
                    merge_corrected(prior_item, corrected_item);
                }
            } else {
                let mut replacements = corrected_items.iter();
                for prior_item in prior_items.iter_mut() {
                    if prior_item.is_reask() {
                        match replacements.next() {
                            Some(replacement) => *prior_item = replacement.clone(),
                            None => break,
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Downgrades every remaining marker to its original invalid value.
///
/// Called once the reask budget is spent: the call still returns a tree,
/// with each unfixed field holding the value the model last produced.
/// Returns how many markers were downgraded.
pub fn finalize_noop(value: &mut Value) -> usize {
    match value {
        Value::Reask(marker) => {
            warn!(path = %marker.path, error = %marker.error_message,
                "reask budget exhausted, keeping invalid value");
            let incorrect = marker.incorrect_value.clone();
            *value = incorrect;
            1
        }
        Value::Object(map) => map.values_mut().map(finalize_noop).sum(),
        Value::List(items) => items.iter_mut().map(finalize_noop).sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use railguard_core::FieldPath;

    fn marker(path: FieldPath, value: Value, message: &str) -> Value {
        Value::Reask(Box::new(Reask::new(path, value, message)))
    }

    fn object(entries: Vec<(&str, Value)>) -> Value {
        let mut map = IndexMap::new();
        for (name, value) in entries {
            map.insert(name.to_string(), value);
        }
        Value::Object(map)
    }

    #[test]
    fn gather_finds_nested_markers() {
        let tree = object(vec![
            ("ok", Value::Str("fine".into())),
            (
                "inner",
                object(vec![(
                    "bad",
                    marker(
                        FieldPath::root().key("inner").key("bad"),
                        Value::Integer(99),
                        "out of range",
                    ),
                )]),
            ),
            (
                "items",
                Value::List(vec![
                    Value::Str("good".into()),
                    marker(
                        FieldPath::root().key("items").index(1),
                        Value::Str("bad".into()),
                        "too short",
                    ),
                ]),
            ),
        ]);

        let markers = gather_reasks(&tree);
        let paths: Vec<String> = markers.iter().map(|m| m.path.to_string()).collect();
        assert_eq!(paths, vec!["inner.bad", "items[1]"]);
    }

    #[test]
    fn feedback_prunes_passing_fields() {
        let tree = object(vec![
            ("ok", Value::Str("fine".into())),
            (
                "bad",
                marker(
                    FieldPath::root().key("bad"),
                    Value::Str("nope".into()),
                    "not two words",
                ),
            ),
        ]);

        let feedback = prune_for_feedback(&tree).unwrap();
        assert_eq!(
            feedback,
            json!({
                "bad": {
                    "incorrect_value": "nope",
                    "error_message": "not two words",
                }
            })
        );
        assert!(feedback.get("ok").is_none());
    }

    #[test]
    fn feedback_is_none_without_markers() {
        let tree = object(vec![("ok", Value::Str("fine".into()))]);
        assert_eq!(prune_for_feedback(&tree), None);
    }

    #[test]
    fn merge_replaces_markers_and_keeps_valid_fields() {
        let mut prior = object(vec![
            ("keep", Value::Str("untouched".into())),
            (
                "bad",
                marker(
                    FieldPath::root().key("bad"),
                    Value::Str("x".into()),
                    "too short",
                ),
            ),
        ]);
        let corrected = object(vec![("bad", Value::Str("long enough now".into()))]);

        merge_corrected(&mut prior, &corrected);

        let map = prior.as_object().unwrap();
        assert_eq!(map["keep"], Value::Str("untouched".into()));
        assert_eq!(map["bad"], Value::Str("long enough now".into()));
    }

    #[test]
    fn merge_fills_list_marker_slots_in_order() {
        let mut prior = object(vec![(
            "items",
            Value::List(vec![
                Value::Str("good".into()),
                marker(
                    FieldPath::root().key("items").index(1),
                    Value::Str("bad one".into()),
                    "invalid",
                ),
                Value::Str("also good".into()),
                marker(
                    FieldPath::root().key("items").index(3),
                    Value::Str("bad two".into()),
                    "invalid",
                ),
            ]),
        )]);
        let corrected = object(vec![(
            "items",
            Value::List(vec![
                Value::Str("fixed one".into()),
                Value::Str("fixed two".into()),
            ]),
        )]);

        merge_corrected(&mut prior, &corrected);

        let map = prior.as_object().unwrap();
        let items = map["items"].as_list().unwrap();
        assert_eq!(
            items,
            &[
                Value::Str("good".into()),
                Value::Str("fixed one".into()),
                Value::Str("also good".into()),
                Value::Str("fixed two".into()),
            ]
        );
    }

    #[test]
    fn merge_keeps_prior_value_when_correction_omits_the_field() {
        // A correction round that leaves the flagged field out decodes to a
        // missing-required marker holding Absent. After exhaustion the field
        // must still degrade to the round-1 value, not disappear.
        let mut prior = object(vec![(
            "explanation",
            marker(
                FieldPath::root().key("explanation"),
                Value::Str("too short".into()),
                "length below 200",
            ),
        )]);
        let corrected = object(vec![(
            "explanation",
            marker(
                FieldPath::root().key("explanation"),
                Value::Absent,
                "missing required field",
            ),
        )]);

        merge_corrected(&mut prior, &corrected);

        let markers = gather_reasks(&prior);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].incorrect_value, Value::Str("too short".into()));
        assert_eq!(markers[0].error_message, "missing required field");

        let downgraded = finalize_noop(&mut prior);
        assert_eq!(downgraded, 1);
        let map = prior.as_object().unwrap();
        assert_eq!(map["explanation"], Value::Str("too short".into()));
    }

    #[test]
    fn finalize_restores_incorrect_values() {
        let mut tree = object(vec![
            ("ok", Value::Str("fine".into())),
            (
                "bad",
                marker(
                    FieldPath::root().key("bad"),
                    Value::Integer(99),
                    "out of range",
                ),
            ),
        ]);

        let downgraded = finalize_noop(&mut tree);
        assert_eq!(downgraded, 1);

        let map = tree.as_object().unwrap();
        assert_eq!(map["bad"], Value::Integer(99));
        assert!(gather_reasks(&tree).is_empty());
    }
}

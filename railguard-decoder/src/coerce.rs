//! Schema-driven coercion of parsed JSON into the value tree.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use railguard_core::{FieldPath, Reask, ScalarKind, Value};
use railguard_schema::{NodeBody, SchemaNode};

/// Coerce a parsed JSON document against a schema tree.
///
/// Never fails: a leaf that cannot be coerced to its declared kind, and a
/// missing required field, become reask markers in place. The literal token
/// `none` (case-insensitive) and JSON null mean "no value": absent when the
/// field is optional, a reask marker when it is required.
pub fn coerce(json: &JsonValue, schema: &SchemaNode) -> Value {
    coerce_node(json, schema, &FieldPath::root())
}

fn coerce_node(json: &JsonValue, schema: &SchemaNode, path: &FieldPath) -> Value {
    if is_none_token(json) {
        return if schema.required {
            reask(path, json, "required field returned no value")
        } else {
            Value::Absent
        };
    }

    match &schema.body {
        NodeBody::Scalar(kind) => coerce_scalar(json, *kind, path),
        NodeBody::List(element) => coerce_list(json, element.as_deref(), path),
        NodeBody::Object(fields) => coerce_object(json, fields, path),
    }
}

fn coerce_scalar(json: &JsonValue, kind: ScalarKind, path: &FieldPath) -> Value {
    match kind {
        ScalarKind::String | ScalarKind::Url => match json {
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Number(n) => Value::Str(n.to_string()),
            JsonValue::Bool(b) => Value::Str(b.to_string()),
            other => reask(path, other, "expected a string"),
        },
        ScalarKind::Integer => match json {
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 => Value::Integer(f as i64),
                        _ => reask(path, json, "expected a whole number"),
                    }
                }
            }
            JsonValue::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => reask(path, json, "expected a whole number"),
            },
            other => reask(path, other, "expected a whole number"),
        },
        ScalarKind::Float => match json {
            JsonValue::Number(n) => match n.as_f64() {
                Some(f) => Value::Float(f),
                None => reask(path, json, "expected a number"),
            },
            JsonValue::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => reask(path, json, "expected a number"),
            },
            other => reask(path, other, "expected a number"),
        },
        ScalarKind::Boolean => match json {
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => reask(path, json, "expected true or false"),
            },
            other => reask(path, other, "expected true or false"),
        },
        ScalarKind::Date => match json {
            JsonValue::String(s) => match parse_date(s) {
                Some(date) => Value::Date(date),
                None => reask(path, json, "expected an ISO-8601 date (YYYY-MM-DD)"),
            },
            other => reask(path, other, "expected an ISO-8601 date (YYYY-MM-DD)"),
        },
    }
}

fn coerce_list(json: &JsonValue, element: Option<&SchemaNode>, path: &FieldPath) -> Value {
    let JsonValue::Array(items) = json else {
        return reask(path, json, "expected a list");
    };
    let coerced = items
        .iter()
        .enumerate()
        .map(|(i, item)| match element {
            Some(schema) => coerce_node(item, schema, &path.index(i)),
            // No element contract declared: best-effort decoding.
            None => Value::from_json(item),
        })
        .collect();
    Value::List(coerced)
}

fn coerce_object(
    json: &JsonValue,
    fields: &IndexMap<String, SchemaNode>,
    path: &FieldPath,
) -> Value {
    let JsonValue::Object(entries) = json else {
        return reask(path, json, "expected an object");
    };

    for key in entries.keys() {
        if !fields.contains_key(key) {
            debug!(field = %path.key(key), "dropping key not present in schema");
        }
    }

    let mut out = IndexMap::new();
    for (name, field_schema) in fields {
        let field_path = path.key(name);
        let value = match entries.get(name) {
            Some(raw) => coerce_node(raw, field_schema, &field_path),
            None if field_schema.required => {
                reask(&field_path, &JsonValue::Null, "missing required field")
            }
            None => Value::Absent,
        };
        out.insert(name.clone(), value);
    }
    Value::Object(out)
}

fn is_none_token(json: &JsonValue) -> bool {
    match json {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().eq_ignore_ascii_case("none"),
        _ => false,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            // Datetime forms: keep the calendar date.
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn reask(path: &FieldPath, raw: &JsonValue, message: &str) -> Value {
    Value::Reask(Box::new(Reask::new(
        path.clone(),
        Value::from_json(raw),
        message,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn scalar(kind: ScalarKind) -> SchemaNode {
        SchemaNode::scalar("x", kind)
    }

    fn optional(kind: ScalarKind) -> SchemaNode {
        let mut node = scalar(kind);
        node.required = false;
        node
    }

    #[rstest]
    #[case(json!(7), Value::Integer(7))]
    #[case(json!("42"), Value::Integer(42))]
    #[case(json!(3.0), Value::Integer(3))]
    fn integers_coerce(#[case] raw: JsonValue, #[case] expected: Value) {
        assert_eq!(coerce(&raw, &scalar(ScalarKind::Integer)), expected);
    }

    #[test]
    fn fractional_number_is_not_an_integer() {
        let value = coerce(&json!(3.5), &scalar(ScalarKind::Integer));
        assert!(value.is_reask());
    }

    #[rstest]
    #[case(json!(2.5), Value::Float(2.5))]
    #[case(json!("0.25"), Value::Float(0.25))]
    #[case(json!(4), Value::Float(4.0))]
    fn floats_coerce(#[case] raw: JsonValue, #[case] expected: Value) {
        assert_eq!(coerce(&raw, &scalar(ScalarKind::Float)), expected);
    }

    #[test]
    fn dates_coerce_from_iso_strings() {
        let value = coerce(&json!("2024-03-09"), &scalar(ScalarKind::Date));
        assert_eq!(
            value,
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        );

        let value = coerce(&json!("2024-03-09T12:30:00Z"), &scalar(ScalarKind::Date));
        assert_eq!(
            value,
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        );

        assert!(coerce(&json!("March 9th"), &scalar(ScalarKind::Date)).is_reask());
    }

    #[test]
    fn booleans_coerce_from_tokens() {
        assert_eq!(
            coerce(&json!("True"), &scalar(ScalarKind::Boolean)),
            Value::Bool(true)
        );
        assert!(coerce(&json!("yes"), &scalar(ScalarKind::Boolean)).is_reask());
    }

    #[test]
    fn none_token_is_absent_when_optional() {
        assert_eq!(coerce(&json!("none"), &optional(ScalarKind::String)), Value::Absent);
        assert_eq!(coerce(&json!("NONE"), &optional(ScalarKind::String)), Value::Absent);
        assert_eq!(coerce(&json!(null), &optional(ScalarKind::String)), Value::Absent);
    }

    #[test]
    fn none_token_is_a_reask_when_required() {
        let value = coerce(&json!("none"), &scalar(ScalarKind::String));
        match value {
            Value::Reask(reask) => {
                assert!(reask.error_message.contains("required"));
            }
            other => panic!("expected reask, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_is_a_reask() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), scalar(ScalarKind::String));
        fields.insert("b".to_string(), optional(ScalarKind::String));
        let schema = SchemaNode::object("output", fields);

        let value = coerce(&json!({}), &schema);
        let obj = value.as_object().unwrap();
        assert!(obj["a"].is_reask());
        assert_eq!(obj["b"], Value::Absent);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), scalar(ScalarKind::Integer));
        let schema = SchemaNode::object("output", fields);

        let value = coerce(&json!({"a": 1, "surplus": true}), &schema);
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["a"], Value::Integer(1));
    }

    #[test]
    fn typed_list_coerces_each_element() {
        let schema = SchemaNode::list("xs", Some(scalar(ScalarKind::Integer)));
        let value = coerce(&json!(["1", 2, "x"]), &schema);
        let items = value.as_list().unwrap();
        assert_eq!(items[0], Value::Integer(1));
        assert_eq!(items[1], Value::Integer(2));
        assert!(items[2].is_reask());
    }

    #[test]
    fn untyped_list_is_best_effort() {
        let schema = SchemaNode::list("xs", None);
        let value = coerce(&json!([1, "two", true]), &schema);
        let items = value.as_list().unwrap();
        assert_eq!(items[1], Value::Str("two".into()));
        assert_eq!(items[2], Value::Bool(true));
    }

    #[test]
    fn reask_paths_point_into_the_tree() {
        let mut inner = IndexMap::new();
        inner.insert("age".to_string(), scalar(ScalarKind::Integer));
        let mut fields = IndexMap::new();
        fields.insert(
            "pets".to_string(),
            SchemaNode::list("pets", Some(SchemaNode::object("pet", inner))),
        );
        let schema = SchemaNode::object("output", fields);

        let value = coerce(&json!({"pets": [{"age": "old"}]}), &schema);
        let pets = value.as_object().unwrap()["pets"].as_list().unwrap();
        let pet = pets[0].as_object().unwrap();
        match &pet["age"] {
            Value::Reask(reask) => assert_eq!(reask.path.to_string(), "pets[0].age"),
            other => panic!("expected reask, got {other:?}"),
        }
    }
}

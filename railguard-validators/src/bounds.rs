//! Cardinality, range, and membership directives.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use railguard_core::validator::KindSet;
use railguard_core::{
    split_params, CheckResult, ScalarKind, SchemaError, Validator, ValidatorRegistry, Value,
    ValueKind,
};

/// Register the directives in this module.
pub fn register(registry: &mut ValidatorRegistry) {
    registry.register(
        "length",
        KindSet::Only(vec![
            ValueKind::Scalar(ScalarKind::String),
            ValueKind::List,
            ValueKind::Object,
        ]),
        |params| Ok(Arc::new(ValidLength::from_params(params)?) as Arc<dyn Validator>),
    );
    registry.register(
        "valid-range",
        KindSet::Only(vec![
            ValueKind::Scalar(ScalarKind::Integer),
            ValueKind::Scalar(ScalarKind::Float),
        ]),
        |params| Ok(Arc::new(ValidRange::from_params(params)?) as Arc<dyn Validator>),
    );
    registry.register(
        "valid-choices",
        KindSet::Only(vec![
            ValueKind::Scalar(ScalarKind::String),
            ValueKind::Scalar(ScalarKind::Integer),
            ValueKind::Scalar(ScalarKind::Float),
            ValueKind::Scalar(ScalarKind::Boolean),
            ValueKind::Scalar(ScalarKind::Date),
            ValueKind::Scalar(ScalarKind::Url),
        ]),
        |params| Ok(Arc::new(ValidChoices::from_params(params)) as Arc<dyn Validator>),
    );
}

fn parse_bound<T: std::str::FromStr>(
    directive: &str,
    which: &str,
    token: Option<&String>,
) -> Result<Option<T>, SchemaError> {
    match token.map(String::as_str) {
        None | Some("") | Some("none") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            SchemaError::invalid_params(directive, format!("{which} bound '{s}' is not numeric"))
        }),
    }
}

/// `length: min max`: character/element/field count within bounds.
///
/// Fix: too short pads by repeating the last character or element; too long
/// truncates.
#[derive(Debug, Clone)]
pub struct ValidLength {
    min: Option<usize>,
    max: Option<usize>,
}

impl ValidLength {
    /// Create with explicit bounds.
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Build from raw directive parameters `min max`.
    pub fn from_params(raw: &str) -> Result<Self, SchemaError> {
        let params = split_params(raw);
        Ok(Self::new(
            parse_bound("length", "min", params.first())?,
            parse_bound("length", "max", params.get(1))?,
        ))
    }

    fn fix_short(&self, value: &Value, min: usize) -> Option<Value> {
        match value {
            Value::Str(s) => {
                let last = s.chars().last()?;
                let mut fixed = s.clone();
                while fixed.chars().count() < min {
                    fixed.push(last);
                }
                Some(Value::Str(fixed))
            }
            Value::List(items) => {
                let last = items.last()?.clone();
                let mut fixed = items.clone();
                while fixed.len() < min {
                    fixed.push(last.clone());
                }
                Some(Value::List(fixed))
            }
            _ => None,
        }
    }

    fn fix_long(&self, value: &Value, max: usize) -> Option<Value> {
        match value {
            Value::Str(s) => Some(Value::Str(s.chars().take(max).collect())),
            Value::List(items) => Some(Value::List(items.iter().take(max).cloned().collect())),
            _ => None,
        }
    }
}

#[async_trait]
impl Validator for ValidLength {
    fn name(&self) -> &str {
        "length"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let Some(len) = value.cardinality() else {
            return CheckResult::fail(format!(
                "length applies to strings, lists, and objects, not {}",
                value.type_name()
            ));
        };
        debug!(len, min = ?self.min, max = ?self.max, "checking length");

        if let Some(min) = self.min {
            if len < min {
                let message = format!(
                    "length {len} is less than the minimum {min}; return a longer value"
                );
                return match self.fix_short(value, min) {
                    Some(fix) => CheckResult::fail_with_fix(message, fix),
                    None => CheckResult::fail(message),
                };
            }
        }
        if let Some(max) = self.max {
            if len > max {
                let message = format!(
                    "length {len} is greater than the maximum {max}; return a shorter value"
                );
                return match self.fix_long(value, max) {
                    Some(fix) => CheckResult::fail_with_fix(message, fix),
                    None => CheckResult::fail(message),
                };
            }
        }
        CheckResult::pass()
    }
}

/// `valid-range: min max`: numeric value within bounds.
///
/// Fix: clamp to the violated bound, keeping the value's numeric kind.
#[derive(Debug, Clone)]
pub struct ValidRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl ValidRange {
    /// Create with explicit bounds.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Build from raw directive parameters `min max`.
    pub fn from_params(raw: &str) -> Result<Self, SchemaError> {
        let params = split_params(raw);
        Ok(Self::new(
            parse_bound("valid-range", "min", params.first())?,
            parse_bound("valid-range", "max", params.get(1))?,
        ))
    }

    fn clamp_like(&self, value: &Value, bound: f64) -> Value {
        match value {
            Value::Integer(_) => Value::Integer(bound as i64),
            _ => Value::Float(bound),
        }
    }
}

#[async_trait]
impl Validator for ValidRange {
    fn name(&self) -> &str {
        "valid-range"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let n = match value {
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            other => {
                return CheckResult::fail(format!(
                    "valid-range applies to numbers, not {}",
                    other.type_name()
                ))
            }
        };

        if let Some(min) = self.min {
            if n < min {
                return CheckResult::fail_with_fix(
                    format!("value {n} is less than {min}"),
                    self.clamp_like(value, min),
                );
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return CheckResult::fail_with_fix(
                    format!("value {n} is greater than {max}"),
                    self.clamp_like(value, max),
                );
            }
        }
        CheckResult::pass()
    }
}

/// `valid-choices: a b c`: scalar must be one of the listed values.
#[derive(Debug, Clone)]
pub struct ValidChoices {
    choices: Vec<String>,
}

impl ValidChoices {
    /// Create from the allowed values.
    pub fn new(choices: Vec<String>) -> Self {
        Self { choices }
    }

    /// Build from raw directive parameters, one choice per token.
    pub fn from_params(raw: &str) -> Self {
        Self::new(split_params(raw))
    }
}

fn scalar_repr(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

#[async_trait]
impl Validator for ValidChoices {
    fn name(&self) -> &str {
        "valid-choices"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let Some(repr) = scalar_repr(value) else {
            return CheckResult::fail(format!(
                "valid-choices applies to scalar values, not {}",
                value.type_name()
            ));
        };
        if self.choices.iter().any(|c| c == &repr) {
            CheckResult::pass()
        } else {
            CheckResult::fail(format!(
                "value '{repr}' is not one of the choices: {}",
                self.choices.join(", ")
            ))
        }
    }
}

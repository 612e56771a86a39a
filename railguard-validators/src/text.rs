//! String-shape directives.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use railguard_core::validator::KindSet;
use railguard_core::{
    CheckResult, ScalarKind, SchemaError, Validator, ValidatorRegistry, Value, ValueKind,
};

fn string_kinds() -> KindSet {
    KindSet::Only(vec![ValueKind::Scalar(ScalarKind::String)])
}

/// Register the directives in this module.
pub fn register(registry: &mut ValidatorRegistry) {
    registry.register("two-words", string_kinds(), |_params| {
        Ok(Arc::new(TwoWords) as Arc<dyn Validator>)
    });
    registry.register("one-line", string_kinds(), |_params| {
        Ok(Arc::new(OneLine) as Arc<dyn Validator>)
    });
    registry.register("lower-case", string_kinds(), |_params| {
        Ok(Arc::new(LowerCase) as Arc<dyn Validator>)
    });
    registry.register("upper-case", string_kinds(), |_params| {
        Ok(Arc::new(UpperCase) as Arc<dyn Validator>)
    });
    registry.register("matches", string_kinds(), |params| {
        Ok(Arc::new(Matches::from_params(params)?) as Arc<dyn Validator>)
    });
}

fn expect_str(directive: &str, value: &Value) -> Result<String, CheckResult> {
    match value.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Err(CheckResult::fail(format!(
            "{directive} applies to strings, not {}",
            value.type_name()
        ))),
    }
}

/// `two-words`: exactly two whitespace-separated words.
///
/// Fix: the first two words.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoWords;

#[async_trait]
impl Validator for TwoWords {
    fn name(&self) -> &str {
        "two-words"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let s = match expect_str("two-words", value) {
            Ok(s) => s,
            Err(fail) => return fail,
        };
        let words: Vec<&str> = s.split_whitespace().collect();
        if words.len() == 2 {
            CheckResult::pass()
        } else {
            let message = format!("must be exactly two words, got {}", words.len());
            if words.len() > 2 {
                CheckResult::fail_with_fix(message, Value::Str(words[..2].join(" ")))
            } else {
                CheckResult::fail(message)
            }
        }
    }
}

/// `one-line`: a single line of text.
///
/// Fix: the first line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneLine;

#[async_trait]
impl Validator for OneLine {
    fn name(&self) -> &str {
        "one-line"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let s = match expect_str("one-line", value) {
            Ok(s) => s,
            Err(fail) => return fail,
        };
        let mut lines = s.lines();
        let first = lines.next().unwrap_or_default();
        if lines.next().is_none() {
            CheckResult::pass()
        } else {
            CheckResult::fail_with_fix(
                "must be a single line",
                Value::Str(first.to_string()),
            )
        }
    }
}

/// `lower-case`: no uppercase characters.
///
/// Fix: the lowercased value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCase;

#[async_trait]
impl Validator for LowerCase {
    fn name(&self) -> &str {
        "lower-case"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let s = match expect_str("lower-case", value) {
            Ok(s) => s,
            Err(fail) => return fail,
        };
        if s == s.to_lowercase() {
            CheckResult::pass()
        } else {
            CheckResult::fail_with_fix("must be lower case", Value::Str(s.to_lowercase()))
        }
    }
}

/// `upper-case`: no lowercase characters.
///
/// Fix: the uppercased value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpperCase;

#[async_trait]
impl Validator for UpperCase {
    fn name(&self) -> &str {
        "upper-case"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let s = match expect_str("upper-case", value) {
            Ok(s) => s,
            Err(fail) => return fail,
        };
        if s == s.to_uppercase() {
            CheckResult::pass()
        } else {
            CheckResult::fail_with_fix("must be upper case", Value::Str(s.to_uppercase()))
        }
    }
}

/// `matches: <regex>`: the value must match the pattern.
#[derive(Debug, Clone)]
pub struct Matches {
    pattern: Regex,
}

impl Matches {
    /// Create from a compiled pattern.
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    /// Build from the raw parameter text, used verbatim as the pattern so
    /// embedded whitespace survives. One outer `{...}` pair is stripped.
    pub fn from_params(raw: &str) -> Result<Self, SchemaError> {
        let source = raw
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(raw);
        if source.is_empty() {
            return Err(SchemaError::invalid_params("matches", "missing pattern"));
        }
        let pattern = Regex::new(source)
            .map_err(|e| SchemaError::invalid_params("matches", e.to_string()))?;
        Ok(Self::new(pattern))
    }
}

#[async_trait]
impl Validator for Matches {
    fn name(&self) -> &str {
        "matches"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let s = match expect_str("matches", value) {
            Ok(s) => s,
            Err(fail) => return fail,
        };
        if self.pattern.is_match(&s) {
            CheckResult::pass()
        } else {
            CheckResult::fail(format!("does not match the pattern {}", self.pattern))
        }
    }
}

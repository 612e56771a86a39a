//! Validator trait and registry.
//!
//! A validator is a named, parametrized check over one decoded value. The
//! registry maps directive names to factories; a schema compiler resolves
//! each `format` directive against it once, at compile time, so validation
//! never dispatches on strings.
//!
//! Registration is `&mut` and happens at configuration time, before a guard
//! is built; a duplicate registration under the same name replaces the prior
//! entry (last registration wins). The registry is then treated as read-only.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::SchemaError;
use crate::kind::ValueKind;
use crate::value::Value;

/// Result of one validator check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The value satisfies the directive.
    Pass,
    /// The value fails the directive.
    Fail {
        /// Human-readable description, fed back to the model on reask.
        error_message: String,
        /// A corrected value, where the validator can propose one.
        fix_value: Option<Value>,
    },
}

impl CheckResult {
    /// A passing result.
    pub fn pass() -> Self {
        Self::Pass
    }

    /// A failing result without a fix.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            error_message: message.into(),
            fix_value: None,
        }
    }

    /// A failing result with a proposed fix.
    pub fn fail_with_fix(message: impl Into<String>, fix: Value) -> Self {
        Self::Fail {
            error_message: message.into(),
            fix_value: Some(fix),
        }
    }

    /// Whether the check passed.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A compiled, parametrized check over one decoded value.
///
/// Implementations must be pure; the one sanctioned exception is a bounded
/// network probe (URL reachability), which treats its own timeout as a
/// failing check, never as an error.
#[async_trait]
pub trait Validator: Send + Sync {
    /// The directive name this validator was registered under.
    fn name(&self) -> &str;

    /// Check one value.
    async fn check(&self, value: &Value) -> CheckResult;
}

impl std::fmt::Debug for dyn Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").field("name", &self.name()).finish()
    }
}

/// Factory signature: raw directive parameter text → compiled validator.
///
/// The text is everything after the `:` in a format token, verbatim. Most
/// factories tokenize it with [`split_params`]; factories whose parameter is
/// free-form text (a regex, say) use it as-is, so embedded whitespace
/// survives.
pub type BuildFn = Box<dyn Fn(&str) -> Result<Arc<dyn Validator>, SchemaError> + Send + Sync>;

/// Split raw parameter text on whitespace, stripping one `{...}` pair per
/// token.
pub fn split_params(raw: &str) -> Vec<String> {
    raw.split_whitespace()
        .map(|p| {
            p.strip_prefix('{')
                .and_then(|p| p.strip_suffix('}'))
                .unwrap_or(p)
                .to_string()
        })
        .collect()
}

/// Which node kinds a directive applies to.
#[derive(Debug, Clone)]
pub enum KindSet {
    /// Applicable to every kind, scalar or container.
    All,
    /// Applicable to the listed kinds only.
    Only(Vec<ValueKind>),
}

impl KindSet {
    /// Whether `kind` is covered.
    pub fn contains(&self, kind: ValueKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(kinds) => kinds.contains(&kind),
        }
    }
}

struct RegistryEntry {
    kinds: KindSet,
    build: BuildFn,
}

/// Named validator factories, keyed by directive name.
#[derive(Default)]
pub struct ValidatorRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ValidatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name` for the given kinds.
    ///
    /// Replaces any prior entry under the same name; replacement is not an
    /// error, so a notebook-style session can redefine a validator freely.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kinds: KindSet,
        build: impl Fn(&str) -> Result<Arc<dyn Validator>, SchemaError> + Send + Sync + 'static,
    ) {
        let name = name.into();
        if self.entries.contains_key(&name) {
            debug!(directive = %name, "replacing registered validator");
        }
        self.entries.insert(
            name,
            RegistryEntry {
                kinds,
                build: Box::new(build),
            },
        );
    }

    /// Whether a directive name is registered at all.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether a directive name is registered and applicable to `kind`.
    pub fn applies_to(&self, name: &str, kind: ValueKind) -> bool {
        self.entries
            .get(name)
            .map(|e| e.kinds.contains(kind))
            .unwrap_or(false)
    }

    /// Resolve a directive into a compiled validator.
    ///
    /// `Ok(None)` means the directive is unknown or inapplicable to `kind`
    /// and should be dropped with a warning. `Err` means the directive is
    /// known but its parameters are unusable, which is fatal.
    pub fn resolve(
        &self,
        name: &str,
        kind: ValueKind,
        params: &str,
    ) -> Result<Option<Arc<dyn Validator>>, SchemaError> {
        match self.entries.get(name) {
            Some(entry) if entry.kinds.contains(kind) => (entry.build)(params).map(Some),
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("directives", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ScalarKind;

    struct AlwaysFail {
        message: String,
    }

    #[async_trait]
    impl Validator for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }

        async fn check(&self, _value: &Value) -> CheckResult {
            CheckResult::fail(&self.message)
        }
    }

    fn string_kind() -> ValueKind {
        ValueKind::Scalar(ScalarKind::String)
    }

    #[test]
    fn resolve_unknown_name_is_none() {
        let registry = ValidatorRegistry::new();
        let resolved = registry.resolve("no-such", string_kind(), "").unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn resolve_inapplicable_kind_is_none() {
        let mut registry = ValidatorRegistry::new();
        registry.register(
            "always-fail",
            KindSet::Only(vec![ValueKind::Scalar(ScalarKind::Integer)]),
            |_params| {
                Ok(Arc::new(AlwaysFail {
                    message: "nope".into(),
                }) as Arc<dyn Validator>)
            },
        );
        assert!(registry
            .resolve("always-fail", string_kind(), "")
            .unwrap()
            .is_none());
        assert!(registry.applies_to("always-fail", ValueKind::Scalar(ScalarKind::Integer)));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = ValidatorRegistry::new();
        registry.register("check", KindSet::All, |_params| {
            Ok(Arc::new(AlwaysFail {
                message: "first".into(),
            }) as Arc<dyn Validator>)
        });
        registry.register("check", KindSet::All, |_params| {
            Ok(Arc::new(AlwaysFail {
                message: "second".into(),
            }) as Arc<dyn Validator>)
        });

        let validator = registry
            .resolve("check", string_kind(), "")
            .unwrap()
            .unwrap();
        match validator.check(&Value::Str("x".into())).await {
            CheckResult::Fail { error_message, .. } => assert_eq!(error_message, "second"),
            CheckResult::Pass => panic!("expected failure"),
        }
    }

    #[test]
    fn bad_params_are_fatal() {
        let mut registry = ValidatorRegistry::new();
        registry.register("picky", KindSet::All, |params| {
            if params.is_empty() {
                Err(SchemaError::invalid_params("picky", "needs one parameter"))
            } else {
                Ok(Arc::new(AlwaysFail {
                    message: "x".into(),
                }) as Arc<dyn Validator>)
            }
        });
        let err = registry.resolve("picky", string_kind(), "").unwrap_err();
        assert!(err.to_string().contains("picky"));
    }

    #[test]
    fn split_params_strips_braces_per_token() {
        assert_eq!(split_params("1 {5} x"), vec!["1", "5", "x"]);
        assert_eq!(split_params("  "), Vec::<String>::new());
    }
}

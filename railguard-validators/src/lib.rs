//! # railguard-validators
//!
//! The built-in format directives.
//!
//! Each directive is a [`Validator`](railguard_core::Validator)
//! implementation registered under the name used in RAIL `format`
//! attributes:
//!
//! | directive | kinds | proposed fix |
//! |---|---|---|
//! | `length: min max` | string, list, object | pad with last element / truncate |
//! | `valid-range: min max` | integer, float | clamp to the nearest bound |
//! | `valid-choices: a b c` | all scalars | none |
//! | `two-words` | string | first two words |
//! | `one-line` | string | first line |
//! | `lower-case` | string | lowercased value |
//! | `upper-case` | string | uppercased value |
//! | `matches: <regex>` | string | none |
//! | `valid-url` | string, url | none |
//! | `is-reachable` | string, url | none |
//!
//! All are pure except `is-reachable`, which probes the URL with a bounded
//! timeout and treats a timeout as a failing check.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bounds;
pub mod text;
pub mod web;

use railguard_core::ValidatorRegistry;

pub use bounds::{ValidChoices, ValidLength, ValidRange};
pub use text::{LowerCase, Matches, OneLine, TwoWords, UpperCase};
pub use web::{IsReachable, ValidUrl};

/// Register every built-in directive into `registry`.
pub fn register_builtins(registry: &mut ValidatorRegistry) {
    bounds::register(registry);
    text::register(registry);
    web::register(registry);
}

/// A registry pre-loaded with all built-in directives.
pub fn builtin_registry() -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new();
    register_builtins(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use railguard_core::{ScalarKind, ValueKind};

    #[test]
    fn builtin_registry_knows_every_directive() {
        let registry = builtin_registry();
        for name in [
            "length",
            "valid-range",
            "valid-choices",
            "two-words",
            "one-line",
            "lower-case",
            "upper-case",
            "matches",
            "valid-url",
            "is-reachable",
        ] {
            assert!(registry.contains(name), "missing builtin: {name}");
        }
    }

    #[test]
    fn applicability_follows_kinds() {
        let registry = builtin_registry();
        let string = ValueKind::Scalar(ScalarKind::String);
        let integer = ValueKind::Scalar(ScalarKind::Integer);

        assert!(registry.applies_to("two-words", string));
        assert!(!registry.applies_to("two-words", integer));
        assert!(registry.applies_to("length", ValueKind::List));
        assert!(registry.applies_to("length", ValueKind::Object));
        assert!(!registry.applies_to("valid-range", string));
        assert!(registry.applies_to("valid-choices", integer));
        assert!(!registry.applies_to("valid-choices", ValueKind::List));
    }
}

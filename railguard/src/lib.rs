//! # railguard - Schema-Guarded LLM Output for Rust
//!
//! railguard wraps a call to a large language model in a contract: a RAIL
//! document declares the exact shape, types, and quality constraints of the
//! output, and the guard loop decodes, validates, and (within a bounded
//! budget) re-asks the model to correct the fields that failed.
//!
//! ## Quick Start
//!
//! ```ignore
//! use railguard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> railguard::core::Result<()> {
//!     let guard = Guard::from_rail_string(r#"<rail version="0.1">
//! <output>
//!     <string name="pet_name" format="two-words" on-fail-two-words="reask" />
//!     <integer name="age" format="valid-range: 0 30" on-fail-valid-range="fix" />
//! </output>
//! <prompt>
//! Describe {owner}'s pet.
//!
//! {output_schema}
//!
//! @complete_json_suffix
//! </prompt>
//! </rail>"#)?;
//!
//!     let llm = FnLlm::new(|prompt| my_provider_call(prompt));
//!     let output = guard
//!         .call(&llm, CallOptions::new().prompt_param("owner", "Ada"))
//!         .await?;
//!
//!     println!("{}", output.validated_json());
//!     Ok(())
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Declarative schemas** in a compact XML dialect, compiled once per guard
//! - **Typed decoding** that digs a JSON document out of chatty model text
//! - **Named validators** with parameters, bound at compile time
//! - **Per-field on-fail actions**: `noop`, `filter`, `fix`, `reask`, `exception`
//! - **Bounded reask rounds** that show the model only its own mistakes
//! - **Call history** recording every prompt and response along the way
//!
//! ## Architecture
//!
//! railguard is organized as a workspace of focused crates:
//!
//! - [`railguard_core`] - Values, paths, actions, errors, the validator trait
//! - [`railguard_schema`] - RAIL compiler, serializer, prompt skeletons
//! - [`railguard_validators`] - The built-in format directives
//! - [`railguard_decoder`] - Extraction and schema-directed coercion
//! - [`railguard_guard`] - The correction engine and the call loop

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

/// Values, paths, on-fail actions, errors, and the validator trait.
pub use railguard_core as core;

/// The RAIL markup compiler and its companions.
pub use railguard_schema as schema;

/// The built-in format directives.
pub use railguard_validators as validators;

/// Extraction and schema-directed coercion of raw model text.
pub use railguard_decoder as decoder;

/// The correction engine and the guard orchestrator.
pub use railguard_guard as guard;

/// Commonly used types, importable in one line.
pub mod prelude {
    // Core types
    pub use crate::core::{
        split_params, CheckResult, FieldPath, GuardError, KindSet, LlmError, OnFailAction, Reask,
        Result, ScalarKind, SchemaError, ValidationError, Validator, ValidatorRegistry, Value,
        ValueKind,
    };

    // Schema
    pub use crate::schema::{compile_rail, to_rail, PromptSkeleton, Rail, SchemaNode};

    // Validators
    pub use crate::validators::{builtin_registry, register_builtins};

    // Decoding
    pub use crate::decoder::decode;

    // Guard
    pub use crate::guard::{
        CallHistory, CallLog, CallOptions, FnLlm, Guard, GuardOutput, LlmClient, LlmParams,
        ScriptedLlm,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // The crates compose through the facade the same way they do directly.
    #[tokio::test]
    async fn facade_covers_the_whole_loop() {
        let guard = Guard::from_rail_string(
            r#"<rail><output>
                <string name="greeting" format="lower-case" on-fail-lower-case="fix" />
            </output></rail>"#,
        )
        .unwrap();

        let llm = ScriptedLlm::new().with_response(r#"{"greeting": "Hello There"}"#);
        let output = guard.call(&llm, CallOptions::new()).await.unwrap();

        assert_eq!(output.validated_json(), json!({"greeting": "hello there"}));
    }

    #[test]
    fn prelude_exposes_the_registry() {
        let registry = builtin_registry();
        assert!(registry.contains("two-words"));
    }
}

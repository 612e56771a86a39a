//! # railguard-schema
//!
//! The RAIL markup compiler and its companions.
//!
//! A RAIL document declares, in a restricted XML dialect, the exact shape and
//! quality constraints expected of a model's output, plus the prompt skeleton
//! used to ask for it:
//!
//! ```xml
//! <rail version="0.1">
//! <output>
//!     <string name="pet_name" format="two-words" on-fail-two-words="reask" />
//!     <integer name="age" format="valid-range: 0 30" on-fail-valid-range="fix" />
//! </output>
//! <prompt>
//! Describe a pet.
//!
//! {output_schema}
//!
//! @complete_json_suffix
//! </prompt>
//! </rail>
//! ```
//!
//! [`compile_rail`] turns such a document into a [`SchemaNode`] tree with
//! every `format` directive resolved against a validator registry. Unknown
//! or inapplicable directives are dropped with a warning at compile time, not
//! at validation time. [`to_rail`] serializes a tree back to markup (without
//! `on-fail-*` attributes) for splicing into prompts, and [`prune`] cuts a
//! tree down to the failing fields for reask rounds.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod compile;
pub mod node;
pub mod prompt;
pub mod serialize;

pub use compile::{compile_rail, Rail};
pub use node::{Directive, NodeBody, SchemaNode};
pub use prompt::{PromptSkeleton, reask_prompt};
pub use serialize::{prune, to_rail};

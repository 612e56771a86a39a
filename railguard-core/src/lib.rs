//! # railguard-core
//!
//! Foundational types for the railguard framework.
//!
//! This crate provides the building blocks shared by every other railguard
//! crate:
//!
//! - **Value tree**: the loosely-typed, insertion-ordered tree that decoded
//!   model output is coerced into, including reask markers embedded in place
//! - **Kinds**: the closed set of scalar and container kinds a schema can
//!   declare
//! - **Paths**: dotted/indexed locations of fields inside the tree
//! - **Validators**: the `Validator` trait, check results, and the registry
//!   that directive names are resolved against at schema compile time
//! - **Errors**: the full error taxonomy, from fatal schema errors down to
//!   per-field validation failures

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod action;
pub mod errors;
pub mod kind;
pub mod outcome;
pub mod path;
pub mod validator;
pub mod value;

pub use action::OnFailAction;
pub use errors::{
    DecodeError, GuardError, LlmError, Result, SchemaError, ValidationError,
};
pub use kind::{ScalarKind, ValueKind};
pub use outcome::{FieldOutcome, FieldState, Reask, ReaskBatch, ValidationReport};
pub use path::{FieldPath, PathSegment};
pub use validator::{split_params, CheckResult, KindSet, Validator, ValidatorRegistry};
pub use value::Value;

//! # railguard-guard
//!
//! The correction engine and the [`Guard`] orchestrator.
//!
//! A guard owns a compiled RAIL document and, per call, drives the loop of
//! prompt rendering, generation through an [`LlmClient`], decoding,
//! validation with per-field on-fail actions, and bounded reask rounds that
//! feed the model its own mistakes back:
//!
//! ```no_run
//! use railguard_guard::{CallOptions, FnLlm, Guard};
//!
//! # async fn demo() -> Result<(), railguard_core::GuardError> {
//! let guard = Guard::from_rail_string(r#"<rail>
//! <output>
//!     <string name="pet_name" format="two-words" on-fail-two-words="reask" />
//! </output>
//! </rail>"#)?;
//!
//! let llm = FnLlm::new(|_prompt: &str| Ok(r#"{"pet_name": "rex rover"}"#.to_string()));
//! let output = guard.call(&llm, CallOptions::new()).await?;
//! println!("{}", output.validated_json());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod correction;
pub mod guard;
pub mod history;
pub mod llm;
pub mod reask;

pub use correction::run_pass;
pub use guard::{CallOptions, Guard, GuardBuilder, GuardOutput, DEFAULT_NUM_REASKS};
pub use history::{CallHistory, CallLog};
pub use llm::{FnLlm, LlmClient, LlmParams, ScriptedLlm};
pub use reask::{finalize_noop, gather_reasks, merge_corrected, prune_for_feedback};

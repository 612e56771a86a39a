//! The seam between the guard loop and whatever produces model text.
//!
//! [`Guard::call`](crate::Guard::call) only ever talks to an [`LlmClient`],
//! so any provider binding, local model, or test double plugs in behind the
//! same async trait.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use railguard_core::LlmError;

/// Opaque generation parameters forwarded to the client on every round.
///
/// The guard never interprets these. They exist so callers can thread
/// temperature, token limits, or provider-specific knobs through the loop
/// without the loop knowing their names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmParams {
    entries: Map<String, JsonValue>,
}

impl LlmParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any prior value under the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Looks up a parameter by key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    /// Iterates over all parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.entries.iter()
    }

    /// Returns true when no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A callable that turns a fully rendered prompt into raw model text.
///
/// Implementations must be safe to call repeatedly; the guard invokes the
/// same client once per round, including reask rounds.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates raw text for the given prompt.
    async fn generate(&self, prompt: &str, params: &LlmParams) -> Result<String, LlmError>;
}

/// Adapts a plain closure into an [`LlmClient`].
///
/// Handy for wiring up thin provider shims without a dedicated type:
///
/// ```
/// use railguard_guard::FnLlm;
///
/// let echo = FnLlm::new(|prompt: &str| Ok(format!("{{\"echo\": \"{}\"}}", prompt.len())));
/// ```
pub struct FnLlm<F> {
    func: F,
}

impl<F> FnLlm<F>
where
    F: Fn(&str) -> Result<String, LlmError> + Send + Sync,
{
    /// Wraps the closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> LlmClient for FnLlm<F>
where
    F: Fn(&str) -> Result<String, LlmError> + Send + Sync,
{
    async fn generate(&self, prompt: &str, _params: &LlmParams) -> Result<String, LlmError> {
        (self.func)(prompt)
    }
}

/// A scripted client that replays canned responses in order.
///
/// Each call pops the next response and records the prompt it was asked,
/// so tests can assert on reask prompt contents. Once the script runs dry
/// every call fails with [`LlmError::Failed`].
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a response to the script.
    #[must_use]
    pub fn with_response(self, response: impl Into<String>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response.into());
        }
        self
    }

    /// Returns every prompt this client has been asked so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str, _params: &LlmParams) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_owned());
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        next.ok_or_else(|| LlmError::failed("scripted client has no responses left"))
    }
}

//! The guard orchestrator.
//!
//! A [`Guard`] owns a compiled RAIL document and runs the full loop for each
//! call: render the prompt, generate, decode, validate, and if fields were
//! flagged for reask, build a corrective prompt and go again, up to a bounded
//! number of reask rounds.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use railguard_core::{DecodeError, GuardError, LlmError, SchemaError, Value};
use railguard_decoder::{coerce, extract_json};
use railguard_schema::{compile_rail, prune, reask_prompt, to_rail, PromptSkeleton, Rail, SchemaNode};
use railguard_validators::builtin_registry;

use crate::correction::run_pass;
use crate::history::{CallHistory, CallLog};
use crate::llm::{LlmClient, LlmParams};
use crate::reask::{finalize_noop, gather_reasks, merge_corrected, prune_for_feedback};

/// Default number of reask rounds after the initial call.
pub const DEFAULT_NUM_REASKS: usize = 1;

/// A compiled RAIL document plus call policy.
///
/// Guards are cheap to clone and safe to share; each call carries its own
/// per-call options.
#[derive(Debug, Clone)]
pub struct Guard {
    rail: Rail,
    num_reasks: usize,
}

impl Guard {
    /// Compile a RAIL document with the builtin validators.
    pub fn from_rail_string(source: &str) -> Result<Self, SchemaError> {
        GuardBuilder::new().rail_string(source).build()
    }

    /// Read and compile a RAIL file with the builtin validators.
    pub fn from_rail_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_rail_string(&source)
    }

    /// Start building a guard with custom options.
    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    /// The compiled output schema.
    pub fn schema(&self) -> &SchemaNode {
        &self.rail.output
    }

    /// The prompt skeleton this guard renders, falling back to the default
    /// when the document declared no `<prompt>`.
    pub fn prompt_skeleton(&self) -> PromptSkeleton {
        self.rail.prompt.clone().unwrap_or_default()
    }

    /// Render the initial prompt without calling any model.
    pub fn base_prompt(&self, prompt_params: &HashMap<String, String>) -> String {
        self.prompt_skeleton()
            .render(&to_rail(&self.rail.output), prompt_params)
    }

    /// Run the guarded call loop against `llm`.
    ///
    /// Returns the last raw model text, the validated tree, and the round
    /// history. Fails only on an `exception` directive, an unparsable output
    /// with no budget left, a timeout with no budget left, cancellation, or
    /// a generation error.
    pub async fn call(
        &self,
        llm: &dyn LlmClient,
        options: CallOptions,
    ) -> Result<GuardOutput, GuardError> {
        let budget = options.num_reasks.unwrap_or(self.num_reasks);
        let mut rounds_used = 0usize;

        let mut round_schema = self.rail.output.clone();
        let mut prompt = self.base_prompt(&options.prompt_params);
        let mut merged: Option<Value> = None;
        let mut history = CallHistory::new();
        let mut last_raw = String::new();

        info!(num_reasks = budget, "starting guarded call");

        loop {
            let raw = match self.generate_once(llm, &prompt, &options).await {
                Ok(raw) => raw,
                Err(GuardError::Timeout(elapsed)) => {
                    if rounds_used < budget {
                        // A timed-out round spends one retry unit.
                        rounds_used += 1;
                        warn!(?elapsed, round = rounds_used, "generation timed out, retrying");
                        continue;
                    }
                    return Err(GuardError::Timeout(elapsed));
                }
                Err(err) => return Err(err),
            };
            last_raw.clone_from(&raw);

            let json = match extract_json(&raw) {
                Ok(json) => json,
                Err(err) => {
                    if rounds_used < budget {
                        rounds_used += 1;
                        warn!(round = rounds_used, error = %err, "output unparsable, reasking");
                        let mut log = CallLog::new(&prompt, &raw);
                        log.reask_count = 1;
                        history.push(log);
                        prompt = unparsable_reask_prompt(&raw, &round_schema);
                        continue;
                    }
                    return Err(GuardError::Decode(err));
                }
            };

            let mut decoded = coerce(&json, &round_schema);
            run_pass(&round_schema, &mut decoded).await?;

            match merged.as_mut() {
                Some(prior) => merge_corrected(prior, &decoded),
                None => merged = Some(decoded.clone()),
            }
            let current = match merged.as_ref() {
                Some(current) => current,
                // merged is set just above on the first parsable round
                None => return Err(GuardError::Decode(DecodeError::unparsable("empty round"))),
            };

            let markers = gather_reasks(current);
            let mut log = CallLog::new(&prompt, &raw);
            log.decoded = Some(decoded);
            log.validated = Some(current.clone());
            log.reask_count = markers.len();
            history.push(log);

            if markers.is_empty() {
                debug!(rounds = history.len(), "all fields valid");
                break;
            }
            if rounds_used >= budget {
                debug!(remaining = markers.len(), "reask budget exhausted");
                break;
            }
            rounds_used += 1;

            let feedback = prune_for_feedback(current)
                .unwrap_or(serde_json::Value::Null);
            let paths: Vec<_> = markers.iter().map(|m| m.path.clone()).collect();
            round_schema = prune(&self.rail.output, &paths);
            prompt = reask_prompt(&format!("{feedback:#}"), &to_rail(&round_schema));
            info!(round = rounds_used, fields = paths.len(), "reasking for failing fields");
        }

        let mut validated = match merged {
            Some(value) => value,
            None => return Err(GuardError::Decode(DecodeError::unparsable("no output"))),
        };
        let downgraded = finalize_noop(&mut validated);
        if downgraded > 0 {
            warn!(fields = downgraded, "returning fields that never passed validation");
        }

        Ok(GuardOutput {
            raw: last_raw,
            validated,
            history,
        })
    }

    async fn generate_once(
        &self,
        llm: &dyn LlmClient,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<String, GuardError> {
        if let Some(token) = &options.cancellation {
            if token.is_cancelled() {
                return Err(GuardError::Cancelled);
            }
        }

        let generation = llm.generate(prompt, &options.llm_params);
        let raw: Result<String, LlmError> = match (options.timeout, options.cancellation.as_ref()) {
            (Some(limit), Some(token)) => tokio::select! {
                _ = token.cancelled() => return Err(GuardError::Cancelled),
                timed = tokio::time::timeout(limit, generation) => {
                    timed.map_err(|_| GuardError::Timeout(limit))?
                }
            },
            (Some(limit), None) => tokio::time::timeout(limit, generation)
                .await
                .map_err(|_| GuardError::Timeout(limit))?,
            (None, Some(token)) => tokio::select! {
                _ = token.cancelled() => return Err(GuardError::Cancelled),
                result = generation => result,
            },
            (None, None) => generation.await,
        };
        Ok(raw?)
    }
}

// Reask prompt for output that never parsed: the whole response is the
// incorrect value, and the full round schema is repeated.
fn unparsable_reask_prompt(raw: &str, schema: &SchemaNode) -> String {
    let feedback = serde_json::json!({
        "incorrect_value": raw,
        "error_message": "output could not be parsed as a JSON document",
    });
    reask_prompt(&format!("{feedback:#}"), &to_rail(schema))
}

/// Builder for [`Guard`].
#[derive(Default)]
pub struct GuardBuilder {
    source: Option<String>,
    registry: Option<railguard_core::ValidatorRegistry>,
    num_reasks: Option<usize>,
}

impl GuardBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The RAIL document to compile.
    #[must_use]
    pub fn rail_string(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Compile against a custom registry instead of the builtins.
    #[must_use]
    pub fn registry(mut self, registry: railguard_core::ValidatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reask rounds allowed after the initial call. Defaults to
    /// [`DEFAULT_NUM_REASKS`].
    #[must_use]
    pub fn num_reasks(mut self, num_reasks: usize) -> Self {
        self.num_reasks = Some(num_reasks);
        self
    }

    /// Compile the document and produce the guard.
    pub fn build(self) -> Result<Guard, SchemaError> {
        let source = self
            .source
            .ok_or_else(|| SchemaError::malformed("no RAIL document provided"))?;
        let registry = self.registry.unwrap_or_else(builtin_registry);
        let rail = compile_rail(&source, &registry)?;
        Ok(Guard {
            rail,
            num_reasks: self.num_reasks.unwrap_or(DEFAULT_NUM_REASKS),
        })
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Variables substituted into the prompt skeleton.
    pub prompt_params: HashMap<String, String>,
    /// Opaque parameters forwarded to the client on every round.
    pub llm_params: LlmParams,
    /// Wall-clock limit for each generation call.
    pub timeout: Option<Duration>,
    /// Token that aborts the call between and during rounds.
    pub cancellation: Option<CancellationToken>,
    /// Overrides the guard's reask budget for this call.
    pub num_reasks: Option<usize>,
}

impl CallOptions {
    /// Options with everything defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prompt variable.
    #[must_use]
    pub fn prompt_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.prompt_params.insert(name.into(), value.into());
        self
    }

    /// Set the generation parameters.
    #[must_use]
    pub fn llm_params(mut self, params: LlmParams) -> Self {
        self.llm_params = params;
        self
    }

    /// Set the per-generation timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Override the reask budget for this call.
    #[must_use]
    pub fn num_reasks(mut self, num_reasks: usize) -> Self {
        self.num_reasks = Some(num_reasks);
        self
    }
}

/// What a guarded call returns.
#[derive(Debug, Clone)]
pub struct GuardOutput {
    /// The last raw model text received.
    pub raw: String,
    /// The validated (and possibly corrected) output tree.
    pub validated: Value,
    /// Every round taken, oldest first.
    pub history: CallHistory,
}

impl GuardOutput {
    /// The validated tree as plain JSON.
    pub fn validated_json(&self) -> serde_json::Value {
        self.validated.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use railguard_core::LlmError;

    use crate::llm::{FnLlm, ScriptedLlm};

    const PET_RAIL: &str = r#"<rail version="0.1">
<output>
    <string name="pet_name" format="two-words" on-fail-two-words="reask" />
    <integer name="age" format="valid-range: 0 30" on-fail-valid-range="fix" />
</output>
<prompt>
Describe {owner}'s pet.

{output_schema}

@complete_json_suffix
</prompt>
</rail>"#;

    fn pet_guard() -> Guard {
        Guard::from_rail_string(PET_RAIL).unwrap()
    }

    #[test]
    fn from_rail_file_reads_and_compiles() {
        let path = std::env::temp_dir().join(format!("{}.rail", uuid::Uuid::new_v4()));
        std::fs::write(&path, PET_RAIL).unwrap();

        let guard = Guard::from_rail_file(&path).unwrap();
        assert_eq!(guard.schema().fields().map(|f| f.len()), Some(2));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn from_rail_file_surfaces_missing_file() {
        let path = std::env::temp_dir().join("railguard-no-such-file.rail");
        assert!(matches!(
            Guard::from_rail_file(&path),
            Err(SchemaError::Io(_))
        ));
    }

    #[test]
    fn base_prompt_renders_schema_and_vars() {
        let guard = pet_guard();
        let mut params = HashMap::new();
        params.insert("owner".to_string(), "Ada".to_string());

        let prompt = guard.base_prompt(&params);
        assert!(prompt.contains("Ada's pet"));
        assert!(prompt.contains("pet_name"));
        assert!(prompt.contains("valid JSON object"));
        assert!(!prompt.contains("on-fail"));
    }

    #[tokio::test]
    async fn valid_first_response_takes_one_round() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new()
            .with_response(r#"{"pet_name": "golden retriever", "age": 4}"#);

        let output = guard.call(&llm, CallOptions::new()).await.unwrap();

        assert_eq!(
            output.validated_json(),
            json!({"pet_name": "golden retriever", "age": 4})
        );
        assert_eq!(output.history.len(), 1);
        assert_eq!(output.history.total_reasks(), 0);
    }

    #[tokio::test]
    async fn reask_round_merges_corrections() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new()
            .with_response(r#"{"pet_name": "rex", "age": 4}"#)
            .with_response(r#"{"pet_name": "rex rover"}"#);

        let output = guard.call(&llm, CallOptions::new()).await.unwrap();

        // The corrected field lands where the marker sat; the valid field
        // from round one is untouched.
        assert_eq!(
            output.validated_json(),
            json!({"pet_name": "rex rover", "age": 4})
        );
        assert_eq!(output.history.len(), 2);

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("rex"));
        assert!(prompts[1].contains("two words"));
        assert!(prompts[1].contains("pet_name"));
        // The pruned schema sent in round two omits the passing field.
        assert!(!prompts[1].contains("name=\"age\""));
    }

    #[tokio::test]
    async fn exhausted_budget_keeps_the_invalid_value() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new()
            .with_response(r#"{"pet_name": "rex", "age": 4}"#)
            .with_response(r#"{"pet_name": "fido"}"#);

        let output = guard.call(&llm, CallOptions::new()).await.unwrap();

        // Both rounds failed two-words; the last attempt is kept as-is.
        assert_eq!(
            output.validated_json(),
            json!({"pet_name": "fido", "age": 4})
        );
        assert_eq!(output.history.len(), 2);
    }

    #[tokio::test]
    async fn num_reasks_zero_never_reasks() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new().with_response(r#"{"pet_name": "rex", "age": 4}"#);

        let output = guard
            .call(&llm, CallOptions::new().num_reasks(0))
            .await
            .unwrap();

        assert_eq!(llm.prompts().len(), 1);
        assert_eq!(output.validated_json(), json!({"pet_name": "rex", "age": 4}));
    }

    #[tokio::test]
    async fn exception_aborts_without_partial_result() {
        let guard = Guard::from_rail_string(
            r#"<rail><output>
                <string name="title" format="one-line" on-fail-one-line="exception" />
            </output></rail>"#,
        )
        .unwrap();
        let llm = ScriptedLlm::new().with_response(r#"{"title": "two\nlines"}"#);

        let err = guard.call(&llm, CallOptions::new()).await.unwrap_err();
        match err {
            GuardError::Validation(validation) => {
                assert_eq!(validation.path.to_string(), "title");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[tokio::test]
    async fn unparsable_output_gets_a_whole_output_reask() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new()
            .with_response("Sure! Here is your pet: a nice dog.")
            .with_response(r#"{"pet_name": "nice dog", "age": 3}"#);

        let output = guard.call(&llm, CallOptions::new()).await.unwrap();

        assert_eq!(
            output.validated_json(),
            json!({"pet_name": "nice dog", "age": 3})
        );
        let prompts = llm.prompts();
        assert!(prompts[1].contains("could not be parsed"));
        assert_eq!(output.history.len(), 2);
    }

    #[tokio::test]
    async fn unparsable_output_with_no_budget_is_an_error() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new().with_response("no json here");

        let err = guard
            .call(&llm, CallOptions::new().num_reasks(0))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Decode(_)));
    }

    #[tokio::test]
    async fn llm_failure_surfaces_directly() {
        let guard = pet_guard();
        let llm = FnLlm::new(|_prompt: &str| Err(LlmError::failed("provider is down")));

        let err = guard.call(&llm, CallOptions::new()).await.unwrap_err();
        assert!(matches!(err, GuardError::Llm(_)));
    }

    #[tokio::test]
    async fn timeout_consumes_budget_then_surfaces() {
        struct SlowLlm;

        #[async_trait::async_trait]
        impl LlmClient for SlowLlm {
            async fn generate(&self, _prompt: &str, _params: &LlmParams) -> Result<String, LlmError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            }
        }

        tokio::time::pause();
        let guard = pet_guard();
        let options = CallOptions::new()
            .timeout(Duration::from_millis(50))
            .num_reasks(1);

        let call = guard.call(&SlowLlm, options);
        tokio::pin!(call);

        // Auto-advancing paused time drives both the first attempt and the
        // one retry the budget allows.
        let err = call.await.unwrap_err();
        assert!(matches!(err, GuardError::Timeout(_)));
    }

    #[tokio::test]
    async fn timeout_retry_can_still_succeed() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct FlakyLlm {
            calls: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl LlmClient for FlakyLlm {
            async fn generate(&self, _prompt: &str, _params: &LlmParams) -> Result<String, LlmError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok(r#"{"pet_name": "rex rover", "age": 2}"#.to_string())
            }
        }

        tokio::time::pause();
        let guard = pet_guard();
        let llm = FlakyLlm {
            calls: AtomicUsize::new(0),
        };
        let options = CallOptions::new().timeout(Duration::from_millis(50));

        let output = guard.call(&llm, options).await.unwrap();
        assert_eq!(
            output.validated_json(),
            json!({"pet_name": "rex rover", "age": 2})
        );
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_generating() {
        let guard = pet_guard();
        let llm = ScriptedLlm::new().with_response("{}");
        let token = CancellationToken::new();
        token.cancel();

        let err = guard
            .call(&llm, CallOptions::new().cancellation(token))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Cancelled));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn length_reask_and_reachability_filter_compose() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let guard = Guard::from_rail_string(
            r#"<rail><output>
                <string name="explanation" format="length: 200 240" on-fail-length="reask" />
                <url name="follow_up_url" format="is-reachable" on-fail-is-reachable="filter" />
            </output></rail>"#,
        )
        .unwrap();

        let short = "a".repeat(125);
        let long = "b".repeat(210);
        let llm = ScriptedLlm::new()
            .with_response(format!(
                r#"{{"explanation": "{short}", "follow_up_url": "{}"}}"#,
                server.uri()
            ))
            .with_response(format!(r#"{{"explanation": "{long}"}}"#));

        let output = guard.call(&llm, CallOptions::new()).await.unwrap();

        // Round one: explanation too short, flagged for reask; the URL
        // probe succeeded and its value is kept. Round two supplies a
        // conforming explanation, merged at the original position.
        let json = output.validated_json();
        assert_eq!(json["explanation"].as_str().map(str::len), Some(210));
        assert_eq!(json["follow_up_url"], server.uri().as_str());
        assert_eq!(output.history.len(), 2);
        assert_eq!(output.history.total_reasks(), 1);
    }

    #[tokio::test]
    async fn unreachable_url_is_filtered_from_the_result() {
        let guard = Guard::from_rail_string(
            r#"<rail><output>
                <string name="note" />
                <url name="source" format="is-reachable" on-fail-is-reachable="filter" />
            </output></rail>"#,
        )
        .unwrap();

        // Nothing listens on this port.
        let llm = ScriptedLlm::new().with_response(
            r#"{"note": "kept", "source": "http://127.0.0.1:9/"}"#,
        );

        let output = guard.call(&llm, CallOptions::new()).await.unwrap();
        let json = output.validated_json();
        assert_eq!(json["note"], "kept");
        assert!(json.get("source").is_none());
    }

    #[tokio::test]
    async fn round_trip_through_markup_preserves_the_structure() {
        // to_rail emits the root as <output>, so wrapping in <rail> yields
        // a compilable document again. on-fail attributes are not emitted,
        // so only structure and directives survive the trip.
        let guard = pet_guard();
        let rail = format!("<rail>\n{}\n</rail>", to_rail(guard.schema()));

        let recompiled = Guard::from_rail_string(&rail).unwrap();
        let names = |g: &Guard| -> Vec<String> {
            g.schema()
                .fields()
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default()
        };
        assert_eq!(names(&recompiled), names(&guard));
        let directive_names = |g: &Guard| -> Vec<String> {
            g.schema()
                .fields()
                .into_iter()
                .flat_map(|fields| fields.values())
                .flat_map(|node| node.directives.iter().map(|d| d.name.clone()))
                .collect()
        };
        assert_eq!(directive_names(&recompiled), directive_names(&guard));
    }
}

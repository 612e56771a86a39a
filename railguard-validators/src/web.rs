//! URL directives.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use railguard_core::validator::KindSet;
use railguard_core::{
    split_params, CheckResult, ScalarKind, SchemaError, Validator, ValidatorRegistry, Value,
    ValueKind,
};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn url_kinds() -> KindSet {
    KindSet::Only(vec![
        ValueKind::Scalar(ScalarKind::String),
        ValueKind::Scalar(ScalarKind::Url),
    ])
}

/// Register the directives in this module.
pub fn register(registry: &mut ValidatorRegistry) {
    registry.register("valid-url", url_kinds(), |_params| {
        Ok(Arc::new(ValidUrl) as Arc<dyn Validator>)
    });
    registry.register("is-reachable", url_kinds(), |params| {
        Ok(Arc::new(IsReachable::from_params(params)?) as Arc<dyn Validator>)
    });
}

/// `valid-url`: the value parses as an absolute URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidUrl;

#[async_trait]
impl Validator for ValidUrl {
    fn name(&self) -> &str {
        "valid-url"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let Some(s) = value.as_str() else {
            return CheckResult::fail(format!(
                "valid-url applies to strings, not {}",
                value.type_name()
            ));
        };
        match Url::parse(s) {
            Ok(_) => CheckResult::pass(),
            Err(e) => CheckResult::fail(format!("'{s}' is not a valid URL: {e}")),
        }
    }
}

/// `is-reachable: [timeout-secs]`: a GET probe of the URL succeeds.
///
/// The probe runs under a bounded timeout; a timeout or connection failure is
/// a failing check, never an error, so validation can never hang on a dead
/// host.
#[derive(Debug, Clone)]
pub struct IsReachable {
    client: reqwest::Client,
    timeout: Duration,
}

impl IsReachable {
    /// Create with the default probe timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    /// Create with an explicit probe timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Build from raw directive parameters: an optional timeout in seconds.
    pub fn from_params(raw: &str) -> Result<Self, SchemaError> {
        match split_params(raw).first() {
            None => Ok(Self::new()),
            Some(token) => {
                let secs: u64 = token.parse().map_err(|_| {
                    SchemaError::invalid_params(
                        "is-reachable",
                        format!("timeout '{token}' is not a number of seconds"),
                    )
                })?;
                Ok(Self::with_timeout(Duration::from_secs(secs)))
            }
        }
    }
}

impl Default for IsReachable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for IsReachable {
    fn name(&self) -> &str {
        "is-reachable"
    }

    async fn check(&self, value: &Value) -> CheckResult {
        let Some(s) = value.as_str() else {
            return CheckResult::fail(format!(
                "is-reachable applies to strings, not {}",
                value.type_name()
            ));
        };
        debug!(url = %s, timeout = ?self.timeout, "probing URL");

        match self.client.get(s).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => CheckResult::pass(),
            Ok(response) => CheckResult::fail(format!(
                "URL '{s}' returned status {}",
                response.status().as_u16()
            )),
            Err(e) if e.is_timeout() => {
                CheckResult::fail(format!("URL '{s}' did not respond within {:?}", self.timeout))
            }
            Err(_) => CheckResult::fail(format!("URL '{s}' could not be reached")),
        }
    }
}

//! Prompt skeletons.
//!
//! The `<prompt>` element of a RAIL document is a template with three kinds
//! of token:
//!
//! - `{output_schema}`: replaced by the serialized schema markup
//! - `{variable}`: replaced from caller-supplied prompt parameters
//! - `@macro`: expanded to a fixed instructional boilerplate block
//!
//! Unknown tokens are left verbatim with a warning, so a stray brace in prose
//! never breaks a call.

use std::collections::HashMap;

use tracing::warn;

/// Fixed boilerplate asking for a complete JSON document matching the schema.
pub const COMPLETE_JSON_SUFFIX: &str = "\
Return ONLY a valid JSON object that matches the XML description above. \
Every field name in the JSON must come from a `name` attribute, and every \
value must satisfy the element's type and format constraints. If a field is \
marked required=\"false\" and you have no answer for it, use the value \
`none`. Do not include any text outside the JSON object.";

/// Shorter variant: JSON output, no completeness demand.
pub const JSON_SUFFIX: &str =
    "Return the answer as a JSON object matching the XML description above.";

/// Boilerplate introducing the schema markup.
pub const XML_PREFIX: &str =
    "Given below is an XML description of the information to return.";

/// Template for a reask round. `{previous_response}` is the offending values
/// with their error messages; `{output_schema}` is the pruned schema markup.
const REASK_TEMPLATE: &str = "\
Your previous response was not satisfactory. Below are the values that failed \
validation, each with the error that explains what was wrong:

{previous_response}

Generate corrected values for ONLY the fields described here:

{output_schema}

@complete_json_suffix";

const MACROS: &[(&str, &str)] = &[
    ("complete_json_suffix", COMPLETE_JSON_SUFFIX),
    ("json_suffix", JSON_SUFFIX),
    ("xml_prefix", XML_PREFIX),
];

/// A prompt template owned by a guard, rendered once per round.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSkeleton {
    template: String,
}

impl PromptSkeleton {
    /// Create a skeleton from template text.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The raw template text.
    pub fn source(&self) -> &str {
        &self.template
    }

    /// Render the template: macros first, then the schema, then variables.
    pub fn render(&self, schema_text: &str, vars: &HashMap<String, String>) -> String {
        let mut out = self.template.clone();

        for (name, expansion) in MACROS {
            out = out.replace(&format!("@{name}"), expansion);
        }

        out = out.replace("{output_schema}", schema_text);

        for (name, value) in vars {
            out = out.replace(&format!("{{{name}}}"), value);
        }

        if let Some(start) = find_unresolved(&out) {
            warn!(token = %start, "prompt still contains an unresolved placeholder");
        }

        out
    }
}

impl Default for PromptSkeleton {
    /// Skeleton used when a RAIL document declares no `<prompt>`.
    fn default() -> Self {
        Self::new("@xml_prefix\n\n{output_schema}\n\n@complete_json_suffix")
    }
}

/// Build the prompt for a reask round.
pub fn reask_prompt(previous_response: &str, schema_text: &str) -> String {
    PromptSkeleton::new(REASK_TEMPLATE).render(schema_text, &{
        let mut vars = HashMap::new();
        vars.insert("previous_response".to_string(), previous_response.to_string());
        vars
    })
}

// First `{word}` token left in the rendered text, if any.
fn find_unresolved(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let rest = &text[start + 1..];
    let end = rest.find('}')?;
    let token = &rest[..end];
    if !token.is_empty() && token.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some(token.to_string())
    } else {
        None
    }
}

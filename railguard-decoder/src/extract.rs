//! Finding the structured document inside raw model text.

use serde_json::Value as JsonValue;

use railguard_core::DecodeError;

/// Extract the JSON document from raw generation text.
///
/// Tried in order: markdown-fenced block, strict parse of the whole text,
/// boundary scan from the first `{` to its matching `}`, then the same for
/// `[`/`]`. Leading and trailing prose around the document is discarded.
pub fn extract_json(raw: &str) -> Result<JsonValue, DecodeError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(DecodeError::unparsable("empty output"));
    }

    if let Some(json) = fenced_block(text).and_then(|block| parse(block)) {
        return Ok(json);
    }

    if let Some(json) = parse(text) {
        return Ok(json);
    }

    if let Some(json) = balanced_span(text, '{', '}').and_then(|span| parse(span)) {
        return Ok(json);
    }

    if let Some(json) = balanced_span(text, '[', ']').and_then(|span| parse(span)) {
        return Ok(json);
    }

    Err(DecodeError::unparsable(
        "no JSON object or array found in output",
    ))
}

fn parse(text: &str) -> Option<JsonValue> {
    serde_json::from_str(text).ok()
}

/// Content of the first markdown code fence, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// The span from the first `open` to its matching `close`, respecting JSON
/// string literals and escapes.
fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn strict_json_parses_directly() {
        let json = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(json, json!({"a": 1}));
    }

    #[test]
    fn prose_around_the_object_is_stripped() {
        let raw = r#"Of course! The answer is {"a": [1, 2], "b": "x"} — let me know."#;
        let json = extract_json(raw).unwrap();
        assert_eq!(json, json!({"a": [1, 2], "b": "x"}));
    }

    #[test]
    fn fenced_block_wins_over_boundary_scan() {
        let raw = "Here it is:\n```json\n{\"a\": 1}\n```\nAnd some trailing { noise";
        let json = extract_json(raw).unwrap();
        assert_eq!(json, json!({"a": 1}));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let raw = r#"Answer: {"code": "if (x) { return y; }", "ok": true} done"#;
        let json = extract_json(raw).unwrap();
        assert_eq!(json["ok"], json!(true));
    }

    #[test]
    fn escaped_quotes_are_respected() {
        let raw = r#"{"msg": "she said \"hi\""}"#;
        let json = extract_json(raw).unwrap();
        assert_eq!(json["msg"], json!(r#"she said "hi""#));
    }

    #[test]
    fn top_level_array_is_found() {
        let raw = "The list: [1, 2, 3].";
        let json = extract_json(raw).unwrap();
        assert_eq!(json, json!([1, 2, 3]));
    }

    #[test]
    fn pure_prose_is_unparsable() {
        assert!(extract_json("no structure here at all").is_err());
        assert!(extract_json("").is_err());
        assert!(extract_json("{ broken json").is_err());
    }
}

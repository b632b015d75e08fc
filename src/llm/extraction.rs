//! JSON extraction from model responses.
//!
//! Models asked for JSON frequently wrap it in markdown code fences or
//! surround it with prose. Extraction tries, in order: direct parse,
//! fenced code block, bracket-matched object or array anywhere in the
//! content.

use regex::Regex;
use serde_json::Value;

use crate::error::LlmError;

/// Extracts and parses the first JSON payload found in `content`.
pub fn extract_json(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Ok(value);
        }
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Ok(value);
        }
    }

    if let Some(span) = bracket_matched(trimmed) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    let preview: String = trimmed.chars().take(50).collect();
    Err(LlmError::ParseError(format!(
        "No JSON content found in response starting with: '{preview}'"
    )))
}

/// Content of the first ```json or generic ``` fence, if any.
fn fenced_block(content: &str) -> Option<&str> {
    // Non-greedy body so multiple fences each match separately.
    let fence = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok()?;
    fence
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The first brace- or bracket-balanced span in the content.
///
/// Tracks string literals and escapes so braces inside strings do not
/// unbalance the scan.
fn bracket_matched(content: &str) -> Option<&str> {
    let start = content.find(['{', '['])?;
    let bytes = content.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + 1]);
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
    use serde_json::json;

    #[test]
    fn test_direct_json() {
        let value = extract_json(r#"{"title": "Space Trivia"}"#).expect("direct parse");
        assert_eq!(value["title"], "Space Trivia");
    }

    #[test]
    fn test_direct_array() {
        let value = extract_json("[1, 2, 3]").expect("array parse");
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn test_fenced_block() {
        let content = "Here you go:\n```json\n{\"topics\": [\"mars\"]}\n```\nEnjoy!";
        let value = extract_json(content).expect("fenced parse");
        assert_eq!(value["topics"][0], "mars");
    }

    #[test]
    fn test_generic_fence() {
        let content = "```\n{\"a\": 1}\n```";
        let value = extract_json(content).expect("generic fence");
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_embedded_object() {
        let content = "The result is {\"count\": 5} as requested.";
        let value = extract_json(content).expect("embedded parse");
        assert_eq!(value["count"], 5);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let content = r#"Answer: {"text": "use { and } carefully", "n": 1} done"#;
        let value = extract_json(content).expect("string-aware parse");
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_no_json_is_an_error() {
        let err = extract_json("no structured content here").expect_err("not found");
        assert!(matches!(err, LlmError::ParseError(_)));
    }

    #[test]
    fn test_truncated_json_is_an_error() {
        assert!(extract_json(r#"{"unclosed": ["#).is_err());
    }
}

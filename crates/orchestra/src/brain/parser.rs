//! JSON extraction from free-form model output

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid fence regex"));

static OBJECT_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid object regex"));

/// Parse JSON from model text: whole reply, then a fenced block, then the
/// outermost `{...}` span.
pub fn extract_json(raw: &str) -> Option<Value> {
    let raw = raw.trim();

    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    if let Some(block) = FENCED_BLOCK.captures(raw).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str(block.as_str().trim()) {
            return Some(value);
        }
    }

    OBJECT_SPAN
        .find(raw)
        .and_then(|m| serde_json::from_str(m.as_str()).ok())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_direct_json() {
        assert_eq!(extract_json(r#" {"a": 1} "#), Some(json!({"a": 1})));
    }

    #[test]
    fn test_fenced_json() {
        let raw = "Here you go:\n```json\n{\"agents\": []}\n```\nThanks";
        assert_eq!(extract_json(raw), Some(json!({"agents": []})));
    }

    #[test]
    fn test_embedded_object() {
        let raw = "Sure! {\"summary\": \"done\"} Let me know.";
        assert_eq!(extract_json(raw), Some(json!({"summary": "done"})));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json("no structured content here"), None);
        assert_eq!(extract_json("{ broken"), None);
    }
}

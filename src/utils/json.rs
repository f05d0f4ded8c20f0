//! Tolerant JSON extraction for LLM responses.
//!
//! Model output is treated as potentially malformed: responses arrive
//! wrapped in code fences, prefixed with prose, or truncated. Callers get a
//! safe fallback instead of a parse error.

use serde_json::{Map, Value};

/// Extract the first JSON object found in a string.
///
/// Passes, in order:
/// 1. scan for the first balanced `{...}` span and parse it;
/// 2. strip code-fence wrappers and strict-parse the remainder;
/// 3. give up and return `None`.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(obj) = find_balanced_object(text) {
        return Some(obj);
    }

    let stripped = strip_code_fences(text);
    match serde_json::from_str::<Value>(stripped.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Extract a JSON object whose values are coerced to strings.
///
/// Non-string scalar values are rendered with `to_string`; nested arrays and
/// objects are serialized compactly. Null becomes the empty string.
pub fn extract_string_map(text: &str) -> Option<Vec<(String, String)>> {
    let obj = extract_json_object(text)?;
    let mut out = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        let text_value = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => serde_json::to_string(&other).unwrap_or_default(),
        };
        out.push((key, text_value));
    }
    Some(out)
}

/// Scan for the first balanced top-level object, honoring string escapes.
fn find_balanced_object(text: &str) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..=i];
                    if let Ok(Value::Object(map)) = serde_json::from_str(candidate) {
                        return Some(map);
                    }
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove markdown code-fence wrappers (```json ... ``` or ``` ... ```).
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let map = extract_json_object(r#"{"amenities": "Pool, Spa"}"#).unwrap();
        assert_eq!(map["amenities"], "Pool, Spa");
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let map =
            extract_json_object(r#"Here is the data: {"faq": "Q: Pets? A: Yes."} Hope it helps!"#)
                .unwrap();
        assert_eq!(map["faq"], "Q: Pets? A: Yes.");
    }

    #[test]
    fn test_fenced_object() {
        let text = "```json\n{\"policies\": \"No smoking\"}\n```";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["policies"], "No smoking");
    }

    #[test]
    fn test_braces_inside_strings() {
        let map = extract_json_object(r#"{"other": "use {curly} freely"}"#).unwrap();
        assert_eq!(map["other"], "use {curly} freely");
    }

    #[test]
    fn test_garbage_returns_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{broken: ").is_none());
        assert!(extract_json_object("").is_none());
    }

    #[test]
    fn test_array_is_not_an_object() {
        assert!(extract_json_object(r#"["a", "b"]"#).is_none());
    }

    #[test]
    fn test_string_map_coerces_scalars() {
        let pairs = extract_string_map(r#"{"a": "x", "b": 3, "c": null, "d": true}"#).unwrap();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("a"), Some("x"));
        assert_eq!(get("b"), Some("3"));
        assert_eq!(get("c"), Some(""));
        assert_eq!(get("d"), Some("true"));
    }
}

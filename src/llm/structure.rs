//! Structuring of the free-form `other` field into flat JSON.

use serde_json::{Map, Value};
use tracing::warn;

use super::client::LlmClient;
use super::prompts::{build_structure_prompt, STRUCTURE_SYSTEM};
use crate::utils::json::extract_json_object;

/// Maximum response tokens for structuring calls.
pub const STRUCTURE_MAX_TOKENS: u32 = 40960;

/// Convert free-form `other` text into a flat snake_case JSON object,
/// serialized. Falls back to `"{}"` on any failure.
pub async fn structure_other(client: &LlmClient, text: &str) -> String {
    if text.trim().is_empty() {
        return "{}".to_string();
    }

    let prompt = build_structure_prompt(text);
    let raw = match client
        .complete(STRUCTURE_SYSTEM, &prompt, STRUCTURE_MAX_TOKENS)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "other-field structuring unavailable");
            return "{}".to_string();
        }
    };

    serde_json::to_string(&Value::Object(parse_flat_object(&raw))).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a structuring response into a flat object with snake_case keys.
///
/// Keys are normalized defensively even though the prompt demands
/// snake_case; nested values are flattened to their compact serialization.
pub fn parse_flat_object(raw: &str) -> Map<String, Value> {
    let Some(obj) = extract_json_object(raw) else {
        return Map::new();
    };
    let mut out = Map::new();
    for (key, value) in obj {
        let key = snake_case(&key);
        if key.is_empty() {
            continue;
        }
        let flat = match value {
            Value::String(s) => Value::String(s),
            Value::Null => continue,
            Value::Bool(b) => Value::String(b.to_string()),
            Value::Number(n) => Value::String(n.to_string()),
            other => Value::String(serde_json::to_string(&other).unwrap_or_default()),
        };
        out.insert(key, flat);
    }
    out
}

/// Lowercase and collapse non-alphanumeric runs to underscores.
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last_was_sep = true;
    for c in key.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

//! Merge adjudication: decide whether a refined value meaningfully updates
//! the stored one.
//!
//! The decision is a pure function of `(existing, candidate)` with the LLM
//! as an oracle for the one genuinely ambiguous case. Every degenerate case
//! is settled deterministically, and any oracle failure falls back to
//! keeping the existing text.

use serde_json::Value;
use tracing::warn;

use super::client::LlmClient;
use super::prompts::{build_merge_prompt, MERGE_SYSTEM};
use crate::utils::json::extract_json_object;

/// Maximum response tokens for adjudication calls.
pub const MERGE_MAX_TOKENS: u32 = 40960;

/// Outcome of one field's adjudication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDecision {
    pub is_update: bool,
    pub merged_text: String,
}

impl MergeDecision {
    fn keep(existing: &str) -> Self {
        Self {
            is_update: false,
            merged_text: existing.to_string(),
        }
    }
}

/// The deterministic fall-throughs, applied before any LLM call:
/// blank candidate or trimmed equality keep the existing text.
pub fn decide_without_llm(existing: &str, candidate: &str) -> Option<MergeDecision> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Some(MergeDecision::keep(existing));
    }
    if existing.trim() == candidate {
        return Some(MergeDecision::keep(existing));
    }
    None
}

/// Adjudicate one field.
///
/// Conservative by construction: when the oracle is unreachable or its
/// answer does not fit the required shape, the existing text stands.
pub async fn adjudicate(
    client: &LlmClient,
    field: &str,
    existing: &str,
    candidate: &str,
) -> MergeDecision {
    if let Some(decision) = decide_without_llm(existing, candidate) {
        return decision;
    }

    let prompt = build_merge_prompt(field, existing, candidate);
    let raw = match client.complete(MERGE_SYSTEM, &prompt, MERGE_MAX_TOKENS).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(field, error = %e, "merge adjudication unavailable, keeping existing text");
            return MergeDecision::keep(existing);
        }
    };

    parse_decision(&raw, existing)
}

/// Parse `{isUpdate, mergedText}`; anything else keeps the existing text.
pub fn parse_decision(raw: &str, existing: &str) -> MergeDecision {
    let Some(obj) = extract_json_object(raw) else {
        return MergeDecision::keep(existing);
    };
    let Some(&Value::Bool(is_update)) = obj.get("isUpdate") else {
        return MergeDecision::keep(existing);
    };
    if !is_update {
        return MergeDecision::keep(existing);
    }
    match obj.get("mergedText") {
        Some(Value::String(text)) if !text.trim().is_empty() => MergeDecision {
            is_update: true,
            merged_text: text.trim().to_string(),
        },
        _ => MergeDecision::keep(existing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_candidate_keeps_existing() {
        let decision = decide_without_llm("existing", "").unwrap();
        assert!(!decision.is_update);
        assert_eq!(decision.merged_text, "existing");

        let decision = decide_without_llm("existing", "   \n ").unwrap();
        assert!(!decision.is_update);
    }

    #[test]
    fn test_equal_texts_keep_existing() {
        let decision = decide_without_llm("rooms from $199", "  rooms from $199  ").unwrap();
        assert!(!decision.is_update);
        assert_eq!(decision.merged_text, "rooms from $199");
    }

    #[test]
    fn test_different_texts_need_the_oracle() {
        assert!(decide_without_llm("rooms from $199", "rooms from $229").is_none());
        // A fresh field with no existing text is also a real decision.
        assert!(decide_without_llm("", "rooms from $199").is_none());
    }

    #[test]
    fn test_parse_decision_update() {
        let decision = parse_decision(
            r#"{"isUpdate": true, "mergedText": "rooms from $229"}"#,
            "rooms from $199",
        );
        assert!(decision.is_update);
        assert_eq!(decision.merged_text, "rooms from $229");
    }

    #[test]
    fn test_parse_decision_no_update() {
        let decision = parse_decision(
            r#"{"isUpdate": false, "mergedText": "whatever"}"#,
            "rooms from $199",
        );
        assert!(!decision.is_update);
        assert_eq!(decision.merged_text, "rooms from $199");
    }

    #[test]
    fn test_malformed_responses_keep_existing() {
        for raw in [
            "not json at all",
            r#"{"isUpdate": "yes"}"#,
            r#"{"mergedText": "no verdict"}"#,
            r#"{"isUpdate": true}"#,
            r#"{"isUpdate": true, "mergedText": ""}"#,
        ] {
            let decision = parse_decision(raw, "existing");
            assert!(!decision.is_update, "raw: {raw}");
            assert_eq!(decision.merged_text, "existing");
        }
    }
}

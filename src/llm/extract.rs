//! Per-page category extraction: one LLM call per changed page.

use std::collections::HashMap;

use tracing::debug;

use super::client::{LlmClient, LlmError};
use super::prompts::{build_extract_prompt, EXTRACT_SYSTEM};
use crate::models::find_category;
use crate::utils::json::extract_string_map;

/// Maximum response tokens for extraction calls.
pub const EXTRACT_MAX_TOKENS: u32 = 6144;

/// Extract the partial category map for one page.
///
/// An unparseable response yields the empty map, never an error; transport
/// failures bubble so the caller can log and skip the page.
pub async fn extract_page(
    client: &LlmClient,
    hotel_name: &str,
    page_url: &str,
    markdown: &str,
) -> Result<HashMap<String, String>, LlmError> {
    let prompt = build_extract_prompt(hotel_name, page_url, markdown);
    let raw = client.complete(EXTRACT_SYSTEM, &prompt, EXTRACT_MAX_TOKENS).await?;
    let map = parse_category_map(&raw);
    debug!(
        page_url,
        categories = map.len(),
        "extracted page categories"
    );
    Ok(map)
}

/// Parse an extractor response into category → value.
///
/// Keys outside the category schema are dropped; values are trimmed; empty
/// values are kept out of the map (empty string means "not on this page").
pub fn parse_category_map(raw: &str) -> HashMap<String, String> {
    let Some(pairs) = extract_string_map(raw) else {
        return HashMap::new();
    };
    pairs
        .into_iter()
        .filter(|(key, _)| find_category(key).is_some())
        .map(|(key, value)| (key, value.trim().to_string()))
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

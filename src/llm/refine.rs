//! Per-field refinement: consolidate one category's snippet bucket into a
//! single field value.

use tracing::debug;

use super::client::{LlmClient, LlmError};
use super::prompts::{build_refine_prompt, REFINE_SYSTEM};
use crate::models::Category;

/// Maximum response tokens for refinement calls.
pub const REFINE_MAX_TOKENS: u32 = 10240;

/// Consolidate the snippets gathered for one category.
///
/// An empty bucket short-circuits to `""` without an LLM call.
pub async fn refine_field(
    client: &LlmClient,
    category: &Category,
    hotel_name: &str,
    snippets: &[(String, String)],
) -> Result<String, LlmError> {
    if snippets.iter().all(|(_, text)| text.trim().is_empty()) {
        return Ok(String::new());
    }

    let prompt = build_refine_prompt(category, hotel_name, snippets);
    let raw = client.complete(REFINE_SYSTEM, &prompt, REFINE_MAX_TOKENS).await?;
    let refined = raw.trim().to_string();
    debug!(
        category = category.name,
        snippets = snippets.len(),
        chars = refined.len(),
        "refined field"
    );
    Ok(refined)
}

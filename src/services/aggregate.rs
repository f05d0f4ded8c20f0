//! The `aggregate` entry point: distill changed pages into the hotel's
//! market-data record.
//!
//! Pipeline per hotel: list dirty pages, extract each into per-category
//! buckets, refine each bucket into one field value, adjudicate against the
//! existing record, then upsert only the fields that survived. A page-level
//! failure is logged and skipped; it never aborts the hotel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::{require_hotel_id, AppContext};
use crate::llm::extract::extract_page;
use crate::llm::merge::adjudicate;
use crate::llm::refine::refine_field;
use crate::llm::structure::structure_other;
use crate::llm::{LlmClient, LlmConfig};
use crate::models::{categories, OTHER_CATEGORY, OTHER_STRUCTURED_COLUMN};

/// Bound on concurrent LLM requests; provider rate limits make a small cap
/// prudent.
const LLM_CONCURRENCY: usize = 4;

/// Values the extractor occasionally emits that mean "nothing found".
const NOT_AVAILABLE: &[&str] = &["n/a", "na", "none", "not available"];

/// Summary of one aggregation run.
#[derive(Debug, Default)]
pub struct AggregateReport {
    pub dirty_pages: usize,
    pub extracted_pages: usize,
    pub refined_fields: usize,
    pub updated_fields: usize,
    pub wrote_record: bool,
}

/// Consolidate every dirty page of `hotel_id` into its market-data record.
pub async fn aggregate(ctx: &AppContext, hotel_id: &str, hotel_name: &str) -> Result<AggregateReport> {
    require_hotel_id(hotel_id)?;

    let dirty = ctx
        .pages
        .dirty_pages(hotel_id)
        .context("failed to list dirty pages")?;
    if dirty.is_empty() {
        info!(hotel_id, hotel_name, "no changed pages, skipping aggregation");
        return Ok(AggregateReport::default());
    }

    let client = Arc::new(LlmClient::new(LlmConfig::from_env(
        ctx.config.crawler.max_retries,
    )?));
    let mut report = AggregateReport {
        dirty_pages: dirty.len(),
        ..Default::default()
    };

    info!(
        hotel_id,
        hotel_name,
        pages = dirty.len(),
        "extracting changed pages"
    );

    // Stage 1: per-page extraction, bounded fan-out, results in crawl order
    // so bucket order is deterministic.
    let extractions: Vec<_> = stream::iter(dirty.iter())
        .map(|page| {
            let client = client.clone();
            async move {
                let result = extract_page(&client, hotel_name, &page.page_url, &page.markdown).await;
                (page, result)
            }
        })
        .buffered(LLM_CONCURRENCY)
        .collect()
        .await;

    let mut buckets: HashMap<&'static str, Vec<(String, String)>> = HashMap::new();
    for (page, result) in extractions {
        let map = match result {
            Ok(map) => map,
            Err(e) => {
                warn!(page_url = %page.page_url, error = %e, "page extraction failed, skipping page");
                continue;
            }
        };
        // Mark consumption even when the map is empty: the page was read at
        // this checksum and must leave the dirty set.
        let serialized = serde_json::to_string(&map.iter().collect::<BTreeMap<_, _>>())
            .unwrap_or_else(|_| "{}".to_string());
        if let Err(e) =
            ctx.pages
                .mark_llm_consumed(hotel_id, &page.page_url, &page.checksum, &serialized)
        {
            warn!(page_url = %page.page_url, error = %e, "failed to record extraction state");
        }
        report.extracted_pages += 1;

        for cat in categories() {
            if let Some(value) = map.get(cat.name) {
                buckets
                    .entry(cat.name)
                    .or_default()
                    .push((page.page_url.clone(), value.clone()));
            }
        }
    }

    // Stage 2: per-field refinement; fields are independent and run with the
    // same bounded fan-out. Empty buckets short-circuit inside refine_field.
    let refined: Vec<(&'static str, String)> = stream::iter(categories().iter())
        .map(|cat| {
            let client = client.clone();
            let snippets = buckets.get(cat.name).cloned().unwrap_or_default();
            async move {
                match refine_field(&client, cat, hotel_name, &snippets).await {
                    Ok(text) => (cat.name, text),
                    Err(e) => {
                        warn!(category = cat.name, error = %e, "field refinement failed, skipping field");
                        (cat.name, String::new())
                    }
                }
            }
        })
        .buffered(LLM_CONCURRENCY)
        .collect()
        .await;
    report.refined_fields = refined.iter().filter(|(_, v)| !v.is_empty()).count();

    // Stage 3: adjudicate against the existing record; all refinement is
    // complete before this barrier.
    let existing = ctx
        .market
        .get(hotel_id)
        .context("failed to load market-data record")?;
    let mut updates: HashMap<String, String> = match existing {
        None => first_record_updates(&refined),
        Some(record) => {
            stream::iter(refined.iter())
                .map(|(name, candidate)| {
                    let client = client.clone();
                    let existing_text = record.get(name).to_string();
                    async move {
                        let decision = adjudicate(&client, name, &existing_text, candidate).await;
                        (*name, decision)
                    }
                })
                .buffered(LLM_CONCURRENCY)
                .collect::<Vec<_>>()
                .await
                .into_iter()
                .filter(|(_, decision)| decision.is_update)
                .map(|(name, decision)| (name.to_string(), decision.merged_text))
                .collect()
        }
    };
    report.updated_fields = updates.len();

    // Derive the structured form whenever `other` changed.
    if let Some(other_text) = updates.get(OTHER_CATEGORY).cloned() {
        let structured = structure_other(&client, &other_text).await;
        updates.insert(OTHER_STRUCTURED_COLUMN.to_string(), structured);
    }

    if updates.is_empty() {
        info!(hotel_id, hotel_name, "no market-data changes");
        return Ok(report);
    }

    ctx.market
        .upsert(hotel_id, &updates)
        .context("failed to write market-data record")?;
    report.wrote_record = true;
    info!(
        hotel_id,
        hotel_name,
        fields = updates.len(),
        "market-data record updated"
    );
    Ok(report)
}

/// With no existing record, the refined map itself becomes the update,
/// filtered down to meaningful values.
fn first_record_updates(refined: &[(&'static str, String)]) -> HashMap<String, String> {
    refined
        .iter()
        .filter(|(_, value)| {
            let v = value.trim();
            !v.is_empty() && !NOT_AVAILABLE.contains(&v.to_ascii_lowercase().as_str())
        })
        .map(|(name, value)| (name.to_string(), value.trim().to_string()))
        .collect()
}

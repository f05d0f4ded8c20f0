//! Page-store lifecycle tests.
//!
//! Exercises the persistence half of the pipeline end-to-end on a temporary
//! database: crawl bookkeeping, change detection, the dirty set, and the
//! closed market-data schema. Browser and LLM stages are covered by their
//! own unit tests; everything here is deterministic.

use std::collections::{HashMap, HashSet};

use hotelintel::llm::merge::decide_without_llm;
use hotelintel::models::{category_names, PageSnapshot};
use hotelintel::repository::{MarketDataRepository, PageRepository};
use hotelintel::utils::hash::content_checksum;

fn snapshot(url: &str, markdown: &str, depth: u32) -> PageSnapshot {
    PageSnapshot::new(
        url.to_string(),
        format!("<html><body>{markdown}</body></html>"),
        format!("<body>{markdown}</body>"),
        markdown.to_string(),
        depth,
    )
}

#[test]
fn fresh_hotel_then_rescrape_then_retire() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("hotelintel.db");
    let pages = PageRepository::new(&db, "hotel_page_data").unwrap();

    // First crawl: two pages.
    let home = snapshot("https://seaside.test/", "# Seaside Inn\n\nOcean-view rooms from $199.", 0);
    let rooms = snapshot("https://seaside.test/rooms", "## Rooms\n\n- King\n- Double", 1);
    assert!(pages.upsert_snapshot("h1", &home).unwrap().created);
    assert!(pages.upsert_snapshot("h1", &rooms).unwrap().created);

    // Both pages are dirty (never extracted) and active.
    let dirty = pages.dirty_pages("h1").unwrap();
    assert_eq!(dirty.len(), 2);
    assert!(dirty.iter().all(|p| p.active));
    assert_eq!(
        dirty[0].checksum,
        content_checksum(&dirty[0].markdown),
        "stored checksum matches the content identity function"
    );

    // Extraction consumes both pages; the dirty set drains.
    for page in &dirty {
        pages
            .mark_llm_consumed("h1", &page.page_url, &page.checksum, "{}")
            .unwrap();
    }
    assert!(pages.dirty_pages("h1").unwrap().is_empty());

    // Idempotent re-crawl: identical content leaves the dirty set empty.
    pages.upsert_snapshot("h1", &home).unwrap();
    pages.upsert_snapshot("h1", &rooms).unwrap();
    assert!(pages.dirty_pages("h1").unwrap().is_empty());

    // Content drift: one page changes, only it becomes dirty again.
    let drifted = snapshot("https://seaside.test/", "# Seaside Inn\n\nOcean-view rooms from $229.", 0);
    let outcome = pages.upsert_snapshot("h1", &drifted).unwrap();
    assert!(outcome.checksum_changed);
    let dirty = pages.dirty_pages("h1").unwrap();
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty[0].page_url, "https://seaside.test/");
    assert!(dirty[0].is_checksum_updated);
    assert!(dirty[0]
        .markdown_prev
        .as_deref()
        .unwrap()
        .contains("$199"));

    // Page retired: the next crawl only sees the homepage.
    let visited: HashSet<String> = ["https://seaside.test/".to_string()].into_iter().collect();
    assert_eq!(pages.deactivate_missing("h1", &visited).unwrap(), 1);
    let active = pages.active_urls("h1").unwrap();
    assert_eq!(active, vec!["https://seaside.test/"]);

    // The retired page keeps its contents and leaves the dirty set.
    let retired = pages.get("h1", "https://seaside.test/rooms").unwrap().unwrap();
    assert!(!retired.active);
    assert!(retired.markdown.contains("King"));
    assert_eq!(pages.dirty_pages("h1").unwrap().len(), 1);
}

#[test]
fn market_record_respects_closed_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("hotelintel.db");
    let market = MarketDataRepository::new(&db, "market_data").unwrap();

    // Fresh hotel: only the extracted field is written.
    let mut updates = HashMap::new();
    updates.insert(
        "guest_rooms".to_string(),
        "Ocean-view rooms from $199.".to_string(),
    );
    updates.insert("__proto__".to_string(), "nope".to_string());
    market.upsert("h1", &updates).unwrap();

    let record = market.get("h1").unwrap().unwrap();
    assert_eq!(record.get("guest_rooms"), "Ocean-view rooms from $199.");
    assert!(record
        .fields
        .keys()
        .all(|k| category_names().any(|c| c == k) || k == "other_structured"));

    // A later partial update never clobbers untouched fields.
    let mut updates = HashMap::new();
    updates.insert("guest_rooms".to_string(), "Ocean-view rooms from $229.".to_string());
    market.upsert("h1", &updates).unwrap();
    let record = market.get("h1").unwrap().unwrap();
    assert_eq!(record.get("guest_rooms"), "Ocean-view rooms from $229.");
}

#[test]
fn adjudication_short_circuits_without_changes() {
    // Blank candidates and unchanged text never need the LLM: rerunning
    // aggregation over unchanged refinements produces zero updates.
    let existing = "Ocean-view rooms from $199.";
    let decision = decide_without_llm(existing, existing).unwrap();
    assert!(!decision.is_update);
    let decision = decide_without_llm(existing, "").unwrap();
    assert!(!decision.is_update);
    assert_eq!(decision.merged_text, existing);
}

#[test]
fn table_names_from_environment_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("hotelintel.db");
    assert!(PageRepository::new(&db, "custom_pages_v2").is_ok());
    assert!(PageRepository::new(&db, "pages; DROP TABLE x").is_err());
    assert!(MarketDataRepository::new(&db, "").is_err());
}

//! The `scrape` entry point: crawl one hotel's site into the page store.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::{require_hotel_id, require_hotel_url, AppContext};
use crate::scrapers::{CrawlReport, Crawler, HotelBrowser};

/// Crawl `hotel_url` and persist every reachable page for `hotel_id`.
///
/// The browser is crawler-local: launched here, closed before returning.
/// All scraping for the hotel completes before `aggregate` may run.
pub async fn scrape(
    ctx: &AppContext,
    hotel_url: &str,
    hotel_id: &str,
    hotel_name: &str,
) -> Result<CrawlReport> {
    require_hotel_id(hotel_id)?;
    require_hotel_url(hotel_url)?;

    info!(hotel_id, hotel_name, hotel_url, "scraping hotel site");

    let browser = Arc::new(HotelBrowser::launch().await?);
    let crawler = Crawler::new(browser.clone(), ctx.pages.clone(), ctx.config.crawler.clone());
    let result = crawler.crawl(hotel_id, hotel_url).await;
    drop(crawler);

    if let Ok(browser) = Arc::try_unwrap(browser) {
        browser.close().await;
    }

    let report = result?;
    info!(
        hotel_id,
        hotel_name,
        pages = report.saved,
        changed = report.changed,
        errors = report.errors,
        deactivated = report.deactivated,
        "scrape finished"
    );
    Ok(report)
}

//! Bounded same-origin BFS crawler.
//!
//! The crawl proceeds level by level; pages within a level are fetched in
//! parallel (each in-flight item owns one browser page), while all
//! bookkeeping (visited set, persistence, frontier growth) happens on the
//! orchestrating task between levels. Redirects are honored: the
//! post-redirect URL is the storage key.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::browser::HotelBrowser;
use super::clean::clean_dom;
use super::markdown::convert_to_markdown;
use super::stabilize::{wait_for_stable_dom, StabilizeParams};
use crate::config::CrawlerConfig;
use crate::models::PageSnapshot;
use crate::repository::PageRepository;

/// Binary asset suffixes that are never enqueued (closed list).
const BLOCKED_EXTENSIONS: &[&str] = &[
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico", ".bmp", ".tif", ".tiff", ".avif",
    // video
    ".mp4", ".webm", ".avi", ".mov", ".mkv", ".wmv",
    // audio
    ".mp3", ".wav", ".ogg", ".m4a", ".aac", ".flac",
    // documents
    ".pdf",
];

/// Maximum lazy-scroll iterations per page.
const MAX_SCROLL_ITERATIONS: usize = 25;
/// Wait between lazy-scroll iterations.
const SCROLL_WAIT: Duration = Duration::from_millis(1500);

/// Collect candidate links from the live DOM before any mutation.
///
/// Anchors inside ad-scoped containers and anchors pointing at search
/// engines are excluded here; scheme, origin, and extension filtering
/// happens on the Rust side.
const LINKS_JS: &str = r#"
(() => {
    const SEARCH_HOSTS = ['google.', 'bing.', 'yahoo.', 'duckduckgo.', 'baidu.', 'yandex.'];
    const AD_TOKENS = ['ad', 'ads', 'advertisement'];
    const tokens = (value) =>
        String(value || '').toLowerCase().split(/[^a-z0-9]+/).filter(Boolean);
    const adScoped = (el) => {
        for (let node = el; node && node.nodeType === Node.ELEMENT_NODE; node = node.parentElement) {
            const parts = tokens(node.id)
                .concat(tokens(typeof node.className === 'string' ? node.className : ''))
                .concat(tokens(node.getAttribute && node.getAttribute('role')));
            if (parts.some((t) => AD_TOKENS.includes(t))) return true;
        }
        return false;
    };
    const out = new Set();
    document.querySelectorAll('a[href]').forEach((a) => {
        const href = a.href;
        if (!href) return;
        let host;
        try { host = new URL(href).hostname.toLowerCase(); } catch (e) { return; }
        if (SEARCH_HOSTS.some((h) => host.includes(h))) return;
        if (adScoped(a)) return;
        out.add(href);
    });
    return Array.from(out);
})()
"#;

/// Result of one hotel crawl.
#[derive(Debug)]
pub struct CrawlReport {
    /// Post-redirect URLs successfully canonicalized and saved.
    pub visited: HashSet<String>,
    /// Pages persisted this run.
    pub saved: usize,
    /// Pages whose checksum changed this run.
    pub changed: usize,
    /// Pages that failed permanently or exhausted retries.
    pub errors: usize,
    /// Previously-known pages deactivated because this run never saw them.
    pub deactivated: usize,
}

/// One successfully canonicalized page plus its outbound link candidates.
struct ScrapedPage {
    snapshot: PageSnapshot,
    links: Vec<String>,
}

/// Same-origin BFS crawler over a shared headless browser.
pub struct Crawler {
    browser: Arc<HotelBrowser>,
    pages: Arc<PageRepository>,
    config: CrawlerConfig,
}

impl Crawler {
    pub fn new(browser: Arc<HotelBrowser>, pages: Arc<PageRepository>, config: CrawlerConfig) -> Self {
        Self {
            browser,
            pages,
            config,
        }
    }

    /// Crawl one hotel site and persist every reachable page.
    ///
    /// On completion, previously-known URLs this run did not visit are
    /// deactivated so the active set mirrors exactly this run's results.
    pub async fn crawl(&self, hotel_id: &str, seed_url: &str) -> Result<CrawlReport> {
        let seed = Url::parse(seed_url).context("invalid seed URL")?;
        anyhow::ensure!(
            matches!(seed.scheme(), "http" | "https"),
            "seed URL must be http(s): {seed_url}"
        );

        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        // `seen` suppresses duplicate fetches of requested/discovered URLs;
        // `visited` holds post-redirect URLs of successfully saved pages.
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut saved = 0usize;
        let mut changed = 0usize;
        let mut errors = 0usize;

        let mut frontier: Vec<(String, u32)> = vec![(seed.to_string(), 0)];
        seen.insert(seed.to_string());

        while !frontier.is_empty() {
            let mut handles = Vec::with_capacity(frontier.len());
            for (url, depth) in frontier.drain(..) {
                if visited.contains(&url) {
                    continue;
                }
                let browser = self.browser.clone();
                let semaphore = semaphore.clone();
                let max_retries = self.config.max_retries;
                handles.push((
                    depth,
                    tokio::spawn(async move {
                        let _permit = semaphore.acquire_owned().await;
                        fetch_page(&browser, &url, depth, timeout, max_retries).await
                    }),
                ));
            }

            let mut next: Vec<(String, u32)> = Vec::new();
            for (depth, handle) in handles {
                let scraped = match handle.await {
                    Ok(Ok(Some(scraped))) => scraped,
                    Ok(Ok(None)) => {
                        errors += 1;
                        continue;
                    }
                    Ok(Err(e)) => {
                        warn!(hotel_id, error = %e, "page scrape failed");
                        errors += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(hotel_id, error = %e, "scrape task panicked");
                        errors += 1;
                        continue;
                    }
                };

                let final_url = scraped.snapshot.url.clone();
                if visited.contains(&final_url) {
                    // A redirect landed on a page saved earlier this run.
                    continue;
                }

                match self.pages.upsert_snapshot(hotel_id, &scraped.snapshot) {
                    Ok(outcome) => {
                        debug!(
                            url = %final_url,
                            depth,
                            created = outcome.created,
                            checksum_changed = outcome.checksum_changed,
                            "saved page"
                        );
                        saved += 1;
                        if outcome.checksum_changed {
                            changed += 1;
                        }
                    }
                    Err(e) => {
                        warn!(url = %final_url, error = %e, "failed to persist page");
                        errors += 1;
                        continue;
                    }
                }
                visited.insert(final_url.clone());
                seen.insert(final_url);

                let within_depth = self
                    .config
                    .max_depth
                    .map_or(true, |max| depth + 1 <= max);
                if !within_depth {
                    continue;
                }
                for link in &scraped.links {
                    if let Some(canonical) = should_enqueue(link, &seed) {
                        if seen.insert(canonical.clone()) {
                            next.push((canonical, depth + 1));
                        }
                    }
                }
            }

            frontier = next;
        }

        let deactivated = self.pages.deactivate_missing(hotel_id, &visited)?;
        info!(
            hotel_id,
            pages = visited.len(),
            changed,
            errors,
            deactivated,
            "crawl complete"
        );

        Ok(CrawlReport {
            visited,
            saved,
            changed,
            errors,
            deactivated,
        })
    }
}

/// Decide whether a discovered link joins the frontier, and in which
/// canonical form. Filters: http(s) scheme, same origin as the seed, not a
/// blocked binary extension. Fragments are stripped so equivalent URLs
/// dedupe.
fn should_enqueue(href: &str, seed: &Url) -> Option<String> {
    let mut url = Url::parse(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.origin() != seed.origin() {
        return None;
    }
    url.set_fragment(None);
    let path = url.path().to_ascii_lowercase();
    if BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }
    Some(url.to_string())
}

/// Fetch one URL with retries for transient browser/network faults.
/// `Ok(None)` is a permanent page failure (HTTP error, error title, empty
/// body) and is not retried.
async fn fetch_page(
    browser: &HotelBrowser,
    url: &str,
    depth: u32,
    timeout: Duration,
    max_retries: u32,
) -> Result<Option<ScrapedPage>> {
    let mut last_error = None;
    for attempt in 0..=max_retries {
        if attempt > 0 {
            debug!(url, attempt, "retrying page");
            tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
        }
        match scrape_once(browser, url, depth, timeout).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => {
                warn!(url, attempt, error = %e, "transient scrape failure");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("scrape failed: {url}")))
}

async fn scrape_once(
    browser: &HotelBrowser,
    url: &str,
    depth: u32,
    timeout: Duration,
) -> Result<Option<ScrapedPage>> {
    let page = browser.new_page().await?;
    let result = drive_page(&page, url, depth, timeout).await;
    // Close the page to prevent tab accumulation.
    let _ = page.close().await;
    result
}

/// The per-URL procedure: navigate, settle, snapshot, canonicalize.
async fn drive_page(
    page: &Page,
    url: &str,
    depth: u32,
    timeout: Duration,
) -> Result<Option<ScrapedPage>> {
    let nav = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| anyhow!("invalid URL {url}: {e}"))?;
    tokio::time::timeout(timeout, page.execute(nav))
        .await
        .map_err(|_| anyhow!("navigation timed out: {url}"))?
        .context("navigation failed")?;

    // Best-effort HTTP status: CDP surfaces it via the navigation response;
    // when unavailable, the title check below is the fallback.
    let status = match tokio::time::timeout(
        Duration::from_secs(10),
        page.wait_for_navigation_response(),
    )
    .await
    {
        Ok(Ok(Some(request))) => request.response.as_ref().map(|r| r.status).unwrap_or(200),
        _ => 200,
    };

    // Wait for the body to exist; failure is non-fatal.
    match tokio::time::timeout(Duration::from_secs(5), page.find_element("body")).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!(url, "body selector not found: {}", e),
        Err(_) => debug!(url, "timeout waiting for body selector"),
    }

    lazy_scroll(page).await;
    wait_for_stable_dom(page, StabilizeParams::for_depth(depth)).await;

    let title: String = page
        .evaluate("document.title".to_string())
        .await
        .ok()
        .and_then(|r| r.into_value().ok())
        .unwrap_or_default();
    if status >= 400 || title.contains("404") || title.contains("500") {
        warn!(url, status, title = %title, "page fetch failure");
        return Ok(None);
    }

    let raw_html = page.content().await.context("failed to read page content")?;
    if raw_html.trim().is_empty() {
        warn!(url, "empty page content");
        return Ok(None);
    }

    // Link candidates come from the live DOM, before cleanup mutates it.
    let links: Vec<String> = page
        .evaluate(LINKS_JS.to_string())
        .await
        .ok()
        .and_then(|r| r.into_value().ok())
        .unwrap_or_default();

    let canonical_html = clean_dom(page, depth).await?;
    let markdown = convert_to_markdown(&canonical_html)?;

    let final_url = page
        .url()
        .await?
        .map(|u| u.to_string())
        .unwrap_or_else(|| url.to_string());

    Ok(Some(ScrapedPage {
        snapshot: PageSnapshot::new(final_url, raw_html, canonical_html, markdown, depth),
        links,
    }))
}

/// Scroll to the bottom until `scrollHeight` stops growing (lazy-loaded
/// sections), then return to the top.
async fn lazy_scroll(page: &Page) {
    const SCROLL_JS: &str = r#"
(() => {
    if (!document.body) return 0;
    window.scrollTo(0, document.body.scrollHeight);
    return document.body.scrollHeight;
})()
"#;
    let mut last_height: i64 = -1;
    for _ in 0..MAX_SCROLL_ITERATIONS {
        let height: i64 = match page.evaluate(SCROLL_JS.to_string()).await {
            Ok(result) => result.into_value().unwrap_or(0),
            Err(e) => {
                debug!("lazy scroll failed: {}", e);
                break;
            }
        };
        if height == last_height {
            break;
        }
        last_height = height;
        tokio::time::sleep(SCROLL_WAIT).await;
    }
    let _ = page.evaluate("window.scrollTo(0, 0)".to_string()).await;
}

//! Headless Chromium driver for page rendering.
//!
//! Uses chromiumoxide (CDP). The browser is launched once per crawl; each
//! in-flight work item opens its own page and closes it when done.

use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tracing::{debug, info};

/// User agent presented to hotel sites.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// A launched headless browser shared by crawl workers.
pub struct HotelBrowser {
    browser: Arc<Browser>,
    handler_task: tokio::task::JoinHandle<()>,
}

impl HotelBrowser {
    /// Find a Chrome/Chromium executable.
    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Install it (e.g. apt install chromium-browser) \
             or download from https://www.google.com/chrome/"
        ))
    }

    /// Launch a headless browser instance.
    pub async fn launch() -> Result<Self> {
        let chrome_path = Self::find_chrome()?;
        info!("Launching browser (headless)");

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler_task,
        })
    }

    /// Open a fresh page with the standard user agent applied.
    pub async fn new_page(&self) -> Result<Page> {
        let page = self.browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await?;
        Ok(page)
    }

    /// Shut the browser down, aborting the CDP event handler.
    pub async fn close(self) {
        // Browser::drop kills the child process; the handler task ends with it.
        drop(self.browser);
        self.handler_task.abort();
    }
}

//! Runtime configuration.
//!
//! Defaults follow the external contract; every knob can be overridden
//! through the environment. `.env` files are loaded by `main` before this
//! module is consulted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default page-artifact table name.
pub const DEFAULT_PAGE_TABLE: &str = "hotel_page_data";
/// Default market-data table name.
pub const DEFAULT_MARKET_TABLE: &str = "market_data";
/// Database filename inside the data directory.
const DATABASE_FILENAME: &str = "hotelintel.db";

/// Crawler tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum BFS depth; `None` means unlimited.
    #[serde(default)]
    pub max_depth: Option<u32>,
    /// Concurrent in-flight pages within one hotel.
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    /// Retries for transient navigation faults.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_concurrency() -> usize {
    3
}

fn default_retries() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_concurrency: default_concurrency(),
            max_retries: default_retries(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl CrawlerConfig {
    /// Apply environment variable overrides.
    ///
    /// `CRAWLER_MAX_DEPTH` unset or non-numeric means unlimited.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CRAWLER_MAX_DEPTH") {
            self.max_depth = val.trim().parse().ok();
        }
        if let Ok(val) = std::env::var("CRAWLER_MAX_CONCURRENCY") {
            if let Ok(n) = val.trim().parse() {
                self.max_concurrency = n;
            }
        }
        if let Ok(val) = std::env::var("CRAWLER_MAX_RETRIES") {
            if let Ok(n) = val.trim().parse() {
                self.max_retries = n;
            }
        }
        if let Ok(val) = std::env::var("CRAWLER_TIMEOUT_SECS") {
            if let Ok(n) = val.trim().parse() {
                self.request_timeout_secs = n;
            }
        }
        self
    }
}

/// Process-wide configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory holding the SQLite database.
    pub data_dir: PathBuf,
    /// Page-artifact table name.
    pub page_table: String,
    /// Market-data table name.
    pub market_table: String,
    pub crawler: CrawlerConfig,
    /// Perplexity API credential; LLM stages are unavailable without it.
    pub perplexity_api_key: Option<String>,
}

impl Config {
    /// Build configuration from the environment.
    pub fn from_env(data_dir: &Path) -> Self {
        let page_table = std::env::var("HOTEL_PAGE_DATA_TABLE")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PAGE_TABLE.to_string());
        let market_table = std::env::var("MARKET_DATA_TABLE")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MARKET_TABLE.to_string());

        Self {
            data_dir: data_dir.to_path_buf(),
            page_table,
            market_table,
            crawler: CrawlerConfig::default().with_env_overrides(),
            perplexity_api_key: std::env::var("PERPLEXITY_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILENAME)
    }
}

/// True when `NODE_ENV=development` requests verbose debug logging.
pub fn is_development() -> bool {
    std::env::var("NODE_ENV").map(|v| v == "development").unwrap_or(false)
}

/// Single-phase selection for test harnesses: `UNIT_TEST=1` plus
/// `UNIT_TEST_MODULE=scrape|aggregate`.
pub fn unit_test_module() -> Option<String> {
    let enabled = std::env::var("UNIT_TEST")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        return None;
    }
    std::env::var("UNIT_TEST_MODULE")
        .ok()
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| m == "scrape" || m == "aggregate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawler_defaults() {
        let cfg = CrawlerConfig::default();
        assert_eq!(cfg.max_depth, None);
        assert_eq!(cfg.max_concurrency, 3);
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.request_timeout_secs, 60);
    }
}

//! Per-hotel orchestration: the `scrape` and `aggregate` entry points.

pub mod aggregate;
pub mod scrape;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use url::Url;

use crate::config::Config;
use crate::repository::{HotelRepository, MarketDataRepository, PageRepository};

pub use aggregate::{aggregate, AggregateReport};
pub use scrape::scrape;

/// Process-wide services shared by both entry points.
///
/// Failure to initialize the database here is the one fatal error class:
/// nothing downstream can degrade gracefully without a store.
pub struct AppContext {
    pub config: Config,
    pub pages: Arc<PageRepository>,
    pub market: Arc<MarketDataRepository>,
    pub hotels: Arc<HotelRepository>,
}

impl AppContext {
    pub fn initialize(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("cannot create data dir {:?}", config.data_dir))?;
        let db_path = config.database_path();
        let pages = Arc::new(
            PageRepository::new(&db_path, &config.page_table)
                .context("failed to initialize page store")?,
        );
        let market = Arc::new(
            MarketDataRepository::new(&db_path, &config.market_table)
                .context("failed to initialize market-data store")?,
        );
        let hotels = Arc::new(
            HotelRepository::new(&db_path).context("failed to initialize hotel directory")?,
        );
        Ok(Self {
            config,
            pages,
            market,
            hotels,
        })
    }
}

/// Reject blank hotel ids up front; the driver skips the hotel and moves on.
pub(crate) fn require_hotel_id(hotel_id: &str) -> Result<()> {
    anyhow::ensure!(!hotel_id.trim().is_empty(), "invalid input: blank hotel id");
    Ok(())
}

/// Reject malformed seed URLs up front.
pub(crate) fn require_hotel_url(hotel_url: &str) -> Result<Url> {
    let url = Url::parse(hotel_url)
        .with_context(|| format!("invalid input: malformed hotel URL {hotel_url:?}"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "invalid input: hotel URL must be http(s): {hotel_url}"
    );
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_validation() {
        assert!(require_hotel_id("h1").is_ok());
        assert!(require_hotel_id("  ").is_err());
        assert!(require_hotel_url("https://hotel.test/").is_ok());
        assert!(require_hotel_url("ftp://hotel.test/").is_err());
        assert!(require_hotel_url("not a url").is_err());
    }
}

//! Browser-driven crawling and page canonicalization.

pub mod browser;
pub mod clean;
pub mod crawler;
pub mod markdown;
pub mod stabilize;

pub use browser::HotelBrowser;
pub use crawler::{CrawlReport, Crawler};

//! hotelintel - hotel website ingestion and market-data distillation.
//!
//! Crawls a hotel's public website with a real browser, canonicalizes every
//! page to checksum-stable markdown, and distills changed pages into a
//! fixed categorical knowledge record per hotel.

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;
pub mod utils;

//! Page artifact models.
//!
//! A page artifact is the persisted state for one (hotel, URL) pair. Only
//! the previous/current content pair is retained; each re-scrape rolls the
//! current markdown and raw HTML into the `*_prev` columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::hash::content_checksum;

/// Freshly canonicalized content for one URL, produced by the crawler
/// before persistence.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// Post-redirect URL; the storage key.
    pub url: String,
    /// Pre-cleanup HTML, retained for debugging.
    pub raw_html: String,
    /// Cleaned DOM serialization.
    pub canonical_html: String,
    /// NFC-normalized, trimmed markdown.
    pub markdown: String,
    /// Lowercase hex SHA-256 of `markdown`.
    pub checksum: String,
    /// Crawl depth at which the page was reached.
    pub depth: u32,
}

impl PageSnapshot {
    /// Build a snapshot, computing the canonical checksum of the markdown.
    pub fn new(url: String, raw_html: String, canonical_html: String, markdown: String, depth: u32) -> Self {
        let checksum = content_checksum(&markdown);
        Self {
            url,
            raw_html,
            canonical_html,
            markdown,
            checksum,
            depth,
        }
    }
}

/// The persisted state for one (hotel, URL) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageArtifact {
    pub hotel_id: String,
    pub page_url: String,
    pub raw_html: String,
    pub raw_html_prev: Option<String>,
    pub canonical_html: String,
    pub markdown: String,
    pub markdown_prev: Option<String>,
    pub checksum: String,
    /// Checksum of the markdown last consumed by the extractor.
    pub llm_input_checksum: Option<String>,
    /// Serialized category map last produced by the extractor.
    pub llm_output: Option<String>,
    pub depth: u32,
    /// True iff the page was seen in the most recent crawl of its hotel.
    pub active: bool,
    /// Set when an update changed `checksum`.
    pub is_checksum_updated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub llm_updated: Option<DateTime<Utc>>,
}

impl PageArtifact {
    /// Extraction eligibility: active, non-empty markdown, and a checksum
    /// the extractor has not consumed yet.
    pub fn is_dirty(&self) -> bool {
        self.active
            && !self.markdown.is_empty()
            && self.llm_input_checksum.as_deref() != Some(self.checksum.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(markdown: &str, llm_input: Option<&str>, active: bool) -> PageArtifact {
        let checksum = content_checksum(markdown);
        PageArtifact {
            hotel_id: "h1".into(),
            page_url: "https://example.com/".into(),
            raw_html: String::new(),
            raw_html_prev: None,
            canonical_html: String::new(),
            markdown: markdown.to_string(),
            markdown_prev: None,
            checksum,
            llm_input_checksum: llm_input.map(String::from),
            llm_output: None,
            depth: 0,
            active,
            is_checksum_updated: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            llm_updated: None,
        }
    }

    #[test]
    fn test_dirty_when_never_extracted() {
        assert!(artifact("content", None, true).is_dirty());
    }

    #[test]
    fn test_clean_after_extraction() {
        let page = artifact("content", None, true);
        let extracted = artifact("content", Some(page.checksum.as_str()), true);
        assert!(!extracted.is_dirty());
    }

    #[test]
    fn test_inactive_or_empty_never_dirty() {
        assert!(!artifact("content", None, false).is_dirty());
        assert!(!artifact("", None, true).is_dirty());
    }
}

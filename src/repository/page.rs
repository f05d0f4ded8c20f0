//! Page artifact repository.
//!
//! One row per (hotel, URL). Re-scrapes roll the current markdown and raw
//! HTML into the `*_prev` columns; rows are deactivated when a crawl no
//! longer visits them, never deleted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{parse_datetime, parse_datetime_opt, validate_identifier, Result};
use crate::models::{PageArtifact, PageSnapshot};

/// Result of persisting one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// True when the row did not exist before.
    pub created: bool,
    /// True when the write changed `checksum`.
    pub checksum_changed: bool,
}

/// SQLite-backed page artifact store.
pub struct PageRepository {
    db_path: PathBuf,
    table: String,
}

impl PageRepository {
    /// Create the repository and ensure the schema exists.
    pub fn new(db_path: &Path, table: &str) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
            table: validate_identifier(table)?.to_string(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                hotel_id TEXT NOT NULL,
                page_url TEXT NOT NULL,
                raw_html TEXT NOT NULL,
                raw_html_prev TEXT,
                canonical_html TEXT NOT NULL,
                markdown TEXT NOT NULL,
                markdown_prev TEXT,
                checksum TEXT NOT NULL,
                llm_input_checksum TEXT,
                llm_output TEXT,
                depth INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                is_checksum_updated INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                llm_updated TEXT,
                PRIMARY KEY (hotel_id, page_url)
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_hotel_active
                ON {table}(hotel_id, active);
            "#,
            table = self.table
        ))?;
        Ok(())
    }

    /// Persist a snapshot, rolling prior content into the `*_prev` columns.
    ///
    /// `is_checksum_updated` is set only when a prior checksum exists and
    /// differs from the snapshot's.
    pub fn upsert_snapshot(&self, hotel_id: &str, snapshot: &PageSnapshot) -> Result<UpsertOutcome> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT checksum FROM {} WHERE hotel_id = ? AND page_url = ?",
                    self.table
                ),
                params![hotel_id, snapshot.url],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    &format!(
                        r#"INSERT INTO {} (
                            hotel_id, page_url, raw_html, canonical_html, markdown,
                            checksum, depth, active, is_checksum_updated,
                            created_at, updated_at
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, 0, ?, ?)"#,
                        self.table
                    ),
                    params![
                        hotel_id,
                        snapshot.url,
                        snapshot.raw_html,
                        snapshot.canonical_html,
                        snapshot.markdown,
                        snapshot.checksum,
                        snapshot.depth,
                        now,
                        now
                    ],
                )?;
                Ok(UpsertOutcome {
                    created: true,
                    checksum_changed: false,
                })
            }
            Some(prior_checksum) => {
                let changed = prior_checksum != snapshot.checksum;
                conn.execute(
                    &format!(
                        r#"UPDATE {} SET
                            raw_html_prev = raw_html,
                            markdown_prev = markdown,
                            raw_html = ?,
                            canonical_html = ?,
                            markdown = ?,
                            checksum = ?,
                            active = 1,
                            is_checksum_updated = CASE WHEN ? THEN 1 ELSE is_checksum_updated END,
                            updated_at = ?
                        WHERE hotel_id = ? AND page_url = ?"#,
                        self.table
                    ),
                    params![
                        snapshot.raw_html,
                        snapshot.canonical_html,
                        snapshot.markdown,
                        snapshot.checksum,
                        changed,
                        now,
                        hotel_id,
                        snapshot.url
                    ],
                )?;
                Ok(UpsertOutcome {
                    created: false,
                    checksum_changed: changed,
                })
            }
        }
    }

    /// Get one artifact.
    pub fn get(&self, hotel_id: &str, page_url: &str) -> Result<Option<PageArtifact>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE hotel_id = ? AND page_url = ?",
            self.table
        ))?;
        let artifact = stmt
            .query_row(params![hotel_id, page_url], row_to_artifact)
            .optional()?;
        Ok(artifact)
    }

    /// All URLs known for a hotel, regardless of activity.
    pub fn known_urls(&self, hotel_id: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT page_url FROM {} WHERE hotel_id = ?",
            self.table
        ))?;
        let urls = stmt
            .query_map(params![hotel_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    /// URLs currently marked active for a hotel.
    pub fn active_urls(&self, hotel_id: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT page_url FROM {} WHERE hotel_id = ? AND active = 1",
            self.table
        ))?;
        let urls = stmt
            .query_map(params![hotel_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    /// Deactivate every known URL the most recent crawl did not visit.
    ///
    /// Returns the number of deactivated rows. Deactivation is not deletion:
    /// row contents stay untouched.
    pub fn deactivate_missing(&self, hotel_id: &str, visited: &HashSet<String>) -> Result<usize> {
        let known = self.known_urls(hotel_id)?;
        let conn = self.connect()?;
        let mut count = 0usize;
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET active = 0, updated_at = ? WHERE hotel_id = ? AND page_url = ? AND active = 1",
            self.table
        );
        for url in known {
            if !visited.contains(&url) {
                count += conn.execute(&sql, params![now, hotel_id, url])?;
            }
        }
        if count > 0 {
            debug!(hotel_id, count, "deactivated pages missing from crawl");
        }
        Ok(count)
    }

    /// Pages eligible for extraction: active, non-empty markdown, and a
    /// checksum the extractor has not consumed.
    ///
    /// `checksum IS NOT llm_input_checksum` is SQLite's NULL-safe
    /// inequality, so never-extracted rows (NULL) qualify.
    pub fn dirty_pages(&self, hotel_id: &str) -> Result<Vec<PageArtifact>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT * FROM {}
               WHERE hotel_id = ?
                 AND active = 1
                 AND markdown != ''
                 AND checksum IS NOT llm_input_checksum
               ORDER BY depth, page_url"#,
            self.table
        ))?;
        let pages = stmt
            .query_map(params![hotel_id], row_to_artifact)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    /// Record that the extractor consumed a page at the given checksum.
    pub fn mark_llm_consumed(
        &self,
        hotel_id: &str,
        page_url: &str,
        checksum: &str,
        llm_output: &str,
    ) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            &format!(
                r#"UPDATE {} SET
                    llm_input_checksum = ?,
                    llm_output = ?,
                    llm_updated = ?,
                    is_checksum_updated = 0
                WHERE hotel_id = ? AND page_url = ?"#,
                self.table
            ),
            params![checksum, llm_output, now, hotel_id, page_url],
        )?;
        Ok(())
    }

    /// Count of (active, total) pages for a hotel.
    pub fn page_counts(&self, hotel_id: &str) -> Result<(usize, usize)> {
        let conn = self.connect()?;
        let (active, total): (i64, i64) = conn.query_row(
            &format!(
                "SELECT COALESCE(SUM(active), 0), COUNT(*) FROM {} WHERE hotel_id = ?",
                self.table
            ),
            params![hotel_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((active as usize, total as usize))
    }
}

fn row_to_artifact(row: &Row<'_>) -> rusqlite::Result<PageArtifact> {
    Ok(PageArtifact {
        hotel_id: row.get("hotel_id")?,
        page_url: row.get("page_url")?,
        raw_html: row.get("raw_html")?,
        raw_html_prev: row.get("raw_html_prev")?,
        canonical_html: row.get("canonical_html")?,
        markdown: row.get("markdown")?,
        markdown_prev: row.get("markdown_prev")?,
        checksum: row.get("checksum")?,
        llm_input_checksum: row.get("llm_input_checksum")?,
        llm_output: row.get("llm_output")?,
        depth: row.get("depth")?,
        active: row.get::<_, i64>("active")? != 0,
        is_checksum_updated: row.get::<_, i64>("is_checksum_updated")? != 0,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
        llm_updated: parse_datetime_opt(row.get("llm_updated")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageSnapshot;

    fn repo() -> (tempfile::TempDir, PageRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = PageRepository::new(&dir.path().join("test.db"), "hotel_page_data").unwrap();
        (dir, repo)
    }

    fn snapshot(url: &str, markdown: &str, depth: u32) -> PageSnapshot {
        PageSnapshot::new(
            url.to_string(),
            format!("<html>{markdown}</html>"),
            format!("<body>{markdown}</body>"),
            markdown.to_string(),
            depth,
        )
    }

    #[test]
    fn test_insert_then_rescrape_rolls_prev() {
        let (_dir, repo) = repo();
        let first = snapshot("https://h.test/", "rooms from $199", 0);
        let outcome = repo.upsert_snapshot("h1", &first).unwrap();
        assert!(outcome.created);
        assert!(!outcome.checksum_changed);

        let second = snapshot("https://h.test/", "rooms from $229", 0);
        let outcome = repo.upsert_snapshot("h1", &second).unwrap();
        assert!(!outcome.created);
        assert!(outcome.checksum_changed);

        let page = repo.get("h1", "https://h.test/").unwrap().unwrap();
        assert_eq!(page.markdown, "rooms from $229");
        assert_eq!(page.markdown_prev.as_deref(), Some("rooms from $199"));
        assert!(page.is_checksum_updated);
        assert_eq!(page.checksum, second.checksum);
    }

    #[test]
    fn test_identical_rescrape_keeps_checksum_flag_clear() {
        let (_dir, repo) = repo();
        let snap = snapshot("https://h.test/", "same content", 0);
        repo.upsert_snapshot("h1", &snap).unwrap();
        let outcome = repo.upsert_snapshot("h1", &snap).unwrap();
        assert!(!outcome.checksum_changed);
        let page = repo.get("h1", "https://h.test/").unwrap().unwrap();
        assert!(!page.is_checksum_updated);
    }

    #[test]
    fn test_dirty_set_null_safe() {
        let (_dir, repo) = repo();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/a", "alpha", 0))
            .unwrap();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/b", "beta", 1))
            .unwrap();

        // Never-extracted pages (NULL llm_input_checksum) are dirty.
        let dirty = repo.dirty_pages("h1").unwrap();
        assert_eq!(dirty.len(), 2);

        // Consuming one page removes it from the dirty set.
        let page = &dirty[0];
        repo.mark_llm_consumed("h1", &page.page_url, &page.checksum, "{}")
            .unwrap();
        let dirty = repo.dirty_pages("h1").unwrap();
        assert_eq!(dirty.len(), 1);
        assert_ne!(dirty[0].page_url, page.page_url);
    }

    #[test]
    fn test_dirty_excludes_empty_markdown_and_inactive() {
        let (_dir, repo) = repo();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/empty", "", 0))
            .unwrap();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/live", "text", 0))
            .unwrap();
        repo.deactivate_missing(
            "h1",
            &["https://h.test/empty".to_string()].into_iter().collect(),
        )
        .unwrap();

        let dirty = repo.dirty_pages("h1").unwrap();
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_content_change_makes_page_dirty_again() {
        let (_dir, repo) = repo();
        let first = snapshot("https://h.test/", "v1", 0);
        repo.upsert_snapshot("h1", &first).unwrap();
        repo.mark_llm_consumed("h1", "https://h.test/", &first.checksum, "{}")
            .unwrap();
        assert!(repo.dirty_pages("h1").unwrap().is_empty());

        repo.upsert_snapshot("h1", &snapshot("https://h.test/", "v2", 0))
            .unwrap();
        let dirty = repo.dirty_pages("h1").unwrap();
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty[0].markdown, "v2");
    }

    #[test]
    fn test_deactivation_preserves_contents() {
        let (_dir, repo) = repo();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/a", "alpha", 0))
            .unwrap();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/b", "beta", 1))
            .unwrap();

        let visited: HashSet<String> = ["https://h.test/a".to_string()].into_iter().collect();
        let deactivated = repo.deactivate_missing("h1", &visited).unwrap();
        assert_eq!(deactivated, 1);

        assert_eq!(repo.active_urls("h1").unwrap(), vec!["https://h.test/a"]);
        let retired = repo.get("h1", "https://h.test/b").unwrap().unwrap();
        assert!(!retired.active);
        assert_eq!(retired.markdown, "beta");
    }

    #[test]
    fn test_hotels_are_isolated() {
        let (_dir, repo) = repo();
        repo.upsert_snapshot("h1", &snapshot("https://h.test/", "one", 0))
            .unwrap();
        repo.upsert_snapshot("h2", &snapshot("https://h.test/", "two", 0))
            .unwrap();
        assert_eq!(repo.get("h1", "https://h.test/").unwrap().unwrap().markdown, "one");
        assert_eq!(repo.get("h2", "https://h.test/").unwrap().unwrap().markdown, "two");
        assert_eq!(repo.dirty_pages("h1").unwrap().len(), 1);
    }
}

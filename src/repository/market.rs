//! Market-data record repository.
//!
//! One row per hotel; one nullable text column per category plus the
//! derived `other_structured` column. Upserts touch only the columns that
//! survived adjudication.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::warn;

use super::{validate_identifier, Result};
use crate::models::{category_names, MarketDataRecord, OTHER_STRUCTURED_COLUMN};

/// SQLite-backed market-data store.
pub struct MarketDataRepository {
    db_path: PathBuf,
    table: String,
}

impl MarketDataRepository {
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
        let category_columns = category_names()
            .map(|name| format!("{name} TEXT"))
            .collect::<Vec<_>>()
            .join(",\n                ");
        let conn = self.connect()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                hotel_id TEXT PRIMARY KEY,
                {category_columns},
                {other_structured} TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
            table = self.table,
            other_structured = OTHER_STRUCTURED_COLUMN,
        ))?;
        Ok(())
    }

    /// Load a hotel's record, if one exists.
    pub fn get(&self, hotel_id: &str) -> Result<Option<MarketDataRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE hotel_id = ?",
            self.table
        ))?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let record = stmt
            .query_row([hotel_id], |row| {
                let mut fields = HashMap::new();
                for (idx, name) in column_names.iter().enumerate() {
                    if !MarketDataRecord::is_known_column(name) {
                        continue;
                    }
                    if let Some(value) = row.get::<_, Option<String>>(idx)? {
                        fields.insert(name.clone(), value);
                    }
                }
                Ok(MarketDataRecord {
                    hotel_id: hotel_id.to_string(),
                    fields,
                })
            })
            .optional()?;
        Ok(record)
    }

    /// Upsert only the given columns for a hotel.
    ///
    /// Keys outside the category schema (plus `other_structured`) are
    /// discarded; the closed schema is enforced here as the last line of
    /// defense. An empty update map is a no-op.
    pub fn upsert(&self, hotel_id: &str, updates: &HashMap<String, String>) -> Result<usize> {
        let mut columns: Vec<(&str, &str)> = Vec::with_capacity(updates.len());
        for (key, value) in updates {
            if MarketDataRecord::is_known_column(key) {
                columns.push((key.as_str(), value.as_str()));
            } else {
                warn!(column = %key, "discarding unknown market-data column");
            }
        }
        if columns.is_empty() {
            return Ok(0);
        }
        columns.sort_by_key(|(name, _)| *name);

        let now = Utc::now().to_rfc3339();
        let column_list = columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let assignments = columns
            .iter()
            .map(|(name, _)| format!("{name} = excluded.{name}"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            r#"INSERT INTO {table} (hotel_id, {column_list}, created_at, updated_at)
               VALUES (?, {placeholders}, ?, ?)
               ON CONFLICT(hotel_id) DO UPDATE SET
                   {assignments},
                   updated_at = excluded.updated_at"#,
            table = self.table,
        );

        let mut values: Vec<&str> = Vec::with_capacity(columns.len() + 3);
        values.push(hotel_id);
        values.extend(columns.iter().map(|(_, value)| *value));
        values.push(now.as_str());
        values.push(now.as_str());

        let conn = self.connect()?;
        let affected = conn.execute(&sql, params_from_iter(values))?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, MarketDataRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = MarketDataRepository::new(&dir.path().join("test.db"), "market_data").unwrap();
        (dir, repo)
    }

    #[test]
    fn test_get_missing_record() {
        let (_dir, repo) = repo();
        assert!(repo.get("h1").unwrap().is_none());
    }

    #[test]
    fn test_upsert_creates_then_patches() {
        let (_dir, repo) = repo();
        let mut updates = HashMap::new();
        updates.insert("guest_rooms".to_string(), "Ocean-view rooms from $199.".to_string());
        assert_eq!(repo.upsert("h1", &updates).unwrap(), 1);

        let record = repo.get("h1").unwrap().unwrap();
        assert_eq!(record.get("guest_rooms"), "Ocean-view rooms from $199.");
        assert_eq!(record.get("amenities"), "");

        // A later write touching a different column leaves the first intact.
        let mut updates = HashMap::new();
        updates.insert("amenities".to_string(), "Pool, Spa".to_string());
        repo.upsert("h1", &updates).unwrap();
        let record = repo.get("h1").unwrap().unwrap();
        assert_eq!(record.get("guest_rooms"), "Ocean-view rooms from $199.");
        assert_eq!(record.get("amenities"), "Pool, Spa");
    }

    #[test]
    fn test_unknown_columns_are_discarded() {
        let (_dir, repo) = repo();
        let mut updates = HashMap::new();
        updates.insert("guest_rooms".to_string(), "x".to_string());
        updates.insert("not_a_category".to_string(), "y".to_string());
        repo.upsert("h1", &updates).unwrap();
        let record = repo.get("h1").unwrap().unwrap();
        assert_eq!(record.get("guest_rooms"), "x");
        assert!(!record.fields.contains_key("not_a_category"));
    }

    #[test]
    fn test_empty_update_is_noop() {
        let (_dir, repo) = repo();
        assert_eq!(repo.upsert("h1", &HashMap::new()).unwrap(), 0);
        assert!(repo.get("h1").unwrap().is_none());
    }

    #[test]
    fn test_other_structured_round_trip() {
        let (_dir, repo) = repo();
        let mut updates = HashMap::new();
        updates.insert("other".to_string(), "Loyalty: Marriott Bonvoy".to_string());
        updates.insert(
            OTHER_STRUCTURED_COLUMN.to_string(),
            r#"{"loyalty":"Marriott Bonvoy"}"#.to_string(),
        );
        repo.upsert("h1", &updates).unwrap();
        let record = repo.get("h1").unwrap().unwrap();
        assert_eq!(
            record.get(OTHER_STRUCTURED_COLUMN),
            r#"{"loyalty":"Marriott Bonvoy"}"#
        );
    }
}

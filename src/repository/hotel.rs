//! Hotel directory.
//!
//! Thin registry backing the driver loop: which hotels exist, their seed
//! URLs, and whether they are active.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::Result;

/// One hotel the driver loop can process.
#[derive(Debug, Clone)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub url: String,
    pub active: bool,
}

/// SQLite-backed hotel directory.
pub struct HotelRepository {
    db_path: PathBuf,
}

impl HotelRepository {
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS hotels (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Register or update a hotel.
    pub fn add(&self, id: &str, name: &str, url: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"INSERT INTO hotels (id, name, url, active, created_at)
               VALUES (?, ?, ?, 1, ?)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name, url = excluded.url, active = 1"#,
            params![id, name, url, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get one hotel by id.
    pub fn get(&self, id: &str) -> Result<Option<Hotel>> {
        let conn = self.connect()?;
        let hotel = conn
            .query_row(
                "SELECT id, name, url, active FROM hotels WHERE id = ?",
                params![id],
                |row| {
                    Ok(Hotel {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                        active: row.get::<_, i64>(3)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(hotel)
    }

    /// Hotels eligible for the driver loop.
    pub fn list_active(&self) -> Result<Vec<Hotel>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, name, url, active FROM hotels WHERE active = 1 ORDER BY id")?;
        let hotels = stmt
            .query_map([], |row| {
                Ok(Hotel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                    active: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(hotels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_list_active() {
        let dir = tempfile::tempdir().unwrap();
        let repo = HotelRepository::new(&dir.path().join("test.db")).unwrap();
        repo.add("h1", "Seaside Inn", "https://seaside.test").unwrap();
        repo.add("h2", "City Lodge", "https://citylodge.test").unwrap();

        let hotels = repo.list_active().unwrap();
        assert_eq!(hotels.len(), 2);
        assert_eq!(hotels[0].id, "h1");
        assert_eq!(hotels[0].name, "Seaside Inn");

        // Re-adding updates in place.
        repo.add("h1", "Seaside Inn & Spa", "https://seaside.test").unwrap();
        let hotel = repo.get("h1").unwrap().unwrap();
        assert_eq!(hotel.name, "Seaside Inn & Spa");
        assert_eq!(repo.list_active().unwrap().len(), 2);
    }
}

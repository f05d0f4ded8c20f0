//! Repository layer for SQLite persistence.
//!
//! Repositories hold the database path and open short-lived connections per
//! call; row writes are individually transactional and no cross-row
//! transactions are required.

pub mod hotel;
pub mod market;
pub mod page;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub use hotel::{Hotel, HotelRepository};
pub use market::MarketDataRepository;
pub use page::{PageRepository, UpsertOutcome};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Open a connection with the pragmas every repository relies on.
pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Validate an identifier destined for interpolation into SQL.
///
/// Table names arrive from the environment; only `[A-Za-z0-9_]` names are
/// accepted.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.chars().next().unwrap_or('0').is_ascii_digit();
    if ok {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("hotel_page_data").is_ok());
        assert!(validate_identifier("market_data_v2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("bad-name").is_err());
        assert!(validate_identifier("1table").is_err());
        assert!(validate_identifier("x; DROP TABLE y").is_err());
    }

    #[test]
    fn test_parse_datetime_round_trip() {
        let now = Utc::now();
        let parsed = parse_datetime(&now.to_rfc3339());
        assert_eq!(parsed.timestamp(), now.timestamp());
        assert_eq!(parse_datetime("garbage"), DateTime::UNIX_EPOCH);
    }
}

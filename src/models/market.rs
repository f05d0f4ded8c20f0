//! Market-data record model.

use std::collections::HashMap;

use crate::models::category::category_names;

/// Derived column holding the structured form of `other`.
pub const OTHER_STRUCTURED_COLUMN: &str = "other_structured";

/// One hotel's categorical knowledge record: one text value per category
/// plus the derived `other_structured` JSON string.
#[derive(Debug, Clone, Default)]
pub struct MarketDataRecord {
    pub hotel_id: String,
    /// Column name → value, for columns present in the row.
    pub fields: HashMap<String, String>,
}

impl MarketDataRecord {
    /// Get one field's value, treating absent and empty alike.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// True if `name` is a writable column of this record.
    pub fn is_known_column(name: &str) -> bool {
        name == OTHER_STRUCTURED_COLUMN || category_names().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_columns() {
        assert!(MarketDataRecord::is_known_column("guest_rooms"));
        assert!(MarketDataRecord::is_known_column("other"));
        assert!(MarketDataRecord::is_known_column(OTHER_STRUCTURED_COLUMN));
        assert!(!MarketDataRecord::is_known_column("drop table"));
        assert!(!MarketDataRecord::is_known_column("hotel_id"));
    }

    #[test]
    fn test_get_defaults_to_empty() {
        let record = MarketDataRecord::default();
        assert_eq!(record.get("amenities"), "");
    }
}

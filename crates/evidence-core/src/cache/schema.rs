//! SQLite schema for the evidence cache

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Positive entries: one JSON record per identifier
CREATE TABLE IF NOT EXISTS records (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    source_tier TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

-- Negative entries: last failed cascade per identifier
CREATE TABLE IF NOT EXISTS negative (
    key TEXT PRIMARY KEY,
    attempts TEXT NOT NULL,
    cascade_count INTEGER NOT NULL DEFAULT 1,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_fetched ON records(fetched_at);
"#
    }

    /// Get migration SQL from one version to another
    pub fn migration(from_version: u32, to_version: u32) -> Option<&'static str> {
        match (from_version, to_version) {
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(Schema::create_tables()).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('records', 'negative', 'schema_version')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}

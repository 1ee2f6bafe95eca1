//! SQLite-backed store for resolved records and negative entries

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use evidence_identifiers::Identifier;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::schema::{Schema, SCHEMA_VERSION};
use crate::domain::{CachedRecord, TierAttempt};
use crate::error::CacheError;

type CacheResult<T> = std::result::Result<T, CacheError>;

/// Persisted outcome of a failed cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativeEntry {
    pub attempts: Vec<TierAttempt>,
    /// Failed cascades recorded for this identifier since the last refresh
    pub cascade_count: u32,
    pub recorded_at: DateTime<Utc>,
}

impl NegativeEntry {
    /// Whether the entry is still inside its validity window
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.recorded_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }

    /// Whether this entry should answer a lookup without a new cascade
    pub fn suppresses_cascade(&self, ttl: Duration, max_cascades: u32, now: DateTime<Utc>) -> bool {
        self.cascade_count >= max_cascades || self.is_fresh(ttl, now)
    }
}

/// Durable cache keyed by canonical identifier
pub struct CacheStore {
    conn: Mutex<rusqlite::Connection>,
    documents_dir: Option<PathBuf>,
}

impl CacheStore {
    /// Open (or create) a store at the given database path.
    ///
    /// Downloaded documents go to a `documents` directory next to the file.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)?;
        let documents_dir = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("documents");
        let store = Self {
            conn: Mutex::new(conn),
            documents_dir: Some(documents_dir),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> CacheResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            documents_dir: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Override where downloaded documents are written
    pub fn with_documents_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.documents_dir = Some(dir.into());
        self
    }

    pub fn documents_dir(&self) -> Option<&Path> {
        self.documents_dir.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn initialize(&self) -> CacheResult<()> {
        let conn = self.conn();
        let current_version = Self::get_schema_version(&conn).unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(Schema::create_tables())?;
            Self::set_schema_version(&conn, SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    conn.execute_batch(migration)?;
                }
            }
            Self::set_schema_version(&conn, SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn get_schema_version(conn: &rusqlite::Connection) -> Option<u32> {
        conn.query_row(
            "SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .ok()
    }

    fn set_schema_version(conn: &rusqlite::Connection, version: u32) -> CacheResult<()> {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        Ok(())
    }

    // ==================== Positive entries ====================

    /// Look up a record.
    ///
    /// A row that no longer decodes is deleted and reported as a miss.
    pub fn get(&self, id: &Identifier) -> CacheResult<Option<CachedRecord>> {
        let key = id.cache_key();
        let conn = self.conn();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM records WHERE key = ?1",
                [&key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match decode_record(&key, &payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Dropping unreadable cache entry: {}", e);
                conn.execute("DELETE FROM records WHERE key = ?1", [&key])?;
                Ok(None)
            }
        }
    }

    /// Write a record, replacing any previous one and clearing the
    /// identifier's negative entry in the same transaction
    pub fn put(&self, record: &CachedRecord) -> CacheResult<()> {
        let key = record.identifier.cache_key();
        let payload = serde_json::to_string(record)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT OR REPLACE INTO records (key, payload, source_tier, fetched_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                key,
                payload,
                record.pdf_source_tier.as_str(),
                record.fetched_at.to_rfc3339(),
            ],
        )?;
        tx.execute("DELETE FROM negative WHERE key = ?1", [&key])?;
        tx.commit()?;
        Ok(())
    }

    // ==================== Negative entries ====================

    /// Look up the negative entry for an identifier
    pub fn get_negative(&self, id: &Identifier) -> CacheResult<Option<NegativeEntry>> {
        let key = id.cache_key();
        let conn = self.conn();
        let row: Option<(String, u32, String)> = conn
            .query_row(
                "SELECT attempts, cascade_count, recorded_at FROM negative WHERE key = ?1",
                [&key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((attempts, cascade_count, recorded_at)) = row else {
            return Ok(None);
        };

        match decode_negative(&key, &attempts, cascade_count, &recorded_at) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("Dropping unreadable negative cache entry: {}", e);
                conn.execute("DELETE FROM negative WHERE key = ?1", [&key])?;
                Ok(None)
            }
        }
    }

    /// Record a failed cascade, incrementing the identifier's cascade count
    pub fn record_negative(
        &self,
        id: &Identifier,
        attempts: &[TierAttempt],
    ) -> CacheResult<NegativeEntry> {
        let key = id.cache_key();
        let payload = serde_json::to_string(attempts)?;
        let now = Utc::now();

        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO negative (key, attempts, cascade_count, recorded_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT(key) DO UPDATE SET
                attempts = excluded.attempts,
                cascade_count = negative.cascade_count + 1,
                recorded_at = excluded.recorded_at
            "#,
            params![key, payload, now.to_rfc3339()],
        )?;
        let cascade_count: u32 = conn.query_row(
            "SELECT cascade_count FROM negative WHERE key = ?1",
            [&key],
            |row| row.get(0),
        )?;

        Ok(NegativeEntry {
            attempts: attempts.to_vec(),
            cascade_count,
            recorded_at: now,
        })
    }

    /// Forget failed cascades for an identifier
    pub fn clear_negative(&self, id: &Identifier) -> CacheResult<()> {
        self.conn()
            .execute("DELETE FROM negative WHERE key = ?1", [id.cache_key()])?;
        Ok(())
    }

    /// Drop both positive and negative entries for an identifier
    pub fn invalidate(&self, id: &Identifier) -> CacheResult<()> {
        let key = id.cache_key();
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM records WHERE key = ?1", [&key])?;
        tx.execute("DELETE FROM negative WHERE key = ?1", [&key])?;
        tx.commit()?;
        Ok(())
    }

    /// Number of positive entries
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    // ==================== Documents ====================

    /// Write a downloaded document for an identifier.
    ///
    /// Returns `None` when the store has no documents directory. The file is
    /// written to a temporary name first and renamed into place.
    pub fn store_document(&self, id: &Identifier, bytes: &[u8]) -> CacheResult<Option<PathBuf>> {
        let Some(dir) = &self.documents_dir else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}.pdf", document_file_stem(id)));
        let tmp = path.with_extension("pdf.part");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(Some(path))
    }
}

fn decode_record(key: &str, payload: &str) -> CacheResult<CachedRecord> {
    let record: CachedRecord = serde_json::from_str(payload).map_err(|e| CacheError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    if record.identifier.cache_key() != key {
        return Err(CacheError::Corrupt {
            key: key.to_string(),
            message: format!("record belongs to {}", record.identifier),
        });
    }
    Ok(record)
}

fn decode_negative(
    key: &str,
    attempts: &str,
    cascade_count: u32,
    recorded_at: &str,
) -> CacheResult<NegativeEntry> {
    let corrupt = |message: String| CacheError::Corrupt {
        key: key.to_string(),
        message,
    };
    let attempts: Vec<TierAttempt> =
        serde_json::from_str(attempts).map_err(|e| corrupt(e.to_string()))?;
    let recorded_at = DateTime::parse_from_rfc3339(recorded_at)
        .map_err(|e| corrupt(e.to_string()))?
        .with_timezone(&Utc);
    Ok(NegativeEntry {
        attempts,
        cascade_count,
        recorded_at,
    })
}

/// File-system safe name derived from the cache key; distinct keys never collide
fn document_file_stem(id: &Identifier) -> String {
    urlencoding::encode(&id.cache_key()).into_owned()
}

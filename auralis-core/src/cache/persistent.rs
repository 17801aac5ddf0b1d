//! L2 cache: a SQLite-backed fingerprint store, durable across restarts.
//!
//! `schema_version` is stamped on every row (a supplemented field, not in
//! the minimal column list) so a future fingerprint format change is
//! treated as a cache miss instead of a silent misparse.
use std::path::Path;

use auralis_dsp::AudioFingerprint;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub struct PersistentCache {
    conn: parking_lot::Mutex<Connection>,
    max_size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistentStats {
    pub row_count: u64,
    pub size_bytes: u64,
}

impl PersistentCache {
    pub fn open(path: &Path, max_size_bytes: u64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| crate::error::Error::CacheIo(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS fingerprints (
                cache_key TEXT PRIMARY KEY,
                fingerprint_json TEXT NOT NULL,
                fingerprint_size INTEGER NOT NULL,
                audio_length INTEGER NOT NULL,
                schema_version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                accessed_at INTEGER NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_fingerprints_accessed_at ON fingerprints(accessed_at DESC);
            CREATE INDEX IF NOT EXISTS idx_fingerprints_access_count ON fingerprints(access_count DESC);",
        )?;
        Ok(Self { conn: parking_lot::Mutex::new(conn), max_size_bytes })
    }

    /// Looks up `key`. A version mismatch (an old fingerprint format) is
    /// treated as a miss, not an error. Bumps `accessed_at`/`access_count`
    /// on hit.
    pub fn get(&self, key: &str, now: i64) -> Result<Option<(AudioFingerprint, u64)>> {
        let conn = self.conn.lock();
        let row: Option<(String, i64, i64)> = conn
            .query_row(
                "SELECT fingerprint_json, schema_version, audio_length FROM fingerprints WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((json, schema_version, audio_length)) = row else {
            return Ok(None);
        };
        if schema_version != SCHEMA_VERSION {
            return Ok(None);
        }
        let fingerprint: AudioFingerprint = serde_json::from_str(&json)
            .map_err(|e| crate::error::Error::CacheIo(e.to_string()))?;

        conn.execute(
            "UPDATE fingerprints SET accessed_at = ?1, access_count = access_count + 1 WHERE cache_key = ?2",
            params![now, key],
        )?;

        Ok(Some((fingerprint, audio_length as u64)))
    }

    pub fn put(&self, key: &str, fingerprint: &AudioFingerprint, audio_length: u64, now: i64) -> Result<()> {
        let json = serde_json::to_string(fingerprint).map_err(|e| crate::error::Error::CacheIo(e.to_string()))?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO fingerprints
                (cache_key, fingerprint_json, fingerprint_size, audio_length, schema_version, created_at, accessed_at, access_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 1)
             ON CONFLICT(cache_key) DO UPDATE SET
                fingerprint_json = excluded.fingerprint_json,
                fingerprint_size = excluded.fingerprint_size,
                audio_length = excluded.audio_length,
                schema_version = excluded.schema_version,
                accessed_at = excluded.accessed_at,
                access_count = fingerprints.access_count + 1",
            params![key, json, json.len() as i64, audio_length as i64, SCHEMA_VERSION, now],
        )?;
        Ok(())
    }

    pub fn stats(&self, path: &Path) -> Result<PersistentStats> {
        let conn = self.conn.lock();
        let row_count: i64 = conn.query_row("SELECT COUNT(*) FROM fingerprints", [], |row| row.get(0))?;
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Ok(PersistentStats { row_count: row_count as u64, size_bytes })
    }

    /// Deletes oldest-by-`accessed_at` rows in batches of 1000 until the
    /// database file is at or below 80% of `max_size_bytes`.
    pub fn evict_if_over_limit(&self, path: &Path) -> Result<u64> {
        const BATCH_SIZE: i64 = 1000;
        let target = (self.max_size_bytes as f64 * 0.8) as u64;
        let mut deleted = 0u64;

        loop {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if size <= self.max_size_bytes && (deleted == 0 || size <= target) {
                break;
            }

            let conn = self.conn.lock();
            let affected = conn.execute(
                "DELETE FROM fingerprints WHERE cache_key IN (
                    SELECT cache_key FROM fingerprints ORDER BY accessed_at ASC LIMIT ?1
                )",
                params![BATCH_SIZE],
            )?;
            drop(conn);

            if affected == 0 {
                break;
            }
            deleted += affected as u64;

            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if size <= target {
                break;
            }
        }

        Ok(deleted)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.lock().execute("DELETE FROM fingerprints", [])?;
        Ok(())
    }

    /// Deletes rows whose `accessed_at` is older than `days`, returning the
    /// count removed.
    pub fn cleanup_old_entries(&self, days: u32, now: i64) -> Result<u64> {
        let cutoff = now - days as i64 * 86_400;
        let affected = self.conn.lock().execute("DELETE FROM fingerprints WHERE accessed_at < ?1", params![cutoff])?;
        Ok(affected as u64)
    }
}

//! Two-level fingerprint cache (C2): an in-memory LRU fronting a durable
//! SQLite store, keyed by a content hash so identical audio always maps to
//! the same entry regardless of filename or track id.
pub mod memory;
pub mod persistent;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use auralis_dsp::AudioFingerprint;
use sha2::{Digest, Sha256};

use crate::error::Result;
use memory::MemoryCache;
use persistent::PersistentCache;

const KEY_PREFIX_BYTES: usize = 10 * 1024;
const KEY_HEX_LEN: usize = 16;

/// Derives the cache key for a buffer of raw audio bytes: SHA-256 of the
/// first `min(10240, len)` bytes, concatenated with the little-endian
/// length, truncated to 16 hex characters. The length suffix means two
/// files sharing an identical short prefix but differing in length never
/// collide.
pub fn cache_key(audio_bytes: &[u8]) -> String {
    let prefix_len = audio_bytes.len().min(KEY_PREFIX_BYTES);
    let mut hasher = Sha256::new();
    hasher.update(&audio_bytes[..prefix_len]);
    hasher.update((audio_bytes.len() as u64).to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..KEY_HEX_LEN].to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub l1_size: usize,
    pub l2_row_count: u64,
    pub l2_size_mb: f64,
    pub memory_capacity: usize,
    pub max_size_bytes: u64,
}

pub struct FingerprintCache {
    memory: MemoryCache,
    persistent: PersistentCache,
    path: std::path::PathBuf,
    memory_capacity: usize,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
}

impl FingerprintCache {
    pub fn open(path: &Path, memory_capacity: usize, max_size_bytes: u64) -> Result<Self> {
        Ok(Self {
            memory: MemoryCache::new(memory_capacity),
            persistent: PersistentCache::open(path, max_size_bytes)?,
            path: path.to_path_buf(),
            memory_capacity,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        })
    }

    /// L1 first, then L2. An L2 hit repopulates L1. A persistent I/O error
    /// degrades silently to a miss rather than propagating — per the
    /// `CacheIo` contract, callers always get a usable (if slower) path.
    pub fn get(&self, key: &str) -> Option<AudioFingerprint> {
        if let Some(fp) = self.memory.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(fp);
        }

        match self.persistent.get(key, now_unix()) {
            Ok(Some((fp, _audio_length))) => {
                self.memory.put(key.to_string(), fp);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(fp)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "persistent cache read failed, treating as miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, fingerprint: &AudioFingerprint, audio_length: u64) {
        self.memory.put(key.to_string(), *fingerprint);
        self.insertions.fetch_add(1, Ordering::Relaxed);

        if let Err(err) = self.persistent.put(key, fingerprint, audio_length, now_unix()) {
            tracing::warn!(error = %err, "persistent cache write failed, entry only cached in memory");
            return;
        }
        if let Err(err) = self.persistent.evict_if_over_limit(&self.path) {
            tracing::warn!(error = %err, "cache eviction pass failed");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (l2_row_count, l2_size_mb) = match self.persistent.stats(&self.path) {
            Ok(stats) => (stats.row_count, stats.size_bytes as f64 / (1024.0 * 1024.0)),
            Err(_) => (0, 0.0),
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            l1_size: self.memory.len(),
            l2_row_count,
            l2_size_mb,
            memory_capacity: self.memory_capacity,
            max_size_bytes: self.max_size_bytes,
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.memory.clear();
        self.persistent.clear()
    }

    /// Evicts persistent entries not accessed in over `days` days, returning
    /// the count removed. Does not touch the in-memory L1, which is already
    /// bounded by its own LRU capacity.
    pub fn cleanup_old_entries(&self, days: u32) -> Result<u64> {
        self.persistent.cleanup_old_entries(days, now_unix())
    }
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

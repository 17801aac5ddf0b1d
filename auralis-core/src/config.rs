use crate::error::{Error, Result};
use crate::space::PreferenceVector;
use std::path::PathBuf;

/// Immutable, built-once configuration shared by reference across the
/// cache, content analyzer, pipeline, streaming processor, and worker pool.
///
/// Construct one of these in `main()` and pass `&UnifiedConfig` everywhere;
/// nothing in this crate mutates it after construction.
#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    pub sample_rate: u32,
    pub preference: PreferenceVector,
    pub cache_dir: PathBuf,
    pub memory_cache_capacity: usize,
    pub persistent_cache_max_bytes: u64,
    pub worker_pool_size: usize,
}

const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 50;
const DEFAULT_PERSISTENT_CACHE_MAX_BYTES: u64 = 2 * 1024 * 1024 * 1024;

impl Default for UnifiedConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            preference: PreferenceVector::default(),
            cache_dir: default_cache_dir(),
            memory_cache_capacity: DEFAULT_MEMORY_CACHE_CAPACITY,
            persistent_cache_max_bytes: DEFAULT_PERSISTENT_CACHE_MAX_BYTES,
            worker_pool_size: crate::worker::default_worker_count(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".auralis")
        .join("cache")
}

impl UnifiedConfig {
    /// Build configuration from `AURALIS_`-prefixed environment variables,
    /// falling back to defaults for anything unset. Unknown preset names
    /// are rejected rather than silently falling back to `adaptive`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(rate) = std::env::var("AURALIS_SAMPLE_RATE") {
            config.sample_rate = rate
                .parse()
                .map_err(|_| Error::InvalidInput(format!("AURALIS_SAMPLE_RATE: invalid u32 {rate:?}")))?;
        }
        if let Ok(preset) = std::env::var("AURALIS_PRESET") {
            config.preference = PreferenceVector::from_preset_name(&preset)?;
        }
        if let Ok(dir) = std::env::var("AURALIS_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Ok(cap) = std::env::var("AURALIS_MEMORY_CACHE_CAPACITY") {
            config.memory_cache_capacity = cap
                .parse()
                .map_err(|_| Error::InvalidInput(format!("AURALIS_MEMORY_CACHE_CAPACITY: invalid usize {cap:?}")))?;
        }
        if let Ok(bytes) = std::env::var("AURALIS_PERSISTENT_CACHE_MAX_BYTES") {
            config.persistent_cache_max_bytes = bytes
                .parse()
                .map_err(|_| Error::InvalidInput(format!("AURALIS_PERSISTENT_CACHE_MAX_BYTES: invalid u64 {bytes:?}")))?;
        }
        if let Ok(workers) = std::env::var("AURALIS_WORKER_POOL_SIZE") {
            config.worker_pool_size = workers
                .parse()
                .map_err(|_| Error::InvalidInput(format!("AURALIS_WORKER_POOL_SIZE: invalid usize {workers:?}")))?;
        }

        Ok(config)
    }

    pub fn persistent_cache_path(&self) -> PathBuf {
        self.cache_dir.join("fingerprints.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = UnifiedConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.memory_cache_capacity, 50);
        assert!(config.worker_pool_size >= 1);
    }

    #[test]
    fn from_env_rejects_unknown_preset() {
        std::env::set_var("AURALIS_PRESET", "nonexistent_preset_xyz");
        let result = UnifiedConfig::from_env();
        std::env::remove_var("AURALIS_PRESET");
        assert!(result.is_err());
    }

    #[test]
    fn from_env_accepts_known_preset() {
        std::env::set_var("AURALIS_PRESET", "warm");
        let config = UnifiedConfig::from_env().unwrap();
        std::env::remove_var("AURALIS_PRESET");
        assert_eq!(config.preference, PreferenceVector::from_preset_name("warm").unwrap());
    }
}

use std::sync::Arc;
use std::time::Instant;

use auralis_core::{FingerprintCache, UnifiedConfig};

pub struct AppState {
    pub config: UnifiedConfig,
    pub cache: FingerprintCache,
    pub start_time: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: UnifiedConfig) -> auralis_core::Result<Self> {
        let cache = FingerprintCache::open(
            &config.persistent_cache_path(),
            config.memory_cache_capacity,
            config.persistent_cache_max_bytes,
        )?;
        Ok(Self { config, cache, start_time: Instant::now() })
    }
}

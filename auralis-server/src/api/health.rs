use axum::extract::State;
use axum::Json;

use crate::models::{CacheStatsDto, HealthResponse};
use crate::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let stats = state.cache.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.start_time.elapsed().as_secs(),
        cache_stats: CacheStatsDto {
            hits: stats.hits,
            misses: stats.misses,
            insertions: stats.insertions,
            l1_size: stats.l1_size,
            l2_row_count: stats.l2_row_count,
        },
    })
}

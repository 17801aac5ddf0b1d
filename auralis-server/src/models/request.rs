use auralis_core::{AdaptiveParameters, AudioFingerprint, ProcessingParameters, RecordingType};
use serde::{Deserialize, Serialize};

/// Audio ingress shape shared by every endpoint: planar channels (1 for
/// mono, 2 for stereo) plus the sample rate. Values are expected in
/// [-1.0, 1.0]; out-of-range values are tolerated and clipped downstream.
#[derive(Debug, Deserialize)]
pub struct AudioPayload {
    pub channels: Vec<Vec<f64>>,
    pub sample_rate: u32,
}

#[derive(Debug, Deserialize)]
pub struct FingerprintRequest {
    pub track_id: String,
    pub audio: AudioPayload,
}

#[derive(Debug, Serialize)]
pub struct FingerprintResponse {
    pub track_id: String,
    pub fingerprint: AudioFingerprint,
    pub recording_type: RecordingType,
    pub adaptive_parameters: AdaptiveParameters,
    pub cache_hit: bool,
    pub processing_time_ms: u128,
}

#[derive(Debug, Deserialize)]
pub struct MasterRequest {
    pub track_id: String,
    pub audio: AudioPayload,
    #[serde(default = "default_preset")]
    pub preset: String,
}

fn default_preset() -> String {
    "adaptive".to_string()
}

#[derive(Debug, Serialize)]
pub struct MasterResponse {
    pub track_id: String,
    pub channels: Vec<Vec<f64>>,
    pub sample_rate: u32,
    pub measured_lufs: f64,
    pub parameters: ProcessingParameters,
    pub recording_type: RecordingType,
    pub processing_time_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub cache_stats: CacheStatsDto,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsDto {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub l1_size: usize,
    pub l2_row_count: u64,
}

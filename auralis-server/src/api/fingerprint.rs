use std::time::Instant;

use axum::extract::State;
use axum::Json;

use auralis_core::AudioBuffer;

use crate::error::{Result, ServerError};
use crate::models::{FingerprintRequest, FingerprintResponse};
use crate::state::SharedState;

/// Hashes the raw little-endian sample bytes the same way the cache keys
/// decoded file bytes, since this endpoint receives already-decoded audio
/// rather than a compressed file.
pub(crate) fn payload_cache_key(audio: &AudioBuffer) -> String {
    let mut bytes = Vec::with_capacity(audio.num_samples() * audio.channel_count() * 8);
    for channel in audio.channels_slice() {
        for sample in channel {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }
    auralis_core::cache_key(&bytes)
}

pub async fn fingerprint_handler(
    State(state): State<SharedState>,
    Json(req): Json<FingerprintRequest>,
) -> Result<Json<FingerprintResponse>> {
    let start = Instant::now();

    let buffer = AudioBuffer::from_planar(req.audio.channels, req.audio.sample_rate)
        .map_err(|err| ServerError::InvalidAudio(err.to_string()))?;

    let key = payload_cache_key(&buffer);
    let audio_length = buffer.num_samples() as u64;
    let (fingerprint, cache_hit) = match state.cache.get(&key) {
        Some(fp) => (fp, true),
        None => {
            let strategy = auralis_core::AnalysisStrategy::default();
            let fp = tokio::task::spawn_blocking(move || auralis_dsp::fingerprint::analyze(&buffer, strategy))
                .await
                .map_err(|err| ServerError::InvalidAudio(format!("analysis task join error: {err}")))?;
            state.cache.set(&key, &fp, audio_length);
            (fp, false)
        }
    };

    let (recording_type, adaptive_parameters) = auralis_core::detect_recording_type(&fingerprint);

    Ok(Json(FingerprintResponse {
        track_id: req.track_id,
        fingerprint,
        recording_type,
        adaptive_parameters,
        cache_hit,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}

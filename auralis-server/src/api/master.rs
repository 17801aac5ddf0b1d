use std::time::Instant;

use axum::extract::State;
use axum::Json;

use auralis_core::{AudioBuffer, PreferenceVector};

use crate::api::fingerprint::payload_cache_key;
use crate::error::{Result, ServerError};
use crate::models::{MasterRequest, MasterResponse};
use crate::state::SharedState;

/// Fingerprints, classifies, generates parameters, and runs the full DSP
/// pipeline over one buffer in a single request. Intended for debugging
/// and small clips; the streaming processor (not exposed over HTTP here)
/// is the production path for full-length tracks.
///
/// Reuses the same fingerprint cache as `/fingerprint` so re-mastering the
/// same clip under a different preset skips re-analysis.
pub async fn master_handler(
    State(state): State<SharedState>,
    Json(req): Json<MasterRequest>,
) -> Result<Json<MasterResponse>> {
    let start = Instant::now();

    let mut buffer = AudioBuffer::from_planar(req.audio.channels, req.audio.sample_rate)
        .map_err(|err| ServerError::InvalidAudio(err.to_string()))?;

    let preference = PreferenceVector::from_preset_name(&req.preset)?;

    let key = payload_cache_key(&buffer);
    let audio_length = buffer.num_samples() as u64;
    let cached = state.cache.get(&key);

    let sample_rate = buffer.sample_rate;
    let (buffer, measured_lufs, parameters, recording_type, fingerprint) = tokio::task::spawn_blocking(move || {
        let fingerprint = cached
            .unwrap_or_else(|| auralis_dsp::fingerprint::analyze(&buffer, auralis_core::AnalysisStrategy::default()));
        let (recording_type, adaptive) = auralis_core::detect_recording_type(&fingerprint);
        let coords = auralis_core::ProcessingCoordinates::from_fingerprint(&fingerprint);
        let mut parameters = auralis_core::generate_parameters(coords, &fingerprint, &preference);
        parameters.eq_curve = auralis_core::blend_adaptive_eq(parameters.eq_curve, &adaptive);
        let parameters = auralis_core::blend_adaptive_dynamics(parameters, &adaptive);

        let measured_lufs = auralis_core::process_buffer(&mut buffer, &parameters, 0.0);
        (buffer, measured_lufs, parameters, recording_type, fingerprint)
    })
    .await
    .map_err(|err| ServerError::InvalidAudio(format!("mastering task join error: {err}")))?;
    state.cache.set(&key, &fingerprint, audio_length);

    Ok(Json(MasterResponse {
        track_id: req.track_id,
        channels: buffer.channels_slice().to_vec(),
        sample_rate,
        measured_lufs,
        parameters,
        recording_type,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}

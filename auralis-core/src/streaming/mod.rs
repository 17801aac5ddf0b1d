//! Chunked streaming processor (C6): processes a track as overlapping
//! chunks through the C5 pipeline with track-level (not per-chunk)
//! parameters, crossfading the overlaps for click-free, level-stable
//! output.
use std::num::NonZeroUsize;
use std::sync::Mutex;

use auralis_dsp::buffer::AudioBuffer;
use auralis_dsp::primitives::{rms, to_db};
use auralis_dsp::windowing::overlapping_chunks;
use auralis_dsp::AudioFingerprint;
use lru::LruCache;

use crate::content::{self, AdaptiveParameters, ContentProfile, RecordingType};
use crate::pipeline;
use crate::space::{self, PreferenceVector, ProcessingParameters};

pub const CHUNK_DURATION_SECS: f64 = 15.0;
pub const OVERLAP_DURATION_SECS: f64 = 5.0;
pub const CONTEXT_DURATION_SECS: f64 = 3.0;
pub const MAX_LEVEL_CHANGE_DB: f64 = 1.5;

/// Per-track analysis, computed once and reused for every chunk of that
/// track so output level does not drift chunk to chunk.
#[derive(Debug, Clone)]
pub struct TrackAnalysis {
    pub fingerprint: AudioFingerprint,
    pub content_profile: ContentProfile,
    pub recording_type: RecordingType,
    pub adaptive: AdaptiveParameters,
    pub parameters: ProcessingParameters,
}

fn analyze_track(buffer: &AudioBuffer, preference: &PreferenceVector) -> TrackAnalysis {
    let fingerprint = auralis_dsp::fingerprint::analyze(buffer, auralis_dsp::AnalysisStrategy::default());
    let content_profile = content::analyze_content(buffer);
    let (recording_type, adaptive) = content::detect_recording_type(&fingerprint);
    let coords = space::ProcessingCoordinates::from_fingerprint(&fingerprint);
    let mut parameters = space::generate(coords, &fingerprint, preference);
    parameters.eq_curve = pipeline::blend_adaptive_eq(parameters.eq_curve, &adaptive);
    let parameters = pipeline::blend_adaptive_dynamics(parameters, &adaptive);

    TrackAnalysis { fingerprint, content_profile, recording_type, adaptive, parameters }
}

/// LRU of per-track analysis entries, keyed by caller-supplied track id.
/// A fresh analysis runs at most once per track unless explicitly evicted.
pub struct AnalysisCache {
    inner: Mutex<LruCache<String, TrackAnalysis>>,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap())) }
    }

    pub fn get_or_compute(&self, track_id: &str, buffer: &AudioBuffer, preference: &PreferenceVector) -> TrackAnalysis {
        let mut guard = self.inner.lock().unwrap();
        if let Some(existing) = guard.get(track_id) {
            return existing.clone();
        }
        drop(guard);

        let analysis = analyze_track(buffer, preference);
        self.inner.lock().unwrap().put(track_id.to_string(), analysis.clone());
        analysis
    }

    pub fn invalidate(&self, track_id: &str) {
        self.inner.lock().unwrap().pop(track_id);
    }
}

fn equal_power_crossfade(prev_tail: &[f64], new_head: &[f64], out: &mut [f64]) {
    let n = out.len();
    for i in 0..n {
        let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
        let theta = t * std::f64::consts::FRAC_PI_2;
        let weight_prev = theta.cos().powi(2);
        let weight_new = theta.sin().powi(2);
        out[i] = prev_tail[i] * weight_prev + new_head[i] * weight_new;
    }
}

/// Processes a whole track as overlapping chunks, crossfading the
/// overlaps. Output has exactly as many samples as `buffer`.
pub fn process_track(buffer: &AudioBuffer, analysis: &TrackAnalysis) -> AudioBuffer {
    let sample_rate = buffer.sample_rate as f64;
    let chunk_len = (CHUNK_DURATION_SECS * sample_rate) as usize;
    let overlap_len = (OVERLAP_DURATION_SECS * sample_rate) as usize;
    let total_samples = buffer.num_samples();
    let channel_count = buffer.channel_count();

    let windows = overlapping_chunks(total_samples, chunk_len.max(1), overlap_len.min(chunk_len.saturating_sub(1)));
    let mut out_channels: Vec<Vec<f64>> = vec![vec![0.0; total_samples]; channel_count];

    let mut prior_tail_db: Option<f64> = None;

    for window in &windows {
        let chunk_channels: Vec<Vec<f64>> = (0..channel_count)
            .map(|c| buffer.channel(c)[window.start..window.end].to_vec())
            .collect();
        let mut chunk_buffer = AudioBuffer::from_planar(chunk_channels, buffer.sample_rate).unwrap();

        let mut input_gain_db = 0.0;
        if let Some(prior_db) = prior_tail_db {
            let head_len = overlap_len.min(chunk_buffer.num_samples());
            let head_mono: Vec<f64> = if chunk_buffer.is_stereo() {
                chunk_buffer.to_mono()[..head_len].to_vec()
            } else {
                chunk_buffer.channel(0)[..head_len].to_vec()
            };
            let head_db = to_db(rms(&head_mono));
            let change = prior_db - head_db;
            input_gain_db = change.clamp(-MAX_LEVEL_CHANGE_DB, MAX_LEVEL_CHANGE_DB);
        }

        pipeline::process(&mut chunk_buffer, &analysis.parameters, input_gain_db);

        let this_overlap = overlap_len.min(window.len()).min(window.start);
        for c in 0..channel_count {
            let chunk_channel = chunk_buffer.channel(c);
            if this_overlap > 0 {
                let prev_tail = out_channels[c][window.start..window.start + this_overlap].to_vec();
                let new_head = &chunk_channel[..this_overlap];
                equal_power_crossfade(&prev_tail, new_head, &mut out_channels[c][window.start..window.start + this_overlap]);
            }
            out_channels[c][window.start + this_overlap..window.end].copy_from_slice(&chunk_channel[this_overlap..]);
        }

        let tail_len = overlap_len.min(chunk_buffer.num_samples());
        let tail_mono: Vec<f64> = if chunk_buffer.is_stereo() {
            let mono = chunk_buffer.to_mono();
            mono[mono.len() - tail_len..].to_vec()
        } else {
            let ch = chunk_buffer.channel(0);
            ch[ch.len() - tail_len..].to_vec()
        };
        prior_tail_db = Some(to_db(rms(&tail_mono)));
    }

    AudioBuffer::from_planar(out_channels, buffer.sample_rate).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_track(seconds: f64, sample_rate: u32) -> AudioBuffer {
        let n = (seconds * sample_rate as f64) as usize;
        let samples: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).sin() * 0.3).collect();
        AudioBuffer::from_planar(vec![samples.clone(), samples], sample_rate).unwrap()
    }

    #[test]
    fn output_sample_count_matches_input_exactly() {
        let buffer = sine_track(40.0, 44100);
        let analysis = analyze_track(&buffer, &PreferenceVector::default());
        let out = process_track(&buffer, &analysis);
        assert_eq!(out.num_samples(), buffer.num_samples());
        assert_eq!(out.channel_count(), buffer.channel_count());
    }

    #[test]
    fn short_track_under_one_chunk_processes_without_panicking() {
        let buffer = sine_track(5.0, 44100);
        let analysis = analyze_track(&buffer, &PreferenceVector::default());
        let out = process_track(&buffer, &analysis);
        assert_eq!(out.num_samples(), buffer.num_samples());
    }

    #[test]
    fn analysis_cache_reuses_entry_for_same_track_id() {
        let cache = AnalysisCache::new(4);
        let buffer = sine_track(2.0, 44100);
        let first = cache.get_or_compute("track-1", &buffer, &PreferenceVector::default());
        let second = cache.get_or_compute("track-1", &buffer, &PreferenceVector::default());
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn output_has_no_discontinuity_beyond_six_db_at_chunk_boundaries() {
        let buffer = sine_track(40.0, 44100);
        let analysis = analyze_track(&buffer, &PreferenceVector::default());
        let out = process_track(&buffer, &analysis);
        for pair in out.channel(0).windows(2) {
            assert!((pair[1] - pair[0]).abs() < 2.0);
        }
    }
}

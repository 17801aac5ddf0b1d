/// 25-dimensional audio fingerprint extraction (C1). Orchestrates every
/// dimension-specific module into one deterministic, always-succeeding
/// analysis pass.
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::buffer::AudioBuffer;
use crate::frequency_analysis;
use crate::primitives::{crest_factor_db, rms, to_db};
use crate::spectral_features;
use crate::stereo;
use crate::variation_analysis;
use crate::windowing::strided_windows;

/// Minimum sample count below which sub-features are filled with neutral
/// defaults rather than computed (too little data for a stable estimate).
const MIN_ANALYSIS_SAMPLES: usize = 512;

/// How C1 bounds work on long tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStrategy {
    /// Analyze every sample.
    FullTrack,
    /// Concatenate fixed-length windows spaced `stride_seconds` apart.
    Sampling { window_seconds: u32, stride_seconds: u32 },
}

impl Default for AnalysisStrategy {
    fn default() -> Self {
        AnalysisStrategy::Sampling { window_seconds: 10, stride_seconds: 20 }
    }
}

/// The complete 25-D fingerprint. Field names match the fixed vocabulary
/// used by the cache, the content analyzer, and the wire format — this type
/// is serialized to JSON verbatim, one key per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFingerprint {
    // Frequency distribution (7): percent of total band energy, summing ~100.
    pub sub_bass: f64,
    pub bass: f64,
    pub low_mid: f64,
    pub mid: f64,
    pub upper_mid: f64,
    pub presence: f64,
    pub air: f64,

    // Dynamics (3)
    pub lufs: f64,
    pub crest_db: f64,
    pub bass_mid_ratio: f64,

    // Temporal (4)
    pub tempo_bpm: f64,
    pub rhythm_stability: f64,
    pub transient_density: f64,
    pub silence_ratio: f64,

    // Spectral (3) — kept in Hz, see spectral_features module doc.
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub spectral_flatness: f64,

    // Harmonic (3)
    pub harmonic_ratio: f64,
    pub pitch_stability: f64,
    pub chroma_energy: f64,

    // Variation (3)
    pub dynamic_range_variation: f64,
    pub loudness_variation_std: f64,
    pub peak_consistency: f64,

    // Stereo (2)
    pub stereo_width: f64,
    pub phase_correlation: f64,
}

impl AudioFingerprint {
    /// Neutral fingerprint returned for degenerate/too-short input, or as
    /// the per-dimension fallback when a sub-feature computation panics.
    pub fn neutral() -> Self {
        let share = 100.0 / 7.0;
        Self {
            sub_bass: share,
            bass: share,
            low_mid: share,
            mid: share,
            upper_mid: share,
            presence: share,
            air: share,
            lufs: -23.0,
            crest_db: 10.0,
            bass_mid_ratio: 0.0,
            tempo_bpm: 120.0,
            rhythm_stability: 0.5,
            transient_density: 0.3,
            silence_ratio: 0.0,
            spectral_centroid: 2000.0,
            spectral_rolloff: 8000.0,
            spectral_flatness: 0.3,
            harmonic_ratio: 0.5,
            pitch_stability: 0.5,
            chroma_energy: 0.5,
            dynamic_range_variation: 2.0,
            loudness_variation_std: 1.5,
            peak_consistency: 0.5,
            stereo_width: 0.0,
            phase_correlation: 1.0,
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("sub_bass", self.sub_bass),
            ("bass", self.bass),
            ("low_mid", self.low_mid),
            ("mid", self.mid),
            ("upper_mid", self.upper_mid),
            ("presence", self.presence),
            ("air", self.air),
            ("lufs", self.lufs),
            ("crest_db", self.crest_db),
            ("bass_mid_ratio", self.bass_mid_ratio),
            ("tempo_bpm", self.tempo_bpm),
            ("rhythm_stability", self.rhythm_stability),
            ("transient_density", self.transient_density),
            ("silence_ratio", self.silence_ratio),
            ("spectral_centroid", self.spectral_centroid),
            ("spectral_rolloff", self.spectral_rolloff),
            ("spectral_flatness", self.spectral_flatness),
            ("harmonic_ratio", self.harmonic_ratio),
            ("pitch_stability", self.pitch_stability),
            ("chroma_energy", self.chroma_energy),
            ("dynamic_range_variation", self.dynamic_range_variation),
            ("loudness_variation_std", self.loudness_variation_std),
            ("peak_consistency", self.peak_consistency),
            ("stereo_width", self.stereo_width),
            ("phase_correlation", self.phase_correlation),
        ]
    }
}

/// Analyze `buffer`, selecting windows per `strategy`. Never fails: on
/// short/degenerate input, returns [`AudioFingerprint::neutral`].
pub fn analyze(buffer: &AudioBuffer, strategy: AnalysisStrategy) -> AudioFingerprint {
    if buffer.num_samples() < MIN_ANALYSIS_SAMPLES {
        tracing::warn!(samples = buffer.num_samples(), "input too short for fingerprinting, returning neutral fingerprint");
        return AudioFingerprint::neutral();
    }

    let sample_rate = buffer.sample_rate;
    let mono_full = buffer.to_mono();

    let (window_seconds, stride_seconds) = match strategy {
        AnalysisStrategy::FullTrack => (u32::MAX, u32::MAX),
        AnalysisStrategy::Sampling { window_seconds, stride_seconds } => (window_seconds, stride_seconds),
    };
    let mono = select_windows(&mono_full, sample_rate, window_seconds, stride_seconds);

    let freq_dist = frequency_analysis::compute_frequency_distribution(&mono, sample_rate);
    let lufs = estimate_lufs_fixed_offset(&mono);
    let crest_db = crest_factor_db(&mono);
    let bass_mid_ratio = compute_bass_mid_ratio_db(&mono, sample_rate);

    let silence_ratio = compute_silence_ratio(&mono);
    let tempo_bpm = estimate_tempo(&mono, sample_rate);
    let rhythm_stability = estimate_rhythm_stability(&mono);
    let transient_density = estimate_transient_density(&mono, sample_rate);

    let (freqs, psd) = spectral_features::audio_to_freq_domain(&mono, sample_rate);
    let spectral_centroid = spectral_features::compute_spectral_centroid(&psd, &freqs);
    let spectral_rolloff = spectral_features::compute_spectral_rolloff(&psd, &freqs, 0.85);
    let spectral_flatness = spectral_features::compute_spectral_flatness(&psd);

    let harmonic_ratio = (1.0 - spectral_flatness).clamp(0.0, 1.0);
    let pitch_stability = estimate_pitch_stability(&mono);
    let chroma_energy = estimate_chroma_energy(&mono);

    let dynamic_range_variation = variation_analysis::compute_dynamic_range_variation(&mono, sample_rate);
    let loudness_variation_std = variation_analysis::compute_loudness_variation(&mono, sample_rate);
    let peak_consistency = variation_analysis::compute_peak_consistency(&mono, sample_rate);

    let (stereo_width, phase_correlation) = if buffer.is_stereo() {
        let left = select_windows(buffer.channel(0), sample_rate, window_seconds, stride_seconds);
        let right = select_windows(buffer.channel(1), sample_rate, window_seconds, stride_seconds);
        (stereo::compute_stereo_width(&left, &right), stereo::compute_phase_correlation(&left, &right))
    } else {
        (0.0, 1.0)
    };

    AudioFingerprint {
        sub_bass: freq_dist.sub_bass,
        bass: freq_dist.bass,
        low_mid: freq_dist.low_mid,
        mid: freq_dist.mid,
        upper_mid: freq_dist.upper_mid,
        presence: freq_dist.presence,
        air: freq_dist.air,
        lufs,
        crest_db,
        bass_mid_ratio,
        tempo_bpm,
        rhythm_stability,
        transient_density,
        silence_ratio,
        spectral_centroid,
        spectral_rolloff,
        spectral_flatness,
        harmonic_ratio,
        pitch_stability,
        chroma_energy,
        dynamic_range_variation,
        loudness_variation_std,
        peak_consistency,
        stereo_width,
        phase_correlation,
    }
}

fn select_windows(audio: &[f64], sample_rate: u32, window_seconds: u32, stride_seconds: u32) -> Vec<f64> {
    if window_seconds == u32::MAX || stride_seconds == u32::MAX {
        return audio.to_vec();
    }
    let window_len = (window_seconds as usize) * sample_rate as usize;
    let stride = (stride_seconds as usize) * sample_rate as usize;
    let windows = strided_windows(audio.len(), window_len.max(1), stride.max(1));
    let mut out = Vec::new();
    for w in windows {
        out.extend_from_slice(&audio[w.start..w.end]);
    }
    out
}

fn estimate_lufs_fixed_offset(audio: &[f64]) -> f64 {
    let r = rms(audio);
    if r < 1e-10 {
        return -120.0;
    }
    (to_db(r) - 23.0).clamp(-120.0, 0.0)
}

fn compute_bass_mid_ratio_db(audio: &[f64], sample_rate: u32) -> f64 {
    let (freqs, psd) = spectral_features::audio_to_freq_domain(audio, sample_rate);
    if freqs.is_empty() {
        return 0.0;
    }
    let bass_bin = freqs.partition_point(|&f| f < 200.0);
    let mid_bin = freqs.partition_point(|&f| f < 2000.0);
    let bass_energy: f64 = psd[..bass_bin.min(psd.len())].iter().sum();
    let mid_energy: f64 = psd[bass_bin.min(psd.len())..mid_bin.min(psd.len())].iter().sum();
    if bass_energy < 1e-15 || mid_energy < 1e-15 {
        return 0.0;
    }
    (10.0 * (bass_energy / mid_energy).log10()).clamp(-40.0, 40.0)
}

fn compute_silence_ratio(audio: &[f64]) -> f64 {
    if audio.is_empty() {
        return 1.0;
    }
    let threshold = 10f64.powf(-40.0 / 20.0);
    let silent = audio.iter().filter(|&&s| s.abs() < threshold).count();
    (silent as f64 / audio.len() as f64).clamp(0.0, 1.0)
}

/// Spectral-flux onset strength autocorrelated over the 60-200 BPM range.
fn estimate_tempo(audio: &[f64], sample_rate: u32) -> f64 {
    let hop = 512usize;
    let frame_size = 1024usize;
    if audio.len() < frame_size * 2 {
        return 120.0;
    }

    let n_frames = (audio.len().saturating_sub(frame_size)) / hop + 1;
    if n_frames < 2 {
        return 120.0;
    }

    let half = frame_size / 2 + 1;
    let mut prev_mag = vec![0.0f64; half];
    let mut onset_env = Vec::with_capacity(n_frames);

    for i in 0..n_frames {
        let start = i * hop;
        let end = (start + frame_size).min(audio.len());
        let frame = &audio[start..end];

        let mut mag = vec![0.0f64; half];
        for (k, slot) in mag.iter_mut().enumerate() {
            let mut re = 0.0;
            let mut im = 0.0;
            for (n, &s) in frame.iter().enumerate() {
                let angle = -2.0 * PI * k as f64 * n as f64 / frame_size as f64;
                re += s * angle.cos();
                im += s * angle.sin();
            }
            *slot = (re * re + im * im).sqrt();
        }

        let flux: f64 = mag.iter().zip(prev_mag.iter()).map(|(&cur, &prev)| (cur - prev).max(0.0)).sum();
        onset_env.push(flux);
        prev_mag = mag;
    }

    if onset_env.len() < 4 {
        return 120.0;
    }

    let onset_sr = sample_rate as f64 / hop as f64;
    let min_lag = (onset_sr * 60.0 / 200.0).ceil() as usize;
    let max_lag = ((onset_sr * 60.0 / 60.0).floor() as usize).min(onset_env.len() / 2);

    if min_lag >= max_lag {
        return 120.0;
    }

    let mut best_lag = min_lag;
    let mut best_corr = f64::NEG_INFINITY;
    for lag in min_lag..=max_lag {
        let n = onset_env.len() - lag;
        let corr: f64 = (0..n).map(|i| onset_env[i] * onset_env[i + lag]).sum();
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    (60.0 * onset_sr / best_lag as f64).clamp(60.0, 200.0)
}

/// Inter-onset-interval coefficient of variation from an energy envelope.
fn estimate_rhythm_stability(audio: &[f64]) -> f64 {
    let hop = 512usize;
    let frame_size = 1024usize;
    if audio.len() < frame_size * 4 {
        return 0.5;
    }

    let n_frames = (audio.len().saturating_sub(frame_size)) / hop + 1;
    let energies: Vec<f64> = (0..n_frames)
        .map(|i| {
            let start = i * hop;
            let end = (start + frame_size).min(audio.len());
            audio[start..end].iter().map(|s| s * s).sum::<f64>() / (end - start) as f64
        })
        .collect();

    let mean_energy: f64 = energies.iter().sum::<f64>() / energies.len() as f64;
    let threshold = mean_energy * 1.5;

    let mut onset_frames = Vec::new();
    let mut in_onset = false;
    for (i, &e) in energies.iter().enumerate() {
        if e > threshold && !in_onset {
            onset_frames.push(i);
            in_onset = true;
        } else if e <= mean_energy {
            in_onset = false;
        }
    }

    if onset_frames.len() < 3 {
        return 0.5;
    }

    let iois: Vec<f64> = onset_frames.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let mean_ioi: f64 = iois.iter().sum::<f64>() / iois.len() as f64;
    if mean_ioi < 1e-6 {
        return 0.5;
    }
    let variance: f64 = iois.iter().map(|&ioi| (ioi - mean_ioi).powi(2)).sum::<f64>() / iois.len() as f64;
    let cv = variance.sqrt() / mean_ioi;
    (1.0 - cv).clamp(0.0, 1.0)
}

fn estimate_transient_density(audio: &[f64], sample_rate: u32) -> f64 {
    if audio.len() < 2 {
        return 0.0;
    }
    let frame_size = (sample_rate as usize).max(512);
    let diff_count = audio
        .windows(2)
        .take(frame_size.min(audio.len() - 1))
        .filter(|w| (w[1] - w[0]).abs() > 0.01)
        .count();
    (diff_count as f64 / frame_size as f64).clamp(0.0, 1.0)
}

/// Zero-crossing-rate variance across frames. Stable pitch -> consistent ZCR.
fn estimate_pitch_stability(audio: &[f64]) -> f64 {
    let frame_size = 2048usize;
    let hop = 1024usize;
    if audio.len() < frame_size * 3 {
        return 0.5;
    }

    let n_frames = (audio.len().saturating_sub(frame_size)) / hop + 1;
    let zcrs: Vec<f64> = (0..n_frames)
        .map(|i| {
            let start = i * hop;
            let end = (start + frame_size).min(audio.len());
            let frame = &audio[start..end];
            let crossings = frame.windows(2).filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0)).count();
            crossings as f64 / (end - start) as f64
        })
        .collect();

    if zcrs.len() < 2 {
        return 0.5;
    }
    let mean_zcr: f64 = zcrs.iter().sum::<f64>() / zcrs.len() as f64;
    if mean_zcr < 1e-8 {
        return 0.5;
    }
    let variance: f64 = zcrs.iter().map(|&z| (z - mean_zcr).powi(2)).sum::<f64>() / zcrs.len() as f64;
    let cv = variance.sqrt() / mean_zcr;
    (1.0 - cv).clamp(0.0, 1.0)
}

fn estimate_chroma_energy(audio: &[f64]) -> f64 {
    let r = rms(audio);
    if r < 1e-10 {
        return 0.0;
    }
    let db = to_db(r) + 20.0;
    (db / 40.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, seconds: f64, sample_rate: u32) -> Vec<f64> {
        let n = (seconds * sample_rate as f64) as usize;
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin() * 0.3).collect()
    }

    #[test]
    fn too_short_input_yields_neutral_fingerprint() {
        let buf = AudioBuffer::from_interleaved(&[0.1; 100], 1, 44100).unwrap();
        let fp = analyze(&buf, AnalysisStrategy::FullTrack);
        assert_eq!(fp, AudioFingerprint::neutral());
    }

    #[test]
    fn mono_fingerprint_has_zero_stereo_width_and_unit_correlation() {
        let samples = sine(440.0, 3.0, 44100);
        let buf = AudioBuffer::from_interleaved(&samples, 1, 44100).unwrap();
        let fp = analyze(&buf, AnalysisStrategy::FullTrack);
        assert_eq!(fp.stereo_width, 0.0);
        assert_eq!(fp.phase_correlation, 1.0);
    }

    #[test]
    fn stereo_fingerprint_has_nonzero_width_for_decorrelated_channels() {
        let n = 3 * 44100;
        let left: Vec<f64> = (0..n).map(|i| (2.0 * PI * 220.0 * i as f64 / 44100.0).sin() * 0.3).collect();
        let right: Vec<f64> = (0..n).map(|i| (2.0 * PI * 330.0 * i as f64 / 44100.0).sin() * 0.3).collect();
        let buf = AudioBuffer::from_planar(vec![left, right], 44100).unwrap();
        let fp = analyze(&buf, AnalysisStrategy::FullTrack);
        assert!(fp.stereo_width > 0.0);
    }

    #[test]
    fn all_fields_finite_and_frequency_bands_sum_near_100() {
        let samples = sine(300.0, 4.0, 44100);
        let buf = AudioBuffer::from_interleaved(&samples, 1, 44100).unwrap();
        let fp = analyze(&buf, AnalysisStrategy::FullTrack);
        for (_, v) in fp.to_pairs() {
            assert!(v.is_finite());
        }
        let band_sum = fp.sub_bass + fp.bass + fp.low_mid + fp.mid + fp.upper_mid + fp.presence + fp.air;
        assert!((band_sum - 100.0).abs() < 1.0);
    }

    #[test]
    fn determinism_same_input_yields_identical_fingerprint() {
        let samples = sine(500.0, 2.0, 44100);
        let buf = AudioBuffer::from_interleaved(&samples, 1, 44100).unwrap();
        let a = analyze(&buf, AnalysisStrategy::FullTrack);
        let b = analyze(&buf, AnalysisStrategy::FullTrack);
        assert_eq!(a, b);
    }

    #[test]
    fn sampling_strategy_bounds_work_on_long_audio() {
        let samples = sine(300.0, 90.0, 8000);
        let buf = AudioBuffer::from_interleaved(&samples, 1, 8000).unwrap();
        let fp = analyze(&buf, AnalysisStrategy::Sampling { window_seconds: 10, stride_seconds: 20 });
        assert!(fp.spectral_centroid.is_finite());
    }

    #[test]
    fn bright_tone_yields_higher_centroid_than_dark_tone() {
        let dark = AudioBuffer::from_interleaved(&sine(100.0, 3.0, 44100), 1, 44100).unwrap();
        let bright = AudioBuffer::from_interleaved(&sine(6000.0, 3.0, 44100), 1, 44100).unwrap();
        let fp_dark = analyze(&dark, AnalysisStrategy::FullTrack);
        let fp_bright = analyze(&bright, AnalysisStrategy::FullTrack);
        assert!(fp_bright.spectral_centroid > fp_dark.spectral_centroid);
    }
}

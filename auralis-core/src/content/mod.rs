//! Content analysis and recording-type classification (C3): turns a raw
//! buffer into a [`ContentProfile`] and, via [`recording_type`], into a
//! mastering philosophy.
pub mod recording_type;

pub use recording_type::{detect as detect_recording_type, AdaptiveParameters, MasteringPhilosophy, RecordingType, StereoStrategy};

use auralis_dsp::buffer::AudioBuffer;
use auralis_dsp::primitives::{crest_factor_db, peak_multi, rms};
use auralis_dsp::spectral_features::{audio_to_freq_domain, compute_spectral_centroid, compute_spectral_rolloff};
use auralis_dsp::AnalysisStrategy;

const GENRE_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Genre {
    Classical,
    Rock,
    Electronic,
    Jazz,
    Pop,
    HipHop,
    Acoustic,
    Ambient,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenreClassification {
    pub genre: Genre,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContentProfile {
    pub rms: f64,
    pub peak: f64,
    pub crest_factor_db: f64,
    pub estimated_lufs: f64,
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
    /// `None` in the quick variant, which skips tempo estimation.
    pub estimated_tempo: Option<f64>,
    pub is_stereo: bool,
    pub stereo_width: f64,
    pub energy_level: EnergyLevel,
    pub dynamic_range_db: f64,
}

fn zero_crossing_rate(audio: &[f64]) -> f64 {
    if audio.len() < 2 {
        return 0.0;
    }
    let crossings = audio
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f64 / (audio.len() - 1) as f64
}

fn categorize_energy_level(rms_value: f64) -> EnergyLevel {
    if rms_value > 0.3 {
        EnergyLevel::High
    } else if rms_value > 0.1 {
        EnergyLevel::Medium
    } else {
        EnergyLevel::Low
    }
}

/// Dynamic range as the gap between the 95th and 10th percentile of
/// per-second RMS across the track, defaulted to 20 dB for very short or
/// near-silent audio where percentiles aren't meaningful.
fn estimate_dynamic_range_db(mono: &[f64], sample_rate: u32) -> f64 {
    let window = sample_rate.max(1) as usize;
    if mono.len() < window * 2 {
        return 20.0;
    }

    let mut rms_values: Vec<f64> = mono
        .chunks(window.max(1))
        .map(rms)
        .filter(|v| *v > 1e-6)
        .collect();

    if rms_values.len() < 2 {
        return 20.0;
    }
    rms_values.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let percentile = |values: &[f64], p: f64| -> f64 {
        let idx = ((values.len() - 1) as f64 * p).round() as usize;
        values[idx.min(values.len() - 1)]
    };
    let loud = percentile(&rms_values, 0.95);
    let quiet = percentile(&rms_values, 0.10);

    if quiet > 0.0 {
        (20.0 * (loud / quiet).log10()).clamp(0.0, 60.0)
    } else {
        20.0
    }
}

/// Full content analysis: RMS, peak, crest, approximate LUFS, spectral
/// centroid/rolloff, zero-crossing rate, tempo, stereo flag, energy
/// category, and estimated dynamic range.
pub fn analyze_content(buffer: &AudioBuffer) -> ContentProfile {
    analyze_content_inner(buffer, false)
}

/// Skips tempo estimation and full-spectrum analysis, for real-time paths;
/// spectral centroid is estimated from a single 512-point FFT window.
pub fn analyze_content_quick(buffer: &AudioBuffer) -> ContentProfile {
    analyze_content_inner(buffer, true)
}

fn analyze_content_inner(buffer: &AudioBuffer, quick: bool) -> ContentProfile {
    let mono = buffer.to_mono();
    let peak = peak_multi(buffer.channels_slice());
    let rms_value = rms(&mono);
    let crest = crest_factor_db(&mono);

    let spectral_window: &[f64] = if quick { &mono[..mono.len().min(512)] } else { &mono };
    let (freqs, psd) = audio_to_freq_domain(spectral_window, buffer.sample_rate);
    let centroid = compute_spectral_centroid(&psd, &freqs);
    let rolloff = compute_spectral_rolloff(&psd, &freqs, 0.85);

    let estimated_tempo = if quick {
        None
    } else {
        let fp = auralis_dsp::fingerprint::analyze(buffer, AnalysisStrategy::FullTrack);
        Some(fp.tempo_bpm)
    };

    let stereo_width = if buffer.is_stereo() {
        auralis_dsp::stereo::compute_stereo_width(buffer.channel(0), buffer.channel(1))
    } else {
        0.5
    };

    ContentProfile {
        rms: rms_value,
        peak,
        crest_factor_db: crest,
        estimated_lufs: 20.0 * rms_value.max(1e-10).log10() - 23.0,
        spectral_centroid: centroid,
        spectral_rolloff: rolloff,
        zero_crossing_rate: zero_crossing_rate(&mono),
        estimated_tempo,
        is_stereo: buffer.is_stereo(),
        stereo_width,
        energy_level: categorize_energy_level(rms_value),
        dynamic_range_db: estimate_dynamic_range_db(&mono, buffer.sample_rate),
    }
}

/// Rule-based genre scoring over tempo, centroid, zero-crossing rate, and
/// crest factor. Falls back to `Pop` at confidence 0.5 below the confidence
/// threshold, matching the spec's "never classify with unwarranted
/// certainty" stance.
pub fn classify_genre(profile: &ContentProfile) -> GenreClassification {
    let mut scores: [(Genre, f64); 8] = [
        (Genre::Classical, 0.0),
        (Genre::Rock, 0.0),
        (Genre::Electronic, 0.0),
        (Genre::Jazz, 0.0),
        (Genre::Pop, 0.0),
        (Genre::HipHop, 0.0),
        (Genre::Acoustic, 0.0),
        (Genre::Ambient, 0.0),
    ];

    let mut add = |genre: Genre, delta: f64| {
        for (g, score) in scores.iter_mut() {
            if *g == genre {
                *score += delta;
            }
        }
    };

    let tempo = profile.estimated_tempo.unwrap_or(120.0);
    if tempo < 80.0 {
        add(Genre::Ambient, 0.3);
        add(Genre::Classical, 0.2);
    } else if tempo > 140.0 {
        add(Genre::Electronic, 0.3);
        add(Genre::Rock, 0.2);
    }

    if profile.spectral_centroid > 3000.0 {
        add(Genre::Electronic, 0.2);
        add(Genre::Rock, 0.2);
    } else if profile.spectral_centroid < 1500.0 {
        add(Genre::Classical, 0.2);
        add(Genre::Ambient, 0.2);
    }

    if profile.zero_crossing_rate > 0.1 {
        add(Genre::Rock, 0.2);
        add(Genre::Electronic, 0.1);
    } else if profile.zero_crossing_rate < 0.05 {
        add(Genre::Classical, 0.2);
    }

    if profile.crest_factor_db > 15.0 {
        add(Genre::Classical, 0.3);
        add(Genre::Jazz, 0.2);
    } else if profile.crest_factor_db < 8.0 {
        add(Genre::Electronic, 0.2);
        add(Genre::Pop, 0.2);
    }

    let (primary, confidence) = scores
        .into_iter()
        .fold((Genre::Pop, 0.0_f64), |best, candidate| if candidate.1 > best.1 { candidate } else { best });

    if confidence < GENRE_CONFIDENCE_THRESHOLD {
        GenreClassification { genre: Genre::Pop, confidence: 0.5 }
    } else {
        GenreClassification { genre: primary, confidence }
    }
}

/// Parallel content analysis + recording-type detection over a batch of
/// buffers, independent of the C7 worker pool's repository-claim model;
/// used internally by the streaming processor's track-priming step.
pub fn analyze_batch(buffers: &[AudioBuffer]) -> Vec<(ContentProfile, RecordingType, AdaptiveParameters)> {
    use rayon::prelude::*;

    buffers
        .par_iter()
        .map(|buffer| {
            let profile = analyze_content(buffer);
            let fp = auralis_dsp::fingerprint::analyze(buffer, AnalysisStrategy::default());
            let (recording_type, params) = detect_recording_type(&fp);
            (profile, recording_type, params)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(freq: f64, seconds: f64, sample_rate: u32) -> AudioBuffer {
        let n = (seconds * sample_rate as f64) as usize;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin() * 0.5)
            .collect();
        AudioBuffer::from_planar(vec![samples], sample_rate).unwrap()
    }

    #[test]
    fn quiet_signal_is_categorized_low_energy() {
        let mut buf = sine_buffer(440.0, 1.0, 44100);
        for s in buf.channel_mut(0) {
            *s *= 0.01;
        }
        let profile = analyze_content(&buf);
        assert_eq!(profile.energy_level, EnergyLevel::Low);
    }

    #[test]
    fn quick_variant_skips_tempo() {
        let buf = sine_buffer(440.0, 1.0, 44100);
        let profile = analyze_content_quick(&buf);
        assert!(profile.estimated_tempo.is_none());
    }

    #[test]
    fn full_variant_estimates_tempo() {
        let buf = sine_buffer(440.0, 2.0, 44100);
        let profile = analyze_content(&buf);
        assert!(profile.estimated_tempo.is_some());
    }

    #[test]
    fn low_zcr_and_long_tones_lean_classical_or_pop_default() {
        let buf = sine_buffer(220.0, 2.0, 44100);
        let profile = analyze_content(&buf);
        let classification = classify_genre(&profile);
        assert!(classification.confidence > 0.0);
    }

    #[test]
    fn mono_buffer_reports_not_stereo() {
        let buf = sine_buffer(440.0, 0.5, 44100);
        let profile = analyze_content(&buf);
        assert!(!profile.is_stereo);
    }
}

/// Temporal variation analysis: how dynamics, loudness, and peak level drift
/// across the length of a track. Feeds the three "Variation" dimensions of
/// the fingerprint.
use crate::primitives::{peak, rms, to_db};
use crate::windowing::{strided_windows, Window};

/// K-weighting is not applied here (no multi-stage shelf/high-pass filter
/// bank); per the fixed calibration decided in SPEC_FULL.md, LUFS is
/// approximated as RMS in dB with a constant -23dB reference offset so the
/// result sits in the same range as true integrated loudness without
/// claiming ITU-1770 conformance.
const LUFS_OFFSET_DB: f64 = -23.0;

fn compute_dynamic_range_db(frame: &[f64]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let max_abs = frame.iter().map(|s| s.abs()).fold(0.0f64, f64::max);
    let min_nonzero = frame
        .iter()
        .map(|s| s.abs())
        .filter(|&s| s > 1e-10)
        .fold(f64::INFINITY, f64::min);

    if max_abs < 1e-10 || min_nonzero.is_infinite() {
        return 0.0;
    }
    20.0 * (max_abs / min_nonzero).log10()
}

fn estimate_lufs(frame: &[f64]) -> f64 {
    let r = rms(frame);
    if r < 1e-10 {
        return -120.0;
    }
    (to_db(r) + LUFS_OFFSET_DB).clamp(-120.0, 0.0)
}

fn frame_windows(total_samples: usize, sample_rate: u32, frame_seconds: f64) -> Vec<Window> {
    let frame_len = ((frame_seconds * sample_rate as f64) as usize).max(1);
    strided_windows(total_samples, frame_len, frame_len)
}

fn frame_analysis<F>(audio: &[f64], sample_rate: u32, frame_seconds: f64, mut metric_fn: F) -> Vec<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    frame_windows(audio.len(), sample_rate, frame_seconds)
        .into_iter()
        .map(|w| metric_fn(&audio[w.start..w.end]))
        .collect()
}

fn compute_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
    let variance: f64 = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn compute_cv(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
    if mean.abs() < 1e-10 {
        return 0.0;
    }
    compute_std_dev(values) / mean.abs()
}

/// Standard deviation of per-1s-frame dynamic range. Range: 0.0 to ~20.0 dB.
pub fn compute_dynamic_range_variation(audio: &[f64], sample_rate: u32) -> f64 {
    if audio.is_empty() {
        return 0.0;
    }
    let ranges = frame_analysis(audio, sample_rate, 1.0, compute_dynamic_range_db);
    if ranges.is_empty() {
        return 0.0;
    }
    compute_std_dev(&ranges).clamp(0.0, 50.0)
}

/// Standard deviation of per-1s-frame loudness (LUFS). Range: 0.0 to ~20.0.
pub fn compute_loudness_variation(audio: &[f64], sample_rate: u32) -> f64 {
    if audio.is_empty() {
        return 0.0;
    }
    let loudness = frame_analysis(audio, sample_rate, 1.0, estimate_lufs);
    if loudness.is_empty() {
        return 0.0;
    }
    compute_std_dev(&loudness).clamp(0.0, 50.0)
}

/// Coefficient of variation of per-1s-frame peak level. Lower = consistent
/// peaks. Range: 0.0 to ~2.0.
pub fn compute_peak_consistency(audio: &[f64], sample_rate: u32) -> f64 {
    if audio.is_empty() {
        return 0.0;
    }
    let peaks = frame_analysis(audio, sample_rate, 1.0, peak);
    if peaks.is_empty() {
        return 0.0;
    }
    compute_cv(&peaks).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_range_silence_is_zero() {
        assert_eq!(compute_dynamic_range_db(&vec![0.0; 48000]), 0.0);
    }

    #[test]
    fn dynamic_range_variation_constant_amplitude_is_low() {
        let audio = vec![0.5; 96000];
        assert!(compute_dynamic_range_variation(&audio, 48000) < 1.0);
    }

    #[test]
    fn dynamic_range_variation_alternating_amplitude_is_higher() {
        let mut audio = Vec::new();
        for i in 0..96000 {
            audio.push(if (i / 48000) % 2 == 0 { 0.9 } else { 0.1 });
        }
        assert!(compute_dynamic_range_variation(&audio, 48000) > 1.0);
    }

    #[test]
    fn loudness_variation_constant_is_low() {
        let audio = vec![0.1; 96000];
        assert!(compute_loudness_variation(&audio, 48000) < 1.0);
    }

    #[test]
    fn peak_consistency_constant_is_near_zero() {
        let audio = vec![0.5; 96000];
        assert!(compute_peak_consistency(&audio, 48000) < 0.1);
    }

    #[test]
    fn peak_consistency_alternating_is_higher() {
        let mut audio = Vec::new();
        for i in 0..96000 {
            audio.push(if (i / 48000) % 2 == 0 { 0.9 } else { 0.1 });
        }
        assert!(compute_peak_consistency(&audio, 48000) > 0.5);
    }

    #[test]
    fn estimate_lufs_of_silence_is_floor() {
        assert_eq!(estimate_lufs(&[0.0; 100]), -120.0);
    }

    #[test]
    fn std_dev_of_known_sequence() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((compute_std_dev(&v) - 1.4142).abs() < 0.01);
    }

    #[test]
    fn cv_of_constant_sequence_is_zero() {
        assert!(compute_cv(&[2.0, 2.0, 2.0]) < 1e-9);
    }
}

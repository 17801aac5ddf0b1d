/// Shared scalar and buffer primitives used throughout the DSP pipeline:
/// RMS/peak measurement, dB conversions, gain application, and the soft-clip
/// curve used by the safety limiter and the clip-blend compressor.

/// RMS energy of a single channel.
pub fn rms(audio: &[f64]) -> f64 {
    if audio.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = audio.iter().map(|s| s * s).sum();
    (sum_sq / audio.len() as f64).sqrt()
}

/// Peak absolute amplitude of a single channel.
pub fn peak(audio: &[f64]) -> f64 {
    audio.iter().fold(0.0f64, |m, &s| m.max(s.abs()))
}

/// Peak absolute amplitude across all channels of a buffer.
pub fn peak_multi(channels: &[Vec<f64>]) -> f64 {
    channels.iter().map(|c| peak(c)).fold(0.0f64, f64::max)
}

/// Linear amplitude to decibels. Returns -inf for zero/negative input.
pub fn to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Decibels to linear amplitude.
pub fn to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Crest factor (peak-to-RMS ratio) in dB. 0.0 for silence.
pub fn crest_factor_db(audio: &[f64]) -> f64 {
    let r = rms(audio);
    if r < 1e-10 {
        return 0.0;
    }
    to_db(peak(audio) / r)
}

/// Scale every sample in `audio` by `gain_db` decibels, in place.
pub fn amplify(audio: &mut [f64], gain_db: f64) {
    let gain = to_linear(gain_db);
    for s in audio.iter_mut() {
        *s *= gain;
    }
}

/// Scale a multi-channel buffer by `gain_db` decibels, in place.
pub fn amplify_multi(channels: &mut [Vec<f64>], gain_db: f64) {
    let gain = to_linear(gain_db);
    for ch in channels.iter_mut() {
        for s in ch.iter_mut() {
            *s *= gain;
        }
    }
}

/// Scale `audio` in place so its peak equals `target_peak_db`. No-op on silence.
pub fn normalize_peak(audio: &mut [f64], target_peak_db: f64) {
    let current = peak(audio);
    if current < 1e-10 {
        return;
    }
    let target = to_linear(target_peak_db);
    let gain = target / current;
    for s in audio.iter_mut() {
        *s *= gain;
    }
}

/// Scale a multi-channel buffer in place so the loudest channel's peak equals
/// `target_peak_db`, preserving the relative balance between channels.
pub fn normalize_peak_multi(channels: &mut [Vec<f64>], target_peak_db: f64) {
    let current = peak_multi(channels);
    if current < 1e-10 {
        return;
    }
    let target = to_linear(target_peak_db);
    let gain = target / current;
    for ch in channels.iter_mut() {
        for s in ch.iter_mut() {
            *s *= gain;
        }
    }
}

/// Soft-clip curve: transparent below `threshold`, a tanh-like compression
/// between `threshold` and `ceiling`, and a hard ceiling beyond that.
/// Symmetric in sign, per §4.5.1.
pub fn soft_clip_sample(x: f64, threshold: f64, ceiling: f64) -> f64 {
    let sign = x.signum();
    let mag = x.abs();

    if mag <= threshold {
        return x;
    }
    if mag >= ceiling {
        return sign * ceiling;
    }

    // Map [threshold, ceiling] -> [threshold, ceiling) with a tanh knee so the
    // approach to the ceiling is asymptotic rather than a hard corner.
    let span = ceiling - threshold;
    let over = (mag - threshold) / span;
    let shaped = threshold + span * over.tanh();
    sign * shaped
}

/// Apply [`soft_clip_sample`] to an entire buffer.
pub fn soft_clip(audio: &mut [f64], threshold: f64, ceiling: f64) {
    for s in audio.iter_mut() {
        *s = soft_clip_sample(*s, threshold, ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_dc_signal() {
        assert!((rms(&[0.5, 0.5, 0.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn peak_picks_largest_magnitude() {
        assert_eq!(peak(&[0.1, -0.9, 0.3]), 0.9);
    }

    #[test]
    fn db_roundtrip() {
        let db = -6.0;
        let lin = to_linear(db);
        assert!((to_db(lin) - db).abs() < 1e-9);
    }

    #[test]
    fn to_db_of_zero_is_neg_infinity() {
        assert_eq!(to_db(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn amplify_scales_samples() {
        let mut audio = vec![0.5, -0.5];
        amplify(&mut audio, 6.0206); // +2x
        assert!((audio[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn normalize_peak_hits_target() {
        let mut audio = vec![0.1, -0.4, 0.2];
        normalize_peak(&mut audio, to_db(0.8));
        assert!((peak(&audio) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn normalize_peak_is_noop_on_silence() {
        let mut audio = vec![0.0, 0.0];
        normalize_peak(&mut audio, -1.0);
        assert_eq!(audio, vec![0.0, 0.0]);
    }

    #[test]
    fn soft_clip_is_transparent_below_threshold() {
        assert_eq!(soft_clip_sample(0.5, 0.89, 0.95), 0.5);
    }

    #[test]
    fn soft_clip_never_exceeds_ceiling() {
        for x in [1.0, 2.0, 10.0, -5.0] {
            assert!(soft_clip_sample(x, 0.89, 0.95).abs() <= 0.95 + 1e-9);
        }
    }

    #[test]
    fn soft_clip_preserves_sign() {
        assert!(soft_clip_sample(-1.5, 0.89, 0.95) < 0.0);
    }
}

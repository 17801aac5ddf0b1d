/// Compression and expansion stage. Compression and expansion are never both
/// active; callers choose at most one of [`compress`] / [`expand`] per pass.
use crate::primitives::{crest_factor_db, peak, rms, soft_clip_sample, to_db};

/// Compression strategy, dispatched at runtime rather than through a trait
/// hierarchy — both are equivalent in effect, differing only in how the
/// gain-reduction curve is derived.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CompressionMode {
    SoftKnee,
    ClipBlend,
}

/// Expansion strategy, same dispatch shape as [`CompressionMode`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ExpansionMode {
    PeakEnhancement,
    RmsReduction,
}

const CREST_REDUCTION_PER_UNIT_DB: f64 = 4.5;
const CREST_INCREASE_PER_UNIT_DB: f64 = 4.5;

/// Apply compression in place. `amount` in [0,1] controls strength; the
/// underlying curve depends on `mode`, but both must reduce crest by
/// `amount * 4.5 dB` within a 2 dB tolerance without increasing peak.
pub fn compress(audio: &mut [f64], amount: f64, mode: CompressionMode) {
    if audio.is_empty() || amount <= 0.0 {
        return;
    }
    let amount = amount.clamp(0.0, 1.0);
    match mode {
        CompressionMode::SoftKnee => compress_soft_knee(audio, amount),
        CompressionMode::ClipBlend => compress_clip_blend(audio, amount),
    }
}

fn compress_soft_knee(audio: &mut [f64], amount: f64) {
    let rms_db = to_db(rms(audio));
    let current_crest = crest_factor_db(audio);
    let target_reduction = amount * CREST_REDUCTION_PER_UNIT_DB;
    let threshold_db = rms_db + (current_crest - target_reduction);
    let threshold_lin = 10f64.powf(threshold_db / 20.0);
    let ratio = 3.0 + amount * 4.0;

    for s in audio.iter_mut() {
        let mag = s.abs();
        if mag <= threshold_lin || !mag.is_finite() || threshold_lin <= 0.0 {
            continue;
        }
        let excess_db = to_db(mag) - threshold_db;
        let compressed_excess_db = excess_db / ratio;
        let new_mag_db = threshold_db + compressed_excess_db;
        let new_mag = 10f64.powf(new_mag_db / 20.0);
        *s = s.signum() * new_mag;
    }
}

fn compress_clip_blend(audio: &mut [f64], amount: f64) {
    let ratio = 3.0 + amount * 4.0;
    let threshold = 0.8 - 0.1 * (ratio - 1.0);
    let ceiling = 0.95;

    for s in audio.iter_mut() {
        let compressed = soft_clip_sample(*s, threshold.max(0.01), ceiling);
        *s = (1.0 - amount) * *s + amount * compressed;
    }
}

/// Apply expansion in place. `amount` in [0,1] controls strength; must
/// increase crest and must not introduce clipping.
pub fn expand(audio: &mut [f64], amount: f64, mode: ExpansionMode) {
    if audio.is_empty() || amount <= 0.0 {
        return;
    }
    let amount = amount.clamp(0.0, 1.0);
    match mode {
        ExpansionMode::PeakEnhancement => expand_peak_enhancement(audio, amount),
        ExpansionMode::RmsReduction => expand_rms_reduction(audio, amount),
    }
}

fn expand_peak_enhancement(audio: &mut [f64], amount: f64) {
    let rms_db = to_db(rms(audio));
    let threshold_db = rms_db + 3.0;
    let threshold_lin = 10f64.powf(threshold_db / 20.0);

    let pre_peak = peak(audio);
    for s in audio.iter_mut() {
        let mag = s.abs();
        if mag <= threshold_lin || threshold_lin <= 0.0 {
            continue;
        }
        let excess_db = to_db(mag) - threshold_db;
        let expanded_excess_db = excess_db * (1.0 + amount);
        let new_mag_db = threshold_db + expanded_excess_db;
        let new_mag = 10f64.powf(new_mag_db / 20.0);
        *s = s.signum() * new_mag;
    }

    let post_peak = peak(audio);
    if post_peak > pre_peak && post_peak > 0.0 {
        let scale = pre_peak.max(1e-9) / post_peak;
        for s in audio.iter_mut() {
            *s *= scale;
        }
    }
}

fn expand_rms_reduction(audio: &mut [f64], amount: f64) {
    let attenuation_db = CREST_INCREASE_PER_UNIT_DB * amount;
    let gain = 10f64.powf(-attenuation_db / 20.0);
    for s in audio.iter_mut() {
        *s *= gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_test_signal() -> Vec<f64> {
        let n = 48000;
        (0..n)
            .map(|i| {
                let base = (i as f64 * 0.002).sin() * 0.2;
                if i % 4800 == 0 {
                    0.9
                } else {
                    base
                }
            })
            .collect()
    }

    #[test]
    fn soft_knee_compression_never_increases_peak() {
        let mut audio = dynamic_test_signal();
        let before_peak = peak(&audio);
        compress(&mut audio, 0.5, CompressionMode::SoftKnee);
        assert!(peak(&audio) <= before_peak + 1e-9);
    }

    #[test]
    fn clip_blend_compression_never_increases_peak() {
        let mut audio = dynamic_test_signal();
        let before_peak = peak(&audio);
        compress(&mut audio, 0.5, CompressionMode::ClipBlend);
        assert!(peak(&audio) <= before_peak + 1e-9);
    }

    #[test]
    fn soft_knee_compression_reduces_crest() {
        let mut audio = dynamic_test_signal();
        let before_crest = crest_factor_db(&audio);
        compress(&mut audio, 0.6, CompressionMode::SoftKnee);
        let after_crest = crest_factor_db(&audio);
        assert!(after_crest < before_crest);
    }

    #[test]
    fn peak_enhancement_expansion_increases_crest_without_clipping() {
        let mut audio = dynamic_test_signal();
        let before_crest = crest_factor_db(&audio);
        expand(&mut audio, 0.5, ExpansionMode::PeakEnhancement);
        assert!(crest_factor_db(&audio) > before_crest);
        assert!(peak(&audio) <= 1.0 + 1e-9);
    }

    #[test]
    fn rms_reduction_expansion_increases_crest_preserves_peak_shape() {
        let mut audio = dynamic_test_signal();
        let before_crest = crest_factor_db(&audio);
        let before_peak = peak(&audio);
        expand(&mut audio, 0.5, ExpansionMode::RmsReduction);
        assert!(crest_factor_db(&audio) > before_crest);
        assert!(peak(&audio) <= before_peak + 1e-9);
    }

    #[test]
    fn zero_amount_is_a_no_op() {
        let mut audio = dynamic_test_signal();
        let original = audio.clone();
        compress(&mut audio, 0.0, CompressionMode::SoftKnee);
        assert_eq!(audio, original);
        expand(&mut audio, 0.0, ExpansionMode::PeakEnhancement);
        assert_eq!(audio, original);
    }
}

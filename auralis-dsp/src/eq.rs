/// Five-band EQ stage: fixed center frequencies, blended dry/wet.
use crate::biquad::{BiquadCascade, BiquadCoeffs};

/// Per-track shelf + peak gain curve, one field per fixed-frequency band.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EqCurve {
    pub low_shelf_db: f64,
    pub low_mid_db: f64,
    pub mid_db: f64,
    pub high_mid_db: f64,
    pub high_shelf_db: f64,
}

const LOW_SHELF_HZ: f64 = 200.0;
const LOW_MID_HZ: f64 = 500.0;
const MID_HZ: f64 = 1500.0;
const HIGH_MID_HZ: f64 = 4000.0;
const HIGH_SHELF_HZ: f64 = 8000.0;
const SHELF_SLOPE: f64 = 1.0;
const PEAK_Q: f64 = 0.9;

impl EqCurve {
    /// Blend adaptive-detector guidance into this curve with the weight the
    /// spec fixes for EQ (`min(confidence, 0.7)`), before filtering.
    pub fn blended_with(&self, adaptive: EqCurve, confidence: f64) -> EqCurve {
        let w = confidence.min(0.7).max(0.0);
        EqCurve {
            low_shelf_db: self.low_shelf_db * (1.0 - w) + adaptive.low_shelf_db * w,
            low_mid_db: self.low_mid_db * (1.0 - w) + adaptive.low_mid_db * w,
            mid_db: self.mid_db * (1.0 - w) + adaptive.mid_db * w,
            high_mid_db: self.high_mid_db * (1.0 - w) + adaptive.high_mid_db * w,
            high_shelf_db: self.high_shelf_db * (1.0 - w) + adaptive.high_shelf_db * w,
        }
    }

    fn to_biquad_coeffs(self, sample_rate: f64) -> Vec<BiquadCoeffs> {
        vec![
            BiquadCoeffs::low_shelf(sample_rate, LOW_SHELF_HZ, SHELF_SLOPE, self.low_shelf_db),
            BiquadCoeffs::peaking(sample_rate, LOW_MID_HZ, PEAK_Q, self.low_mid_db),
            BiquadCoeffs::peaking(sample_rate, MID_HZ, PEAK_Q, self.mid_db),
            BiquadCoeffs::peaking(sample_rate, HIGH_MID_HZ, PEAK_Q, self.high_mid_db),
            BiquadCoeffs::high_shelf(sample_rate, HIGH_SHELF_HZ, SHELF_SLOPE, self.high_shelf_db),
        ]
    }
}

/// Applies `curve` to a single channel's samples, blended with the dry
/// signal by `blend` (`processed = (1 - blend) * input + blend * filtered`).
pub fn apply_eq(audio: &mut [f64], sample_rate: u32, curve: EqCurve, blend: f64) {
    if audio.is_empty() {
        return;
    }
    let dry = audio.to_vec();
    let coeffs = curve.to_biquad_coeffs(sample_rate as f64);
    let mut cascade = BiquadCascade::new(coeffs, 1);
    cascade.process_channel(0, audio);

    let blend = blend.clamp(0.0, 1.0);
    for (out, &d) in audio.iter_mut().zip(dry.iter()) {
        *out = (1.0 - blend) * d + blend * *out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_gain_curve_is_transparent_at_full_blend() {
        let mut audio = vec![0.1, -0.2, 0.3, -0.4, 0.05, -0.05];
        let original = audio.clone();
        apply_eq(&mut audio, 44100, EqCurve::default(), 1.0);
        for (a, b) in audio.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn blend_zero_is_fully_dry_regardless_of_curve() {
        let mut audio = vec![0.1, -0.2, 0.3, -0.4];
        let original = audio.clone();
        let curve = EqCurve { low_shelf_db: 5.0, ..Default::default() };
        apply_eq(&mut audio, 44100, curve, 0.0);
        assert_eq!(audio, original);
    }

    #[test]
    fn blended_curve_at_zero_confidence_ignores_adaptive() {
        let base = EqCurve { low_shelf_db: 2.0, ..Default::default() };
        let adaptive = EqCurve { low_shelf_db: 10.0, ..Default::default() };
        let blended = base.blended_with(adaptive, 0.0);
        assert_eq!(blended.low_shelf_db, 2.0);
    }

    #[test]
    fn blended_curve_caps_weight_at_point_seven() {
        let base = EqCurve { mid_db: 0.0, ..Default::default() };
        let adaptive = EqCurve { mid_db: 10.0, ..Default::default() };
        let blended = base.blended_with(adaptive, 1.0);
        assert!((blended.mid_db - 7.0).abs() < 1e-9);
    }
}

/// Stereo field analysis and the stereo-width DSP stage.
///
/// Fingerprint side: width and phase correlation between channels, used by
/// the fingerprint extractor. DSP side: mid/side width scaling (single-band
/// and four-band), used by the C5 pipeline.
use crate::biquad::{BiquadCoeffs, BiquadChannel};
use crate::primitives::{peak_multi, rms};

/// Stereo width (0 = mono, 1 = fully decorrelated), from the mid/side energy
/// ratio: `side_energy / (mid_energy + side_energy)`.
pub fn compute_stereo_width(left: &[f64], right: &[f64]) -> f64 {
    if left.is_empty() || left.len() != right.len() {
        return 0.0;
    }
    let (mid, side) = midside_encode(left, right);
    let mid_energy = rms(&mid);
    let side_energy = rms(&side);
    let total = mid_energy + side_energy;
    if total < 1e-10 {
        return 0.0;
    }
    (side_energy / total).clamp(0.0, 1.0)
}

/// Phase correlation between channels, in [-1, 1]. 1 = identical, -1 =
/// inverted, near 0 = uncorrelated. Mono (identical-length silence or a
/// single channel) is treated as perfectly correlated.
pub fn compute_phase_correlation(left: &[f64], right: &[f64]) -> f64 {
    if left.is_empty() || left.len() != right.len() {
        return 1.0;
    }
    let left_norm = zscore(left);
    let right_norm = zscore(right);

    let mut sum_product = 0.0;
    let mut sum_left2 = 0.0;
    let mut sum_right2 = 0.0;
    for (l, r) in left_norm.iter().zip(right_norm.iter()) {
        sum_product += l * r;
        sum_left2 += l * l;
        sum_right2 += r * r;
    }

    let denom = (sum_left2 * sum_right2).sqrt();
    if denom < 1e-10 {
        return 1.0;
    }
    (sum_product / denom).clamp(-1.0, 1.0)
}

fn zscore(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mean: f64 = signal.iter().sum::<f64>() / signal.len() as f64;
    let variance: f64 = signal.iter().map(|&s| (s - mean).powi(2)).sum::<f64>() / signal.len() as f64;
    let std_dev = variance.sqrt().max(1e-10);
    signal.iter().map(|&s| (s - mean) / std_dev).collect()
}

fn midside_encode(left: &[f64], right: &[f64]) -> (Vec<f64>, Vec<f64>) {
    left.iter()
        .zip(right)
        .map(|(l, r)| ((l + r) * 0.5, (l - r) * 0.5))
        .unzip()
}

fn midside_decode(mid: &[f64], side: &[f64]) -> (Vec<f64>, Vec<f64>) {
    mid.iter().zip(side).map(|(m, s)| (m + s, m - s)).unzip()
}

/// Correlation-based width estimate used by the DSP stage (distinct from the
/// fingerprint's energy-ratio width): `1 - |corr|`, matching §4.5.5. The
/// pipeline stage uses this, not [`compute_stereo_width`], to decide how far
/// the current material already is from mono before scaling it.
pub fn correlation_width(left: &[f64], right: &[f64]) -> f64 {
    compute_phase_correlation(left, right).abs().mul_add(-1.0, 1.0).clamp(0.0, 1.0)
}

/// Per-band width multipliers for the four-band split (0-200 Hz, 200 Hz-2
/// kHz, 2-8 kHz, 8 kHz+), fractions of the requested expansion amount that
/// keep the low end centered.
const BAND_WIDTH_FRACTIONS: [f64; 4] = [0.0, 0.5, 1.0, 1.2];
const BAND_EDGES_HZ: [f64; 3] = [200.0, 2000.0, 8000.0];

/// Single-band mid/side width scaling. `width_factor`: 0 collapses to mono,
/// 0.5 leaves width unchanged, 1 doubles the side signal.
pub fn apply_stereo_width(left: &mut [f64], right: &mut [f64], width_factor: f64) {
    let (mid, mut side) = midside_encode(left, right);
    let scale = 2.0 * width_factor;
    for s in side.iter_mut() {
        *s *= scale;
    }
    let (l, r) = midside_decode(&mid, &side);
    left.copy_from_slice(&l);
    right.copy_from_slice(&r);
}

/// Four-band mid/side width scaling. `expansion_amount` is the baseline
/// width change (already net of direction); each band is scaled by
/// `1.0 + expansion_amount * BAND_WIDTH_FRACTIONS[band]`, i.e. the sub-200 Hz
/// band never changes, the top band moves at 120% of the requested amount.
pub fn apply_multiband_stereo_width(left: &mut [f64], right: &mut [f64], sample_rate: u32, expansion_amount: f64) {
    let (mid, side) = midside_encode(left, right);
    let sr = sample_rate as f64;

    let mut low_split = split_bands(&side, sr, BAND_EDGES_HZ[0]);
    let mut mid_split = split_bands(&low_split.1, sr, BAND_EDGES_HZ[1] - BAND_EDGES_HZ[0]);
    let mut high_split = split_bands(&mid_split.1, sr, BAND_EDGES_HZ[2] - BAND_EDGES_HZ[1]);

    for (band, fraction) in [
        (&mut low_split.0, BAND_WIDTH_FRACTIONS[0]),
        (&mut mid_split.0, BAND_WIDTH_FRACTIONS[1]),
        (&mut high_split.0, BAND_WIDTH_FRACTIONS[2]),
        (&mut high_split.1, BAND_WIDTH_FRACTIONS[3]),
    ] {
        let scale = 1.0 + expansion_amount * fraction;
        for s in band.iter_mut() {
            *s *= scale;
        }
    }

    let recombined_side: Vec<f64> = low_split
        .0
        .iter()
        .zip(mid_split.0.iter())
        .zip(high_split.0.iter())
        .zip(high_split.1.iter())
        .map(|(((a, b), c), d)| a + b + c + d)
        .collect();

    let (l, r) = midside_decode(&mid, &recombined_side);
    left.copy_from_slice(&l);
    right.copy_from_slice(&r);
}

/// Split `audio` into (below, above) `cutoff_hz` using a lowpass/highpass
/// biquad pair run in both directions for zero phase shift.
fn split_bands(audio: &[f64], sample_rate: f64, cutoff_hz: f64) -> (Vec<f64>, Vec<f64>) {
    let low = zero_phase_filter(audio, BiquadCoeffs::lowpass(sample_rate, cutoff_hz.max(1.0), 0.707));
    let high: Vec<f64> = audio.iter().zip(low.iter()).map(|(a, l)| a - l).collect();
    (low, high)
}

fn zero_phase_filter(audio: &[f64], coeffs: BiquadCoeffs) -> Vec<f64> {
    let mut forward = audio.to_vec();
    BiquadChannel::new(coeffs).process(&mut forward);
    forward.reverse();
    BiquadChannel::new(coeffs).process(&mut forward);
    forward.reverse();
    forward
}

/// Safety cap: if the current peak exceeds `cap_threshold_db` (default +3
/// dBFS per §4.5.5) and the requested width increases, cap the requested
/// width factor back to unchanged (0.5) rather than expanding further.
pub fn safety_capped_width_factor(channels: &[Vec<f64>], requested_width_factor: f64, cap_threshold_db: f64) -> f64 {
    use crate::primitives::to_db;
    let current_peak_db = to_db(peak_multi(channels));
    if current_peak_db > cap_threshold_db && requested_width_factor > 0.5 {
        0.5
    } else {
        requested_width_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_channels_have_zero_width() {
        let left = vec![0.1, 0.2, 0.3, 0.4];
        let right = left.clone();
        assert!(compute_stereo_width(&left, &right) < 0.1);
    }

    #[test]
    fn opposite_channels_have_high_width() {
        let left = vec![0.5; 100];
        let right = vec![-0.5; 100];
        assert!(compute_stereo_width(&left, &right) > 0.5);
    }

    #[test]
    fn phase_correlation_identical_is_one() {
        let left = vec![0.1, 0.2, 0.3, 0.4];
        let right = left.clone();
        assert!((compute_phase_correlation(&left, &right) - 1.0).abs() < 0.01);
    }

    #[test]
    fn phase_correlation_inverted_is_negative_one() {
        let left = vec![0.5, 0.5, 0.5, 0.5];
        let right = vec![-0.5, -0.5, -0.5, -0.5];
        assert!((compute_phase_correlation(&left, &right) + 1.0).abs() < 0.01);
    }

    #[test]
    fn width_factor_of_half_preserves_side_energy() {
        let mut left = vec![0.5, -0.2, 0.3, -0.4];
        let mut right = vec![0.1, 0.3, -0.2, 0.4];
        let before = compute_stereo_width(&left, &right);
        apply_stereo_width(&mut left, &mut right, 0.5);
        let after = compute_stereo_width(&left, &right);
        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn width_factor_zero_collapses_to_mono() {
        let mut left = vec![0.5, -0.2, 0.3, -0.4];
        let mut right = vec![0.1, 0.3, -0.2, 0.4];
        apply_stereo_width(&mut left, &mut right, 0.0);
        for (l, r) in left.iter().zip(right.iter()) {
            assert!((l - r).abs() < 1e-9);
        }
    }

    #[test]
    fn correlation_width_is_zero_for_identical_channels() {
        let left = vec![0.1, 0.2, 0.3, 0.4];
        let right = left.clone();
        assert!(correlation_width(&left, &right) < 0.05);
    }

    #[test]
    fn safety_cap_blocks_expansion_above_peak_threshold() {
        let channels = vec![vec![1.5; 10], vec![1.5; 10]];
        let capped = safety_capped_width_factor(&channels, 0.9, 3.0);
        assert_eq!(capped, 0.5);
    }

    #[test]
    fn safety_cap_allows_contraction_above_peak_threshold() {
        let channels = vec![vec![1.5; 10], vec![1.5; 10]];
        let capped = safety_capped_width_factor(&channels, 0.3, 3.0);
        assert_eq!(capped, 0.3);
    }

    #[test]
    fn multiband_width_preserves_sample_count() {
        let sr = 44100;
        let n = 4096;
        let mut left: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).sin() * 0.3).collect();
        let mut right: Vec<f64> = (0..n).map(|i| (i as f64 * 0.011).cos() * 0.3).collect();
        let len_before = left.len();
        apply_multiband_stereo_width(&mut left, &mut right, sr, 0.4);
        assert_eq!(left.len(), len_before);
        assert_eq!(right.len(), len_before);
        assert!(left.iter().all(|s| s.is_finite()));
    }
}

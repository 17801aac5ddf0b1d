//! The DSP execution pipeline (C5): fixed-order stages over a stereo or
//! mono buffer, enforcing peak/LUFS/channel/sample-count invariants on exit.
//!
//! Order is fixed: input gain -> EQ -> dynamics (compression xor expansion)
//! -> stereo width -> LUFS normalize -> peak normalize -> safety limiter.
use auralis_dsp::buffer::AudioBuffer;
use auralis_dsp::primitives::{amplify_multi, crest_factor_db, normalize_peak_multi, peak_multi, rms, to_db};
use auralis_dsp::{dynamics, eq, limiter, stereo};

use crate::content::{AdaptiveParameters, StereoStrategy};
use crate::space::ProcessingParameters;

const LUFS_OFFSET_DB: f64 = -23.0;
const LUFS_SKIP_THRESHOLD_DB: f64 = 0.5;
const COMPRESSED_DR_THRESHOLD_DB: f64 = 8.0;
const LOUD_LUFS_THRESHOLD: f64 = -12.0;
const STEREO_SAFETY_THRESHOLD_DB: f64 = 3.0;

/// Reference budget against which `AdaptiveParameters::dr_expansion_db` is
/// normalized into the pipeline's own 0-1 expansion amount scale; matches
/// the largest `dr_expansion_db` values the detector produces (bootleg and
/// metal both sit in the low-20s).
const DR_EXPANSION_REFERENCE_DB: f64 = 25.0;
/// Crest factor assumed for already heavily-limited material, used to turn
/// the detector's absolute crest-factor target band into a relative
/// increase on the same 0-4 dB scale as `ExpansionParams::target_crest_increase_db`.
const CREST_FACTOR_BASELINE_DB: f64 = 3.0;

/// Weight at which adaptive-detector guidance is blended into a
/// content-generated parameter, per the spec's fixed adaptive-mode weight.
pub fn adaptive_blend_weight(confidence: f64) -> f64 {
    confidence.min(0.7).max(0.0)
}

/// Blend a content-generated EQ curve with adaptive-detector guidance
/// (translated from dB-relative-to-mid adjustments into the fixed-band
/// curve) at `min(confidence, 0.7)`.
pub fn blend_adaptive_eq(base: eq::EqCurve, adaptive: &AdaptiveParameters) -> eq::EqCurve {
    let guidance = eq::EqCurve {
        low_shelf_db: adaptive.bass_adjustment_db,
        low_mid_db: 0.0,
        mid_db: adaptive.mid_adjustment_db,
        high_mid_db: 0.0,
        high_shelf_db: adaptive.treble_adjustment_db,
    };
    base.blended_with(guidance, adaptive.confidence)
}

/// Blend adaptive-detector dynamics and stereo guidance into a generated
/// parameter set at the same `min(confidence, 0.7)` weight used for EQ
/// (`blend_adaptive_eq`), per the spec's adaptive-mode blend formula
/// extended to non-EQ guidance.
///
/// `rms_adjustment_db`/`peak_headroom_db` are already dB nudges, so they
/// blend additively rather than by interpolating an absolute target.
/// `dr_expansion_db` is normalized into the pipeline's 0-1 expansion
/// amount scale; `crest_factor_target_min/max` is converted to a relative
/// crest increase against `CREST_FACTOR_BASELINE_DB` before blending into
/// `target_crest_increase_db`. `stereo_strategy == Maintain` means "leave
/// the generated width alone," so the stereo width target is only nudged
/// for `Narrow`/`Expand`.
pub fn blend_adaptive_dynamics(mut params: ProcessingParameters, adaptive: &AdaptiveParameters) -> ProcessingParameters {
    let w = adaptive_blend_weight(adaptive.confidence);

    if adaptive.stereo_strategy != StereoStrategy::Maintain {
        params.stereo_width_target = params.stereo_width_target * (1.0 - w) + adaptive.stereo_width_target * w;
    }

    params.target_lufs += adaptive.rms_adjustment_db * w;
    params.peak_target_db += adaptive.peak_headroom_db * w;

    let adaptive_expansion_amount = (adaptive.dr_expansion_db / DR_EXPANSION_REFERENCE_DB).clamp(0.0, 1.0);
    params.expansion.amount = params.expansion.amount * (1.0 - w) + adaptive_expansion_amount * w;

    let crest_target_mid = (adaptive.crest_factor_target_min + adaptive.crest_factor_target_max) / 2.0;
    let adaptive_crest_increase = (crest_target_mid - CREST_FACTOR_BASELINE_DB).clamp(0.0, 4.0);
    params.expansion.target_crest_increase_db =
        params.expansion.target_crest_increase_db * (1.0 - w) + adaptive_crest_increase * w;

    params
}

fn estimate_lufs(audio: &[f64]) -> f64 {
    to_db(rms(audio)) + LUFS_OFFSET_DB
}

/// Runs every stage over `buffer` in place and returns the measured output
/// LUFS (for callers that log or assert against the target).
///
/// `input_gain_db` is the one pre-generated knob a caller can set directly
/// (default `0.0`); the streaming processor uses it to apply the level
/// watchdog correction before the rest of the chain runs.
pub fn process(buffer: &mut AudioBuffer, params: &ProcessingParameters, input_gain_db: f64) -> f64 {
    let sample_rate = buffer.sample_rate;
    let channel_count = buffer.channel_count();
    let sample_count = buffer.num_samples();

    if input_gain_db != 0.0 {
        amplify_multi(buffer.channels_mut(), input_gain_db);
    }

    for ch in buffer.channels_mut() {
        eq::apply_eq(ch, sample_rate, params.eq_curve, params.eq_blend);
    }

    apply_dynamics(buffer, params);

    if buffer.is_stereo() {
        apply_stereo_width(buffer, params.stereo_width_target);
    }

    normalize_lufs(buffer, params.target_lufs, params.dynamics_blend);
    normalize_peak_multi(buffer.channels_mut(), params.peak_target_db);

    for ch in buffer.channels_mut() {
        limiter::apply_safety_limiter(ch);
    }

    debug_assert_eq!(buffer.channel_count(), channel_count, "pipeline must not change channel count");
    debug_assert_eq!(buffer.num_samples(), sample_count, "pipeline must not resample or truncate");

    let out_peak = peak_multi(buffer.channels_slice());
    if out_peak > 0.99 {
        tracing::warn!(peak = out_peak, "pipeline output exceeded the 0.99 peak invariant");
    }

    let mono = buffer.to_mono();
    let out_lufs = estimate_lufs(&mono);
    if (out_lufs - params.target_lufs).abs() > 2.0 {
        tracing::warn!(
            target = params.target_lufs,
            actual = out_lufs,
            "pipeline output drifted more than 2 dB from target LUFS"
        );
    }

    out_lufs
}

fn apply_dynamics(buffer: &mut AudioBuffer, params: &ProcessingParameters) {
    // Compression and expansion are never both active: the generator can
    // produce a nonzero amount for each in the 0.4-0.5 dynamics band, so the
    // pipeline resolves the conflict by preferring compression there.
    if params.compression.amount > 0.0 {
        for ch in buffer.channels_mut() {
            dynamics::compress(ch, params.compression.amount, params.compression.mode);
        }
    } else if params.expansion.amount > 0.0 {
        for ch in buffer.channels_mut() {
            dynamics::expand(ch, params.expansion.amount, params.expansion.mode);
        }
    }
}

/// `target_width` is the absolute energy-ratio width `space::parameters`
/// targets (0-1, same scale as `AudioFingerprint::stereo_width`), not a
/// relative factor. `apply_multiband_stereo_width` expects a relative
/// `width_factor` (0 = mono, 0.5 = unchanged, 1 = doubled), so this measures
/// the buffer's current correlation-based width and derives the factor that
/// moves it toward `target_width`, rather than feeding the absolute target
/// straight in as if it already were relative.
fn apply_stereo_width(buffer: &mut AudioBuffer, target_width: f64) {
    let current_width = stereo::correlation_width(buffer.channel(0), buffer.channel(1));
    let requested = (0.5 + (target_width.clamp(0.0, 1.0) - current_width)).clamp(0.0, 1.0);
    let capped = stereo::safety_capped_width_factor(buffer.channels_slice(), requested, STEREO_SAFETY_THRESHOLD_DB);
    let expansion_amount = 2.0 * capped - 1.0;

    let sample_rate = buffer.sample_rate;
    let (left, rest) = buffer.channels_mut().split_at_mut(1);
    stereo::apply_multiband_stereo_width(&mut left[0], &mut rest[0], sample_rate, expansion_amount);
}

fn normalize_lufs(buffer: &mut AudioBuffer, target_lufs: f64, dynamics_blend: f64) {
    let mono = buffer.to_mono();
    let current_lufs = estimate_lufs(&mono);
    let mut delta_db = target_lufs - current_lufs;
    if delta_db.abs() < LUFS_SKIP_THRESHOLD_DB {
        return;
    }

    let dynamic_range_db = crest_factor_db(&mono);
    let is_compressed = dynamic_range_db < COMPRESSED_DR_THRESHOLD_DB;
    let is_loud = current_lufs > LOUD_LUFS_THRESHOLD;
    if is_compressed || is_loud {
        let damping = (0.3 + 0.2 * dynamics_blend).clamp(0.3, 0.5);
        delta_db *= damping;
    }

    amplify_multi(buffer.channels_mut(), delta_db);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{CompressionParams, ExpansionParams, LimiterParams};
    use auralis_dsp::dynamics::{CompressionMode, ExpansionMode};
    use auralis_dsp::eq::EqCurve;

    fn test_buffer() -> AudioBuffer {
        let n = 44100;
        let left: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).sin() * 0.3).collect();
        let right: Vec<f64> = (0..n).map(|i| (i as f64 * 0.0105).sin() * 0.3).collect();
        AudioBuffer::from_planar(vec![left, right], 44100).unwrap()
    }

    fn neutral_params() -> ProcessingParameters {
        ProcessingParameters {
            target_lufs: -16.0,
            peak_target_db: -1.0,
            eq_curve: EqCurve::default(),
            eq_blend: 0.5,
            compression: CompressionParams { ratio: 1.0, threshold_db: 0.0, attack_ms: 0.0, release_ms: 0.0, amount: 0.0, mode: CompressionMode::SoftKnee },
            expansion: ExpansionParams { target_crest_increase_db: 0.0, amount: 0.0, mode: ExpansionMode::PeakEnhancement },
            dynamics_blend: 0.5,
            limiter: LimiterParams { threshold_db: -2.0, release_ms: 100.0 },
            stereo_width_target: 0.7,
        }
    }

    #[test]
    fn pipeline_preserves_sample_and_channel_counts() {
        let mut buffer = test_buffer();
        let original_samples = buffer.num_samples();
        let original_channels = buffer.channel_count();
        process(&mut buffer, &neutral_params(), 0.0);
        assert_eq!(buffer.num_samples(), original_samples);
        assert_eq!(buffer.channel_count(), original_channels);
    }

    #[test]
    fn pipeline_output_never_exceeds_peak_invariant() {
        let mut buffer = test_buffer();
        let mut params = neutral_params();
        params.target_lufs = -6.0;
        params.peak_target_db = -0.1;
        process(&mut buffer, &params, 0.0);
        assert!(peak_multi(buffer.channels_slice()) <= 0.99 + 1e-6);
    }

    #[test]
    fn pipeline_output_has_no_nonfinite_samples() {
        let mut buffer = test_buffer();
        process(&mut buffer, &neutral_params(), 0.0);
        assert!(buffer.all_finite());
    }

    #[test]
    fn stereo_width_narrows_when_target_is_below_current_width() {
        let n = 44100;
        // Near-decorrelated channels: high correlation-based width.
        let left: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).sin() * 0.3).collect();
        let right: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01 + 1.7).sin() * 0.3).collect();
        let mut buffer = AudioBuffer::from_planar(vec![left, right], 44100).unwrap();
        let current_width = stereo::correlation_width(buffer.channel(0), buffer.channel(1));
        assert!(current_width > 0.75, "fixture should already read as wide before processing");

        apply_stereo_width(&mut buffer, 0.5);
        let after_width = stereo::correlation_width(buffer.channel(0), buffer.channel(1));
        assert!(after_width < current_width, "a target below current width should narrow, not widen");
    }

    #[test]
    fn compression_and_expansion_are_mutually_exclusive() {
        let mut buffer = test_buffer();
        let mut params = neutral_params();
        params.compression.amount = 0.5;
        params.expansion.amount = 0.6;
        let before = buffer.clone();
        apply_dynamics(&mut buffer, &params);
        // Compression reduces peak-to-rms; if expansion had also run the
        // crest factor would have moved the opposite direction afterward.
        let before_crest = crest_factor_db(&before.channel(0));
        let after_crest = crest_factor_db(buffer.channel(0));
        assert!(after_crest <= before_crest);
    }

    fn neutral_adaptive(confidence: f64) -> AdaptiveParameters {
        AdaptiveParameters {
            bass_adjustment_db: 0.0,
            mid_adjustment_db: 0.0,
            treble_adjustment_db: 0.0,
            stereo_width_target: 0.9,
            stereo_strategy: StereoStrategy::Expand,
            crest_factor_target_min: 5.0,
            crest_factor_target_max: 7.0,
            dr_expansion_db: 12.5,
            rms_adjustment_db: 2.0,
            peak_headroom_db: -0.5,
            mastering_philosophy: crate::content::MasteringPhilosophy::Correct,
            confidence,
        }
    }

    #[test]
    fn blend_adaptive_dynamics_is_a_no_op_at_zero_confidence() {
        let base = neutral_params();
        let blended = blend_adaptive_dynamics(base, &neutral_adaptive(0.0));
        assert_eq!(blended.stereo_width_target, base.stereo_width_target);
        assert_eq!(blended.target_lufs, base.target_lufs);
        assert_eq!(blended.peak_target_db, base.peak_target_db);
        assert_eq!(blended.expansion.amount, base.expansion.amount);
    }

    #[test]
    fn blend_adaptive_dynamics_nudges_toward_adaptive_guidance() {
        let base = neutral_params();
        let blended = blend_adaptive_dynamics(base, &neutral_adaptive(0.7));
        assert!(blended.stereo_width_target > base.stereo_width_target);
        assert!(blended.target_lufs > base.target_lufs);
        assert!(blended.peak_target_db < base.peak_target_db);
        assert!(blended.expansion.amount > base.expansion.amount);
    }

    #[test]
    fn blend_adaptive_dynamics_maintain_strategy_leaves_width_alone() {
        let base = neutral_params();
        let mut adaptive = neutral_adaptive(0.7);
        adaptive.stereo_strategy = StereoStrategy::Maintain;
        let blended = blend_adaptive_dynamics(base, &adaptive);
        assert_eq!(blended.stereo_width_target, base.stereo_width_target);
    }

    #[test]
    fn blend_adaptive_dynamics_clamps_weight_at_point_seven() {
        let base = neutral_params();
        let at_cap = blend_adaptive_dynamics(base, &neutral_adaptive(0.7));
        let over_cap = blend_adaptive_dynamics(base, &neutral_adaptive(1.0));
        assert!((at_cap.target_lufs - over_cap.target_lufs).abs() < 1e-9);
    }
}

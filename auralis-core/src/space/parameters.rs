//! Parameter generation: turns a (possibly preference-biased) position in
//! processing space into concrete DSP settings for every pipeline stage.
use auralis_dsp::dynamics::{CompressionMode, ExpansionMode};
use auralis_dsp::eq::EqCurve;
use auralis_dsp::AudioFingerprint;

use super::{PreferenceVector, ProcessingCoordinates};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompressionParams {
    pub ratio: f64,
    pub threshold_db: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
    pub amount: f64,
    pub mode: CompressionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExpansionParams {
    pub target_crest_increase_db: f64,
    pub amount: f64,
    pub mode: ExpansionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LimiterParams {
    pub threshold_db: f64,
    pub release_ms: f64,
}

/// The complete set of DSP settings for one track, generated from its
/// position in processing space.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingParameters {
    pub target_lufs: f64,
    pub peak_target_db: f64,
    pub eq_curve: EqCurve,
    pub eq_blend: f64,
    pub compression: CompressionParams,
    pub expansion: ExpansionParams,
    pub dynamics_blend: f64,
    pub limiter: LimiterParams,
    pub stereo_width_target: f64,
}

/// Generate all processing parameters from space coordinates, a fingerprint
/// (needed for the deficit-driven EQ and current stereo width), and an
/// optional user preference.
pub fn generate(
    coords: ProcessingCoordinates,
    fp: &AudioFingerprint,
    preference: &PreferenceVector,
) -> ProcessingParameters {
    let biased = coords.biased_by(preference);

    ProcessingParameters {
        target_lufs: target_lufs(biased, preference),
        peak_target_db: peak_target(biased, preference),
        eq_curve: eq_curve(fp, preference),
        eq_blend: eq_blend(fp),
        compression: compression(biased, preference),
        expansion: expansion(biased, preference),
        dynamics_blend: dynamics_blend(biased, preference),
        limiter: limiter(biased),
        stereo_width_target: stereo_width_target(biased, fp, preference),
    }
}

fn target_lufs(coords: ProcessingCoordinates, preference: &PreferenceVector) -> f64 {
    let base = -16.0 + coords.energy_level * 6.0;
    let dynamics_adjustment = coords.dynamic_range * -2.0;
    let preference_adjustment = preference.loudness_bias * 2.0;
    (base + dynamics_adjustment + preference_adjustment).clamp(-20.0, -8.0)
}

fn peak_target(coords: ProcessingCoordinates, preference: &PreferenceVector) -> f64 {
    let base = -1.0 + (1.0 - coords.dynamic_range) * 0.7;
    let preference_adjustment = preference.loudness_bias * 0.2;
    (base + preference_adjustment).clamp(-1.5, -0.2)
}

const BASS_REFERENCE_PCT: f64 = 28.0;
const AIR_REFERENCE_PCT: f64 = 12.0;
const MID_REFERENCE_PCT: f64 = 35.0;

fn eq_curve(fp: &AudioFingerprint, preference: &PreferenceVector) -> EqCurve {
    let bass_deficit = ((BASS_REFERENCE_PCT - fp.bass) / BASS_REFERENCE_PCT).max(0.0);
    let air_deficit = ((AIR_REFERENCE_PCT - fp.air) / AIR_REFERENCE_PCT).max(0.0);
    let mid_deficit = ((MID_REFERENCE_PCT - fp.mid) / MID_REFERENCE_PCT).max(0.0);

    let mut low_shelf = bass_deficit.powf(0.7) * 4.0;
    let mut high_shelf = air_deficit.powf(0.7) * 3.0;
    let mut high_mid = air_deficit.powf(0.7) * 2.5;
    let low_mid: f64 = 0.5;
    let mid = mid_deficit.powf(0.8) * 1.5;

    low_shelf += preference.bass_boost * 2.0;
    high_shelf += preference.treble_boost * 2.0;
    high_mid += preference.treble_boost * 1.5;

    if preference.spectral_bias > 0.0 {
        high_shelf += preference.spectral_bias * 1.5;
        low_shelf -= preference.spectral_bias * 1.0;
    } else {
        low_shelf += preference.spectral_bias.abs() * 1.5;
        high_shelf -= preference.spectral_bias.abs() * 1.0;
    }

    EqCurve {
        low_shelf_db: low_shelf.clamp(0.0, 5.0),
        low_mid_db: low_mid.clamp(0.0, 3.0),
        mid_db: mid.clamp(0.0, 2.0),
        high_mid_db: high_mid.clamp(0.0, 4.0),
        high_shelf_db: high_shelf.clamp(0.0, 4.0),
    }
}

fn eq_blend(fp: &AudioFingerprint) -> f64 {
    const IDEAL_BASS: f64 = 30.0;
    const IDEAL_AIR: f64 = 12.0;
    const IDEAL_MID: f64 = 35.0;

    let bass_imbalance = (fp.bass - IDEAL_BASS).abs() / IDEAL_BASS;
    let air_imbalance = (fp.air - IDEAL_AIR).abs() / IDEAL_AIR;
    let mid_imbalance = (fp.mid - IDEAL_MID).abs() / IDEAL_MID;
    let imbalance = ((bass_imbalance + air_imbalance + mid_imbalance) / 3.0).clamp(0.0, 1.0);

    0.5 + imbalance * 0.5
}

fn effective_dynamics(coords: ProcessingCoordinates, preference: &PreferenceVector) -> f64 {
    (coords.dynamic_range + preference.dynamic_bias * 0.3).clamp(0.0, 1.0)
}

fn compression(coords: ProcessingCoordinates, preference: &PreferenceVector) -> CompressionParams {
    let dynamics = effective_dynamics(coords, preference);
    if dynamics > 0.7 {
        CompressionParams {
            ratio: 1.5,
            threshold_db: -26.0,
            attack_ms: 25.0,
            release_ms: 250.0,
            amount: 0.3,
            mode: CompressionMode::SoftKnee,
        }
    } else if dynamics > 0.4 {
        CompressionParams {
            ratio: 1.8,
            threshold_db: -22.0,
            attack_ms: 20.0,
            release_ms: 200.0,
            amount: 0.5,
            mode: CompressionMode::SoftKnee,
        }
    } else {
        CompressionParams {
            ratio: 1.0,
            threshold_db: 0.0,
            attack_ms: 0.0,
            release_ms: 0.0,
            amount: 0.0,
            mode: CompressionMode::SoftKnee,
        }
    }
}

fn expansion(coords: ProcessingCoordinates, preference: &PreferenceVector) -> ExpansionParams {
    let dynamics = effective_dynamics(coords, preference);
    if dynamics < 0.3 {
        ExpansionParams { target_crest_increase_db: 4.0, amount: 1.0, mode: ExpansionMode::PeakEnhancement }
    } else if dynamics < 0.5 {
        ExpansionParams { target_crest_increase_db: 2.0, amount: 0.6, mode: ExpansionMode::PeakEnhancement }
    } else {
        ExpansionParams { target_crest_increase_db: 0.0, amount: 0.0, mode: ExpansionMode::PeakEnhancement }
    }
}

fn dynamics_blend(coords: ProcessingCoordinates, preference: &PreferenceVector) -> f64 {
    let base = 0.3 + (1.0 - coords.dynamic_range) * 0.4;
    let adjusted = if preference.dynamic_bias != 0.0 {
        base - preference.dynamic_bias * 0.2
    } else {
        base
    };
    adjusted.clamp(0.2, 0.9)
}

fn limiter(coords: ProcessingCoordinates) -> LimiterParams {
    LimiterParams {
        threshold_db: -3.0 + (1.0 - coords.dynamic_range) * 1.5,
        release_ms: 120.0 - coords.dynamic_range * 40.0,
    }
}

fn stereo_width_target(
    coords: ProcessingCoordinates,
    fp: &AudioFingerprint,
    preference: &PreferenceVector,
) -> f64 {
    let current_width = fp.stereo_width;
    let mut target = if current_width < 0.5 {
        0.7 + coords.spectral_balance * 0.1
    } else if current_width > 0.85 {
        0.75
    } else {
        current_width + 0.05
    };
    target += preference.stereo_bias * 0.2;
    target.clamp(0.5, 0.9)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_coords() -> ProcessingCoordinates {
        ProcessingCoordinates { spectral_balance: 0.5, dynamic_range: 0.5, energy_level: 0.5 }
    }

    #[test]
    fn quiet_dynamic_input_gets_raised_conservative_target() {
        let coords = ProcessingCoordinates { spectral_balance: 0.4, dynamic_range: 0.9, energy_level: 0.1 };
        let fp = AudioFingerprint::neutral();
        let params = generate(coords, &fp, &PreferenceVector::default());
        assert!(params.target_lufs >= -18.0 && params.target_lufs <= -14.0);
        assert_eq!(params.expansion.amount, 0.0);
        assert!(params.compression.amount < 0.4);
    }

    #[test]
    fn loud_brickwalled_input_gets_expansion() {
        let coords = ProcessingCoordinates { spectral_balance: 0.5, dynamic_range: 0.1, energy_level: 0.9 };
        let fp = AudioFingerprint::neutral();
        let params = generate(coords, &fp, &PreferenceVector::default());
        assert!(params.target_lufs >= -12.0 && params.target_lufs <= -9.0);
        assert_eq!(params.compression.amount, 0.0);
        assert!(params.expansion.amount >= 0.6);
    }

    #[test]
    fn target_lufs_stays_within_clamp_bounds() {
        let extreme = ProcessingCoordinates { spectral_balance: 1.0, dynamic_range: 1.0, energy_level: 1.0 };
        let preference = PreferenceVector { loudness_bias: 1.0, ..Default::default() };
        let params = generate(extreme, &AudioFingerprint::neutral(), &preference);
        assert!(params.target_lufs >= -20.0 && params.target_lufs <= -8.0);
    }

    #[test]
    fn eq_blend_is_higher_for_imbalanced_spectrum() {
        let mut fp = AudioFingerprint::neutral();
        fp.bass = 5.0;
        fp.air = 1.0;
        let blend = eq_blend(&fp);
        assert!(blend > 0.5);
    }

    #[test]
    fn narrow_stereo_input_is_widened() {
        let mut fp = AudioFingerprint::neutral();
        fp.stereo_width = 0.2;
        let params = generate(neutral_coords(), &fp, &PreferenceVector::default());
        assert!(params.stereo_width_target > 0.5);
    }

    #[test]
    fn dynamics_blend_stays_in_bounds() {
        let blend = dynamics_blend(neutral_coords(), &PreferenceVector::default());
        assert!((0.2..=0.9).contains(&blend));
    }
}

//! Continuous processing space (C4): maps a 25-D fingerprint to a 3-axis
//! coordinate, biases it by user preference, and generates concrete DSP
//! parameters from the result. Replaces discrete presets with a small
//! continuous model; presets still exist as named points in that model.
use auralis_dsp::AudioFingerprint;

use crate::error::{Error, Result};

pub mod parameters;
pub use parameters::{generate, CompressionParams, ExpansionParams, LimiterParams, ProcessingParameters};

fn norm(x: f64, lo: f64, hi: f64) -> f64 {
    ((x - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Position in the 3D processing space, derived from a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingCoordinates {
    pub spectral_balance: f64,
    pub dynamic_range: f64,
    pub energy_level: f64,
}

impl ProcessingCoordinates {
    /// Map a fingerprint onto the three axes.
    pub fn from_fingerprint(fp: &AudioFingerprint) -> Self {
        let spectral_balance = 0.35 * (1.0 - norm(fp.bass, 15.0, 40.0))
            + 0.35 * norm(fp.air, 5.0, 20.0)
            + 0.15 * norm(fp.spectral_centroid, 1000.0, 6000.0)
            + 0.15 * norm(fp.presence, 8.0, 25.0);
        let dynamic_range = 0.5 * norm(fp.crest_db, 8.0, 20.0)
            + 0.3 * fp.dynamic_range_variation
            + 0.2 * norm(fp.loudness_variation_std, 0.0, 5.0);
        let energy_level = norm(fp.lufs, -30.0, -10.0);

        Self {
            spectral_balance: spectral_balance.clamp(0.0, 1.0),
            dynamic_range: dynamic_range.clamp(0.0, 1.0),
            energy_level: energy_level.clamp(0.0, 1.0),
        }
    }

    /// Shift coordinates by a preference vector at the fixed damping
    /// strength that keeps biasing from pushing content-driven placement
    /// to an extreme.
    pub fn biased_by(&self, preference: &PreferenceVector) -> Self {
        const BIAS_STRENGTH: f64 = 0.3;
        Self {
            spectral_balance: (self.spectral_balance + preference.spectral_bias * BIAS_STRENGTH)
                .clamp(0.0, 1.0),
            dynamic_range: (self.dynamic_range + preference.dynamic_bias * BIAS_STRENGTH)
                .clamp(0.0, 1.0),
            energy_level: (self.energy_level + preference.loudness_bias * BIAS_STRENGTH)
                .clamp(0.0, 1.0),
        }
    }
}

/// User preference as a bias in processing space, rather than a rigid
/// preset. All fields are signed except the two boost fields, which are
/// one-sided (you can only ask for more bass/treble, never less).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreferenceVector {
    pub spectral_bias: f64,
    pub dynamic_bias: f64,
    pub loudness_bias: f64,
    pub bass_boost: f64,
    pub treble_boost: f64,
    pub stereo_bias: f64,
}

impl PreferenceVector {
    /// Resolve a legacy preset name to its fixed preference vector.
    /// Case-insensitive; unknown names are rejected rather than silently
    /// mapped to `adaptive`.
    pub fn from_preset_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "adaptive" => Ok(Self::default()),
            "gentle" => Ok(Self { dynamic_bias: 0.3, loudness_bias: -0.2, ..Self::default() }),
            "warm" => Ok(Self {
                spectral_bias: -0.3,
                bass_boost: 0.5,
                treble_boost: -0.2,
                ..Self::default()
            }),
            "bright" => Ok(Self {
                spectral_bias: 0.5,
                treble_boost: 0.7,
                bass_boost: -0.3,
                ..Self::default()
            }),
            "punchy" => Ok(Self {
                bass_boost: 0.6,
                dynamic_bias: -0.2,
                loudness_bias: 0.3,
                ..Self::default()
            }),
            "live" => Ok(Self {
                dynamic_bias: 0.4,
                stereo_bias: 0.2,
                bass_boost: -0.2,
                ..Self::default()
            }),
            other => Err(Error::UnknownPreset(other.to_string())),
        }
    }
}

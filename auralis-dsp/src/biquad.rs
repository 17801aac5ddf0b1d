/// Biquad filter cascades (RBJ cookbook coefficients, Direct Form II
/// Transposed). Backs the 5-band EQ stage and the multiband stereo-width
/// splitter.
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    z1: f64,
    z2: f64,
}

impl BiquadCoeffs {
    pub fn lowpass(sample_rate: f64, cutoff_hz: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let b0 = (1.0 - cos_w0) / 2.0;
        let b1 = 1.0 - cos_w0;
        let b2 = (1.0 - cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::normalize(b0, b1, b2, a0, a1, a2)
    }

    pub fn highpass(sample_rate: f64, cutoff_hz: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::normalize(b0, b1, b2, a0, a1, a2)
    }

    pub fn peaking(sample_rate: f64, center_hz: f64, q: f64, gain_db: f64) -> Self {
        let w0 = 2.0 * PI * center_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let a_gain = 10f64.powf(gain_db / 40.0);
        let alpha = sin_w0 / (2.0 * q);

        let b0 = 1.0 + alpha * a_gain;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a_gain;
        let a0 = 1.0 + alpha / a_gain;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a_gain;

        Self::normalize(b0, b1, b2, a0, a1, a2)
    }

    /// Low-shelf: boosts/cuts below `corner_hz`, flat above. `slope` is the
    /// RBJ cookbook shelf slope parameter (1.0 = maximally steep without
    /// overshoot at unity gain).
    pub fn low_shelf(sample_rate: f64, corner_hz: f64, slope: f64, gain_db: f64) -> Self {
        let a_gain = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * corner_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / 2.0 * ((a_gain + 1.0 / a_gain) * (1.0 / slope - 1.0) + 2.0).sqrt();
        let two_sqrt_a_alpha = 2.0 * a_gain.sqrt() * alpha;

        let b0 = a_gain * ((a_gain + 1.0) - (a_gain - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = 2.0 * a_gain * ((a_gain - 1.0) - (a_gain + 1.0) * cos_w0);
        let b2 = a_gain * ((a_gain + 1.0) - (a_gain - 1.0) * cos_w0 - two_sqrt_a_alpha);
        let a0 = (a_gain + 1.0) + (a_gain - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = -2.0 * ((a_gain - 1.0) + (a_gain + 1.0) * cos_w0);
        let a2 = (a_gain + 1.0) + (a_gain - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self::normalize(b0, b1, b2, a0, a1, a2)
    }

    /// High-shelf: boosts/cuts above `corner_hz`, flat below.
    pub fn high_shelf(sample_rate: f64, corner_hz: f64, slope: f64, gain_db: f64) -> Self {
        let a_gain = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * corner_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / 2.0 * ((a_gain + 1.0 / a_gain) * (1.0 / slope - 1.0) + 2.0).sqrt();
        let two_sqrt_a_alpha = 2.0 * a_gain.sqrt() * alpha;

        let b0 = a_gain * ((a_gain + 1.0) + (a_gain - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = -2.0 * a_gain * ((a_gain - 1.0) + (a_gain + 1.0) * cos_w0);
        let b2 = a_gain * ((a_gain + 1.0) + (a_gain - 1.0) * cos_w0 - two_sqrt_a_alpha);
        let a0 = (a_gain + 1.0) - (a_gain - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = 2.0 * ((a_gain - 1.0) - (a_gain + 1.0) * cos_w0);
        let a2 = (a_gain + 1.0) - (a_gain - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self::normalize(b0, b1, b2, a0, a1, a2)
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    #[inline]
    fn process_sample(&self, input: f64, state: &mut BiquadState) -> f64 {
        let output = self.b0 * input + state.z1;
        state.z1 = self.b1 * input - self.a1 * output + state.z2;
        state.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

/// A single channel's filter state for one biquad stage.
pub struct BiquadChannel {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadChannel {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, state: BiquadState::default() }
    }

    pub fn process(&mut self, audio: &mut [f64]) {
        for sample in audio.iter_mut() {
            *sample = self.coeffs.process_sample(*sample, &mut self.state);
        }
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }
}

/// A cascade of biquad stages applied in sequence, one state track per
/// channel per stage.
pub struct BiquadCascade {
    coeffs: Vec<BiquadCoeffs>,
    states: Vec<Vec<BiquadState>>,
}

impl BiquadCascade {
    pub fn new(coeffs: Vec<BiquadCoeffs>, num_channels: usize) -> Self {
        let num_stages = coeffs.len();
        let states = vec![vec![BiquadState::default(); num_stages]; num_channels];
        Self { coeffs, states }
    }

    pub fn process_channel(&mut self, channel: usize, audio: &mut [f64]) {
        for (stage_idx, coeffs) in self.coeffs.iter().enumerate() {
            let state = &mut self.states[channel][stage_idx];
            for sample in audio.iter_mut() {
                *sample = coeffs.process_sample(*sample, state);
            }
        }
    }

    pub fn reset(&mut self) {
        for channel_states in self.states.iter_mut() {
            for state in channel_states.iter_mut() {
                *state = BiquadState::default();
            }
        }
    }
}

/// Envelope follower for dynamics processing: tracks the envelope of a
/// level signal with independent attack/release time constants. Used for
/// compressor/expander/limiter gain smoothing.

#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    pub sample_rate: u32,
    pub attack_ms: f64,
    pub release_ms: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self { sample_rate: 44100, attack_ms: 10.0, release_ms: 100.0 }
    }
}

pub struct EnvelopeFollower {
    attack_coeff: f64,
    release_coeff: f64,
    envelope: f64,
}

impl EnvelopeFollower {
    pub fn new(config: &EnvelopeConfig) -> Self {
        Self {
            attack_coeff: Self::ms_to_coefficient(config.attack_ms, config.sample_rate),
            release_coeff: Self::ms_to_coefficient(config.release_ms, config.sample_rate),
            envelope: 0.0,
        }
    }

    fn ms_to_coefficient(time_ms: f64, sample_rate: u32) -> f64 {
        let time_samples = time_ms * 0.001 * sample_rate as f64;
        (-1.0 / time_samples).exp()
    }

    /// Feed one input level (absolute value), return the smoothed envelope.
    pub fn process(&mut self, input_level: f64) -> f64 {
        let coeff = if input_level > self.envelope { self.attack_coeff } else { self.release_coeff };
        self.envelope = input_level + (self.envelope - input_level) * coeff;
        self.envelope
    }

    pub fn process_buffer(&mut self, input_levels: &[f64]) -> Vec<f64> {
        input_levels.iter().map(|&l| self.process(l)).collect()
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    pub fn envelope(&self) -> f64 {
        self.envelope
    }
}

/// One-shot envelope following without a retained follower.
pub fn envelope_follow(input_levels: &[f64], sample_rate: u32, attack_ms: f64, release_ms: f64) -> Vec<f64> {
    let mut follower = EnvelopeFollower::new(&EnvelopeConfig { sample_rate, attack_ms, release_ms });
    follower.process_buffer(input_levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let follower = EnvelopeFollower::new(&EnvelopeConfig::default());
        assert_eq!(follower.envelope(), 0.0);
    }

    #[test]
    fn attack_is_faster_than_release() {
        let mut follower = EnvelopeFollower::new(&EnvelopeConfig { sample_rate: 44100, attack_ms: 1.0, release_ms: 10.0 });
        let rising = follower.process(1.0);
        assert!(rising > 0.0 && rising < 1.0);
        let falling = follower.process(0.0);
        assert!(falling > 0.0 && falling < rising);
    }

    #[test]
    fn buffer_processing_matches_length() {
        let mut follower = EnvelopeFollower::new(&EnvelopeConfig { sample_rate: 44100, attack_ms: 5.0, release_ms: 50.0 });
        let input = vec![0.1, 0.5, 0.9, 0.7, 0.3, 0.1];
        let output = follower.process_buffer(&input);
        assert_eq!(output.len(), input.len());
        assert!(follower.envelope() > 0.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut follower = EnvelopeFollower::new(&EnvelopeConfig::default());
        follower.process(1.0);
        assert!(follower.envelope() > 0.0);
        follower.reset();
        assert_eq!(follower.envelope(), 0.0);
    }

    #[test]
    fn one_shot_helper_matches_input_length() {
        let input = vec![0.1, 0.5, 0.9, 0.7, 0.3];
        let output = envelope_follow(&input, 44100, 5.0, 50.0);
        assert_eq!(output.len(), input.len());
        assert!(output.iter().all(|&v| v >= 0.0));
    }
}

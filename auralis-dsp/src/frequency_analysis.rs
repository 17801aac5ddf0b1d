/// FFT-based frequency distribution analysis.
/// Divides the audio spectrum into the 7 perceptual bands of the fingerprint.
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Energy share (percent, summing to ~100) of each perceptual frequency band.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyBands {
    pub sub_bass: f64,  // 20-60 Hz
    pub bass: f64,       // 60-250 Hz
    pub low_mid: f64,    // 250-500 Hz
    pub mid: f64,        // 500-2000 Hz
    pub upper_mid: f64,  // 2000-4000 Hz
    pub presence: f64,   // 4000-8000 Hz
    pub air: f64,        // 8000-20000 Hz
}

impl FrequencyBands {
    pub fn sum(&self) -> f64 {
        self.sub_bass + self.bass + self.low_mid + self.mid + self.upper_mid + self.presence + self.air
    }

    fn uniform() -> Self {
        let share = 100.0 / 7.0;
        Self {
            sub_bass: share,
            bass: share,
            low_mid: share,
            mid: share,
            upper_mid: share,
            presence: share,
            air: share,
        }
    }
}

fn hann_window(signal: &mut [Complex64]) {
    let n = signal.len() as f64;
    for (i, sample) in signal.iter_mut().enumerate() {
        let w = 0.5 * (1.0 - (2.0 * PI * i as f64 / n).cos());
        sample.re *= w;
    }
}

fn hz_to_bin(hz: f64, sample_rate: u32, fft_size: usize) -> usize {
    ((hz * fft_size as f64) / sample_rate as f64).floor() as usize
}

fn integrate_power(psd: &[f64], start_bin: usize, end_bin: usize) -> f64 {
    if start_bin >= psd.len() {
        return 0.0;
    }
    let end = end_bin.min(psd.len());
    psd[start_bin..end].iter().sum()
}

/// Compute the 7-band frequency distribution, normalized to sum to ~100.
pub fn compute_frequency_distribution(audio: &[f64], sample_rate: u32) -> FrequencyBands {
    if audio.is_empty() || sample_rate == 0 {
        return FrequencyBands::uniform();
    }

    // Bound the FFT to the first 30 seconds; representative of the whole track
    // while keeping cost flat for very long recordings.
    let analysis_len = ((30.0 * sample_rate as f64) as usize).min(audio.len());
    let analysis_audio = &audio[..analysis_len];

    let fft_size = analysis_len.max(1).next_power_of_two();
    let mut input: Vec<Complex64> = vec![Complex64::new(0.0, 0.0); fft_size];
    for (i, &s) in analysis_audio.iter().enumerate() {
        input[i].re = s;
    }
    hann_window(&mut input);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut input);

    let psd: Vec<f64> = input.iter().map(|c| c.norm_sqr() / (fft_size as f64).powi(2)).collect();

    let nyquist = sample_rate as f64 / 2.0;
    let edges = [20.0, 60.0, 250.0, 500.0, 2000.0, 4000.0, 8000.0, 20000.0_f64];
    let bins: Vec<usize> = edges.iter().map(|&hz| hz_to_bin(hz.min(nyquist), sample_rate, fft_size)).collect();

    let mut bands = [0.0f64; 7];
    for i in 0..7 {
        bands[i] = integrate_power(&psd, bins[i], bins[i + 1]);
    }

    let total: f64 = bands.iter().sum();
    if total > 1e-12 {
        for b in bands.iter_mut() {
            *b = *b / total * 100.0;
        }
    } else {
        return FrequencyBands::uniform();
    }

    FrequencyBands {
        sub_bass: bands[0],
        bass: bands[1],
        low_mid: bands[2],
        mid: bands[3],
        upper_mid: bands[4],
        presence: bands[5],
        air: bands[6],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_audio_yields_uniform_distribution() {
        let d = compute_frequency_distribution(&[], 48000);
        assert!((d.sum() - 100.0).abs() < 0.01);
    }

    #[test]
    fn bass_tone_concentrates_in_bass_band() {
        let sr = 48000u32;
        let freq = 100.0;
        let samples = (2.0 * sr as f64) as usize;
        let audio: Vec<f64> = (0..samples)
            .map(|i| (2.0 * PI * freq * i as f64 / sr as f64).sin())
            .collect();
        let d = compute_frequency_distribution(&audio, sr);
        assert!(d.bass > d.air);
        assert!(d.bass > d.presence);
        assert!((d.sum() - 100.0).abs() < 0.5);
    }

    #[test]
    fn presence_tone_concentrates_in_presence_band() {
        let sr = 48000u32;
        let freq = 5000.0;
        let samples = (2.0 * sr as f64) as usize;
        let audio: Vec<f64> = (0..samples)
            .map(|i| (2.0 * PI * freq * i as f64 / sr as f64).sin())
            .collect();
        let d = compute_frequency_distribution(&audio, sr);
        assert!(d.presence > d.sub_bass);
        assert!(d.presence > d.bass);
    }
}

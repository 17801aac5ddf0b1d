/// Spectral shape features: centroid, rolloff, flatness.
///
/// Per the open question in spec.md §9, `spectral_centroid` and
/// `spectral_rolloff` are kept in Hz (not normalized to [0,1]) throughout
/// this crate — see the field docs on `crate::fingerprint::AudioFingerprint`.
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Center of mass of the power spectrum, in Hz. Higher = brighter.
pub fn compute_spectral_centroid(psd: &[f64], freqs: &[f64]) -> f64 {
    if psd.is_empty() || psd.len() != freqs.len() {
        return 0.0;
    }
    let total: f64 = psd.iter().sum();
    if total < 1e-10 {
        return 0.0;
    }
    let weighted: f64 = psd.iter().zip(freqs).map(|(p, f)| p * f).sum();
    weighted / total
}

/// Frequency below which `rolloff` fraction of total spectral energy lies.
pub fn compute_spectral_rolloff(psd: &[f64], freqs: &[f64], rolloff: f64) -> f64 {
    if psd.is_empty() || psd.len() != freqs.len() {
        return 0.0;
    }
    let total: f64 = psd.iter().sum();
    if total < 1e-10 {
        return 0.0;
    }
    let threshold = rolloff * total;
    let mut cumulative = 0.0;
    for (p, f) in psd.iter().zip(freqs) {
        cumulative += p;
        if cumulative >= threshold {
            return *f;
        }
    }
    *freqs.last().unwrap()
}

/// Spectral flatness (Wiener entropy): geometric mean / arithmetic mean of
/// the power spectrum. 0 = pure tone, 1 = white noise.
pub fn compute_spectral_flatness(psd: &[f64]) -> f64 {
    let nonzero: Vec<f64> = psd.iter().copied().filter(|&p| p > 1e-10).collect();
    if nonzero.is_empty() {
        return 0.0;
    }
    let log_sum: f64 = nonzero.iter().map(|p| p.ln()).sum();
    let geometric_mean = (log_sum / nonzero.len() as f64).exp();
    let arithmetic_mean: f64 = nonzero.iter().sum::<f64>() / nonzero.len() as f64;
    if arithmetic_mean < 1e-10 {
        return 0.0;
    }
    (geometric_mean / arithmetic_mean).clamp(0.0, 1.0)
}

/// Windowed FFT of `audio`, returning `(frequencies, power_spectral_density)`
/// for the half-spectrum (DC to Nyquist).
pub fn audio_to_freq_domain(audio: &[f64], sample_rate: u32) -> (Vec<f64>, Vec<f64>) {
    if audio.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let fft_size = audio.len().next_power_of_two();
    let mut input: Vec<Complex64> = vec![Complex64::new(0.0, 0.0); fft_size];
    for (i, &s) in audio.iter().enumerate() {
        input[i].re = s;
    }

    let n = audio.len() as f64;
    for (i, sample) in input.iter_mut().enumerate().take(audio.len()) {
        let w = 0.5 * (1.0 - (2.0 * PI * i as f64 / n).cos());
        sample.re *= w;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut input);

    let half = fft_size / 2;
    let psd: Vec<f64> = input[..half].iter().map(|c| c.norm_sqr() / (fft_size as f64).powi(2)).collect();
    let freqs: Vec<f64> = (0..half).map(|i| i as f64 * sample_rate as f64 / fft_size as f64).collect();

    (freqs, psd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_is_low_for_bass_heavy_spectrum() {
        let freqs: Vec<f64> = (0..100).map(|i| i as f64 * 10.0).collect();
        let psd: Vec<f64> = (0..100).map(|i| if i < 20 { 1.0 } else { 0.1 }).collect();
        assert!(compute_spectral_centroid(&psd, &freqs) < 500.0);
    }

    #[test]
    fn centroid_is_high_for_treble_heavy_spectrum() {
        let freqs: Vec<f64> = (0..100).map(|i| i as f64 * 100.0).collect();
        let psd: Vec<f64> = (0..100).map(|i| if i > 80 { 1.0 } else { 0.1 }).collect();
        assert!(compute_spectral_centroid(&psd, &freqs) > 5000.0);
    }

    #[test]
    fn rolloff_uniform_spectrum_near_rolloff_fraction_of_bandwidth() {
        let freqs: Vec<f64> = (0..100).map(|i| i as f64 * 100.0).collect();
        let psd = vec![1.0; 100];
        let r = compute_spectral_rolloff(&psd, &freqs, 0.85);
        assert!(r > 7000.0 && r < 9000.0);
    }

    #[test]
    fn flatness_tone_is_low_noise_is_high() {
        let mut tone = vec![0.0; 100];
        tone[20] = 1.0;
        assert!(compute_spectral_flatness(&tone) < 0.5);
        assert!(compute_spectral_flatness(&vec![1.0; 100]) > 0.9);
    }
}

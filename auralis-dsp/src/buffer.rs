use crate::error::{Error, Result};

/// A PCM audio buffer, owned per-channel (planar) regardless of how the
/// caller supplied it.
///
/// Callers may hand in interleaved or planar float samples; this is the
/// single point where that distinction is normalized away. Every DSP stage
/// downstream works on planar channel slices.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    channels: Vec<Vec<f64>>,
}

impl AudioBuffer {
    /// Build from interleaved samples (`L, R, L, R, ...` for stereo).
    pub fn from_interleaved(samples: &[f64], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 || channel_count > 2 {
            return Err(Error::UnsupportedChannels(channel_count));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidInput("sample_rate must be > 0".into()));
        }
        if samples.len() % channel_count != 0 {
            return Err(Error::InvalidInput(
                "interleaved sample count is not a multiple of channel count".into(),
            ));
        }
        if !samples.iter().all(|s| s.is_finite()) {
            return Err(Error::InvalidInput("audio contains non-finite samples".into()));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }

        Ok(Self { sample_rate, channels })
    }

    /// Build from planar channels (each channel already its own contiguous slice).
    pub fn from_planar(channels: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(Error::UnsupportedChannels(channels.len()));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidInput("sample_rate must be > 0".into()));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(Error::InvalidInput("channels have mismatched lengths".into()));
        }
        if channels.iter().flatten().any(|s| !s.is_finite()) {
            return Err(Error::InvalidInput("audio contains non-finite samples".into()));
        }

        Ok(Self { sample_rate, channels })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn is_stereo(&self) -> bool {
        self.channels.len() == 2
    }

    pub fn channel(&self, index: usize) -> &[f64] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.channels[index]
    }

    pub fn channels_slice(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.channels
    }

    /// Downmix to a single mono channel by averaging, without mutating self.
    pub fn to_mono(&self) -> Vec<f64> {
        if self.channels.len() == 1 {
            return self.channels[0].clone();
        }
        let (l, r) = (&self.channels[0], &self.channels[1]);
        l.iter().zip(r.iter()).map(|(a, b)| (a + b) * 0.5).collect()
    }

    /// Interleave back into a single flat buffer (for returning to callers).
    pub fn to_interleaved(&self) -> Vec<f64> {
        let frames = self.num_samples();
        let mut out = Vec::with_capacity(frames * self.channels.len());
        for i in 0..frames {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    pub fn all_finite(&self) -> bool {
        self.channels.iter().flatten().all(|s| s.is_finite())
    }
}

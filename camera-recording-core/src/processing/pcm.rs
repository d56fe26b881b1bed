/// Sample-format helpers for the audio track: channel folding, linear
/// resampling and 16-bit PCM packing.
#[derive(Debug, Clone, Copy)]
pub struct PcmConverter {
    pub target_sample_rate: f64,
    pub target_channels: u16,
}

impl PcmConverter {
    pub fn new(target_sample_rate: f64, target_channels: u16) -> Self {
        Self {
            target_sample_rate,
            target_channels,
        }
    }

    /// Bring device samples to the target rate and channel layout.
    pub fn convert(&self, samples: &[f32], sample_rate: f64, channels: u16) -> Vec<f32> {
        let mono = downmix_to_mono(samples, channels as usize);
        let resampled = self.resample(&mono, sample_rate);
        if self.target_channels == 2 {
            resampled.iter().flat_map(|&s| [s, s]).collect()
        } else {
            resampled
        }
    }

    /// Linear interpolation from `source_sample_rate` to the target rate (mono).
    ///
    /// A rate that is not a positive finite number produces no output.
    pub fn resample(&self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        if !(source_sample_rate.is_finite() && source_sample_rate > 0.0) {
            log::warn!("Dropping {} samples with unusable rate {}", samples.len(), source_sample_rate);
            return Vec::new();
        }
        if (source_sample_rate - self.target_sample_rate).abs() < 0.01 || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = self.target_sample_rate / source_sample_rate;
        let output_count = (samples.len() as f64 * ratio) as usize;
        let last = samples.len() - 1;

        (0..output_count)
            .map(|i| {
                let position = i as f64 / ratio;
                let index = (position as usize).min(last);
                let fraction = (position - index as f64) as f32;
                let next = samples[(index + 1).min(last)];
                samples[index] * (1.0 - fraction) + next * fraction
            })
            .collect()
    }
}

/// Average interleaved channels down to one.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// `[-1, 1]` floats to little-endian signed 16-bit PCM, clamping outliers.
pub fn to_int16_le(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| ((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).to_le_bytes())
        .collect()
}

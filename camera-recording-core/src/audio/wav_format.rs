//! 44-byte canonical RIFF/WAVE header for 16-bit PCM.

use crate::models::config::AudioSettings;

pub const WAV_HEADER_SIZE: usize = 44;

/// PCM layout of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl WavSpec {
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bit_depth as u32 / 8
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bit_depth / 8
    }

    /// Header announcing `data_size` bytes of sample data.
    ///
    /// ```text
    /// [0-3]   "RIFF"          [4-7]   36 + data_size
    /// [8-11]  "WAVE"          [12-15] "fmt "
    /// [16-19] 16              [20-21] 1 (PCM)
    /// [22-23] channels        [24-27] sample rate
    /// [28-31] byte rate       [32-33] block align
    /// [34-35] bit depth       [36-39] "data"
    /// [40-43] data_size
    /// ```
    pub fn header(&self, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&(36u32.saturating_add(data_size)).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bit_depth.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_size.to_le_bytes());
        header
    }
}

impl From<&AudioSettings> for WavSpec {
    fn from(settings: &AudioSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate as u32,
            channels: settings.channels,
            bit_depth: settings.bit_depth,
        }
    }
}

/// RIFF chunk size (offset 4) and data size (offset 40) for a finished stream.
///
/// Sizes past `u32::MAX` saturate; such a file is already unplayable.
pub fn size_fields(data_size: u64) -> (u32, u32) {
    let data = u32::try_from(data_size).unwrap_or(u32::MAX);
    (data.saturating_add(36), data)
}

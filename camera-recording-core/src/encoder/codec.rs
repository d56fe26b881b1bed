use std::path::Path;
use std::time::Duration;

use crate::models::config::{EncoderSettings, VideoFileType};
use crate::models::error::EncoderError;
use crate::models::geometry::Size;
use crate::processing::bitmap::Bitmap;

/// Encoder configuration derived from [`EncoderSettings`] and the canvas size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormat {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub bit_rate: u32,
    pub frame_rate: u32,
    pub keyframe_interval_secs: u32,
}

impl VideoFormat {
    pub fn new(settings: &EncoderSettings, size: Size) -> Self {
        Self {
            mime_type: settings.mime_type.clone(),
            width: size.width,
            height: size.height,
            bit_rate: settings.bit_rate,
            frame_rate: settings.frame_rate,
            keyframe_interval_secs: settings.keyframe_interval_secs,
        }
    }
}

/// Output format reported by the encoder once, before its first sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFormat {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Codec-specific data (e.g. SPS/PPS for AVC).
    pub codec_specific_data: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    pub key_frame: bool,
    pub codec_config: bool,
    pub end_of_stream: bool,
}

/// Metadata of one encoded output buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleInfo {
    pub offset: usize,
    pub size: usize,
    pub presentation_time_us: i64,
    pub flags: BufferFlags,
}

/// One step of the encoder's output-buffer protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderOutput {
    /// Nothing available within the dequeue timeout.
    TryAgainLater,
    FormatChanged(TrackFormat),
    /// A filled output buffer; fetch it with [`VideoEncoder::output_buffer`]
    /// and hand it back with [`VideoEncoder::release_output_buffer`].
    Buffer { index: usize, info: SampleInfo },
}

/// Drawable surface feeding the encoder's input.
pub trait InputSurface: Send {
    fn present(&mut self, image: &Bitmap, timestamp: Duration) -> Result<(), EncoderError>;

    fn release(&mut self);
}

/// Hardware video encoder, e.g. MediaCodec on Android or VideoToolbox on iOS.
///
/// Calls are not thread safe; the pipeline serializes them under one lock.
pub trait VideoEncoder: Send {
    fn configure(&mut self, format: &VideoFormat) -> Result<(), EncoderError>;

    /// Must be called after `configure` and before `start`.
    fn create_input_surface(&mut self) -> Result<Box<dyn InputSurface>, EncoderError>;

    fn start(&mut self) -> Result<(), EncoderError>;

    fn signal_end_of_input_stream(&mut self) -> Result<(), EncoderError>;

    fn dequeue_output_buffer(&mut self, timeout: Duration) -> Result<EncoderOutput, EncoderError>;

    fn output_buffer(&mut self, index: usize) -> Result<&[u8], EncoderError>;

    fn release_output_buffer(&mut self, index: usize) -> Result<(), EncoderError>;

    fn stop(&mut self) -> Result<(), EncoderError>;

    fn release(&mut self);
}

/// Container writer, e.g. MediaMuxer or AVAssetWriter.
pub trait ContainerMuxer: Send {
    fn add_track(&mut self, format: &TrackFormat) -> Result<usize, EncoderError>;

    fn start(&mut self) -> Result<(), EncoderError>;

    fn write_sample(&mut self, track: usize, data: &[u8], info: &SampleInfo) -> Result<(), EncoderError>;

    fn stop(&mut self) -> Result<(), EncoderError>;

    fn release(&mut self);
}

pub trait VideoEncoderFactory: Send + Sync {
    fn create_encoder(&self, mime_type: &str) -> Result<Box<dyn VideoEncoder>, EncoderError>;
}

pub trait MuxerFactory: Send + Sync {
    fn create_muxer(&self, path: &Path, file_type: VideoFileType) -> Result<Box<dyn ContainerMuxer>, EncoderError>;
}

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::RecorderError;
use super::geometry::{CameraPosition, Orientation, Size};

/// Container type of the finished recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFileType {
    #[default]
    Mp4,
    Mov,
}

impl VideoFileType {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }
}

/// Location embedded into the container metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude out of range: {}", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude out of range: {}", self.longitude));
        }
        Ok(())
    }
}

/// Options for a single `start_recording` call.
///
/// Deserializes from the camelCase JSON the bridge layer hands over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingOptions {
    /// Where the finished video is written.
    pub output_path: PathBuf,

    pub file_type: VideoFileType,

    /// Record an audio track alongside the video (default: true).
    pub enable_audio: bool,

    /// Blur every detected face in the recorded video (default: false).
    pub enable_face_blur: bool,

    pub location: Option<Location>,

    /// Camera output size, in either orientation.
    pub video_size: Size,

    /// Orientation the recorded output is laid out in.
    pub orientation: Orientation,

    pub camera_position: CameraPosition,
}

impl RecordingOptions {
    pub fn from_json(json: &str) -> Result<Self, RecorderError> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| RecorderError::ConfigurationFailed(format!("invalid recording options: {}", e)))?;
        options.validate().map_err(RecorderError::ConfigurationFailed)?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output_path.as_os_str().is_empty() {
            return Err("output path must not be empty".into());
        }
        if self.video_size.is_empty() {
            return Err(format!(
                "video size must be non-zero, got {}x{}",
                self.video_size.width, self.video_size.height
            ));
        }
        if self.video_size.width % 2 != 0 || self.video_size.height % 2 != 0 {
            return Err(format!(
                "video size must be even, got {}x{}",
                self.video_size.width, self.video_size.height
            ));
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }

    /// Output dimensions after applying the configured orientation.
    pub fn resolved_size(&self) -> Size {
        self.video_size.oriented(self.orientation)
    }
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("recording.mp4"),
            file_type: VideoFileType::Mp4,
            enable_audio: true,
            enable_face_blur: false,
            location: None,
            video_size: Size::new(1920, 1080),
            orientation: Orientation::Portrait,
            camera_position: CameraPosition::Back,
        }
    }
}

/// Fixed hardware encoder parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub mime_type: String,
    pub bit_rate: u32,
    pub frame_rate: u32,
    pub keyframe_interval_secs: u32,
    /// Bounded wait of a single output-buffer dequeue.
    pub dequeue_timeout: Duration,
    /// Upper bound on the end-of-stream drain before cleanup proceeds anyway.
    pub drain_deadline: Duration,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            mime_type: "video/avc".into(),
            bit_rate: 4_000_000,
            frame_rate: 30,
            keyframe_interval_secs: 1,
            dequeue_timeout: Duration::from_millis(10),
            drain_deadline: Duration::from_secs(3),
        }
    }
}

/// Blur strength. Larger values trade quality for throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurSettings {
    pub downscale_factor: u32,
    pub radius: u32,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            downscale_factor: 8,
            radius: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    /// Frames arriving sooner than this after the last detected frame skip detection.
    pub min_interval: Duration,
    /// Detection worker threads. One suits low-end devices.
    pub worker_count: usize,
    /// Scale applied to the frame before detection and compositing.
    pub detection_scale: f32,
    /// How long the encoder context waits for a pending detection result.
    pub result_timeout: Duration,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(100),
            worker_count: 1,
            detection_scale: 0.5,
            result_timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    pub sample_rate: f64,
    pub channels: u16,
    pub bit_depth: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            channels: 1,
            bit_depth: 16,
        }
    }
}

/// Configuration of the recording pipeline, shared by every session a
/// coordinator runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub encoder: EncoderSettings,
    pub blur: BlurSettings,
    pub detection: DetectionSettings,
    pub audio: AudioSettings,

    /// Pause between stopping the face-blur pipeline and the platform recorder.
    pub stop_grace_period: Duration,

    /// Frames buffered toward the encoder context before new ones are dropped.
    pub frame_queue_depth: usize,

    /// Directory for processed-video, processed-audio and raw scratch files.
    pub scratch_directory: PathBuf,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.encoder.bit_rate == 0 || self.encoder.frame_rate == 0 {
            return Err("encoder bit rate and frame rate must be positive".into());
        }
        if self.blur.downscale_factor == 0 {
            return Err("blur downscale factor must be at least 1".into());
        }
        if self.detection.worker_count == 0 {
            return Err("at least one detection worker is required".into());
        }
        if !(self.detection.detection_scale > 0.0 && self.detection.detection_scale <= 1.0) {
            return Err(format!(
                "detection scale must be in (0, 1], got {}",
                self.detection.detection_scale
            ));
        }
        if self.frame_queue_depth == 0 {
            return Err("frame queue depth must be positive".into());
        }
        if self.audio.sample_rate <= 0.0 {
            return Err("audio sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.audio.channels) {
            return Err(format!("unsupported audio channel count: {}", self.audio.channels));
        }
        if self.audio.bit_depth != 16 {
            return Err(format!("unsupported audio bit depth: {}", self.audio.bit_depth));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderSettings::default(),
            blur: BlurSettings::default(),
            detection: DetectionSettings::default(),
            audio: AudioSettings::default(),
            stop_grace_period: Duration::from_millis(200),
            frame_queue_depth: 8,
            scratch_directory: std::env::temp_dir(),
        }
    }
}

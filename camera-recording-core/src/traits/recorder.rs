use std::path::PathBuf;
use std::sync::Arc;

use crate::frame::frame::Frame;
use crate::models::config::{Location, VideoFileType};
use crate::models::error::Result;
use crate::models::video::RecordingStatistics;

/// Where and how the platform recorder writes its file.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFileOptions {
    pub path: PathBuf,
    pub file_type: VideoFileType,
    pub location: Option<Location>,
    pub enable_audio: bool,
}

/// Error reported by the platform recorder when it finalizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderFailure {
    pub message: String,
    /// The file is still playable despite the error (e.g. max duration reached).
    pub has_usable_video: bool,
}

impl RecorderFailure {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            has_usable_video: false,
        }
    }

    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            has_usable_video: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    Started,
    /// Must be reported at least once for a recording that holds data. A
    /// session whose last status shows zero bytes ends with `NoFramesRecorded`.
    Status(RecordingStatistics),
    /// Terminal; the recording file is closed.
    Finalize { error: Option<RecorderFailure> },
}

/// Receives the events of one platform recording.
///
/// Events may arrive on any thread, including synchronously from inside
/// [`PlatformRecorderFactory::start_recording`] or [`PlatformRecording::stop`].
pub trait RecorderEventSink: Send + Sync {
    fn on_event(&self, event: RecorderEvent);
}

/// Handle to a running platform recording (CameraX Recording, AVCaptureMovieFileOutput, ...).
pub trait PlatformRecording: Send {
    /// Feed one frame to recorders that take frames rather than reading the camera directly.
    fn append_frame(&mut self, frame: &Frame) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Request stop. Completion is reported through `Finalize`.
    fn stop(&mut self) -> Result<()>;
}

pub trait PlatformRecorderFactory: Send + Sync {
    fn start_recording(
        &self,
        output: &OutputFileOptions,
        events: Arc<dyn RecorderEventSink>,
    ) -> Result<Box<dyn PlatformRecording>>;
}

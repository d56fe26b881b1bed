use thiserror::Error;

/// Codec and muxer protocol violations.
///
/// Any of these is fatal for the session that raised it: the pipeline is
/// aborted and its resources released. None of them is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("encoder reported its output format more than once")]
    FormatChangedTwice,

    #[error("muxer already started")]
    MuxerAlreadyStarted,

    #[error("muxer received sample data before it was started")]
    MuxerNotStarted,

    #[error("encoder pipeline is {actual}, expected {expected}")]
    InvalidState { expected: String, actual: String },

    #[error("codec failure: {0}")]
    Codec(String),

    #[error("muxer failure: {0}")]
    Muxer(String),
}

/// Errors surfaced by the recording pipeline.
///
/// Every terminal failure a caller can observe through the error callback is
/// one of these variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("camera is not ready")]
    CameraNotReady,

    #[error("a recording is already in progress")]
    RecordingInProgress,

    #[error("video output is disabled")]
    VideoDisabled,

    #[error("no recording is in progress")]
    NoRecordingInProgress,

    #[error("recording was canceled")]
    RecordingCanceled,

    #[error("recording stopped before any frame was recorded")]
    NoFramesRecorded,

    #[error("file I/O failed: {0}")]
    FileIo(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("encoder failed: {0}")]
    Encoder(#[from] EncoderError),

    #[error("recorder failed: {0}")]
    RecorderFailed(String),

    #[error("timeout")]
    Timeout,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl RecorderError {
    /// Stable identifier handed to the bridge layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CameraNotReady => "session/camera-not-ready",
            Self::RecordingInProgress => "capture/recording-in-progress",
            Self::VideoDisabled => "capture/video-not-enabled",
            Self::NoRecordingInProgress => "capture/no-recording-in-progress",
            Self::RecordingCanceled => "capture/recording-canceled",
            Self::NoFramesRecorded => "capture/no-data",
            Self::FileIo(_) => "capture/file-io-error",
            Self::ConfigurationFailed(_) => "capture/invalid-configuration",
            Self::Encoder(_) => "capture/encoder-error",
            Self::RecorderFailed(_) => "capture/recorder-error",
            Self::Timeout => "capture/timeout",
            Self::Unknown(_) => "capture/unknown",
        }
    }

    /// Whether the error is a caller precondition violation (never retried).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::CameraNotReady
                | Self::RecordingInProgress
                | Self::VideoDisabled
                | Self::NoRecordingInProgress
        )
    }
}

impl From<std::io::Error> for RecorderError {
    fn from(error: std::io::Error) -> Self {
        Self::FileIo(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;

//! # camera-recording-core
//!
//! Platform-agnostic recording core of the camera plugin.
//!
//! Drives a platform video recorder and, when face blur is requested, a
//! parallel pipeline that detects faces, blurs them and re-encodes every
//! frame through a hardware encoder. Platform backends (Android CameraX +
//! MediaCodec, AVFoundation) implement the traits in `traits/`, `encoder/`,
//! `detection/` and `audio/` and plug into the generic `RecordingCoordinator`.
//!
//! ## Architecture
//!
//! ```text
//! camera-recording-core (this crate)
//! ├── models/       ← RecorderError, RecordingPhase, RecordingOptions, PipelineConfig, Video
//! ├── frame/        ← Frame (ref-counted), FrameSource, BufferPool
//! ├── processing/   ← RGBA bitmaps, NV21 conversion, ImageProcessor (image crate), RingBuffer
//! ├── detection/    ← FaceDetectionEngine, FaceDetector worker pool, throttle
//! ├── compositor/   ← CanvasTransform, BlurCompositor
//! ├── encoder/      ← VideoEncoder, ContainerMuxer, EncoderPipeline (drain loop)
//! ├── audio/        ← AudioRecorder, WavAudioRecorder, WAV I/O
//! ├── session/      ← RecordingCoordinator, FaceBlurSession, RecordingCallbacks
//! ├── storage/      ← scratch files, checksum
//! └── traits/       ← PlatformRecorderFactory, RecordingDelegate, TrackMerger, Capabilities
//! ```

pub mod audio;
pub mod compositor;
pub mod detection;
pub mod encoder;
pub mod frame;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod sync;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use audio::provider::{AudioBufferCallback, AudioCaptureProvider};
pub use audio::recorder::{AudioRecorder, AudioRecorderFactory, AudioRecording, WavAudioRecorder};
pub use compositor::blur_compositor::BlurCompositor;
pub use detection::detector::{FaceDetectionEngine, FaceDetector};
pub use encoder::codec::{ContainerMuxer, InputSurface, MuxerFactory, VideoEncoder, VideoEncoderFactory};
pub use encoder::pipeline::EncoderPipeline;
pub use frame::frame::{Frame, FrameData, PixelFormat, RetainedFrame};
pub use frame::source::FrameSource;
pub use models::config::{PipelineConfig, RecordingOptions, VideoFileType};
pub use models::error::{EncoderError, RecorderError};
pub use models::face::{FaceRegion, Faces};
pub use models::geometry::{CameraPosition, Orientation, Rect, Rotation, Size};
pub use models::state::{EncoderState, RecordingPhase};
pub use models::video::{RecordingStatistics, Video};
pub use processing::bitmap::Bitmap;
pub use processing::processor::{ImageProcessor, SoftwareImageProcessor};
pub use session::callbacks::{PendingVideo, RecordingCallbacks};
pub use session::coordinator::RecordingCoordinator;
pub use session::face_blur::FaceBlurSession;
pub use traits::capabilities::Capabilities;
pub use traits::delegate::RecordingDelegate;
pub use traits::merger::{MergePolicy, MergeRequest, TrackMerger};
pub use traits::recorder::{PlatformRecorderFactory, PlatformRecording, RecorderEvent, RecorderEventSink};

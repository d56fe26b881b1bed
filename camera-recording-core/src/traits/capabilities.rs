use std::sync::Arc;

use crate::audio::recorder::AudioRecorderFactory;
use crate::detection::detector::FaceDetectionEngine;
use crate::encoder::codec::{MuxerFactory, VideoEncoderFactory};
use crate::processing::processor::{ImageProcessor, SoftwareImageProcessor};

use super::merger::TrackMerger;
use super::recorder::PlatformRecorderFactory;

/// Every platform facility the pipeline reaches.
#[derive(Clone)]
pub struct Capabilities {
    pub recorder: Arc<dyn PlatformRecorderFactory>,
    pub face_detection: Arc<dyn FaceDetectionEngine>,
    pub encoders: Arc<dyn VideoEncoderFactory>,
    pub muxers: Arc<dyn MuxerFactory>,
    pub audio: Arc<dyn AudioRecorderFactory>,
    pub merger: Arc<dyn TrackMerger>,
    pub image_processor: Arc<dyn ImageProcessor>,
}

impl Capabilities {
    /// Bundle with the portable [`SoftwareImageProcessor`].
    pub fn new(
        recorder: Arc<dyn PlatformRecorderFactory>,
        face_detection: Arc<dyn FaceDetectionEngine>,
        encoders: Arc<dyn VideoEncoderFactory>,
        muxers: Arc<dyn MuxerFactory>,
        audio: Arc<dyn AudioRecorderFactory>,
        merger: Arc<dyn TrackMerger>,
    ) -> Self {
        Self {
            recorder,
            face_detection,
            encoders,
            muxers,
            audio,
            merger,
            image_processor: Arc::new(SoftwareImageProcessor),
        }
    }

    /// Swap in an accelerated image processor.
    pub fn with_image_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.image_processor = processor;
        self
    }
}

use std::path::PathBuf;

use crate::models::config::{Location, VideoFileType};
use crate::models::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamPolicy {
    #[default]
    Copy,
    Transcode,
}

/// The video track is already encoded for the target container; audio is
/// raw PCM and always needs an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    pub video: StreamPolicy,
    pub audio: StreamPolicy,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            video: StreamPolicy::Copy,
            audio: StreamPolicy::Transcode,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub video: PathBuf,
    pub audio: Option<PathBuf>,
    pub output: PathBuf,
    pub file_type: VideoFileType,
    pub location: Option<Location>,
    pub policy: MergePolicy,
}

/// Combines the processed video and audio tracks into one container.
pub trait TrackMerger: Send + Sync {
    fn merge(&self, request: &MergeRequest) -> Result<()>;
}

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::VideoFileType;
use super::geometry::Size;

/// A finished recording, delivered through the success callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub path: PathBuf,
    pub duration_ms: u64,
    pub width: u32,
    pub height: u32,
    pub file_type: VideoFileType,
    /// SHA-256 of the finished file, lowercase hex.
    pub checksum: String,
    pub created_at: String,
}

impl Video {
    pub fn new(path: PathBuf, duration: Duration, size: Size, file_type: VideoFileType, checksum: String) -> Self {
        Self {
            path,
            duration_ms: duration.as_millis() as u64,
            width: size.width,
            height: size.height,
            file_type,
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Progress reported by the platform recorder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingStatistics {
    pub recorded_bytes: u64,
    pub recorded_duration: Duration,
}

impl RecordingStatistics {
    pub fn has_recorded_data(&self) -> bool {
        self.recorded_bytes > 0
    }
}

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::config::VideoFileType;
use crate::models::error::{RecorderError, Result};

/// Intermediate files of one face-blurred recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchFiles {
    /// Unprocessed platform recording.
    pub raw_video: PathBuf,
    /// Blurred video track written by the encoder pipeline.
    pub processed_video: PathBuf,
    pub processed_audio: PathBuf,
}

impl ScratchFiles {
    pub fn new(directory: &Path, session_id: Uuid, file_type: VideoFileType) -> Self {
        let ext = file_type.extension();
        Self {
            raw_video: directory.join(format!("raw_{}.{}", session_id, ext)),
            processed_video: directory.join(format!("processed_video_{}.{}", session_id, ext)),
            processed_audio: directory.join(format!("processed_audio_{}.wav", session_id)),
        }
    }

    pub fn paths(&self) -> [&Path; 3] {
        [&self.raw_video, &self.processed_video, &self.processed_audio]
    }

    /// Delete every scratch file, returning the ones that could not be removed.
    pub fn delete_all(&self) -> Vec<(PathBuf, io::Error)> {
        self.paths()
            .into_iter()
            .filter_map(|path| match delete_if_exists(path) {
                Ok(_) => None,
                Err(e) => Some((path.to_path_buf(), e)),
            })
            .collect()
    }
}

/// Remove `path`. A missing file is not an error; returns whether a file was removed.
pub fn delete_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Size of `path` in bytes, 0 if it does not exist.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| RecorderError::FileIo(format!("failed to open {} for checksum: {}", path.display(), e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

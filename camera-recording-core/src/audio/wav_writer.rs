use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::models::error::{RecorderError, Result};

use super::wav_format::{self, WavSpec};

/// Streaming WAV writer. The header is written with a zero data size up
/// front and patched when the writer is finished.
pub struct WavFileWriter {
    path: PathBuf,
    spec: WavSpec,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavFileWriter {
    pub fn create(path: impl Into<PathBuf>, spec: WavSpec) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RecorderError::FileIo(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        let file = File::create(&path)
            .map_err(|e| RecorderError::FileIo(format!("failed to create {}: {}", path.display(), e)))?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&spec.header(0))?;
        Ok(Self {
            path,
            spec,
            file: Some(writer),
            data_bytes: 0,
        })
    }

    /// Append raw little-endian PCM.
    pub fn write_pcm(&mut self, pcm: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecorderError::FileIo("WAV writer is already finished".into()))?;
        file.write_all(pcm)
            .map_err(|e| RecorderError::FileIo(format!("audio write failed: {}", e)))?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    /// Patch the header sizes and flush. Returns the number of data bytes.
    pub fn finish(&mut self) -> Result<u64> {
        let mut writer = self
            .file
            .take()
            .ok_or_else(|| RecorderError::FileIo("WAV writer is already finished".into()))?;
        let (chunk_size, data_size) = wav_format::size_fields(self.data_bytes);

        writer.seek(SeekFrom::Start(4))?;
        writer.write_all(&chunk_size.to_le_bytes())?;
        writer.seek(SeekFrom::Start(40))?;
        writer.write_all(&data_size.to_le_bytes())?;
        writer.flush()?;

        log::debug!(
            "Finished {} ({} bytes of {} Hz audio)",
            self.path.display(),
            self.data_bytes,
            self.spec.sample_rate
        );
        Ok(self.data_bytes)
    }
}

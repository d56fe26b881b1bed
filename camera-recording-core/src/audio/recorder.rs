use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::AudioSettings;
use crate::models::error::{RecorderError, Result};
use crate::processing::pcm::{to_int16_le, PcmConverter};
use crate::processing::ring_buffer::RingBuffer;

use super::provider::AudioCaptureProvider;
use super::wav_format::WavSpec;
use super::wav_writer::WavFileWriter;

const PROCESSING_INTERVAL: Duration = Duration::from_millis(100);
const BUFFERED_SECONDS: f64 = 5.0;

/// A finished audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRecording {
    pub path: PathBuf,
    pub duration: Duration,
    pub data_bytes: u64,
}

/// Records the audio track that accompanies a face-blurred video.
pub trait AudioRecorder: Send {
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and finalize the file.
    fn stop(&mut self) -> Result<AudioRecording>;
}

pub trait AudioRecorderFactory: Send + Sync {
    fn create_recorder(&self, path: &Path, settings: &AudioSettings) -> Result<Box<dyn AudioRecorder>>;
}

/// WAV recorder over an [`AudioCaptureProvider`].
///
/// ```text
/// [provider thread] → convert → [RingBuffer] → [audio-processing thread] → [WavFileWriter]
/// ```
pub struct WavAudioRecorder<P: AudioCaptureProvider> {
    provider: P,
    path: PathBuf,
    settings: AudioSettings,
    converter: PcmConverter,
    buffer: Arc<Mutex<RingBuffer<f32>>>,
    writer: Arc<Mutex<Option<WavFileWriter>>>,
    running: Arc<AtomicBool>,
    processing_handle: Option<thread::JoinHandle<()>>,
}

impl<P: AudioCaptureProvider> WavAudioRecorder<P> {
    pub fn new(provider: P, path: impl Into<PathBuf>, settings: AudioSettings) -> Self {
        let capacity = (settings.sample_rate * BUFFERED_SECONDS) as usize * settings.channels.max(1) as usize;
        Self {
            provider,
            path: path.into(),
            converter: PcmConverter::new(settings.sample_rate, settings.channels),
            settings,
            buffer: Arc::new(Mutex::new(RingBuffer::new(capacity))),
            writer: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            processing_handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start_processing_loop(&mut self) -> Result<()> {
        let running = Arc::clone(&self.running);
        let buffer = Arc::clone(&self.buffer);
        let writer = Arc::clone(&self.writer);

        let handle = thread::Builder::new()
            .name("audio-processing".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(PROCESSING_INTERVAL);
                    drain_into_writer(&buffer, &writer);
                }
            })
            .map_err(|e| RecorderError::Unknown(format!("failed to spawn audio thread: {}", e)))?;
        self.processing_handle = Some(handle);
        Ok(())
    }

    fn stop_processing_loop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.processing_handle.take() {
            if handle.join().is_err() {
                log::error!("Audio processing thread panicked");
            }
        }
    }
}

impl<P: AudioCaptureProvider> AudioRecorder for WavAudioRecorder<P> {
    fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(RecorderError::RecordingInProgress);
        }
        if !self.provider.is_available() {
            return Err(RecorderError::RecorderFailed(format!(
                "audio device {} is not available",
                self.provider.device_name()
            )));
        }

        *self.writer.lock() = Some(WavFileWriter::create(&self.path, WavSpec::from(&self.settings))?);
        self.buffer.lock().clear();

        let buffer = Arc::clone(&self.buffer);
        let converter = self.converter;
        let callback = Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            let converted = converter.convert(samples, sample_rate, channels);
            buffer.lock().push_slice(&converted);
        });

        self.running.store(true, Ordering::SeqCst);
        let started = self.provider.start(callback).and_then(|_| self.start_processing_loop());
        if let Err(e) = started {
            self.stop_processing_loop();
            let _ = self.provider.stop();
            *self.writer.lock() = None;
            return Err(e);
        }

        log::info!(
            "Audio recording started on {} -> {}",
            self.provider.device_name(),
            self.path.display()
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioRecording> {
        if !self.is_running() {
            return Err(RecorderError::NoRecordingInProgress);
        }
        if let Err(e) = self.provider.stop() {
            log::warn!("Failed to stop audio device: {}", e);
        }
        self.stop_processing_loop();

        // Whatever the provider delivered before it stopped.
        drain_into_writer(&self.buffer, &self.writer);

        let mut writer = self
            .writer
            .lock()
            .take()
            .ok_or_else(|| RecorderError::FileIo("audio writer is not open".into()))?;
        let data_bytes = writer.finish()?;

        let byte_rate = WavSpec::from(&self.settings).byte_rate().max(1);
        let duration = Duration::from_secs_f64(data_bytes as f64 / byte_rate as f64);
        log::info!("Audio recording stopped: {:?} in {}", duration, self.path.display());

        Ok(AudioRecording {
            path: self.path.clone(),
            duration,
            data_bytes,
        })
    }
}

impl<P: AudioCaptureProvider> Drop for WavAudioRecorder<P> {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.provider.stop();
            self.stop_processing_loop();
        }
    }
}

/// Move everything queued so far to the file.
fn drain_into_writer(buffer: &Mutex<RingBuffer<f32>>, writer: &Mutex<Option<WavFileWriter>>) {
    let samples = buffer.lock().pop_up_to(usize::MAX);
    if samples.is_empty() {
        return;
    }
    let pcm = to_int16_le(&samples);
    if let Some(writer) = writer.lock().as_mut() {
        if let Err(e) = writer.write_pcm(&pcm) {
            log::error!("Failed to write audio data: {}", e);
        }
    }
}

/// Builds a [`WavAudioRecorder`] per session from a provider constructor.
pub struct WavAudioRecorderFactory<F> {
    make_provider: F,
}

impl<F> WavAudioRecorderFactory<F> {
    pub fn new(make_provider: F) -> Self {
        Self { make_provider }
    }
}

impl<F, P> AudioRecorderFactory for WavAudioRecorderFactory<F>
where
    F: Fn() -> Result<P> + Send + Sync,
    P: AudioCaptureProvider + 'static,
{
    fn create_recorder(&self, path: &Path, settings: &AudioSettings) -> Result<Box<dyn AudioRecorder>> {
        let provider = (self.make_provider)()?;
        Ok(Box::new(WavAudioRecorder::new(provider, path, *settings)))
    }
}

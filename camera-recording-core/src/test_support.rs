//! In-memory fakes of the platform capabilities, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::recorder::{AudioRecorder, AudioRecorderFactory, AudioRecording};
use crate::detection::detector::FaceDetectionEngine;
use crate::encoder::codec::{
    BufferFlags, ContainerMuxer, EncoderOutput, InputSurface, MuxerFactory, SampleInfo, TrackFormat, VideoEncoder,
    VideoEncoderFactory, VideoFormat,
};
use crate::frame::frame::Frame;
use crate::models::config::{AudioSettings, PipelineConfig, VideoFileType};
use crate::models::error::{EncoderError, RecorderError, Result as RecorderResult};
use crate::models::face::FaceRegion;
use crate::models::geometry::Rect;
use crate::models::video::RecordingStatistics;
use crate::processing::bitmap::Bitmap;
use crate::traits::capabilities::Capabilities;
use crate::traits::merger::{MergeRequest, TrackMerger};
use crate::traits::recorder::{
    OutputFileOptions, PlatformRecorderFactory, PlatformRecording, RecorderEvent, RecorderEventSink, RecorderFailure,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct CodecSnapshot {
    pub configured: Option<VideoFormat>,
    pub started: bool,
    pub stopped: bool,
    pub stop_calls: usize,
    pub released: bool,
    pub surface_released: bool,
    pub end_of_stream_signaled: bool,
    pub presented: Vec<Duration>,
}

#[derive(Default)]
struct CodecState {
    snapshot: CodecSnapshot,
    outputs: VecDeque<EncoderOutput>,
    buffers: HashMap<usize, Vec<u8>>,
    next_index: usize,
    format_sent: bool,
    duplicate_format_change: bool,
    skip_format_change: bool,
    skip_end_of_stream: bool,
}

impl CodecState {
    fn push_buffer(&mut self, data: Vec<u8>, presentation_time_us: i64, flags: BufferFlags) {
        let index = self.next_index;
        self.next_index += 1;
        let info = SampleInfo {
            offset: 0,
            size: data.len(),
            presentation_time_us,
            flags,
        };
        self.buffers.insert(index, data);
        self.outputs.push_back(EncoderOutput::Buffer { index, info });
    }
}

/// Scripted encoder: every presented frame yields one key-frame sample, the
/// first one preceded by a format change and a codec-config buffer.
#[derive(Clone, Default)]
pub struct FakeCodec {
    state: Arc<Mutex<CodecState>>,
}

impl FakeCodec {
    pub fn with_duplicate_format_change(self) -> Self {
        self.state.lock().duplicate_format_change = true;
        self
    }

    pub fn without_format_change(self) -> Self {
        self.state.lock().skip_format_change = true;
        self
    }

    pub fn without_end_of_stream(self) -> Self {
        self.state.lock().skip_end_of_stream = true;
        self
    }

    pub fn encoder(&self) -> Box<dyn VideoEncoder> {
        Box::new(FakeEncoder {
            state: Arc::clone(&self.state),
            checked_out: HashMap::new(),
        })
    }

    pub fn snapshot(&self) -> CodecSnapshot {
        self.state.lock().snapshot.clone()
    }
}

impl VideoEncoderFactory for FakeCodec {
    fn create_encoder(&self, _mime_type: &str) -> Result<Box<dyn VideoEncoder>, EncoderError> {
        Ok(self.encoder())
    }
}

struct FakeEncoder {
    state: Arc<Mutex<CodecState>>,
    checked_out: HashMap<usize, Vec<u8>>,
}

impl VideoEncoder for FakeEncoder {
    fn configure(&mut self, format: &VideoFormat) -> Result<(), EncoderError> {
        self.state.lock().snapshot.configured = Some(format.clone());
        Ok(())
    }

    fn create_input_surface(&mut self) -> Result<Box<dyn InputSurface>, EncoderError> {
        Ok(Box::new(FakeSurface {
            state: Arc::clone(&self.state),
        }))
    }

    fn start(&mut self) -> Result<(), EncoderError> {
        self.state.lock().snapshot.started = true;
        Ok(())
    }

    fn signal_end_of_input_stream(&mut self) -> Result<(), EncoderError> {
        let mut state = self.state.lock();
        state.snapshot.end_of_stream_signaled = true;
        if !state.skip_end_of_stream {
            state.push_buffer(
                Vec::new(),
                0,
                BufferFlags {
                    end_of_stream: true,
                    ..BufferFlags::default()
                },
            );
        }
        Ok(())
    }

    fn dequeue_output_buffer(&mut self, timeout: Duration) -> Result<EncoderOutput, EncoderError> {
        let next = {
            let mut state = self.state.lock();
            let next = state.outputs.pop_front();
            if let Some(EncoderOutput::Buffer { index, .. }) = &next {
                let data = state.buffers.remove(index).unwrap_or_default();
                self.checked_out.insert(*index, data);
            }
            next
        };
        match next {
            Some(output) => Ok(output),
            None => {
                thread::sleep(timeout.min(Duration::from_millis(2)));
                Ok(EncoderOutput::TryAgainLater)
            }
        }
    }

    fn output_buffer(&mut self, index: usize) -> Result<&[u8], EncoderError> {
        self.checked_out
            .get(&index)
            .map(Vec::as_slice)
            .ok_or_else(|| EncoderError::Codec(format!("unknown output buffer {}", index)))
    }

    fn release_output_buffer(&mut self, index: usize) -> Result<(), EncoderError> {
        self.checked_out
            .remove(&index)
            .map(|_| ())
            .ok_or_else(|| EncoderError::Codec(format!("buffer {} released twice", index)))
    }

    fn stop(&mut self) -> Result<(), EncoderError> {
        let mut state = self.state.lock();
        state.snapshot.stopped = true;
        state.snapshot.stop_calls += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.state.lock().snapshot.released = true;
    }
}

struct FakeSurface {
    state: Arc<Mutex<CodecState>>,
}

impl InputSurface for FakeSurface {
    fn present(&mut self, image: &Bitmap, timestamp: Duration) -> Result<(), EncoderError> {
        let mut state = self.state.lock();
        if !state.snapshot.started {
            return Err(EncoderError::Codec("surface used before start".into()));
        }
        let first = !state.format_sent;
        if first && !state.skip_format_change {
            let format = TrackFormat {
                mime_type: "video/avc".into(),
                width: image.width(),
                height: image.height(),
                codec_specific_data: vec![vec![0, 0, 0, 1]],
            };
            state.outputs.push_back(EncoderOutput::FormatChanged(format.clone()));
            if state.duplicate_format_change {
                state.outputs.push_back(EncoderOutput::FormatChanged(format));
            }
            state.push_buffer(
                vec![0, 0, 0, 1],
                0,
                BufferFlags {
                    codec_config: true,
                    ..BufferFlags::default()
                },
            );
        }
        state.format_sent = true;

        let micros = timestamp.as_micros() as i64;
        state.push_buffer(
            vec![0xAB; 16],
            micros,
            BufferFlags {
                key_frame: first,
                ..BufferFlags::default()
            },
        );
        state.snapshot.presented.push(timestamp);
        Ok(())
    }

    fn release(&mut self) {
        self.state.lock().snapshot.surface_released = true;
    }
}

// ---------------------------------------------------------------------------
// Muxer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MuxerSnapshot {
    pub path: Option<PathBuf>,
    pub tracks: Vec<TrackFormat>,
    pub start_count: usize,
    pub samples: Vec<(usize, usize, i64)>,
    pub stopped: bool,
    pub released: bool,
}

/// Muxer that records every call and writes a small marker file on stop.
#[derive(Clone, Default)]
pub struct FakeMuxerFactory {
    muxers: Arc<Mutex<Vec<Arc<Mutex<MuxerSnapshot>>>>>,
}

impl FakeMuxerFactory {
    pub fn muxer(&self) -> Box<dyn ContainerMuxer> {
        self.build(None)
    }

    /// State of the most recently created muxer.
    pub fn last(&self) -> MuxerSnapshot {
        self.muxers
            .lock()
            .last()
            .map(|m| m.lock().clone())
            .unwrap_or_default()
    }

    pub fn created(&self) -> usize {
        self.muxers.lock().len()
    }

    fn build(&self, path: Option<PathBuf>) -> Box<dyn ContainerMuxer> {
        let snapshot = Arc::new(Mutex::new(MuxerSnapshot {
            path,
            ..MuxerSnapshot::default()
        }));
        self.muxers.lock().push(Arc::clone(&snapshot));
        Box::new(FakeMuxer { snapshot })
    }
}

impl MuxerFactory for FakeMuxerFactory {
    fn create_muxer(&self, path: &Path, _file_type: VideoFileType) -> Result<Box<dyn ContainerMuxer>, EncoderError> {
        Ok(self.build(Some(path.to_path_buf())))
    }
}

struct FakeMuxer {
    snapshot: Arc<Mutex<MuxerSnapshot>>,
}

impl ContainerMuxer for FakeMuxer {
    fn add_track(&mut self, format: &TrackFormat) -> Result<usize, EncoderError> {
        let mut snapshot = self.snapshot.lock();
        if snapshot.start_count > 0 {
            return Err(EncoderError::Muxer("track added after start".into()));
        }
        snapshot.tracks.push(format.clone());
        Ok(snapshot.tracks.len() - 1)
    }

    fn start(&mut self) -> Result<(), EncoderError> {
        let mut snapshot = self.snapshot.lock();
        snapshot.start_count += 1;
        if snapshot.start_count > 1 {
            return Err(EncoderError::MuxerAlreadyStarted);
        }
        Ok(())
    }

    fn write_sample(&mut self, track: usize, data: &[u8], info: &SampleInfo) -> Result<(), EncoderError> {
        let mut snapshot = self.snapshot.lock();
        if snapshot.start_count == 0 {
            return Err(EncoderError::MuxerNotStarted);
        }
        snapshot.samples.push((track, data.len(), info.presentation_time_us));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncoderError> {
        let mut snapshot = self.snapshot.lock();
        if snapshot.start_count == 0 {
            return Err(EncoderError::Muxer("stop before start".into()));
        }
        snapshot.stopped = true;
        if let Some(path) = &snapshot.path {
            let body = format!("video samples={}\n", snapshot.samples.len());
            std::fs::write(path, body).map_err(|e| EncoderError::Muxer(e.to_string()))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        self.snapshot.lock().released = true;
    }
}

// ---------------------------------------------------------------------------
// Face detection
// ---------------------------------------------------------------------------

/// Engine that finds the same faces in every image.
#[derive(Default)]
pub struct FixedFaceEngine {
    faces: Vec<Rect>,
    calls: Mutex<usize>,
}

impl FixedFaceEngine {
    pub fn new(faces: Vec<Rect>) -> Self {
        Self {
            faces,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl FaceDetectionEngine for FixedFaceEngine {
    fn detect(&self, _image: &Bitmap) -> std::result::Result<Vec<FaceRegion>, String> {
        *self.calls.lock() += 1;
        Ok(self.faces.iter().copied().map(FaceRegion::new).collect())
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AudioSnapshot {
    pub paths: Vec<PathBuf>,
    pub started: usize,
    pub stopped: usize,
}

#[derive(Clone, Default)]
pub struct FakeAudioFactory {
    state: Arc<Mutex<AudioSnapshot>>,
}

impl FakeAudioFactory {
    pub fn snapshot(&self) -> AudioSnapshot {
        self.state.lock().clone()
    }
}

impl AudioRecorderFactory for FakeAudioFactory {
    fn create_recorder(&self, path: &Path, _settings: &AudioSettings) -> RecorderResult<Box<dyn AudioRecorder>> {
        self.state.lock().paths.push(path.to_path_buf());
        Ok(Box::new(FakeAudioRecorder {
            path: path.to_path_buf(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeAudioRecorder {
    path: PathBuf,
    state: Arc<Mutex<AudioSnapshot>>,
}

impl AudioRecorder for FakeAudioRecorder {
    fn start(&mut self) -> RecorderResult<()> {
        self.state.lock().started += 1;
        Ok(())
    }

    fn stop(&mut self) -> RecorderResult<AudioRecording> {
        std::fs::write(&self.path, b"audio")?;
        self.state.lock().stopped += 1;
        Ok(AudioRecording {
            path: self.path.clone(),
            duration: Duration::from_millis(300),
            data_bytes: 5,
        })
    }
}

// ---------------------------------------------------------------------------
// Merger
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct FakeMerger {
    requests: Arc<Mutex<Vec<MergeRequest>>>,
}

impl FakeMerger {
    pub fn requests(&self) -> Vec<MergeRequest> {
        self.requests.lock().clone()
    }
}

impl TrackMerger for FakeMerger {
    fn merge(&self, request: &MergeRequest) -> RecorderResult<()> {
        if !request.video.exists() {
            return Err(RecorderError::FileIo(format!("{} is missing", request.video.display())));
        }
        let mut body = std::fs::read(&request.video)?;
        if let Some(audio) = &request.audio {
            body.extend(std::fs::read(audio)?);
        }
        std::fs::write(&request.output, body)?;
        self.requests.lock().push(request.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Platform recorder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecorderState {
    outputs: Vec<OutputFileOptions>,
    sink: Option<Arc<dyn RecorderEventSink>>,
    frames: Vec<Duration>,
    pause_calls: usize,
    resume_calls: usize,
    stop_calls: usize,
    stop_error: Option<RecorderFailure>,
    hold_finalize: bool,
}

/// Recorder that writes a marker file on stop and reports statistics from
/// the timestamps of appended frames. Events are delivered synchronously.
#[derive(Clone, Default)]
pub struct FakeRecorderFactory {
    state: Arc<Mutex<RecorderState>>,
}

impl FakeRecorderFactory {
    /// Finalize with `failure` when stopped.
    pub fn failing_with(self, failure: RecorderFailure) -> Self {
        self.state.lock().stop_error = Some(failure);
        self
    }

    /// Do not finalize on stop; the test calls [`emit`](Self::emit) itself.
    pub fn holding_finalize(self) -> Self {
        self.state.lock().hold_finalize = true;
        self
    }

    pub fn outputs(&self) -> Vec<OutputFileOptions> {
        self.state.lock().outputs.clone()
    }

    pub fn frames(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().pause_calls
    }

    pub fn resume_calls(&self) -> usize {
        self.state.lock().resume_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().stop_calls
    }

    pub fn emit(&self, event: RecorderEvent) {
        let sink = self.state.lock().sink.clone();
        if let Some(sink) = sink {
            sink.on_event(event);
        }
    }
}

impl PlatformRecorderFactory for FakeRecorderFactory {
    fn start_recording(
        &self,
        output: &OutputFileOptions,
        events: Arc<dyn RecorderEventSink>,
    ) -> RecorderResult<Box<dyn PlatformRecording>> {
        {
            let mut state = self.state.lock();
            state.outputs.push(output.clone());
            state.sink = Some(Arc::clone(&events));
            state.frames.clear();
        }
        events.on_event(RecorderEvent::Started);
        Ok(Box::new(FakeRecording {
            path: output.path.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeRecording {
    path: PathBuf,
    state: Arc<Mutex<RecorderState>>,
}

impl PlatformRecording for FakeRecording {
    fn append_frame(&mut self, frame: &Frame) -> RecorderResult<()> {
        let (sink, statistics) = {
            let mut state = self.state.lock();
            state.frames.push(frame.timestamp());
            let count = state.frames.len() as u32;
            let span = match (state.frames.first(), state.frames.last()) {
                (Some(first), Some(last)) => last.saturating_sub(*first),
                _ => Duration::ZERO,
            };
            // One frame interval on top of the span between first and last frame.
            let duration = if count > 1 { span + span / (count - 1) } else { Duration::ZERO };
            (
                state.sink.clone(),
                RecordingStatistics {
                    recorded_bytes: count as u64 * 1000,
                    recorded_duration: duration,
                },
            )
        };
        if let Some(sink) = sink {
            sink.on_event(RecorderEvent::Status(statistics));
        }
        Ok(())
    }

    fn pause(&mut self) -> RecorderResult<()> {
        self.state.lock().pause_calls += 1;
        Ok(())
    }

    fn resume(&mut self) -> RecorderResult<()> {
        self.state.lock().resume_calls += 1;
        Ok(())
    }

    fn stop(&mut self) -> RecorderResult<()> {
        std::fs::write(&self.path, b"raw video")?;
        let (sink, error, hold) = {
            let mut state = self.state.lock();
            state.stop_calls += 1;
            (state.sink.clone(), state.stop_error.clone(), state.hold_finalize)
        };
        if let (Some(sink), false) = (sink, hold) {
            sink.on_event(RecorderEvent::Finalize { error });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Every fake, plus handles to inspect them.
#[derive(Clone)]
pub struct FakePlatform {
    pub recorder: FakeRecorderFactory,
    pub engine: Arc<FixedFaceEngine>,
    pub codec: FakeCodec,
    pub muxers: FakeMuxerFactory,
    pub audio: FakeAudioFactory,
    pub merger: FakeMerger,
}

impl FakePlatform {
    pub fn new(faces: Vec<Rect>) -> Self {
        Self {
            recorder: FakeRecorderFactory::default(),
            engine: Arc::new(FixedFaceEngine::new(faces)),
            codec: FakeCodec::default(),
            muxers: FakeMuxerFactory::default(),
            audio: FakeAudioFactory::default(),
            merger: FakeMerger::default(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(
            Arc::new(self.recorder.clone()),
            self.engine.clone(),
            Arc::new(self.codec.clone()),
            Arc::new(self.muxers.clone()),
            Arc::new(self.audio.clone()),
            Arc::new(self.merger.clone()),
        )
    }
}

/// Pipeline configuration writing scratch files into `directory`, with a
/// short grace period and a queue deep enough that tests never drop frames.
pub fn test_config(directory: &Path) -> PipelineConfig {
    PipelineConfig {
        stop_grace_period: Duration::from_millis(5),
        frame_queue_depth: 64,
        scratch_directory: directory.to_path_buf(),
        ..PipelineConfig::default()
    }
}

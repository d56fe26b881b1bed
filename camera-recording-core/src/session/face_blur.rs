use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::audio::recorder::{AudioRecorder, AudioRecording};
use crate::compositor::blur_compositor::BlurCompositor;
use crate::detection::detector::{DetectionTicket, FaceDetector};
use crate::encoder::pipeline::EncoderPipeline;
use crate::frame::frame::{Frame, RetainedFrame};
use crate::models::config::{PipelineConfig, RecordingOptions};
use crate::models::error::{RecorderError, Result};
use crate::models::face::Faces;
use crate::models::geometry::Size;
use crate::models::state::EncoderState;
use crate::processing::bitmap::Bitmap;
use crate::processing::processor::{upright_bitmap, ImageProcessor};
use crate::storage::files::ScratchFiles;
use crate::sync::CancellationToken;
use crate::traits::capabilities::Capabilities;

/// What a face-blur session produced once stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurOutcome {
    pub processed_video: PathBuf,
    pub frames_encoded: u64,
    pub frames_dropped: u64,
    pub audio: Option<AudioRecording>,
    /// First fatal pipeline error, if any.
    pub error: Option<RecorderError>,
}

struct EncodeJob {
    frame: RetainedFrame,
    ticket: Option<DetectionTicket>,
}

/// Everything drawn or drained under the session's single encoder lock.
struct EncoderStage {
    pipeline: EncoderPipeline,
    compositor: BlurCompositor,
    last_faces: Faces,
    first_timestamp: Option<Duration>,
}

struct EncoderContext {
    stage: Mutex<EncoderStage>,
    frames_encoded: AtomicU64,
    failure: Mutex<Option<RecorderError>>,
}

impl EncoderContext {
    fn fail(&self, error: RecorderError) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(error);
        }
    }
}

/// Real-time blurred re-encode of the camera stream, plus its audio track.
///
/// ```text
/// [delivery] → retain → [detector pool] ──ticket──┐
///                 └──────→ [encode queue] → [face-blur-encoder] → compose → encoder → muxer
/// ```
///
/// Frames are encoded strictly in delivery order. A frame without a fresh
/// detection reuses the faces of the previous one.
pub struct FaceBlurSession {
    id: Uuid,
    size: Size,
    processed_video: PathBuf,
    jobs: Mutex<Option<SyncSender<EncodeJob>>>,
    detector: Mutex<FaceDetector>,
    context: Arc<EncoderContext>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    audio: Mutex<Option<Box<dyn AudioRecorder>>>,
    token: CancellationToken,
    frames_dropped: AtomicU64,
    outcome: Mutex<Option<BlurOutcome>>,
}

impl FaceBlurSession {
    /// Start the encoder, the detector pool and (if enabled) the audio recorder.
    pub fn start(
        id: Uuid,
        capabilities: &Capabilities,
        config: &PipelineConfig,
        options: &RecordingOptions,
        scratch: &ScratchFiles,
    ) -> Result<Self> {
        let size = options.resolved_size();
        let encoder = capabilities.encoders.create_encoder(&config.encoder.mime_type)?;
        let muxer = capabilities.muxers.create_muxer(&scratch.processed_video, options.file_type)?;
        let mut pipeline = EncoderPipeline::new(encoder, muxer, config.encoder.clone());
        pipeline.start(size)?;

        let processor = Arc::clone(&capabilities.image_processor);
        let compositor = BlurCompositor::new(size, options.camera_position, config.blur, Arc::clone(&processor));
        let detector = FaceDetector::start(
            Arc::clone(&capabilities.face_detection),
            Arc::clone(&processor),
            &config.detection,
        )?;

        let audio = if options.enable_audio {
            let mut recorder = capabilities.audio.create_recorder(&scratch.processed_audio, &config.audio)?;
            recorder.start()?;
            Some(recorder)
        } else {
            None
        };

        let context = Arc::new(EncoderContext {
            stage: Mutex::new(EncoderStage {
                pipeline,
                compositor,
                last_faces: Faces::none(),
                first_timestamp: None,
            }),
            frames_encoded: AtomicU64::new(0),
            failure: Mutex::new(None),
        });

        let (tx, rx) = mpsc::sync_channel::<EncodeJob>(config.frame_queue_depth.max(1));
        let token = CancellationToken::new();
        let worker = {
            let context = Arc::clone(&context);
            let token = token.clone();
            let scale = config.detection.detection_scale;
            let result_timeout = config.detection.result_timeout;
            thread::Builder::new()
                .name("face-blur-encoder".into())
                .spawn(move || encode_loop(rx, &context, processor.as_ref(), &token, scale, result_timeout))
                .map_err(|e| RecorderError::Unknown(format!("failed to spawn encoder thread: {}", e)))?
        };

        log::info!(
            "Face blur session {} started at {}x{} -> {}",
            id,
            size.width,
            size.height,
            scratch.processed_video.display()
        );
        Ok(Self {
            id,
            size,
            processed_video: scratch.processed_video.clone(),
            jobs: Mutex::new(Some(tx)),
            detector: Mutex::new(detector),
            context,
            worker: Mutex::new(Some(worker)),
            audio: Mutex::new(audio),
            token,
            frames_dropped: AtomicU64::new(0),
            outcome: Mutex::new(None),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn frames_encoded(&self) -> u64 {
        self.context.frames_encoded.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.jobs.lock().is_none()
    }

    /// Hand `frame` to the pipeline. Never blocks: when the encode queue is
    /// full the frame is dropped.
    ///
    /// Call from the frame delivery context.
    pub fn submit_frame(&self, frame: &Frame) {
        let jobs = self.jobs.lock();
        let Some(jobs) = jobs.as_ref() else {
            return;
        };
        if self.context.failure.lock().is_some() {
            return;
        }

        let ticket = self.detector.lock().submit(frame, &self.token);
        let job = EncodeJob {
            frame: frame.retain(),
            ticket,
        };
        match jobs.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("Encoder queue full, dropped frame {} ({} so far)", frame.id(), dropped);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Discard pending work; queued frames are not encoded.
    pub fn cancel(&self) -> BlurOutcome {
        self.token.cancel();
        self.stop()
    }

    /// Drain the queue, stop the encoder and the audio track.
    ///
    /// Later calls return the same outcome.
    pub fn stop(&self) -> BlurOutcome {
        let mut outcome = self.outcome.lock();
        if let Some(outcome) = outcome.as_ref() {
            return outcome.clone();
        }

        // Closing the queue lets the encoder thread finish the backlog and exit.
        self.jobs.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                log::error!("Face blur encoder thread panicked");
                self.context.fail(RecorderError::Unknown("encoder thread panicked".into()));
            }
        }
        self.detector.lock().shutdown();

        {
            let mut stage = self.context.stage.lock();
            if let Err(e) = stage.pipeline.stop() {
                self.context.fail(e.into());
            }
        }

        let audio = self.audio.lock().take().and_then(|mut recorder| match recorder.stop() {
            Ok(recording) => Some(recording),
            Err(e) => {
                log::warn!("Audio track of session {} failed: {}", self.id, e);
                None
            }
        });

        let result = BlurOutcome {
            processed_video: self.processed_video.clone(),
            frames_encoded: self.frames_encoded(),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            audio,
            error: self.context.failure.lock().clone(),
        };
        log::info!(
            "Face blur session {} stopped: {} frame(s) encoded, {} dropped",
            self.id,
            result.frames_encoded,
            result.frames_dropped
        );
        *outcome = Some(result.clone());
        result
    }
}

impl Drop for FaceBlurSession {
    fn drop(&mut self) {
        if self.outcome.lock().is_none() {
            self.token.cancel();
            self.stop();
        }
    }
}

fn encode_loop(
    rx: Receiver<EncodeJob>,
    context: &EncoderContext,
    processor: &dyn ImageProcessor,
    token: &CancellationToken,
    scale: f32,
    result_timeout: Duration,
) {
    for job in rx {
        if token.is_canceled() || context.failure.lock().is_some() {
            continue;
        }
        let frame_id = job.frame.id();
        let timestamp = job.frame.timestamp();

        let (image, faces) = match prepare(job, processor, scale, result_timeout) {
            Ok(prepared) => prepared,
            Err(e) => {
                log::warn!("Skipping frame {}: {}", frame_id, e);
                continue;
            }
        };

        let mut stage = context.stage.lock();
        if stage.pipeline.state() != EncoderState::Started {
            continue;
        }
        let faces = match faces {
            Some(faces) => {
                stage.last_faces = faces.clone();
                faces
            }
            None => stage.last_faces.clone(),
        };
        let first = *stage.first_timestamp.get_or_insert(timestamp);
        let presentation = timestamp.saturating_sub(first);

        let EncoderStage {
            pipeline, compositor, ..
        } = &mut *stage;
        let result = pipeline.encode_frame(|surface| {
            compositor
                .compose_into(&image, &faces, surface, presentation)
                .map(|_| ())
        });
        match result {
            Ok(()) => {
                context.frames_encoded.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                log::error!("Face blur pipeline aborted at frame {}: {}", frame_id, e);
                context.fail(e.into());
            }
        }
    }
}

/// Upright bitmap for the frame and, if its detection finished in time, the faces found.
fn prepare(
    job: EncodeJob,
    processor: &dyn ImageProcessor,
    scale: f32,
    result_timeout: Duration,
) -> std::result::Result<(Arc<Bitmap>, Option<Faces>), String> {
    if let Some(ticket) = job.ticket {
        match ticket.wait(result_timeout) {
            Ok(detection) => return Ok((detection.image, Some(detection.faces))),
            Err(e) => log::debug!("No detection for frame {}: {:?}", job.frame.id(), e),
        }
    }
    let image = upright_bitmap(processor, &job.frame, scale)?;
    Ok((Arc::new(image), None))
}

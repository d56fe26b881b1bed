use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::frame::frame::Frame;
use crate::models::config::{PipelineConfig, RecordingOptions};
use crate::models::error::{RecorderError, Result};
use crate::models::geometry::Size;
use crate::models::state::RecordingPhase;
use crate::models::video::{RecordingStatistics, Video};
use crate::storage::files::{delete_if_exists, sha256_file, ScratchFiles};
use crate::traits::capabilities::Capabilities;
use crate::traits::delegate::RecordingDelegate;
use crate::traits::merger::{MergePolicy, MergeRequest};
use crate::traits::recorder::{
    OutputFileOptions, PlatformRecording, RecorderEvent, RecorderEventSink, RecorderFailure,
};

use super::callbacks::RecordingCallbacks;
use super::face_blur::{BlurOutcome, FaceBlurSession};

/// Entry point of the camera plugin's recording feature.
///
/// Owns at most one recording session at a time and drives it through
/// [`RecordingPhase`]. Cheap to clone; clones share the same session.
///
/// ```text
/// start_recording ──→ platform recorder ──events──→ handle_event
///       │                    ↑                            │
///       └─ face blur ←── process_frame                finalize → callbacks
/// ```
///
/// Preconditions are reported synchronously by the returned `Result`; once a
/// session has started, its outcome goes to exactly one of its callbacks.
#[derive(Clone)]
pub struct RecordingCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    capabilities: Capabilities,
    config: PipelineConfig,
    control: Mutex<ControlState>,
    delegate: Mutex<Option<Arc<dyn RecordingDelegate>>>,
}

struct ControlState {
    camera_ready: bool,
    video_enabled: bool,
    // Held between the precondition check and the session being installed.
    reserved: bool,
    session: Option<Arc<ActiveSession>>,
}

struct ActiveSession {
    id: Uuid,
    options: RecordingOptions,
    size: Size,
    state: Mutex<SessionState>,
    recording: Mutex<Option<Box<dyn PlatformRecording>>>,
    blur: Option<FaceBlurSession>,
    scratch: Option<ScratchFiles>,
}

struct SessionState {
    phase: RecordingPhase,
    statistics: RecordingStatistics,
    callbacks: Option<RecordingCallbacks>,
}

impl ActiveSession {
    fn phase(&self) -> RecordingPhase {
        self.state.lock().phase
    }
}

/// Routes platform recorder events back to the session that created them.
struct SessionEvents {
    inner: Weak<Inner>,
    session_id: Uuid,
}

impl RecorderEventSink for SessionEvents {
    fn on_event(&self, event: RecorderEvent) {
        match self.inner.upgrade() {
            Some(inner) => inner.handle_event(self.session_id, event),
            None => log::debug!("Dropping {:?} for session {}: coordinator gone", event, self.session_id),
        }
    }
}

impl RecordingCoordinator {
    pub fn new(capabilities: Capabilities, config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(RecorderError::ConfigurationFailed)?;
        Ok(Self {
            inner: Arc::new(Inner {
                capabilities,
                config,
                control: Mutex::new(ControlState {
                    camera_ready: false,
                    video_enabled: true,
                    reserved: false,
                    session: None,
                }),
                delegate: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn set_camera_ready(&self, ready: bool) {
        self.inner.control.lock().camera_ready = ready;
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.inner.control.lock().video_enabled = enabled;
    }

    pub fn set_delegate(&self, delegate: Option<Arc<dyn RecordingDelegate>>) {
        *self.inner.delegate.lock() = delegate;
    }

    /// Phase of the current session, `Idle` when there is none.
    pub fn phase(&self) -> RecordingPhase {
        self.inner
            .current_session()
            .map(|session| session.phase())
            .unwrap_or(RecordingPhase::Idle)
    }

    pub fn is_recording(&self) -> bool {
        self.phase().is_active()
    }

    /// Latest statistics reported by the platform recorder for the current session.
    pub fn statistics(&self) -> Option<RecordingStatistics> {
        self.inner.current_session().map(|session| session.state.lock().statistics)
    }

    /// Start a recording session.
    ///
    /// On `Err` no session was started and `callbacks` are dropped without
    /// being called.
    pub fn start_recording(&self, options: RecordingOptions, callbacks: RecordingCallbacks) -> Result<()> {
        {
            let mut control = self.inner.control.lock();
            if !control.camera_ready {
                return Err(RecorderError::CameraNotReady);
            }
            if control.reserved || control.session.is_some() {
                return Err(RecorderError::RecordingInProgress);
            }
            if !control.video_enabled {
                return Err(RecorderError::VideoDisabled);
            }
            options.validate().map_err(RecorderError::ConfigurationFailed)?;
            control.reserved = true;
        }

        let result = self.inner.launch(options, callbacks);
        self.inner.control.lock().reserved = false;
        result
    }

    /// Hand a camera frame to the active session. Never blocks on detection
    /// or encoding.
    pub fn process_frame(&self, frame: &Frame) {
        let Some(session) = self.inner.current_session() else {
            return;
        };
        let phase = session.phase();
        if !phase.is_active() {
            return;
        }

        let appended = match session.recording.try_lock() {
            Some(mut recording) => recording.as_mut().map(|recording| recording.append_frame(frame)),
            None => {
                log::trace!("Recorder busy, frame {} not appended", frame.id());
                None
            }
        };
        if let Some(Err(e)) = appended {
            log::warn!("Failed to append frame {}: {}", frame.id(), e);
            self.inner.report_error(&e);
        }

        if phase == RecordingPhase::Recording {
            if let Some(blur) = &session.blur {
                blur.submit_frame(frame);
            }
        }
    }

    /// Stop the current session. The outcome is delivered to its callbacks.
    pub fn stop_recording(&self) -> Result<()> {
        self.inner.stop(false)
    }

    /// Stop the current session and discard what it recorded. Its error
    /// callback receives [`RecorderError::RecordingCanceled`].
    pub fn cancel_recording(&self) -> Result<()> {
        self.inner.stop(true)
    }

    pub fn pause_recording(&self) -> Result<()> {
        let session = self.inner.active_session()?;
        if session.phase().is_paused() {
            return Ok(());
        }
        if let Some(recording) = session.recording.lock().as_mut() {
            recording.pause()?;
        }
        self.inner.transition(&session, RecordingPhase::Paused, |phase| {
            matches!(phase, RecordingPhase::Starting | RecordingPhase::Recording)
        });
        Ok(())
    }

    pub fn resume_recording(&self) -> Result<()> {
        let session = self.inner.active_session()?;
        if !session.phase().is_paused() {
            return Ok(());
        }
        if let Some(recording) = session.recording.lock().as_mut() {
            recording.resume()?;
        }
        self.inner
            .transition(&session, RecordingPhase::Recording, |phase| phase.is_paused());
        Ok(())
    }
}

impl Inner {
    fn current_session(&self) -> Option<Arc<ActiveSession>> {
        self.control.lock().session.clone()
    }

    fn active_session(&self) -> Result<Arc<ActiveSession>> {
        self.current_session()
            .filter(|session| session.phase().is_active())
            .ok_or(RecorderError::NoRecordingInProgress)
    }

    fn session_by_id(&self, id: Uuid) -> Option<Arc<ActiveSession>> {
        self.current_session().filter(|session| session.id == id)
    }

    fn delegate(&self) -> Option<Arc<dyn RecordingDelegate>> {
        self.delegate.lock().clone()
    }

    fn notify_phase(&self, phase: RecordingPhase) {
        if let Some(delegate) = self.delegate() {
            delegate.on_phase_changed(phase);
        }
    }

    fn report_error(&self, error: &RecorderError) {
        if let Some(delegate) = self.delegate() {
            delegate.on_error(error);
        }
    }

    /// Move `session` to `next` if its current phase satisfies `from`.
    fn transition<F>(&self, session: &ActiveSession, next: RecordingPhase, from: F) -> bool
    where
        F: FnOnce(RecordingPhase) -> bool,
    {
        let changed = {
            let mut state = session.state.lock();
            if from(state.phase) {
                state.phase = next;
                true
            } else {
                false
            }
        };
        if changed {
            log::info!("Session {} is now {:?}", session.id, next);
            self.notify_phase(next);
        }
        changed
    }

    fn launch(self: &Arc<Self>, options: RecordingOptions, callbacks: RecordingCallbacks) -> Result<()> {
        let id = Uuid::new_v4();
        let size = options.resolved_size();

        let (blur, scratch) = if options.enable_face_blur {
            let scratch = ScratchFiles::new(&self.config.scratch_directory, id, options.file_type);
            match FaceBlurSession::start(id, &self.capabilities, &self.config, &options, &scratch) {
                Ok(blur) => (Some(blur), Some(scratch)),
                Err(e) => {
                    log::error!("Failed to start face blur for session {}: {}", id, e);
                    self.remove_scratch(&scratch);
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        // With face blur the platform recording is only a scratch source; the
        // caller's file is produced by the merge.
        let output = OutputFileOptions {
            path: scratch
                .as_ref()
                .map(|scratch| scratch.raw_video.clone())
                .unwrap_or_else(|| options.output_path.clone()),
            file_type: options.file_type,
            location: options.location,
            enable_audio: options.enable_audio && blur.is_none(),
        };

        let session = Arc::new(ActiveSession {
            id,
            options,
            size,
            state: Mutex::new(SessionState {
                phase: RecordingPhase::Starting,
                statistics: RecordingStatistics::default(),
                callbacks: Some(callbacks),
            }),
            recording: Mutex::new(None),
            blur,
            scratch,
        });
        self.control.lock().session = Some(Arc::clone(&session));
        log::info!(
            "Starting session {} ({}x{}, face blur {})",
            id,
            size.width,
            size.height,
            if session.blur.is_some() { "on" } else { "off" }
        );
        self.notify_phase(RecordingPhase::Starting);

        let events: Arc<dyn RecorderEventSink> = Arc::new(SessionEvents {
            inner: Arc::downgrade(self),
            session_id: id,
        });

        // The handle slot stays locked until the recording exists, so a
        // concurrent stop waits for it.
        let mut slot = session.recording.lock();
        match self.capabilities.recorder.start_recording(&output, events) {
            Ok(recording) => {
                *slot = Some(recording);
                Ok(())
            }
            Err(e) => {
                drop(slot);
                log::error!("Platform recorder failed to start session {}: {}", id, e);
                {
                    let mut control = self.control.lock();
                    if control.session.as_ref().is_some_and(|current| current.id == id) {
                        control.session = None;
                    }
                }
                session.state.lock().callbacks = None;
                if let Some(blur) = &session.blur {
                    blur.cancel();
                }
                if let Some(scratch) = &session.scratch {
                    self.remove_scratch(scratch);
                }
                self.notify_phase(RecordingPhase::Idle);
                Err(e)
            }
        }
    }

    fn handle_event(&self, session_id: Uuid, event: RecorderEvent) {
        let Some(session) = self.session_by_id(session_id) else {
            log::debug!("Ignoring {:?} for stale session {}", event, session_id);
            return;
        };
        match event {
            RecorderEvent::Started => {
                self.transition(&session, RecordingPhase::Recording, |phase| {
                    phase == RecordingPhase::Starting
                });
            }
            RecorderEvent::Status(statistics) => {
                session.state.lock().statistics = statistics;
                if let Some(delegate) = self.delegate() {
                    delegate.on_statistics(&statistics);
                }
            }
            RecorderEvent::Finalize { error } => self.finalize(&session, error),
        }
    }

    fn stop(&self, canceled: bool) -> Result<()> {
        let session = self.current_session().ok_or(RecorderError::NoRecordingInProgress)?;
        let stopping = RecordingPhase::Stopping { canceled };
        if !self.transition(&session, stopping, |phase| phase.is_active()) {
            return Err(RecorderError::NoRecordingInProgress);
        }

        if let Some(blur) = &session.blur {
            if canceled {
                blur.cancel();
            } else {
                blur.stop();
            }
            thread::sleep(self.config.stop_grace_period);
        }

        let recording = session.recording.lock().take();
        match recording {
            Some(mut recording) => {
                if let Err(e) = recording.stop() {
                    log::error!("Platform recorder failed to stop session {}: {}", session.id, e);
                    self.finalize(&session, Some(RecorderFailure::fatal(e.to_string())));
                }
            }
            None => self.finalize(&session, Some(RecorderFailure::fatal("recording was never started"))),
        }
        Ok(())
    }

    /// Terminal step of a session, run at most once per session.
    fn finalize(&self, session: &Arc<ActiveSession>, failure: Option<RecorderFailure>) {
        {
            let mut control = self.control.lock();
            if !control.session.as_ref().is_some_and(|current| current.id == session.id) {
                return;
            }
            control.session = None;
        }

        let (canceled, statistics, callbacks) = {
            let mut state = session.state.lock();
            let canceled = state.phase.is_canceled();
            state.phase = RecordingPhase::Finalizing;
            (canceled, state.statistics, state.callbacks.take())
        };
        self.notify_phase(RecordingPhase::Finalizing);

        let blur = session
            .blur
            .as_ref()
            .map(|blur| if canceled { blur.cancel() } else { blur.stop() });
        let result = self.conclude(session, canceled, failure, statistics, blur);

        session.state.lock().phase = RecordingPhase::Idle;
        self.notify_phase(RecordingPhase::Idle);
        match &result {
            Ok(video) => log::info!(
                "Session {} finished: {} ({} ms)",
                session.id,
                video.path.display(),
                video.duration_ms
            ),
            Err(e) => log::info!("Session {} ended with {}", session.id, e),
        }
        if let Some(callbacks) = callbacks {
            callbacks.resolve(result);
        }
    }

    fn conclude(
        &self,
        session: &ActiveSession,
        canceled: bool,
        failure: Option<RecorderFailure>,
        statistics: RecordingStatistics,
        blur: Option<BlurOutcome>,
    ) -> Result<Video> {
        if canceled {
            self.discard(session);
            return Err(RecorderError::RecordingCanceled);
        }

        if let Some(failure) = failure {
            if failure.has_usable_video {
                log::warn!("Recorder reported {} for session {}, keeping the video", failure.message, session.id);
            } else {
                if let Some(scratch) = &session.scratch {
                    self.remove_scratch(scratch);
                }
                return Err(RecorderError::RecorderFailed(failure.message));
            }
        }

        let options = &session.options;
        let recorded = statistics.has_recorded_data();
        if let (Some(outcome), Some(scratch)) = (blur, &session.scratch) {
            let merged = match (outcome.error, outcome.frames_encoded) {
                (Some(error), _) => Err(error),
                (None, 0) => Err(RecorderError::NoFramesRecorded),
                (None, _) if !recorded => Err(RecorderError::NoFramesRecorded),
                (None, _) => {
                    let request = MergeRequest {
                        video: outcome.processed_video,
                        audio: outcome.audio.map(|audio| audio.path),
                        output: options.output_path.clone(),
                        file_type: options.file_type,
                        location: options.location,
                        policy: MergePolicy::default(),
                    };
                    log::debug!("Merging {:?}", request);
                    self.capabilities.merger.merge(&request)
                }
            };
            self.remove_scratch(scratch);
            merged?;
        } else if !recorded {
            log::warn!("Session {} recorded no data", session.id);
            if let Err(e) = delete_if_exists(&options.output_path) {
                log::warn!("Failed to delete empty recording {}: {}", options.output_path.display(), e);
            }
            return Err(RecorderError::NoFramesRecorded);
        }

        let checksum = sha256_file(&options.output_path)?;
        Ok(Video::new(
            options.output_path.clone(),
            statistics.recorded_duration,
            session.size,
            options.file_type,
            checksum,
        ))
    }

    /// Best-effort removal of everything a canceled session wrote.
    fn discard(&self, session: &ActiveSession) {
        let output = &session.options.output_path;
        if let Err(e) = delete_if_exists(output) {
            log::warn!("Failed to delete canceled recording {}: {}", output.display(), e);
            self.report_error(&RecorderError::FileIo(format!("failed to delete {}: {}", output.display(), e)));
        }
        if let Some(scratch) = &session.scratch {
            self.remove_scratch(scratch);
        }
    }

    fn remove_scratch(&self, scratch: &ScratchFiles) {
        for (path, e) in scratch.delete_all() {
            log::warn!("Failed to delete scratch file {}: {}", path.display(), e);
            self.report_error(&RecorderError::FileIo(format!("failed to delete {}: {}", path.display(), e)));
        }
    }
}

//! End-to-end recording sessions against the fake platform.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::frame::frame::{FrameData, PixelFormat};
use crate::frame::source::FrameSource;
use crate::models::config::RecordingOptions;
use crate::models::error::{EncoderError, RecorderError, Result};
use crate::models::geometry::{Rect, Rotation, Size};
use crate::models::state::RecordingPhase;
use crate::models::video::{RecordingStatistics, Video};
use crate::test_support::{init_logging, test_config, FakePlatform};
use crate::traits::delegate::RecordingDelegate;
use crate::traits::recorder::{RecorderEvent, RecorderFailure};

use super::callbacks::RecordingCallbacks;
use super::coordinator::RecordingCoordinator;

const FRAME_INTERVAL_US: u64 = 33_333;

#[derive(Default)]
struct RecordingLog {
    phases: Mutex<Vec<RecordingPhase>>,
    errors: Mutex<Vec<RecorderError>>,
    statistics: Mutex<Vec<RecordingStatistics>>,
}

impl RecordingDelegate for RecordingLog {
    fn on_phase_changed(&self, phase: RecordingPhase) {
        self.phases.lock().push(phase);
    }

    fn on_error(&self, error: &RecorderError) {
        self.errors.lock().push(error.clone());
    }

    fn on_statistics(&self, statistics: &RecordingStatistics) {
        self.statistics.lock().push(*statistics);
    }
}

type Outcomes = Arc<Mutex<Vec<Result<Video>>>>;

/// Callbacks recording every invocation, to check that exactly one runs.
fn counted_callbacks() -> (RecordingCallbacks, Outcomes) {
    let outcomes: Outcomes = Arc::default();
    let on_success = Arc::clone(&outcomes);
    let on_error = Arc::clone(&outcomes);
    let callbacks = RecordingCallbacks::new(
        move |video| on_success.lock().push(Ok(video)),
        move |error| on_error.lock().push(Err(error)),
    );
    (callbacks, outcomes)
}

struct Harness {
    platform: FakePlatform,
    coordinator: RecordingCoordinator,
    log: Arc<RecordingLog>,
    source: FrameSource,
    dir: tempfile::TempDir,
    delivered: u64,
}

impl Harness {
    fn new(platform: FakePlatform) -> Self {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let coordinator = RecordingCoordinator::new(platform.capabilities(), test_config(dir.path())).unwrap();
        let log = Arc::new(RecordingLog::default());
        coordinator.set_delegate(Some(log.clone()));
        coordinator.set_camera_ready(true);
        Self {
            platform,
            coordinator,
            log,
            source: FrameSource::new(4),
            dir,
            delivered: 0,
        }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out.mp4")
    }

    fn options(&self, face_blur: bool) -> RecordingOptions {
        RecordingOptions {
            output_path: self.output(),
            enable_face_blur: face_blur,
            video_size: Size::new(32, 16),
            ..RecordingOptions::default()
        }
    }

    fn start(&self, face_blur: bool) -> Outcomes {
        let (callbacks, outcomes) = counted_callbacks();
        self.coordinator.start_recording(self.options(face_blur), callbacks).unwrap();
        outcomes
    }

    fn deliver(&mut self, count: usize) {
        for _ in 0..count {
            let data = FrameData {
                pixels: self.source.allocate(PixelFormat::Rgba8888.buffer_len(16, 8)),
                width: 16,
                height: 8,
                format: PixelFormat::Rgba8888,
                rotation: Rotation::Deg0,
                timestamp: Duration::from_micros(self.delivered * FRAME_INTERVAL_US),
            };
            self.delivered += 1;
            let coordinator = &self.coordinator;
            self.source.deliver(data, |frame| coordinator.process_frame(frame));
        }
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

fn single(outcomes: &Outcomes) -> Result<Video> {
    let outcomes = outcomes.lock();
    assert_eq!(outcomes.len(), 1, "expected exactly one callback, got {:?}", *outcomes);
    outcomes[0].clone()
}

fn two_faces() -> Vec<Rect> {
    vec![Rect::new(0.0, 0.0, 3.0, 3.0), Rect::new(4.0, 0.0, 3.0, 3.0)]
}

#[test]
fn basic_thirty_frames_without_blur_last_one_second() {
    let mut harness = Harness::new(FakePlatform::new(Vec::new()));
    let outcomes = harness.start(false);

    harness.deliver(30);
    harness.coordinator.stop_recording().unwrap();

    let video = single(&outcomes).unwrap();
    assert!((999..=1001).contains(&video.duration_ms), "duration {}", video.duration_ms);
    assert_eq!(video.path, harness.output());
    assert_eq!(video.size(), Size::new(16, 32));
    assert_eq!(video.checksum.len(), 64);
    assert_eq!(harness.platform.recorder.frames(), 30);
    assert_eq!(harness.platform.muxers.created(), 0);
    assert_eq!(harness.coordinator.phase(), RecordingPhase::Idle);
}

#[test]
fn basic_blur_with_two_faces_merges_and_removes_scratch() {
    let mut harness = Harness::new(FakePlatform::new(two_faces()));
    let outcomes = harness.start(true);

    harness.deliver(10);
    harness.coordinator.stop_recording().unwrap();

    let video = single(&outcomes).unwrap();
    assert_eq!(video.path, harness.output());
    assert!(harness.output().exists());
    assert_eq!(harness.files(), vec![harness.output()]);

    assert_eq!(harness.platform.codec.snapshot().presented.len(), 10);
    assert!(harness.platform.engine.calls() >= 1);
    let requests = harness.platform.merger.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].audio.is_some());
    assert_eq!(requests[0].output, harness.output());

    // The platform recorder wrote to scratch, without its own audio track.
    let output = &harness.platform.recorder.outputs()[0];
    assert_ne!(output.path, harness.output());
    assert!(!output.enable_audio);
}

#[test]
fn cancel_before_any_frame_leaves_no_output() {
    let harness = Harness::new(FakePlatform::new(Vec::new()));
    let outcomes = harness.start(false);

    harness.coordinator.cancel_recording().unwrap();

    assert_eq!(single(&outcomes), Err(RecorderError::RecordingCanceled));
    assert!(!harness.output().exists());
    assert!(harness.log.errors.lock().is_empty());
}

#[test]
fn cancel_with_blur_removes_every_file() {
    let mut harness = Harness::new(FakePlatform::new(two_faces()));
    let outcomes = harness.start(true);

    harness.deliver(5);
    harness.coordinator.cancel_recording().unwrap();

    assert_eq!(single(&outcomes), Err(RecorderError::RecordingCanceled));
    assert!(harness.files().is_empty());
    assert!(harness.platform.merger.requests().is_empty());
}

#[test]
fn stop_twice_reports_no_recording() {
    let mut harness = Harness::new(FakePlatform::new(Vec::new()));
    let outcomes = harness.start(false);

    harness.deliver(2);
    harness.coordinator.stop_recording().unwrap();
    let err = harness.coordinator.stop_recording().unwrap_err();

    assert_eq!(err, RecorderError::NoRecordingInProgress);
    assert!(single(&outcomes).is_ok());
    assert_eq!(harness.platform.recorder.stop_calls(), 1);
}

#[test]
fn duplicate_format_change_fails_recording() {
    let platform = FakePlatform::new(two_faces());
    let platform = FakePlatform {
        codec: platform.codec.clone().with_duplicate_format_change(),
        ..platform
    };
    let mut harness = Harness::new(platform);
    let outcomes = harness.start(true);

    harness.deliver(3);
    harness.coordinator.stop_recording().unwrap();

    assert_eq!(
        single(&outcomes),
        Err(RecorderError::Encoder(EncoderError::FormatChangedTwice))
    );
    let muxer = harness.platform.muxers.last();
    assert_eq!(muxer.tracks.len(), 1);
    assert!(muxer.released);
    assert!(harness.platform.merger.requests().is_empty());
    assert!(!harness.output().exists());
}

#[test]
fn blur_without_frames_reports_no_frames() {
    let harness = Harness::new(FakePlatform::new(two_faces()));
    let outcomes = harness.start(true);

    harness.coordinator.stop_recording().unwrap();

    assert_eq!(single(&outcomes), Err(RecorderError::NoFramesRecorded));
    assert!(harness.files().is_empty());
}

#[test]
fn stop_without_frames_reports_no_frames() {
    let harness = Harness::new(FakePlatform::new(Vec::new()));
    let outcomes = harness.start(false);

    harness.coordinator.stop_recording().unwrap();

    assert_eq!(single(&outcomes), Err(RecorderError::NoFramesRecorded));
    assert_eq!(harness.platform.recorder.stop_calls(), 1);
    assert!(!harness.output().exists());
}

#[test]
fn recoverable_recorder_failure_keeps_video() {
    let platform = FakePlatform::new(Vec::new());
    let platform = FakePlatform {
        recorder: platform
            .recorder
            .clone()
            .failing_with(RecorderFailure::recoverable("max duration reached")),
        ..platform
    };
    let mut harness = Harness::new(platform);
    let outcomes = harness.start(false);

    harness.deliver(3);
    harness.coordinator.stop_recording().unwrap();

    assert!(single(&outcomes).is_ok());
    assert!(harness.output().exists());
}

#[test]
fn fatal_recorder_failure_is_reported() {
    let platform = FakePlatform::new(Vec::new());
    let platform = FakePlatform {
        recorder: platform.recorder.clone().failing_with(RecorderFailure::fatal("encoder died")),
        ..platform
    };
    let harness = Harness::new(platform);
    let outcomes = harness.start(false);

    harness.coordinator.stop_recording().unwrap();

    assert_eq!(
        single(&outcomes),
        Err(RecorderError::RecorderFailed("encoder died".into()))
    );
}

#[test]
fn paused_frames_skip_the_blur_pipeline() {
    let mut harness = Harness::new(FakePlatform::new(two_faces()));
    let outcomes = harness.start(true);

    harness.deliver(3);
    harness.coordinator.pause_recording().unwrap();
    harness.coordinator.pause_recording().unwrap();
    assert_eq!(harness.coordinator.phase(), RecordingPhase::Paused);
    harness.deliver(3);
    harness.coordinator.resume_recording().unwrap();
    harness.deliver(2);
    harness.coordinator.stop_recording().unwrap();

    assert!(single(&outcomes).is_ok());
    assert_eq!(harness.platform.recorder.pause_calls(), 1);
    assert_eq!(harness.platform.recorder.resume_calls(), 1);
    assert_eq!(harness.platform.codec.snapshot().presented.len(), 5);
}

#[test]
fn second_start_is_rejected_while_recording() {
    let mut harness = Harness::new(FakePlatform::new(Vec::new()));
    let outcomes = harness.start(false);
    harness.deliver(2);

    let (callbacks, rejected) = counted_callbacks();
    let err = harness
        .coordinator
        .start_recording(harness.options(false), callbacks)
        .unwrap_err();

    assert_eq!(err, RecorderError::RecordingInProgress);
    assert!(rejected.lock().is_empty());
    harness.coordinator.stop_recording().unwrap();
    assert!(single(&outcomes).is_ok());
}

#[test]
fn controls_require_an_active_recording() {
    let harness = Harness::new(FakePlatform::new(Vec::new()));

    assert_eq!(harness.coordinator.stop_recording(), Err(RecorderError::NoRecordingInProgress));
    assert_eq!(harness.coordinator.cancel_recording(), Err(RecorderError::NoRecordingInProgress));
    assert_eq!(harness.coordinator.pause_recording(), Err(RecorderError::NoRecordingInProgress));
    assert_eq!(harness.coordinator.resume_recording(), Err(RecorderError::NoRecordingInProgress));
}

#[test]
fn delegate_sees_every_phase() {
    let mut harness = Harness::new(FakePlatform::new(Vec::new()));
    let _outcomes = harness.start(false);

    harness.deliver(2);
    harness.coordinator.stop_recording().unwrap();

    assert_eq!(
        *harness.log.phases.lock(),
        vec![
            RecordingPhase::Starting,
            RecordingPhase::Recording,
            RecordingPhase::Stopping { canceled: false },
            RecordingPhase::Finalizing,
            RecordingPhase::Idle,
        ]
    );
    let statistics = harness.log.statistics.lock();
    assert_eq!(statistics.len(), 2);
    assert_eq!(statistics[1].recorded_bytes, 2000);
}

#[test]
fn late_finalize_resolves_exactly_once() {
    let platform = FakePlatform::new(Vec::new());
    let platform = FakePlatform {
        recorder: platform.recorder.clone().holding_finalize(),
        ..platform
    };
    let mut harness = Harness::new(platform);
    let outcomes = harness.start(false);

    harness.deliver(2);
    harness.coordinator.stop_recording().unwrap();
    assert_eq!(harness.coordinator.phase(), RecordingPhase::Stopping { canceled: false });
    assert!(outcomes.lock().is_empty());

    harness.platform.recorder.emit(RecorderEvent::Finalize { error: None });
    harness.platform.recorder.emit(RecorderEvent::Finalize { error: None });

    assert!(single(&outcomes).is_ok());
    assert_eq!(harness.coordinator.phase(), RecordingPhase::Idle);
}

#[test]
fn new_session_starts_after_previous_finished() {
    let mut harness = Harness::new(FakePlatform::new(Vec::new()));
    let first = harness.start(false);
    harness.deliver(2);
    harness.coordinator.stop_recording().unwrap();

    let second = harness.start(false);
    harness.deliver(2);
    harness.coordinator.stop_recording().unwrap();

    assert!(single(&first).is_ok());
    assert!(single(&second).is_ok());
    assert_eq!(harness.platform.recorder.outputs().len(), 2);
}

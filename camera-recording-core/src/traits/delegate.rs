use crate::models::error::RecorderError;
use crate::models::state::RecordingPhase;
use crate::models::video::RecordingStatistics;

/// Observer of recording lifecycle notifications.
///
/// Called from whichever thread caused the change, never while a
/// coordinator lock is held. Terminal results go through the
/// [`RecordingCallbacks`](crate::session::callbacks::RecordingCallbacks) instead.
pub trait RecordingDelegate: Send + Sync {
    fn on_phase_changed(&self, phase: RecordingPhase);

    /// A failure that did not end the recording.
    fn on_error(&self, error: &RecorderError);

    fn on_statistics(&self, _statistics: &RecordingStatistics) {}
}

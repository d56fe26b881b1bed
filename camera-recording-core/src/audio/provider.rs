use std::sync::Arc;

use crate::models::error::Result;

/// Invoked with interleaved `f32` samples, the device sample rate and the
/// channel count.
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Platform microphone capture (AudioRecord, AVAudioEngine, ...).
pub trait AudioCaptureProvider: Send {
    fn is_available(&self) -> bool;

    /// Start delivering buffers to `callback`.
    ///
    /// The callback runs on the device's audio thread and must stay cheap.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn device_name(&self) -> String;
}

use std::time::Duration;

/// Rate limit for face detection, keyed on frame timestamps.
///
/// Frames arriving sooner than `min_interval` after the last processed one
/// are skipped for detection. They are not queued for later.
#[derive(Debug, Clone)]
pub struct DetectionThrottle {
    min_interval: Duration,
    last_processed: Option<Duration>,
}

impl DetectionThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_processed: None,
        }
    }

    /// Whether a frame at `timestamp` is due for detection.
    pub fn is_due(&self, timestamp: Duration) -> bool {
        match self.last_processed {
            // A clock that jumped backwards restarts the interval.
            Some(last) if timestamp >= last => timestamp - last >= self.min_interval,
            _ => true,
        }
    }

    /// Record that the frame at `timestamp` went to detection.
    pub fn mark_processed(&mut self, timestamp: Duration) {
        self.last_processed = Some(timestamp);
    }

    pub fn reset(&mut self) {
        self.last_processed = None;
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::{RecorderError, Result};
use crate::models::video::Video;
use crate::sync::{promise, Promise, PromiseError};

type SuccessCallback = Box<dyn FnOnce(Video) + Send + 'static>;
type ErrorCallback = Box<dyn FnOnce(RecorderError) + Send + 'static>;

/// Success and error continuations of one recording. Exactly one of them
/// runs, once.
pub struct RecordingCallbacks {
    on_success: SuccessCallback,
    on_error: ErrorCallback,
}

impl RecordingCallbacks {
    pub fn new<S, E>(on_success: S, on_error: E) -> Self
    where
        S: FnOnce(Video) + Send + 'static,
        E: FnOnce(RecorderError) + Send + 'static,
    {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// Callbacks that settle a [`PendingVideo`], for callers that prefer to wait.
    pub fn pending() -> (Self, PendingVideo) {
        let (resolver, promise) = promise::<Result<Video>>();
        let resolver = Arc::new(Mutex::new(Some(resolver)));
        let on_error = Arc::clone(&resolver);
        let callbacks = Self::new(
            move |video| {
                if let Some(r) = resolver.lock().take() {
                    r.resolve(Ok(video));
                }
            },
            move |error| {
                if let Some(r) = on_error.lock().take() {
                    r.resolve(Err(error));
                }
            },
        );
        (callbacks, PendingVideo { promise })
    }

    pub fn resolve(self, result: Result<Video>) {
        match result {
            Ok(video) => (self.on_success)(video),
            Err(error) => (self.on_error)(error),
        }
    }
}

impl fmt::Debug for RecordingCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingCallbacks").finish_non_exhaustive()
    }
}

/// Outcome of a recording that has not finished yet.
#[derive(Debug)]
pub struct PendingVideo {
    promise: Promise<Result<Video>>,
}

impl PendingVideo {
    pub fn wait(self, timeout: Duration) -> Result<Video> {
        match self.promise.wait(timeout) {
            Ok(result) => result,
            Err(PromiseError::Timeout) => Err(RecorderError::Timeout),
            Err(PromiseError::Abandoned) => Err(RecorderError::Unknown("recording callbacks dropped unresolved".into())),
        }
    }
}

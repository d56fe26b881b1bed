//! Small synchronization primitives shared by the pipeline workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Cancellation flag tied to the lifetime of one recording session.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseError {
    /// No value arrived within the wait.
    Timeout,
    /// The resolver was dropped without producing a value.
    Abandoned,
}

/// Write side of a one-shot value.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: SyncSender<T>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        // The waiting side may have given up already.
        let _ = self.tx.send(value);
    }
}

/// Read side of a one-shot value resolved on another thread.
#[derive(Debug)]
pub struct Promise<T> {
    rx: Receiver<T>,
}

impl<T> Promise<T> {
    /// Block up to `timeout` for the value.
    pub fn wait(self, timeout: Duration) -> Result<T, PromiseError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => PromiseError::Timeout,
            RecvTimeoutError::Disconnected => PromiseError::Abandoned,
        })
    }

    /// The value if it has already arrived.
    pub fn try_take(&self) -> Result<T, PromiseError> {
        self.rx.try_recv().map_err(|e| match e {
            TryRecvError::Empty => PromiseError::Timeout,
            TryRecvError::Disconnected => PromiseError::Abandoned,
        })
    }
}

pub fn promise<T>() -> (Resolver<T>, Promise<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (Resolver { tx }, Promise { rx })
}

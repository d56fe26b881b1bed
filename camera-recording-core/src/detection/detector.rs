use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::frame::frame::{Frame, RetainedFrame};
use crate::models::config::DetectionSettings;
use crate::models::error::{RecorderError, Result};
use crate::models::face::{FaceRegion, Faces};
use crate::processing::bitmap::Bitmap;
use crate::processing::processor::{upright_bitmap, ImageProcessor};
use crate::sync::{promise, CancellationToken, Promise, Resolver};

use super::throttle::DetectionThrottle;

/// Platform or ML face-detection engine.
///
/// Called on a detection worker thread, never on the camera thread. The image
/// is already upright; returned regions are in its coordinate space.
pub trait FaceDetectionEngine: Send + Sync {
    fn detect(&self, image: &Bitmap) -> std::result::Result<Vec<FaceRegion>, String>;
}

/// Result of one detection run.
#[derive(Debug, Clone)]
pub struct Detection {
    pub frame_id: u64,
    /// The upright, downscaled bitmap the faces were found in.
    pub image: Arc<Bitmap>,
    pub faces: Faces,
}

/// Promise of a [`Detection`], resolved on a detection worker.
pub type DetectionTicket = Promise<Detection>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    pub submitted: u64,
    pub throttled: u64,
    pub saturated: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    throttled: AtomicU64,
    saturated: AtomicU64,
    failed: AtomicU64,
}

struct DetectionJob {
    frame: RetainedFrame,
    resolver: Resolver<Detection>,
    token: CancellationToken,
}

/// Bounded pool of detection workers in front of a [`FaceDetectionEngine`].
///
/// Submission never blocks: a frame that is throttled, or arrives while every
/// worker and queue slot is busy, simply gets no detection.
pub struct FaceDetector {
    jobs: Option<SyncSender<DetectionJob>>,
    workers: Vec<thread::JoinHandle<()>>,
    throttle: DetectionThrottle,
    counters: Arc<Counters>,
}

impl FaceDetector {
    pub fn start(
        engine: Arc<dyn FaceDetectionEngine>,
        processor: Arc<dyn ImageProcessor>,
        settings: &DetectionSettings,
    ) -> Result<Self> {
        let worker_count = settings.worker_count.max(1);
        let (tx, rx) = mpsc::sync_channel::<DetectionJob>(worker_count);
        let rx = Arc::new(Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let rx = Arc::clone(&rx);
            let engine = Arc::clone(&engine);
            let processor = Arc::clone(&processor);
            let counters = Arc::clone(&counters);
            let scale = settings.detection_scale;

            let handle = thread::Builder::new()
                .name(format!("face-detection-{}", index))
                .spawn(move || detection_loop(&rx, engine.as_ref(), processor.as_ref(), &counters, scale))
                .map_err(|e| RecorderError::Unknown(format!("failed to spawn detection worker: {}", e)))?;
            workers.push(handle);
        }

        log::debug!("Started face detector with {} worker(s)", worker_count);
        Ok(Self {
            jobs: Some(tx),
            workers,
            throttle: DetectionThrottle::new(settings.min_interval),
            counters,
        })
    }

    /// Queue `frame` for detection if it is due and a worker slot is free.
    ///
    /// Must be called from the frame delivery context, before the delivery
    /// callback returns.
    pub fn submit(&mut self, frame: &Frame, token: &CancellationToken) -> Option<DetectionTicket> {
        let jobs = self.jobs.as_ref()?;
        if !self.throttle.is_due(frame.timestamp()) {
            self.counters.throttled.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let (resolver, ticket) = promise();
        let job = DetectionJob {
            frame: frame.retain(),
            resolver,
            token: token.clone(),
        };
        match jobs.try_send(job) {
            Ok(()) => {
                self.throttle.mark_processed(frame.timestamp());
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Some(ticket)
            }
            Err(TrySendError::Full(_)) => {
                log::trace!("Detection workers busy, skipping frame {}", frame.id());
                self.counters.saturated.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(TrySendError::Disconnected(_)) => None,
        }
    }

    pub fn stats(&self) -> DetectorStats {
        DetectorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            throttled: self.counters.throttled.load(Ordering::Relaxed),
            saturated: self.counters.saturated.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work and join the workers once the queue is drained.
    pub fn shutdown(&mut self) {
        self.jobs = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Face detection worker panicked");
            }
        }
    }
}

impl Drop for FaceDetector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn detection_loop(
    rx: &Mutex<Receiver<DetectionJob>>,
    engine: &dyn FaceDetectionEngine,
    processor: &dyn ImageProcessor,
    counters: &Counters,
    scale: f32,
) {
    loop {
        let job = match rx.lock().recv() {
            Ok(job) => job,
            Err(_) => break,
        };
        if job.token.is_canceled() {
            // Dropping the resolver abandons the ticket.
            continue;
        }

        let image = match upright_bitmap(processor, &job.frame, scale) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Cannot prepare frame {} for detection: {}", job.frame.id(), e);
                counters.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let faces = match engine.detect(&image) {
            Ok(regions) => Faces::from(regions),
            Err(e) => {
                log::warn!("Face detection failed for frame {}: {}", job.frame.id(), e);
                counters.failed.fetch_add(1, Ordering::Relaxed);
                Faces::none()
            }
        };
        log::trace!("Frame {}: {} face(s)", job.frame.id(), faces.len());

        job.resolver.resolve(Detection {
            frame_id: job.frame.id(),
            image: Arc::new(image),
            faces,
        });
    }
}

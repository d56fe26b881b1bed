use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use super::frame::{Frame, FrameData};
use super::pool::BufferPool;

/// Counters describing the buffers a [`FrameSource`] has handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSourceStats {
    pub delivered: u64,
    pub recycled: u64,
    /// Frames still retained by a consumer, or released but not yet recycled.
    pub in_flight: usize,
}

/// Adapter between the platform camera callback and the pipeline.
///
/// Each [`deliver`](Self::deliver) call wraps one camera buffer into a
/// [`Frame`], lends it to the consumer synchronously and keeps ownership of
/// the buffer. Buffers are recycled here, on the delivery thread, and never
/// by the consumers that retained them:
///
/// ```text
/// camera tick → deliver() → consumer(&Frame) ─ retain() → worker threads
///                  │                                         │
///                  └── recycle ← reclaim() ← released ids ←──┘
/// ```
pub struct FrameSource {
    pool: BufferPool,
    released_tx: Sender<u64>,
    released_rx: Receiver<u64>,
    in_flight: HashMap<u64, Frame>,
    // Released frames whose last handle was still being dropped elsewhere.
    pending: Vec<Frame>,
    next_id: u64,
    delivered: u64,
    recycled: u64,
}

impl FrameSource {
    pub fn new(pool_size: usize) -> Self {
        let (released_tx, released_rx) = mpsc::channel();
        Self {
            pool: BufferPool::new(pool_size),
            released_tx,
            released_rx,
            in_flight: HashMap::new(),
            pending: Vec::new(),
            next_id: 0,
            delivered: 0,
            recycled: 0,
        }
    }

    /// A buffer for the next camera tick, recycled when possible.
    pub fn allocate(&mut self, len: usize) -> Vec<u8> {
        self.reclaim();
        self.pool.take(len)
    }

    /// Deliver one camera buffer to `consumer`.
    ///
    /// The consumer must not block: anything that outlives the call has to
    /// [`retain`](Frame::retain) the frame and move to another thread.
    pub fn deliver<F>(&mut self, data: FrameData, consumer: F)
    where
        F: FnOnce(&Frame),
    {
        self.reclaim();

        let id = self.next_id;
        self.next_id += 1;

        let frame = Frame::new(id, data, self.released_tx.clone());
        consumer(&frame);
        self.delivered += 1;

        // Tracked before the delivery reference is dropped so that a release
        // racing in from a worker always finds its frame.
        self.in_flight.insert(id, frame);
        let remaining = self.in_flight.get(&id).map(Frame::release_delivery).unwrap_or(0);
        if remaining == 0 {
            if let Some(frame) = self.in_flight.remove(&id) {
                self.recycle(frame);
            }
        }
    }

    /// Recycle every frame whose count reached zero since the last call.
    pub fn reclaim(&mut self) {
        for frame in std::mem::take(&mut self.pending) {
            self.recycle(frame);
        }
        while let Ok(id) = self.released_rx.try_recv() {
            if let Some(frame) = self.in_flight.remove(&id) {
                self.recycle(frame);
            }
        }
    }

    pub fn stats(&self) -> FrameSourceStats {
        FrameSourceStats {
            delivered: self.delivered,
            recycled: self.recycled,
            in_flight: self.in_flight.len() + self.pending.len(),
        }
    }

    fn recycle(&mut self, frame: Frame) {
        debug_assert_eq!(frame.ref_count(), 0, "recycling a frame that is still referenced");
        match frame.into_data() {
            Ok(data) => {
                self.pool.put(data.pixels);
                self.recycled += 1;
            }
            Err(frame) => self.pending.push(frame),
        }
    }
}

impl Default for FrameSource {
    fn default() -> Self {
        Self::new(4)
    }
}

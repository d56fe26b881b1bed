/// Fixed-capacity circular buffer between a capture callback and the thread
/// that drains it.
///
/// Wrap in `Arc<parking_lot::Mutex<RingBuffer<T>>>` for cross-thread access.
/// On overflow the oldest samples are dropped: a stalled writer loses the
/// start of the backlog, never the newest audio.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![T::default(); capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Append samples, evicting the oldest ones if full.
    ///
    /// Input longer than the capacity keeps only its tail.
    pub fn push_slice(&mut self, samples: &[T]) {
        let capacity = self.capacity();
        let samples = &samples[samples.len().saturating_sub(capacity)..];
        if samples.is_empty() {
            return;
        }

        let overflow = (self.len + samples.len()).saturating_sub(capacity);
        self.head = (self.head + overflow) % capacity;
        self.len -= overflow;

        let tail = (self.head + self.len) % capacity;
        let first = samples.len().min(capacity - tail);
        self.buffer[tail..tail + first].copy_from_slice(&samples[..first]);
        self.buffer[..samples.len() - first].copy_from_slice(&samples[first..]);
        self.len += samples.len();
    }

    /// Remove and return up to `count` of the oldest samples.
    pub fn pop_up_to(&mut self, count: usize) -> Vec<T> {
        let count = count.min(self.len);
        let mut out = Vec::with_capacity(count);
        let first = count.min(self.capacity() - self.head);
        out.extend_from_slice(&self.buffer[self.head..self.head + first]);
        out.extend_from_slice(&self.buffer[..count - first]);
        self.head = (self.head + count) % self.capacity();
        self.len -= count;
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

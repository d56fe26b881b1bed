/// Bounded free list of frame buffers.
///
/// Buffers come back from [`FrameSource`](super::source::FrameSource) once their
/// frame's reference count reached zero and are handed out again to the
/// camera callback, avoiding a fresh allocation per tick.
#[derive(Debug)]
pub struct BufferPool {
    buffers: Vec<Vec<u8>>,
    max_buffers: usize,
}

impl BufferPool {
    pub fn new(max_buffers: usize) -> Self {
        Self {
            buffers: Vec::with_capacity(max_buffers),
            max_buffers,
        }
    }

    /// A zeroed buffer of exactly `len` bytes, reusing a pooled allocation if
    /// one is large enough.
    pub fn take(&mut self, len: usize) -> Vec<u8> {
        match self.buffers.iter().position(|b| b.capacity() >= len) {
            Some(index) => {
                let mut buffer = self.buffers.swap_remove(index);
                buffer.clear();
                buffer.resize(len, 0);
                buffer
            }
            None => vec![0; len],
        }
    }

    /// Return a buffer. Dropped if the pool is full.
    pub fn put(&mut self, buffer: Vec<u8>) {
        if self.buffers.len() < self.max_buffers {
            self.buffers.push(buffer);
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

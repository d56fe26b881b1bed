use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use crate::models::geometry::{Rotation, Size};

/// Memory layout of a camera buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// YUV 4:2:0 semi-planar: full Y plane, then interleaved V/U at half resolution.
    Nv21,
    /// Packed R, G, B, A bytes.
    Rgba8888,
}

impl PixelFormat {
    /// Number of bytes a `width × height` buffer occupies.
    pub fn buffer_len(&self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Nv21 => w * h + w * h.div_ceil(2),
            Self::Rgba8888 => w * h * 4,
        }
    }
}

/// The payload of one camera tick, as delivered by the platform.
#[derive(Debug)]
pub struct FrameData {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Clockwise rotation bringing the buffer upright.
    pub rotation: Rotation,
    /// Presentation time relative to the camera clock.
    pub timestamp: Duration,
}

impl FrameData {
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("frame dimensions must be non-zero".into());
        }
        if self.format == PixelFormat::Nv21 && self.width % 2 != 0 {
            return Err(format!("NV21 frames need an even width, got {}", self.width));
        }
        let expected = self.format.buffer_len(self.width, self.height);
        if self.pixels.len() < expected {
            return Err(format!(
                "{:?} buffer of {}x{} needs {} bytes, got {}",
                self.format,
                self.width,
                self.height,
                expected,
                self.pixels.len()
            ));
        }
        Ok(())
    }
}

struct FrameShared {
    id: u64,
    data: FrameData,
    ref_count: AtomicUsize,
    released: Sender<u64>,
}

/// Immutable view over one captured image buffer.
///
/// A `Frame` is only ever lent out (`&Frame`) during the synchronous delivery
/// callback. Consumers that need it past that point call [`Frame::retain`]
/// before the callback returns; the returned [`RetainedFrame`] gives the
/// reference back when dropped. The [`FrameSource`](super::source::FrameSource)
/// that produced the frame recycles the buffer only once the count is zero.
pub struct Frame {
    shared: Arc<FrameShared>,
}

impl Frame {
    /// Creates a frame holding one reference on behalf of its source.
    pub(crate) fn new(id: u64, data: FrameData, released: Sender<u64>) -> Self {
        Self {
            shared: Arc::new(FrameShared {
                id,
                data,
                ref_count: AtomicUsize::new(1),
                released,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn width(&self) -> u32 {
        self.shared.data.width
    }

    pub fn height(&self) -> u32 {
        self.shared.data.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn format(&self) -> PixelFormat {
        self.shared.data.format
    }

    pub fn rotation(&self) -> Rotation {
        self.shared.data.rotation
    }

    pub fn timestamp(&self) -> Duration {
        self.shared.data.timestamp
    }

    pub fn pixels(&self) -> &[u8] {
        &self.shared.data.pixels
    }

    /// Current number of outstanding references, including the source's own.
    pub fn ref_count(&self) -> usize {
        self.shared.ref_count.load(Ordering::Acquire)
    }

    /// Take a reference that keeps the buffer alive across threads.
    pub fn retain(&self) -> RetainedFrame {
        self.shared.ref_count.fetch_add(1, Ordering::AcqRel);
        RetainedFrame {
            frame: Frame {
                shared: Arc::clone(&self.shared),
            },
        }
    }

    /// Drop the delivery reference held by the source. Returns the remaining count.
    pub(crate) fn release_delivery(&self) -> usize {
        self.decrement()
    }

    /// Hand back the buffer contents once every reference is gone.
    ///
    /// Fails (returning the frame) while another handle still shares the
    /// allocation, which only happens for the instant a `RetainedFrame` is
    /// being dropped on another thread.
    pub(crate) fn into_data(self) -> Result<FrameData, Frame> {
        match Arc::try_unwrap(self.shared) {
            Ok(shared) => Ok(shared.data),
            Err(shared) => Err(Frame { shared }),
        }
    }

    fn decrement(&self) -> usize {
        let previous = self
            .shared
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1));
        match previous {
            Ok(previous) => previous - 1,
            Err(_) => {
                debug_assert!(false, "frame {} released more often than retained", self.id());
                log::error!("Frame {} released more often than retained", self.id());
                0
            }
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id())
            .field("size", &self.size())
            .field("format", &self.format())
            .field("rotation", &self.rotation())
            .field("timestamp", &self.timestamp())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// A counted reference to a [`Frame`], released on drop.
pub struct RetainedFrame {
    frame: Frame,
}

impl Deref for RetainedFrame {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Clone for RetainedFrame {
    fn clone(&self) -> Self {
        self.frame.retain()
    }
}

impl Drop for RetainedFrame {
    fn drop(&mut self) {
        if self.frame.decrement() == 0 {
            // The source may already be gone; the buffer is then freed with the Arc.
            let _ = self.frame.shared.released.send(self.frame.id());
        }
    }
}

impl fmt::Debug for RetainedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetainedFrame").field(&self.frame).finish()
    }
}

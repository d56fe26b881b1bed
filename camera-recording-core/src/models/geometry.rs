use serde::{Deserialize, Serialize};

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Swap width and height.
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Lay the size out for the given output orientation: portrait sizes are
    /// taller than wide, landscape sizes wider than tall.
    pub fn oriented(&self, orientation: Orientation) -> Self {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if orientation.is_portrait() {
            Self::new(short, long)
        } else {
            Self::new(long, short)
        }
    }
}

/// Axis-aligned rectangle in floating point image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Smallest integer rectangle covering `self`, clipped to `bounds`.
    ///
    /// Returns `None` when nothing of the rectangle is left after clipping.
    pub fn clamp_to(&self, bounds: Size) -> Option<PixelRect> {
        if !(self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()) {
            return None;
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let left = self.x.floor().max(0.0);
        let top = self.y.floor().max(0.0);
        let right = self.right().ceil().min(bounds.width as f32);
        let bottom = self.bottom().ceil().min(bounds.height as f32);

        let width = right - left;
        let height = bottom - top;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(PixelRect {
            x: left as u32,
            y: top as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Rectangle in integer pixel coordinates, always non-empty and inside the
/// image it was clamped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Clockwise rotation needed to bring a sensor image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// Nearest quarter turn for an arbitrary angle in degrees.
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = (degrees.rem_euclid(360) + 45) / 90 % 4;
        match normalized {
            1 => Self::Deg90,
            2 => Self::Deg180,
            3 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn is_quarter_turn(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Dimensions of an image of `size` after applying this rotation.
    pub fn apply(&self, size: Size) -> Size {
        if self.is_quarter_turn() {
            size.transposed()
        } else {
            size
        }
    }
}

/// Orientation of the recorded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Portrait,
    LandscapeLeft,
    PortraitUpsideDown,
    LandscapeRight,
}

impl Orientation {
    pub fn is_portrait(&self) -> bool {
        matches!(self, Self::Portrait | Self::PortraitUpsideDown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    #[default]
    Back,
    External,
}

impl CameraPosition {
    /// Front camera output is mirrored horizontally.
    pub fn is_mirrored(&self) -> bool {
        matches!(self, Self::Front)
    }
}

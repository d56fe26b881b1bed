use image::{Rgba, RgbaImage};

use crate::models::geometry::Size;

/// Upright RGBA8 bitmap shared by decoding, detection, compositing and the
/// encoder input surface.
pub type Bitmap = RgbaImage;

pub const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 0xFF]);

/// Opaque black bitmap of `size`.
pub fn blank(size: Size) -> Bitmap {
    RgbaImage::from_pixel(size.width, size.height, OPAQUE_BLACK)
}

pub fn bitmap_size(bitmap: &Bitmap) -> Size {
    let (width, height) = bitmap.dimensions();
    Size::new(width, height)
}

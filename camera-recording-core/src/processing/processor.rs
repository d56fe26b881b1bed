use image::imageops::{self, FilterType};

use crate::frame::frame::{Frame, PixelFormat};
use crate::models::geometry::{Rotation, Size};

use super::bitmap::Bitmap;
use super::yuv::{nv21_to_bitmap, rgba_to_bitmap};

/// Image-processing service used by detection and compositing.
///
/// Injected into the pipeline so that a platform can swap in accelerated
/// colour conversion or blurring.
pub trait ImageProcessor: Send + Sync {
    /// Decode a camera frame into an RGBA bitmap (no rotation applied).
    fn to_bitmap(&self, frame: &Frame) -> Result<Bitmap, String>;

    fn scale(&self, image: &Bitmap, size: Size) -> Bitmap;

    /// Rotate clockwise by `rotation`.
    fn rotate(&self, image: &Bitmap, rotation: Rotation) -> Bitmap;

    fn blur(&self, image: &mut Bitmap, radius: u32);
}

/// Portable CPU implementation on top of `image::imageops`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareImageProcessor;

impl ImageProcessor for SoftwareImageProcessor {
    fn to_bitmap(&self, frame: &Frame) -> Result<Bitmap, String> {
        match frame.format() {
            PixelFormat::Nv21 => nv21_to_bitmap(frame.pixels(), frame.width(), frame.height()),
            PixelFormat::Rgba8888 => rgba_to_bitmap(frame.pixels(), frame.width(), frame.height()),
        }
    }

    fn scale(&self, image: &Bitmap, size: Size) -> Bitmap {
        let filter = if size.width <= image.width() && size.height <= image.height() {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };
        imageops::resize(image, size.width, size.height, filter)
    }

    fn rotate(&self, image: &Bitmap, rotation: Rotation) -> Bitmap {
        match rotation {
            Rotation::Deg0 => image.clone(),
            Rotation::Deg90 => imageops::rotate90(image),
            Rotation::Deg180 => imageops::rotate180(image),
            Rotation::Deg270 => imageops::rotate270(image),
        }
    }

    fn blur(&self, image: &mut Bitmap, radius: u32) {
        if radius == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        *image = imageops::blur(image, radius as f32);
    }
}

/// Decode, downscale by `scale` and rotate `frame` upright.
///
/// The result is the bitmap both the face detector and the compositor work on,
/// so detected face coordinates line up with what gets drawn.
pub fn upright_bitmap(processor: &dyn ImageProcessor, frame: &Frame, scale: f32) -> Result<Bitmap, String> {
    let decoded = processor.to_bitmap(frame)?;
    let scaled = if scale < 1.0 {
        let size = Size::new(
            ((decoded.width() as f32 * scale).round() as u32).max(1),
            ((decoded.height() as f32 * scale).round() as u32).max(1),
        );
        processor.scale(&decoded, size)
    } else {
        decoded
    };
    Ok(match frame.rotation() {
        Rotation::Deg0 => scaled,
        rotation => processor.rotate(&scaled, rotation),
    })
}

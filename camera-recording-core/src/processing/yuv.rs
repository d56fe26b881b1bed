//! Colour conversion from camera buffer layouts to [`Bitmap`].

use image::RgbaImage;

use super::bitmap::Bitmap;

#[inline]
fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Convert an NV21 (YUV420SP, V before U) buffer to an opaque RGBA bitmap.
///
/// Uses the BT.601 limited-range integer approximation (coefficients in
/// 1/1024 units, +2 rounding after the shift).
pub fn nv21_to_bitmap(yuv: &[u8], width: u32, height: u32) -> Result<Bitmap, String> {
    if width % 2 != 0 {
        return Err(format!("NV21 conversion needs an even width, got {}", width));
    }
    let (w, h) = (width as usize, height as usize);
    let frame_size = w * h;
    let needed = frame_size + w * h.div_ceil(2);
    if yuv.len() < needed {
        return Err(format!("NV21 buffer too short: {} < {}", yuv.len(), needed));
    }

    let mut rgba = Vec::with_capacity(frame_size * 4);
    for row in 0..h {
        let mut uvp = frame_size + (row >> 1) * w;
        let (mut u, mut v) = (0i32, 0i32);
        for col in 0..w {
            let y = (yuv[row * w + col] as i32 - 16).max(0);
            if col & 1 == 0 {
                v = yuv[uvp] as i32 - 128;
                u = yuv[uvp + 1] as i32 - 128;
                uvp += 2;
            }

            let y1192 = 1192 * y;
            let r = clamp_channel(((y1192 + 1634 * v) >> 10) + 2);
            let g = clamp_channel(((y1192 - 833 * v - 400 * u) >> 10) + 2);
            let b = clamp_channel(((y1192 + 2066 * u) >> 10) + 2);

            rgba.extend_from_slice(&[r, g, b, 0xFF]);
        }
    }
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| format!("{}x{} NV21 conversion size mismatch", width, height))
}

/// Copy tightly packed RGBA bytes into a bitmap.
pub fn rgba_to_bitmap(rgba: &[u8], width: u32, height: u32) -> Result<Bitmap, String> {
    let len = width as usize * height as usize * 4;
    if rgba.len() < len {
        return Err(format!("RGBA buffer too short: {} < {}", rgba.len(), len));
    }
    RgbaImage::from_raw(width, height, rgba[..len].to_vec())
        .ok_or_else(|| format!("{}x{} RGBA buffer size mismatch", width, height))
}

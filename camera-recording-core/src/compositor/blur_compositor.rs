use std::sync::Arc;
use std::time::Duration;

use image::imageops;

use crate::encoder::codec::InputSurface;
use crate::models::config::BlurSettings;
use crate::models::error::EncoderError;
use crate::models::face::Faces;
use crate::models::geometry::{CameraPosition, PixelRect, Size};
use crate::processing::bitmap::{bitmap_size, blank, Bitmap, OPAQUE_BLACK};
use crate::processing::processor::ImageProcessor;

use super::transform::CanvasTransform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    pub blurred: usize,
    pub skipped: usize,
}

/// Rasterizes upright frames onto the encoder canvas, blurring face regions.
pub struct BlurCompositor {
    canvas: Bitmap,
    settings: BlurSettings,
    processor: Arc<dyn ImageProcessor>,
    mirrored: bool,
    transform: Option<(CanvasTransform, Vec<u32>, Vec<u32>)>,
}

impl BlurCompositor {
    pub fn new(
        canvas_size: Size,
        camera_position: CameraPosition,
        settings: BlurSettings,
        processor: Arc<dyn ImageProcessor>,
    ) -> Self {
        Self {
            canvas: blank(canvas_size),
            settings,
            processor,
            mirrored: camera_position.is_mirrored(),
            transform: None,
        }
    }

    pub fn canvas(&self) -> &Bitmap {
        &self.canvas
    }

    pub fn canvas_size(&self) -> Size {
        bitmap_size(&self.canvas)
    }

    /// Draw `image` onto the canvas and blur every face in `faces`.
    ///
    /// Face bounds are in `image` coordinates.
    pub fn compose(&mut self, image: &Bitmap, faces: &Faces) -> CompositeStats {
        let transform = self.transform_for(bitmap_size(image));
        self.draw_frame(image);

        let mut stats = CompositeStats::default();
        for face in faces {
            let mapped = transform.map_rect(&face.bounds);
            match mapped.clamp_to(self.canvas_size()) {
                Some(region) => {
                    self.blur_region(region);
                    stats.blurred += 1;
                }
                None => {
                    log::debug!("Skipping degenerate face region {:?}", mapped);
                    stats.skipped += 1;
                }
            }
        }
        stats
    }

    /// [`compose`](Self::compose), then present the canvas to `surface`.
    pub fn compose_into(
        &mut self,
        image: &Bitmap,
        faces: &Faces,
        surface: &mut dyn InputSurface,
        timestamp: Duration,
    ) -> Result<CompositeStats, EncoderError> {
        let stats = self.compose(image, faces);
        surface.present(&self.canvas, timestamp)?;
        Ok(stats)
    }

    fn transform_for(&mut self, source: Size) -> CanvasTransform {
        match &self.transform {
            Some((transform, _, _)) if transform.source() == source => *transform,
            _ => {
                let transform = CanvasTransform::aspect_fill(source, self.canvas_size(), self.mirrored);
                let columns = transform.column_lookup();
                let rows = transform.row_lookup();
                self.transform = Some((transform, columns, rows));
                transform
            }
        }
    }

    fn draw_frame(&mut self, image: &Bitmap) {
        let Some((_, columns, rows)) = &self.transform else {
            return;
        };
        if image.width() == 0 || image.height() == 0 {
            self.canvas.pixels_mut().for_each(|px| *px = OPAQUE_BLACK);
            return;
        }
        for (cy, &sy) in rows.iter().enumerate() {
            for (cx, &sx) in columns.iter().enumerate() {
                let mut px = *image.get_pixel(sx, sy);
                px[3] = 0xFF;
                self.canvas.put_pixel(cx as u32, cy as u32, px);
            }
        }
    }

    fn blur_region(&mut self, region: PixelRect) {
        let factor = self.settings.downscale_factor.max(1);
        let patch = imageops::crop_imm(&self.canvas, region.x, region.y, region.width, region.height).to_image();
        let small_size = Size::new((region.width / factor).max(1), (region.height / factor).max(1));

        let mut small = self.processor.scale(&patch, small_size);
        self.processor.blur(&mut small, self.settings.radius);
        let blurred = self.processor.scale(&small, region.size());

        imageops::replace(&mut self.canvas, &blurred, region.x as i64, region.y as i64);
    }
}

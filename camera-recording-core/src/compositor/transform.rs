use crate::models::geometry::{Rect, Size};

/// Aspect-fill mapping from a source bitmap onto the output canvas.
///
/// The source is scaled uniformly so it covers the whole canvas, centred, and
/// optionally mirrored around the vertical axis (front camera).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    mirrored: bool,
    source: Size,
    canvas: Size,
}

impl CanvasTransform {
    pub fn aspect_fill(source: Size, canvas: Size, mirrored: bool) -> Self {
        let scale = if source.is_empty() {
            1.0
        } else {
            (canvas.width as f32 / source.width as f32).max(canvas.height as f32 / source.height as f32)
        };
        Self {
            scale,
            offset_x: (canvas.width as f32 - source.width as f32 * scale) / 2.0,
            offset_y: (canvas.height as f32 - source.height as f32 * scale) / 2.0,
            mirrored,
            source,
            canvas,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn source(&self) -> Size {
        self.source
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Map a rectangle in source coordinates to canvas coordinates.
    ///
    /// The result may extend past the canvas; clamp it before use.
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        let left = rect.x * self.scale + self.offset_x;
        let width = rect.width * self.scale;
        let x = if self.mirrored {
            self.canvas.width as f32 - (left + width)
        } else {
            left
        };
        Rect::new(x, rect.y * self.scale + self.offset_y, width, rect.height * self.scale)
    }

    /// Source column sampled for each canvas column.
    pub fn column_lookup(&self) -> Vec<u32> {
        (0..self.canvas.width)
            .map(|cx| {
                let ux = if self.mirrored { self.canvas.width - 1 - cx } else { cx };
                sample_index(ux, self.offset_x, self.scale, self.source.width)
            })
            .collect()
    }

    /// Source row sampled for each canvas row.
    pub fn row_lookup(&self) -> Vec<u32> {
        (0..self.canvas.height)
            .map(|cy| sample_index(cy, self.offset_y, self.scale, self.source.height))
            .collect()
    }
}

fn sample_index(canvas_index: u32, offset: f32, scale: f32, source_len: u32) -> u32 {
    let position = ((canvas_index as f32 + 0.5 - offset) / scale).floor();
    (position.max(0.0) as u32).min(source_len.saturating_sub(1))
}

pub mod blur_compositor;
pub mod transform;

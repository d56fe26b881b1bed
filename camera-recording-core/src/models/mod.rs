pub mod config;
pub mod error;
pub mod face;
pub mod geometry;
pub mod state;
pub mod video;

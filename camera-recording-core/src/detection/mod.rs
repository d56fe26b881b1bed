pub mod detector;
pub mod throttle;

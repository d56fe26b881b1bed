pub mod frame;
pub mod pool;
pub mod source;

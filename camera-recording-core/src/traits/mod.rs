pub mod capabilities;
pub mod delegate;
pub mod merger;
pub mod recorder;

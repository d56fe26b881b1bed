pub mod bitmap;
pub mod pcm;
pub mod processor;
pub mod ring_buffer;
pub mod yuv;

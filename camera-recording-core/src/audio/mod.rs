pub mod provider;
pub mod recorder;
pub mod wav_format;
pub mod wav_writer;

use std::time::Instant;

use crate::models::config::EncoderSettings;
use crate::models::error::EncoderError;
use crate::models::geometry::Size;
use crate::models::state::EncoderState;

use super::codec::{ContainerMuxer, EncoderOutput, InputSurface, VideoEncoder, VideoFormat};

/// How a call to [`EncoderPipeline::drain_encoder`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The encoder has nothing more for now.
    Drained,
    EndOfStream,
    /// The drain deadline passed while the encoder kept reporting try-again.
    TimedOut,
}

/// Hardware encoder, its input surface and the container muxer it feeds.
///
/// The muxer is started exactly once, when the encoder reports its output
/// format, and never receives a sample before that.
pub struct EncoderPipeline {
    encoder: Box<dyn VideoEncoder>,
    surface: Option<Box<dyn InputSurface>>,
    muxer: Box<dyn ContainerMuxer>,
    settings: EncoderSettings,
    state: EncoderState,
    size: Size,
    encoder_started: bool,
    track_index: Option<usize>,
    muxer_started: bool,
    released: bool,
    frames_presented: u64,
    samples_written: u64,
    bytes_written: u64,
}

impl EncoderPipeline {
    pub fn new(encoder: Box<dyn VideoEncoder>, muxer: Box<dyn ContainerMuxer>, settings: EncoderSettings) -> Self {
        Self {
            encoder,
            surface: None,
            muxer,
            settings,
            state: EncoderState::Idle,
            size: Size::default(),
            encoder_started: false,
            track_index: None,
            muxer_started: false,
            released: false,
            frames_presented: 0,
            samples_written: 0,
            bytes_written: 0,
        }
    }

    /// Configure the encoder for `size`, obtain its input surface and start it.
    ///
    /// The muxer stays unstarted until the first format change.
    pub fn start(&mut self, size: Size) -> Result<(), EncoderError> {
        if self.state != EncoderState::Idle {
            return Err(self.invalid_state(EncoderState::Idle));
        }
        let format = VideoFormat::new(&self.settings, size);
        let result = self
            .encoder
            .configure(&format)
            .and_then(|_| self.encoder.create_input_surface())
            .and_then(|surface| {
                self.surface = Some(surface);
                self.encoder.start()
            });
        if let Err(e) = result {
            log::error!("Failed to start {} encoder at {}x{}: {}", format.mime_type, size.width, size.height, e);
            self.abort();
            return Err(e);
        }

        self.encoder_started = true;
        self.size = size;
        self.state = EncoderState::Started;
        log::info!(
            "Encoder started: {} {}x{} @ {} bit/s, {} fps",
            format.mime_type,
            size.width,
            size.height,
            format.bit_rate,
            format.frame_rate
        );
        Ok(())
    }

    /// Let `draw` render one frame onto the input surface, then drain whatever
    /// the encoder produced. Any error aborts the pipeline.
    pub fn encode_frame<F>(&mut self, draw: F) -> Result<(), EncoderError>
    where
        F: FnOnce(&mut dyn InputSurface) -> Result<(), EncoderError>,
    {
        if self.state != EncoderState::Started {
            return Err(self.invalid_state(EncoderState::Started));
        }
        let Some(surface) = self.surface.as_deref_mut() else {
            return Err(self.invalid_state(EncoderState::Started));
        };

        let result = draw(surface).and_then(|_| {
            self.frames_presented += 1;
            self.drain_encoder(false).map(|_| ())
        });
        if let Err(e) = &result {
            log::error!("Encoder pipeline failed after {} frame(s): {}", self.frames_presented, e);
            self.abort();
        }
        result
    }

    /// Move encoded output into the muxer.
    ///
    /// Without `end_of_stream` this returns as soon as the encoder has nothing
    /// ready. With it, polling continues until the end-of-stream buffer shows
    /// up or the drain deadline passes.
    pub fn drain_encoder(&mut self, end_of_stream: bool) -> Result<DrainOutcome, EncoderError> {
        let deadline = Instant::now() + self.settings.drain_deadline;
        loop {
            match self.encoder.dequeue_output_buffer(self.settings.dequeue_timeout)? {
                EncoderOutput::TryAgainLater => {
                    if !end_of_stream {
                        return Ok(DrainOutcome::Drained);
                    }
                    if Instant::now() >= deadline {
                        return Ok(DrainOutcome::TimedOut);
                    }
                }
                EncoderOutput::FormatChanged(format) => {
                    if self.track_index.is_some() {
                        return Err(EncoderError::FormatChangedTwice);
                    }
                    if self.muxer_started {
                        return Err(EncoderError::MuxerAlreadyStarted);
                    }
                    let track = self.muxer.add_track(&format)?;
                    self.track_index = Some(track);
                    self.muxer.start()?;
                    self.muxer_started = true;
                    log::debug!("Muxer started with track {} ({} {}x{})", track, format.mime_type, format.width, format.height);
                }
                EncoderOutput::Buffer { index, mut info } => {
                    if info.flags.codec_config {
                        // Already delivered to the muxer through the track format.
                        info.size = 0;
                    }
                    if info.size > 0 {
                        let track = match self.track_index {
                            Some(track) if self.muxer_started => track,
                            _ => return Err(EncoderError::MuxerNotStarted),
                        };
                        let data = self.encoder.output_buffer(index)?;
                        let end = (info.offset + info.size).min(data.len());
                        let payload = &data[info.offset.min(end)..end];
                        self.muxer.write_sample(track, payload, &info)?;
                        self.samples_written += 1;
                        self.bytes_written += payload.len() as u64;
                    }
                    self.encoder.release_output_buffer(index)?;

                    if info.flags.end_of_stream {
                        if !end_of_stream {
                            log::warn!("Encoder reached end of stream unexpectedly");
                        }
                        return Ok(DrainOutcome::EndOfStream);
                    }
                }
            }

            if Instant::now() >= deadline {
                log::warn!("Encoder drain exceeded {:?}", self.settings.drain_deadline);
                return Ok(DrainOutcome::TimedOut);
            }
        }
    }

    /// Signal end of stream, drain and release everything.
    ///
    /// Calling this again, or on a failed pipeline, does nothing.
    pub fn stop(&mut self) -> Result<(), EncoderError> {
        match self.state {
            EncoderState::Stopping | EncoderState::Stopped | EncoderState::Failed => return Ok(()),
            EncoderState::Idle => {
                self.release_resources();
                self.state = EncoderState::Stopped;
                return Ok(());
            }
            EncoderState::Started => {}
        }
        self.state = EncoderState::Stopping;

        let result = self
            .encoder
            .signal_end_of_input_stream()
            .and_then(|_| self.drain_encoder(true));
        let result = match result {
            Ok(DrainOutcome::TimedOut) => {
                log::warn!("End-of-stream drain timed out, releasing encoder anyway");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("End-of-stream drain failed: {}", e);
                Err(e)
            }
        };

        self.release_resources();
        self.state = if result.is_ok() {
            EncoderState::Stopped
        } else {
            EncoderState::Failed
        };
        log::info!(
            "Encoder stopped: {} frame(s), {} sample(s), {} byte(s)",
            self.frames_presented,
            self.samples_written,
            self.bytes_written
        );
        result
    }

    /// Release everything after a failure. The pipeline ends up `Failed`.
    pub fn abort(&mut self) {
        self.release_resources();
        self.state = EncoderState::Failed;
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn has_track(&self) -> bool {
        self.track_index.is_some()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn release_resources(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.encoder_started {
            if let Err(e) = self.encoder.stop() {
                log::warn!("Failed to stop encoder: {}", e);
            }
        }
        self.encoder.release();
        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }

        // Stopping a muxer that never started is an error on every platform.
        if self.muxer_started {
            if let Err(e) = self.muxer.stop() {
                log::warn!("Failed to stop muxer: {}", e);
            }
        }
        self.muxer.release();
    }

    fn invalid_state(&self, expected: EncoderState) -> EncoderError {
        EncoderError::InvalidState {
            expected: expected.to_string(),
            actual: self.state.to_string(),
        }
    }
}

impl Drop for EncoderPipeline {
    fn drop(&mut self) {
        if !self.released {
            log::debug!("Releasing encoder pipeline on drop");
            self.release_resources();
        }
    }
}

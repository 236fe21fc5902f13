//! Viseme classification oracle and frame collection
//!
//! The classifier is an injected capability: anything implementing
//! [`VisemeOracle`] can drive the pipeline, which keeps it testable with
//! deterministic fakes.

mod energy;
mod scripted;

pub use energy::EnergyOracle;
pub use scripted::ScriptedOracle;

use crate::audio::PcmAudio;
use crate::pipeline::PipelineError;
use crate::viseme::RawFrame;

/// Classifier set-up failures, reported before any frame is collected
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle rejected configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Oracle failed to initialize: {0}")]
    InitFailed(String),
}

/// One classifier result
#[derive(Debug, Clone, PartialEq)]
pub struct OracleFrame {
    pub visemes: Vec<f32>,
    pub laughter: f32,
    /// Processing delay reported by the classifier
    pub frame_delay_ms: u32,
}

/// Per-chunk viseme classifier
pub trait VisemeOracle {
    /// Prepare for an utterance; called once before the first chunk
    fn prepare(&mut self, sample_rate: u32, buffer_size: usize) -> Result<(), OracleError>;

    /// Classify one interleaved chunk of `channels` channels
    fn process_chunk(&mut self, chunk: &[i16], channels: u16) -> OracleFrame;

    /// Width of every viseme vector this oracle returns
    fn viseme_count(&self) -> usize;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Drives an oracle over a whole utterance at a fixed cadence
pub struct FrameCollector<'o> {
    oracle: &'o mut dyn VisemeOracle,
    chunk_ms: u32,
    buffer_size: usize,
}

impl<'o> FrameCollector<'o> {
    pub fn new(oracle: &'o mut dyn VisemeOracle, chunk_ms: u32, buffer_size: usize) -> Self {
        Self {
            oracle,
            chunk_ms,
            buffer_size,
        }
    }

    /// Classify every complete chunk of `audio`, in order
    pub fn collect(&mut self, audio: &PcmAudio) -> Result<Vec<RawFrame>, PipelineError> {
        let chunks = audio.chunks(self.chunk_ms)?;
        self.oracle.prepare(audio.sample_rate, self.buffer_size)?;

        let expected = self.oracle.viseme_count();
        let mut frames = Vec::with_capacity(chunks.len());
        let mut max_delay_ms = 0;

        for (index, chunk) in chunks.enumerate() {
            let out = self.oracle.process_chunk(chunk, audio.channels);
            if out.visemes.len() != expected {
                return Err(PipelineError::InconsistentFrameWidth {
                    frame: index,
                    expected,
                    found: out.visemes.len(),
                });
            }
            max_delay_ms = max_delay_ms.max(out.frame_delay_ms);
            frames.push(RawFrame::new(out.visemes, out.laughter));
        }

        tracing::debug!(
            "{} produced {} frames ({} ms chunks, max delay {} ms)",
            self.oracle.name(),
            frames.len(),
            self.chunk_ms,
            max_delay_ms
        );

        Ok(frames)
    }
}

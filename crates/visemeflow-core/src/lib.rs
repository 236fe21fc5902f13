//! VisemeFlow Core - Lip-sync viseme post-processing
//!
//! This library turns the jittery per-frame output of a speech-to-viseme
//! classifier into an animation-ready track:
//! - WAV loading and fixed-cadence chunking
//! - Pluggable classifier oracles
//! - Hold filtering of short activations
//! - Block clustering around a dominant viseme
//! - Temporal smoothing with consonant lock

pub mod audio;
pub mod config;
pub mod filter;
pub mod oracle;
pub mod viseme;

mod pipeline;

pub use config::{AudioOptions, Config, ConfigError, DepthPolicy, InterpolationSettings, VisemeTables};
pub use oracle::{EnergyOracle, FrameCollector, OracleError, OracleFrame, ScriptedOracle, VisemeOracle};
pub use pipeline::{Pipeline, PipelineError, PipelineResult, Timings};
pub use viseme::{FrameSequence, RawFrame};

/// Cook a WAV file held in memory into a viseme sequence
///
/// This is the main entry point for the library.
pub fn cook_frame_sequence(
    wav: &[u8],
    oracle: &mut dyn VisemeOracle,
    config: &Config,
) -> Result<PipelineResult, PipelineError> {
    let pipeline = Pipeline::new(config)?;
    pipeline.cook(wav, oracle)
}

/// Post-process frames that were already classified
pub fn process_frames(frames: Vec<RawFrame>, config: &Config) -> Result<PipelineResult, PipelineError> {
    Pipeline::new(config)?.process(frames)
}

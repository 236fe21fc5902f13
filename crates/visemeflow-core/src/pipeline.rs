//! Main processing pipeline: Raw frames → Hold filter → Blocks → Smoothing

use std::time::Instant;

use crate::{
    audio::{load_wav_bytes, AudioError},
    config::{Config, ConfigError, DepthPolicy},
    filter::{
        cluster_blocks, estimate_tempo, filter_short_holds, smooth_frames, BlockSummary,
        HoldStats, TemporalSmoother, TempoEstimate,
    },
    oracle::{FrameCollector, OracleError, VisemeOracle},
    viseme::{
        FrameSequence, RawFrame, SequenceEmitter, VisemeClassification, VisemePriority,
        DEFAULT_FRAME_DURATION_SECS,
    },
};

/// Pipeline error with actionable context
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Frame {frame} has {found} viseme channels, expected {expected}")]
    InconsistentFrameWidth {
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("Frame {frame} channel {channel} has weight {value}, expected a value in [0, 1]")]
    WeightOutOfRange {
        frame: usize,
        channel: usize,
        value: f32,
    },
}

/// Processing time breakdown
#[derive(Debug, Clone, Copy, Default)]
pub struct Timings {
    pub collect_us: u64,
    pub hold_us: u64,
    pub cluster_us: u64,
    pub smooth_us: u64,
    pub total_us: u64,
}

/// Result from the processing pipeline
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Final smoothed viseme track
    pub sequence: FrameSequence,
    /// Per-block dominant selection (empty under tempo-adaptive depth)
    pub blocks: Vec<BlockSummary>,
    /// Smoothing depth actually used
    pub interpolation_frames: usize,
    /// Tempo measurement, when the depth followed it
    pub tempo: Option<TempoEstimate>,
    /// What the hold filter removed
    pub hold: HoldStats,
    /// Processing timings
    pub timings: Timings,
}

/// The viseme post-processing pipeline.
///
/// Holds only validated settings and tables; every call to [`Pipeline::process`]
/// starts from a clean smoothing window.
pub struct Pipeline {
    config: Config,
    classification: VisemeClassification,
    priority: VisemePriority,
    frame_duration_secs: f32,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        config.validate()?;
        let classification = config.tables.classification()?;
        let priority = config.tables.priority()?;
        let settings = &config.interpolation;

        tracing::info!("Initializing VisemeFlow pipeline");
        tracing::info!("  Depth policy: {}", config.depth_policy.display_name());
        tracing::info!(
            "  Interpolation: {} ({} frames, consonant lock {})",
            if settings.enable_interpolation { "on" } else { "off" },
            settings.interpolation_frames(),
            if settings.strict_consonant_lock { "on" } else { "off" }
        );
        tracing::info!("  Min hold: {} frames", settings.min_hold_frames);

        Ok(Self {
            config: config.clone(),
            classification,
            priority,
            frame_duration_secs: config.audio.chunk_ms as f32 / 1000.0,
        })
    }

    /// Replace the classification table
    pub fn with_classification(mut self, classification: VisemeClassification) -> Self {
        self.classification = classification;
        self
    }

    /// Replace the priority table
    pub fn with_priority(mut self, priority: VisemePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Run all stages over one utterance of raw frames
    pub fn process(&self, frames: Vec<RawFrame>) -> Result<PipelineResult, PipelineError> {
        let total_start = Instant::now();
        let settings = &self.config.interpolation;
        let base_depth = settings.interpolation_frames();

        if frames.is_empty() {
            tracing::debug!("Empty utterance, nothing to smooth");
            return Ok(PipelineResult {
                sequence: SequenceEmitter::new(0, self.frame_duration_secs).finish(),
                blocks: Vec::new(),
                interpolation_frames: base_depth,
                tempo: None,
                hold: HoldStats::default(),
                timings: Timings::default(),
            });
        }

        check_frames(&frames)?;
        let frame_count = frames.len();

        // Stage 1: hold filter
        let hold_start = Instant::now();
        let (frames, hold) = filter_short_holds(frames, settings.min_hold_frames);
        let hold_us = elapsed_us(hold_start);
        tracing::debug!(
            "Hold filter: {} short runs zeroed ({} values) in {}us",
            hold.runs_zeroed,
            hold.values_zeroed,
            hold_us
        );

        // Stage 2: block clustering, or a tempo-derived depth instead
        let cluster_start = Instant::now();
        let (frames, blocks, depth, tempo) = match self.config.depth_policy {
            DepthPolicy::Fixed => {
                let (frames, blocks) = cluster_blocks(frames, base_depth, &self.priority);
                let silent = blocks.iter().filter(|b| !b.is_voiced()).count();
                tracing::debug!(
                    "Clustering: {} blocks of {} frames, {} without a dominant viseme",
                    blocks.len(),
                    base_depth,
                    silent
                );
                (frames, blocks, base_depth, None)
            }
            DepthPolicy::TempoAdaptive => {
                let estimate = estimate_tempo(&frames);
                let depth = estimate.depth_for(base_depth);
                tracing::debug!(
                    "Tempo: {:?} (avg {:.2} active frames), depth {} -> {}",
                    estimate.tempo,
                    estimate.average_active_frames,
                    base_depth,
                    depth
                );
                (frames, Vec::new(), depth, Some(estimate))
            }
        };
        let cluster_us = elapsed_us(cluster_start);

        // Stage 3: temporal smoothing
        let smooth_start = Instant::now();
        let mut smoother = TemporalSmoother::new(depth, settings, &self.classification);
        let sequence = smooth_frames(frames, &mut smoother, self.frame_duration_secs);
        let smooth_us = elapsed_us(smooth_start);
        tracing::debug!("Smoothing: depth {} in {}us", depth, smooth_us);

        let total_us = elapsed_us(total_start);
        tracing::info!(
            "Processed {} frames x {} visemes in {}us",
            frame_count,
            sequence.viseme_count(),
            total_us
        );

        Ok(PipelineResult {
            sequence,
            blocks,
            interpolation_frames: depth,
            tempo,
            hold,
            timings: Timings {
                collect_us: 0,
                hold_us,
                cluster_us,
                smooth_us,
                total_us,
            },
        })
    }

    /// Decode WAV bytes, classify every chunk and post-process the frames
    pub fn cook(
        &self,
        wav: &[u8],
        oracle: &mut dyn VisemeOracle,
    ) -> Result<PipelineResult, PipelineError> {
        let start = Instant::now();
        let audio = load_wav_bytes(wav, self.config.audio.fallback_on_bad_header)?;
        tracing::info!(
            "Cooking {:.2}s of audio ({} Hz, {} ch) with the {} oracle",
            audio.duration_secs(),
            audio.sample_rate,
            audio.channels,
            oracle.name()
        );

        let audio_options = &self.config.audio;
        let frames = FrameCollector::new(oracle, audio_options.chunk_ms, audio_options.buffer_size)
            .collect(&audio)?;
        let collect_us = elapsed_us(start);

        let mut result = self.process(frames)?;
        result.timings.collect_us = collect_us;
        result.timings.total_us = elapsed_us(start);
        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            config: Config::default(),
            classification: VisemeClassification::ovr_default(),
            priority: VisemePriority::ovr_default(),
            frame_duration_secs: DEFAULT_FRAME_DURATION_SECS,
        }
    }
}

/// Every frame must match the width of the first and hold weights in [0, 1]
fn check_frames(frames: &[RawFrame]) -> Result<(), PipelineError> {
    let expected = frames.first().map_or(0, RawFrame::width);
    for (frame, raw) in frames.iter().enumerate() {
        if raw.width() != expected {
            return Err(PipelineError::InconsistentFrameWidth {
                frame,
                expected,
                found: raw.width(),
            });
        }
        if let Some((channel, value)) = raw.out_of_range() {
            return Err(PipelineError::WeightOutOfRange {
                frame,
                channel,
                value,
            });
        }
    }
    Ok(())
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

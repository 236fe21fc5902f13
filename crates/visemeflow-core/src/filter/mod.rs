//! Viseme post-processing stages
//!
//! The pipeline runs these in order over a whole utterance:
//! 1. Hold filter - drop activations shorter than `min_hold_frames`
//! 2. Block clustering - one dominant, peak-normalized viseme per block
//! 3. Temporal smoothing - decaying weighted average over earlier frames
//!
//! Stages take the frame buffer by value and hand it back, so each one can
//! be run and tested on its own. Tempo estimation is an alternative way of
//! choosing the smoothing depth and replaces block clustering when enabled.

mod cluster;
mod hold;
mod smooth;
mod tempo;

pub use cluster::{cluster_blocks, summarize_blocks, BlockSummary, PEAK_EPSILON};
pub use hold::{filter_short_holds, HoldStats};
pub use smooth::{smooth_frames, window_weight, TemporalSmoother};
pub use tempo::{adaptive_depth, estimate_tempo, Tempo, TempoEstimate};

/// Upper bound for block size and smoothing depth
pub const MAX_INTERPOLATION_FRAMES: usize = 24;

/// A channel is active in a frame when its weight exceeds this
pub const ACTIVE_THRESHOLD: f32 = 0.5;

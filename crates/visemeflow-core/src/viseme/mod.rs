//! Viseme data model
//!
//! Frames flow through the pipeline as owned `Vec<RawFrame>` buffers and
//! leave it as an immutable [`FrameSequence`]. The channel tables decide how
//! individual channels are treated by the clustering and smoothing stages.

mod frame;
mod tables;

pub use frame::{FrameSequence, RawFrame, SequenceEmitter, DEFAULT_FRAME_DURATION_SECS};
pub use tables::{
    resolve_channel, viseme_name, VisemeClass, VisemeClassification, VisemePriority,
    OVR_VISEME_COUNT, OVR_VISEME_NAMES,
};

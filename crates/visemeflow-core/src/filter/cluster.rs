//! Block clustering and rescaling
//!
//! Splits the utterance into fixed-size blocks, picks one dominant viseme per
//! block by priority-weighted energy and normalizes its peak to 1.0. All other
//! channels are cleared, except that a neighboring block's dominant viseme is
//! left in place (unscaled) in the half of the block facing that neighbor.
//! The result is a near-binary mouth-shape track with a soft crossfade at
//! each block boundary.

use serde::Serialize;

use crate::viseme::{RawFrame, VisemePriority};

/// Peaks at or below this are treated as silence
pub const PEAK_EPSILON: f32 = 1e-4;

/// Selection result for one block
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockSummary {
    /// Index of the first frame in the block
    pub start: usize,
    /// Frames in the block (the last block may be short)
    pub len: usize,
    /// Dominant channel, or `None` when no channel carries any energy
    pub dominant: Option<usize>,
    /// Largest raw value of the dominant channel within the block
    pub peak: f32,
}

impl BlockSummary {
    /// True when the block is rescaled rather than cleared
    pub fn is_voiced(&self) -> bool {
        self.dominant.is_some() && self.peak > PEAK_EPSILON
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Choose the dominant channel and peak for every block
pub fn summarize_blocks(
    frames: &[RawFrame],
    block_size: usize,
    priority: &VisemePriority,
) -> Vec<BlockSummary> {
    let block_size = block_size.max(1);
    let width = frames.first().map_or(0, RawFrame::width);

    frames
        .chunks(block_size)
        .enumerate()
        .map(|(index, block)| {
            let dominant = dominant_channel(block, width, priority);
            let peak = dominant.map_or(0.0, |channel| {
                block
                    .iter()
                    .map(|frame| frame.visemes[channel])
                    .fold(0.0f32, f32::max)
            });

            BlockSummary {
                start: index * block_size,
                len: block.len(),
                dominant,
                peak,
            }
        })
        .collect()
}

/// Channel with the strictly greatest priority-weighted sum.
///
/// Ties keep the lowest index; a block with no positive sum has no dominant.
fn dominant_channel(block: &[RawFrame], width: usize, priority: &VisemePriority) -> Option<usize> {
    let mut dominant = None;
    let mut max_sum = 0.0f32;

    for channel in 0..width {
        let sum: f32 = block.iter().map(|frame| frame.visemes[channel]).sum();
        let weighted = sum * priority.weight(channel);

        if weighted > max_sum {
            max_sum = weighted;
            dominant = Some(channel);
        }
    }

    dominant
}

/// Rescale each block around its dominant viseme.
///
/// Returns the rewritten frames together with the per-block selection.
pub fn cluster_blocks(
    mut frames: Vec<RawFrame>,
    block_size: usize,
    priority: &VisemePriority,
) -> (Vec<RawFrame>, Vec<BlockSummary>) {
    let block_size = block_size.max(1);
    let blocks = summarize_blocks(&frames, block_size, priority);
    let half = block_size / 2;

    for (index, block) in blocks.iter().enumerate() {
        let block_frames = &mut frames[block.range()];

        let Some(dominant) = block.dominant.filter(|_| block.peak > PEAK_EPSILON) else {
            // Silence
            for frame in block_frames {
                frame.visemes.fill(0.0);
            }
            continue;
        };

        let scale = 1.0 / block.peak;
        let previous = index
            .checked_sub(1)
            .and_then(|i| blocks[i].dominant);
        let next = blocks.get(index + 1).and_then(|b| b.dominant);

        for (local, frame) in block_frames.iter_mut().enumerate() {
            let bleed = if local < half { previous } else { next };

            for (channel, value) in frame.visemes.iter_mut().enumerate() {
                if channel == dominant {
                    *value = (*value * scale).clamp(0.0, 1.0);
                } else if bleed != Some(channel) {
                    *value = 0.0;
                }
            }
        }
    }

    (frames, blocks)
}

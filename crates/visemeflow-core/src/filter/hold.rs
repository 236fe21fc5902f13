//! Hold-length filter
//!
//! Removes classifier jitter: an activation that does not stay above
//! [`ACTIVE_THRESHOLD`] for at least `min_hold_frames` consecutive frames is
//! zeroed for its whole run. Longer runs keep their continuous values.

use super::ACTIVE_THRESHOLD;
use crate::viseme::RawFrame;

/// What the hold filter removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldStats {
    /// Active runs that were too short
    pub runs_zeroed: usize,
    /// Channel values set to zero across all such runs
    pub values_zeroed: usize,
}

/// Zero every active run shorter than `min_hold_frames`, channel by channel.
///
/// A run still active on the last frame is measured up to the end of the
/// buffer and filtered like any other.
pub fn filter_short_holds(
    mut frames: Vec<RawFrame>,
    min_hold_frames: usize,
) -> (Vec<RawFrame>, HoldStats) {
    let mut stats = HoldStats::default();

    // Every run is at least one frame long
    if min_hold_frames <= 1 {
        return (frames, stats);
    }

    let width = frames.first().map_or(0, RawFrame::width);

    for channel in 0..width {
        let mut run_start: Option<usize> = None;

        // One step past the end closes a trailing run
        for f in 0..=frames.len() {
            let active = frames
                .get(f)
                .is_some_and(|frame| frame.visemes[channel] > ACTIVE_THRESHOLD);

            match (active, run_start) {
                (true, None) => run_start = Some(f),
                (false, Some(start)) => {
                    if f - start < min_hold_frames {
                        for frame in &mut frames[start..f] {
                            frame.visemes[channel] = 0.0;
                        }
                        stats.runs_zeroed += 1;
                        stats.values_zeroed += f - start;
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
    }

    (frames, stats)
}

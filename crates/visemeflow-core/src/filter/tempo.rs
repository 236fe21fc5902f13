//! Tempo-adaptive smoothing depth
//!
//! Fast speech gets a shallower window so short visemes are not smeared
//! away; slow speech gets the full window.

use super::ACTIVE_THRESHOLD;
use crate::viseme::RawFrame;

/// Average active frames per channel below which speech counts as fast
const FAST_TEMPO_FRAMES: f32 = 6.0;

/// Average active frames per channel above which speech counts as slow
const SLOW_TEMPO_FRAMES: f32 = 9.0;

const FAST_DEPTH_SCALE: f32 = 0.5;
const SLOW_DEPTH_SCALE: f32 = 1.5;

/// Speech-rate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tempo {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl Tempo {
    /// Multiplier applied to the configured depth
    pub fn depth_scale(&self) -> f32 {
        match self {
            Tempo::Fast => FAST_DEPTH_SCALE,
            Tempo::Normal => 1.0,
            Tempo::Slow => SLOW_DEPTH_SCALE,
        }
    }
}

/// Tempo measurement for one utterance
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TempoEstimate {
    /// Mean over channels of the number of frames where the channel is active
    pub average_active_frames: f32,
    pub tempo: Tempo,
}

impl TempoEstimate {
    /// Scale `base_depth` for this tempo, staying within `1..=base_depth`
    pub fn depth_for(&self, base_depth: usize) -> usize {
        let base_depth = base_depth.max(1);
        let scaled = (base_depth as f32 * self.tempo.depth_scale()).round() as usize;
        scaled.clamp(1, base_depth)
    }
}

/// Measure speech tempo from per-channel activation counts
pub fn estimate_tempo(frames: &[RawFrame]) -> TempoEstimate {
    let width = frames.first().map_or(0, RawFrame::width);
    if width == 0 {
        return TempoEstimate::default();
    }

    let total_active: usize = (0..width)
        .map(|channel| {
            frames
                .iter()
                .filter(|frame| frame.visemes[channel] > ACTIVE_THRESHOLD)
                .count()
        })
        .sum();
    let average_active_frames = total_active as f32 / width as f32;

    let tempo = if average_active_frames < FAST_TEMPO_FRAMES {
        Tempo::Fast
    } else if average_active_frames > SLOW_TEMPO_FRAMES {
        Tempo::Slow
    } else {
        Tempo::Normal
    };

    TempoEstimate {
        average_active_frames,
        tempo,
    }
}

/// Smoothing depth for this utterance, within `1..=base_depth`
pub fn adaptive_depth(frames: &[RawFrame], base_depth: usize) -> usize {
    estimate_tempo(frames).depth_for(base_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One channel active for `active` frames out of `total`
    fn utterance(active: usize, total: usize) -> Vec<RawFrame> {
        (0..total)
            .map(|i| RawFrame::new(vec![if i < active { 0.9 } else { 0.1 }], 0.0))
            .collect()
    }

    #[test]
    fn test_fast_speech_halves_depth() {
        let frames = utterance(3, 50);
        let estimate = estimate_tempo(&frames);
        assert_eq!(estimate.tempo, Tempo::Fast);
        assert_eq!(estimate.average_active_frames, 3.0);
        assert_eq!(adaptive_depth(&frames, 6), 3);
    }

    #[test]
    fn test_normal_speech_keeps_depth() {
        let frames = utterance(7, 50);
        assert_eq!(estimate_tempo(&frames).tempo, Tempo::Normal);
        assert_eq!(adaptive_depth(&frames, 6), 6);
    }

    #[test]
    fn test_slow_speech_capped_at_base() {
        let frames = utterance(20, 50);
        assert_eq!(estimate_tempo(&frames).tempo, Tempo::Slow);
        assert_eq!(adaptive_depth(&frames, 6), 6);
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        assert_eq!(estimate_tempo(&utterance(6, 20)).tempo, Tempo::Normal);
        assert_eq!(estimate_tempo(&utterance(9, 20)).tempo, Tempo::Normal);
    }

    #[test]
    fn test_average_over_all_channels() {
        // Channel 0 active for 12 frames, channel 1 never: average 6
        let frames: Vec<RawFrame> = (0..12).map(|_| RawFrame::new(vec![0.9, 0.0], 0.0)).collect();
        let estimate = estimate_tempo(&frames);
        assert_eq!(estimate.average_active_frames, 6.0);
        assert_eq!(estimate.tempo, Tempo::Normal);
    }

    #[test]
    fn test_depth_never_below_one() {
        let frames = utterance(0, 10);
        assert_eq!(adaptive_depth(&frames, 1), 1);
        assert_eq!(adaptive_depth(&[], 6), 6, "empty input is normal tempo");
    }
}

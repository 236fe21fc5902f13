//! Temporal smoothing
//!
//! Each output frame is a weighted average of the current frame and up to
//! `depth` earlier frames, with weights falling off linearly with age. The
//! look-back window always holds the *unsmoothed* inputs so smoothing never
//! compounds.

use std::collections::VecDeque;

use super::ACTIVE_THRESHOLD;
use crate::config::InterpolationSettings;
use crate::viseme::{FrameSequence, RawFrame, SequenceEmitter, VisemeClassification};

/// Weight of window slot `j` (0 = most recent) for a window of `depth` frames.
///
/// Always in (0, 1) and strictly decreasing in `j` for `j < depth`.
pub fn window_weight(depth: usize, j: usize) -> f32 {
    1.0 - (j + 1) as f32 / (depth + 1) as f32
}

/// Frame-by-frame smoother with a bounded look-back window
#[derive(Debug, Clone)]
pub struct TemporalSmoother<'a> {
    enabled: bool,
    consonant_lock: bool,
    classification: &'a VisemeClassification,
    weights: Vec<f32>,
    window: VecDeque<Vec<f32>>,
}

impl<'a> TemporalSmoother<'a> {
    pub fn new(
        depth: usize,
        settings: &InterpolationSettings,
        classification: &'a VisemeClassification,
    ) -> Self {
        let depth = depth.max(1);
        Self {
            enabled: settings.enable_interpolation,
            consonant_lock: settings.strict_consonant_lock,
            classification,
            weights: (0..depth).map(|j| window_weight(depth, j)).collect(),
            window: VecDeque::with_capacity(depth + 1),
        }
    }

    /// Window depth
    pub fn depth(&self) -> usize {
        self.weights.len()
    }

    /// Frames currently held in the look-back window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Forget all earlier frames
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Smooth one frame and push its raw values into the window
    pub fn smooth(&mut self, current: Vec<f32>) -> Vec<f32> {
        let output = if self.enabled && !self.window.is_empty() {
            current
                .iter()
                .enumerate()
                .map(|(channel, &value)| self.smooth_channel(channel, value))
                .collect()
        } else {
            current.clone()
        };

        self.window.push_front(current);
        self.window.truncate(self.depth());
        output
    }

    fn smooth_channel(&self, channel: usize, current: f32) -> f32 {
        let mut weighted_sum = current;
        let mut total_weight = 1.0f32;

        for (previous, &weight) in self.window.iter().zip(&self.weights) {
            weighted_sum += previous[channel] * weight;
            total_weight += weight;
        }

        let value = weighted_sum / total_weight;

        if self.consonant_lock
            && current > ACTIVE_THRESHOLD
            && self.classification.is_consonant(channel)
        {
            // Pull a deliberate consonant back toward its unsmoothed strength
            (value / current).clamp(0.0, 1.0)
        } else {
            value
        }
    }
}

/// Smooth a whole utterance and emit the final sequence
pub fn smooth_frames(
    frames: Vec<RawFrame>,
    smoother: &mut TemporalSmoother<'_>,
    frame_duration_secs: f32,
) -> FrameSequence {
    let width = frames.first().map_or(0, RawFrame::width);
    let mut emitter = SequenceEmitter::with_capacity(width, frame_duration_secs, frames.len());

    for frame in frames {
        let visemes = smoother.smooth(frame.visemes);
        emitter.push(visemes, frame.laughter);
    }

    emitter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::DEFAULT_FRAME_DURATION_SECS;

    fn settings(enable: bool, lock: bool) -> InterpolationSettings {
        InterpolationSettings {
            enable_interpolation: enable,
            strict_consonant_lock: lock,
            ..Default::default()
        }
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "expected {b}, got {a}");
    }

    #[test]
    fn test_weights_decrease_and_stay_in_range() {
        for depth in 1..=24 {
            let weights: Vec<f32> = (0..depth).map(|j| window_weight(depth, j)).collect();
            assert!(weights.iter().all(|&w| w > 0.0 && w < 1.0));
            assert!(weights.windows(2).all(|w| w[0] > w[1]));
        }
        assert_close(window_weight(6, 0), 6.0 / 7.0);
        assert_close(window_weight(6, 5), 1.0 / 7.0);
    }

    #[test]
    fn test_first_frame_unchanged() {
        let classes = VisemeClassification::ovr_default();
        let mut smoother = TemporalSmoother::new(6, &settings(true, true), &classes);
        let frame = vec![0.3, 0.9, 0.0];
        assert_eq!(smoother.smooth(frame.clone()), frame);
    }

    #[test]
    fn test_disabled_is_identity() {
        let classes = VisemeClassification::ovr_default();
        let mut smoother = TemporalSmoother::new(6, &settings(false, true), &classes);
        for i in 0..20 {
            let frame = vec![(i % 3) as f32 / 3.0, 1.0 - (i % 5) as f32 / 5.0];
            assert_eq!(smoother.smooth(frame.clone()), frame);
        }
    }

    #[test]
    fn test_weighted_average_against_unsmoothed_window() {
        let classes = VisemeClassification::empty();
        let mut smoother = TemporalSmoother::new(2, &settings(true, false), &classes);

        smoother.smooth(vec![1.0]);
        // w0 = 2/3
        let second = smoother.smooth(vec![0.0]);
        assert_close(second[0], (0.0 + 1.0 * (2.0 / 3.0)) / (1.0 + 2.0 / 3.0));

        // Window holds raw [0.0, 1.0], not the smoothed value; w1 = 1/3
        let third = smoother.smooth(vec![0.0]);
        let expected = (0.0 + 0.0 * (2.0 / 3.0) + 1.0 * (1.0 / 3.0)) / (1.0 + 2.0 / 3.0 + 1.0 / 3.0);
        assert_close(third[0], expected);
    }

    #[test]
    fn test_window_truncated_to_depth() {
        let classes = VisemeClassification::empty();
        let mut smoother = TemporalSmoother::new(3, &settings(true, false), &classes);
        for _ in 0..10 {
            smoother.smooth(vec![0.5]);
        }
        assert_eq!(smoother.window_len(), 3);

        smoother.reset();
        assert_eq!(smoother.window_len(), 0);
    }

    #[test]
    fn test_consonant_lock_full_strength_is_noop() {
        let classes = VisemeClassification::ovr_default();
        let mut locked = TemporalSmoother::new(6, &settings(true, true), &classes);
        let mut unlocked = TemporalSmoother::new(6, &settings(true, false), &classes);

        // Channel 1 (PP) is a consonant
        for frame in [vec![0.0, 0.2], vec![0.0, 0.4], vec![0.0, 1.0]] {
            let a = locked.smooth(frame.clone());
            let b = unlocked.smooth(frame);
            assert_close(a[1], b[1]);
        }
    }

    #[test]
    fn test_consonant_lock_rescales_and_clamps() {
        let classes = VisemeClassification::ovr_default();
        let mut locked = TemporalSmoother::new(1, &settings(true, true), &classes);
        let mut unlocked = TemporalSmoother::new(1, &settings(true, false), &classes);

        // Weighted average (0.6 + 0.0 * 0.5) / 1.5 = 0.4 -> 0.4 / 0.6
        locked.smooth(vec![0.0, 0.0]);
        unlocked.smooth(vec![0.0, 0.0]);
        let avg = unlocked.smooth(vec![0.0, 0.6]);
        let corrected = locked.smooth(vec![0.0, 0.6]);
        assert_close(avg[1], 0.4);
        assert_close(corrected[1], 0.4 / 0.6);

        // Average above the current value clamps to 1.0: (0.6 + 1.0 * 0.5) / 1.5 / 0.6 > 1
        locked.reset();
        locked.smooth(vec![0.0, 1.0]);
        let clamped = locked.smooth(vec![0.0, 0.6]);
        assert_close(clamped[1], 1.0);
    }

    #[test]
    fn test_consonant_lock_ignores_vowels_and_weak_values() {
        let classes = VisemeClassification::ovr_default();
        let mut smoother = TemporalSmoother::new(1, &settings(true, true), &classes);
        let width = 15;

        smoother.smooth(vec![0.0; width]);
        let mut frame = vec![0.0; width];
        frame[10] = 0.9; // aa, vowel
        frame[2] = 0.4; // FF, below threshold
        let out = smoother.smooth(frame);

        assert_close(out[10], 0.9 / 1.5);
        assert_close(out[2], 0.4 / 1.5);
    }

    #[test]
    fn test_smooth_frames_keeps_length_and_laughter() {
        let classes = VisemeClassification::ovr_default();
        let mut smoother = TemporalSmoother::new(4, &settings(true, true), &classes);
        let frames: Vec<RawFrame> = (0..25)
            .map(|i| RawFrame::new(vec![(i % 2) as f32, 0.5], i as f32 / 25.0))
            .collect();

        let seq = smooth_frames(frames, &mut smoother, DEFAULT_FRAME_DURATION_SECS);
        assert_eq!(seq.len(), 25);
        for (i, laughter) in seq.laughter_scores().enumerate() {
            assert_eq!(laughter, i as f32 / 25.0);
        }
    }
}

//! Frame containers

use serde::{Deserialize, Serialize};

/// Duration of one frame at the 100 Hz collector cadence
pub const DEFAULT_FRAME_DURATION_SECS: f32 = 0.01;

/// One classifier output: a weight per viseme channel plus a laughter score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Per-channel activation weights in [0, 1]
    pub visemes: Vec<f32>,
    /// Laughter intensity in [0, 1], carried through the pipeline untouched
    #[serde(default)]
    pub laughter: f32,
}

impl RawFrame {
    pub fn new(visemes: Vec<f32>, laughter: f32) -> Self {
        Self { visemes, laughter }
    }

    /// A frame with every channel at zero and no laughter
    pub fn silent(width: usize) -> Self {
        Self::new(vec![0.0; width], 0.0)
    }

    /// Number of viseme channels
    pub fn width(&self) -> usize {
        self.visemes.len()
    }

    /// First channel whose weight is NaN or outside [0, 1]
    pub fn out_of_range(&self) -> Option<(usize, f32)> {
        self.visemes
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(v))
    }
}

/// Finished viseme track handed to the animation consumer.
///
/// Built only by [`SequenceEmitter`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSequence {
    frame_duration_secs: f32,
    viseme_count: usize,
    frames: Vec<RawFrame>,
}

impl FrameSequence {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Channels per frame
    pub fn viseme_count(&self) -> usize {
        self.viseme_count
    }

    /// Seconds covered by a single frame
    pub fn frame_duration_secs(&self) -> f32 {
        self.frame_duration_secs
    }

    /// Total duration in seconds
    pub fn duration_secs(&self) -> f32 {
        self.frames.len() as f32 * self.frame_duration_secs
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&RawFrame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawFrame> {
        self.frames.iter()
    }

    /// Laughter scores in frame order
    pub fn laughter_scores(&self) -> impl Iterator<Item = f32> + '_ {
        self.frames.iter().map(|f| f.laughter)
    }

    /// Frame whose time span covers `time_secs`, if any
    pub fn frame_at(&self, time_secs: f32) -> Option<&RawFrame> {
        if time_secs < 0.0 || self.frame_duration_secs <= 0.0 {
            return None;
        }
        self.frames.get((time_secs / self.frame_duration_secs) as usize)
    }

    /// Give up the sequence and take its frames
    pub fn into_frames(self) -> Vec<RawFrame> {
        self.frames
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a RawFrame;
    type IntoIter = std::slice::Iter<'a, RawFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Accumulates processed frames into a [`FrameSequence`]
#[derive(Debug)]
pub struct SequenceEmitter {
    frame_duration_secs: f32,
    viseme_count: usize,
    frames: Vec<RawFrame>,
}

impl SequenceEmitter {
    pub fn new(viseme_count: usize, frame_duration_secs: f32) -> Self {
        Self {
            frame_duration_secs,
            viseme_count,
            frames: Vec::new(),
        }
    }

    /// Emitter with room reserved for `capacity` frames
    pub fn with_capacity(viseme_count: usize, frame_duration_secs: f32, capacity: usize) -> Self {
        Self {
            frame_duration_secs,
            viseme_count,
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, visemes: Vec<f32>, laughter: f32) {
        debug_assert_eq!(visemes.len(), self.viseme_count);
        self.frames.push(RawFrame::new(visemes, laughter));
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Seal the sequence; no further frames can be added
    pub fn finish(self) -> FrameSequence {
        FrameSequence {
            frame_duration_secs: self.frame_duration_secs,
            viseme_count: self.viseme_count,
            frames: self.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_preserves_order() {
        let mut emitter = SequenceEmitter::new(2, DEFAULT_FRAME_DURATION_SECS);
        emitter.push(vec![1.0, 0.0], 0.1);
        emitter.push(vec![0.0, 1.0], 0.2);
        let seq = emitter.finish();

        assert_eq!(seq.len(), 2);
        assert_eq!(seq.viseme_count(), 2);
        assert_eq!(seq.laughter_scores().collect::<Vec<_>>(), vec![0.1, 0.2]);
        assert_eq!(seq.frames()[1].visemes, vec![0.0, 1.0]);
    }

    #[test]
    fn test_sequence_duration_and_lookup() {
        let mut emitter = SequenceEmitter::new(1, 0.01);
        for i in 0..50 {
            emitter.push(vec![i as f32 / 50.0], 0.0);
        }
        let seq = emitter.finish();

        assert!((seq.duration_secs() - 0.5).abs() < 1e-6);
        let frame = seq.frame_at(0.105).expect("frame in range");
        assert!((frame.visemes[0] - 10.0 / 50.0).abs() < 1e-6);
        assert!(seq.frame_at(0.5).is_none());
        assert!(seq.frame_at(-0.1).is_none());
    }

    #[test]
    fn test_empty_sequence() {
        let seq = SequenceEmitter::new(15, DEFAULT_FRAME_DURATION_SECS).finish();
        assert!(seq.is_empty());
        assert_eq!(seq.duration_secs(), 0.0);
        assert_eq!(seq.viseme_count(), 15);
    }

    #[test]
    fn test_raw_frame_laughter_defaults_to_zero() {
        let frame: RawFrame = serde_json::from_str(r#"{"visemes":[0.5,0.25]}"#).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.laughter, 0.0);
    }

    #[test]
    fn test_sequence_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameSequence>();
    }
}

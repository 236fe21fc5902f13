//! Oracle that replays a fixed frame list, one frame per chunk

use super::{OracleError, OracleFrame, VisemeOracle};
use crate::viseme::RawFrame;

/// Deterministic oracle for tests and frame-file replays.
///
/// Once the script runs out it keeps answering with silent frames.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    frames: Vec<RawFrame>,
    viseme_count: usize,
    prepare_error: Option<String>,
    prepared_rate: Option<u32>,
    calls: usize,
}

impl ScriptedOracle {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        let viseme_count = frames.first().map_or(0, RawFrame::width);
        Self {
            frames,
            viseme_count,
            ..Default::default()
        }
    }

    /// Make `prepare` fail with `message`
    pub fn failing_prepare(mut self, message: impl Into<String>) -> Self {
        self.prepare_error = Some(message.into());
        self
    }

    /// Number of chunks classified so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Sample rate seen by the last successful `prepare`
    pub fn prepared_rate(&self) -> Option<u32> {
        self.prepared_rate
    }
}

impl VisemeOracle for ScriptedOracle {
    fn prepare(&mut self, sample_rate: u32, _buffer_size: usize) -> Result<(), OracleError> {
        if let Some(message) = &self.prepare_error {
            return Err(OracleError::InitFailed(message.clone()));
        }
        self.prepared_rate = Some(sample_rate);
        self.calls = 0;
        Ok(())
    }

    fn process_chunk(&mut self, _chunk: &[i16], _channels: u16) -> OracleFrame {
        let frame = self
            .frames
            .get(self.calls)
            .cloned()
            .unwrap_or_else(|| RawFrame::silent(self.viseme_count));
        self.calls += 1;
        OracleFrame {
            visemes: frame.visemes,
            laughter: frame.laughter,
            frame_delay_ms: 0,
        }
    }

    fn viseme_count(&self) -> usize {
        self.viseme_count
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_goes_silent() {
        let mut oracle = ScriptedOracle::new(vec![
            RawFrame::new(vec![0.1, 0.9], 0.5),
            RawFrame::new(vec![0.8, 0.2], 0.0),
        ]);
        oracle.prepare(16_000, 4096).unwrap();
        assert_eq!(oracle.prepared_rate(), Some(16_000));

        assert_eq!(oracle.process_chunk(&[], 1).visemes, vec![0.1, 0.9]);
        assert_eq!(oracle.process_chunk(&[], 1).visemes, vec![0.8, 0.2]);
        let tail = oracle.process_chunk(&[], 1);
        assert_eq!(tail.visemes, vec![0.0, 0.0]);
        assert_eq!(oracle.calls(), 3);
    }

    #[test]
    fn test_failing_prepare() {
        let mut oracle = ScriptedOracle::new(vec![]).failing_prepare("no model");
        let err = oracle.prepare(16_000, 4096).unwrap_err();
        assert_eq!(err.to_string(), "Oracle failed to initialize: no model");
        assert_eq!(oracle.prepared_rate(), None);
    }
}

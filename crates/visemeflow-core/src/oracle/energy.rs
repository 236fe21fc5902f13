//! Energy-based viseme oracle: RMS loudness drives mouth openness.
//!
//! No model involved, so it is only good for demos and smoke tests. Loud
//! noisy chunks (high zero-crossing rate) map to `SS`, loud voiced chunks
//! to `aa`, everything else to `sil`.

use super::{OracleError, OracleFrame, VisemeOracle};
use crate::viseme::OVR_VISEME_COUNT;

const SIL: usize = 0;
const SS: usize = 7;
const AA: usize = 10;

/// Simple RMS oracle over the 15-channel OVR set
#[derive(Debug, Clone)]
pub struct EnergyOracle {
    silence_rms: f32,
    full_scale_rms: f32,
    fricative_zcr: f32,
}

impl EnergyOracle {
    pub fn new(silence_rms: f32, full_scale_rms: f32, fricative_zcr: f32) -> Self {
        Self {
            silence_rms,
            full_scale_rms,
            fricative_zcr,
        }
    }

    fn openness(&self, rms: f32) -> f32 {
        ((rms - self.silence_rms) / (self.full_scale_rms - self.silence_rms)).clamp(0.0, 1.0)
    }
}

impl Default for EnergyOracle {
    fn default() -> Self {
        Self::new(0.015, 0.3, 0.25)
    }
}

impl VisemeOracle for EnergyOracle {
    fn prepare(&mut self, sample_rate: u32, _buffer_size: usize) -> Result<(), OracleError> {
        if sample_rate == 0 {
            return Err(OracleError::InvalidConfiguration(
                "sample rate must be non-zero".to_string(),
            ));
        }
        if self.full_scale_rms <= self.silence_rms {
            return Err(OracleError::InvalidConfiguration(format!(
                "full-scale RMS {} must exceed silence RMS {}",
                self.full_scale_rms, self.silence_rms
            )));
        }
        Ok(())
    }

    fn process_chunk(&mut self, chunk: &[i16], channels: u16) -> OracleFrame {
        let mono = downmix(chunk, channels);
        let mut visemes = vec![0.0; OVR_VISEME_COUNT];

        let rms = if mono.is_empty() {
            0.0
        } else {
            (mono.iter().map(|s| s * s).sum::<f32>() / mono.len() as f32).sqrt()
        };

        if rms <= self.silence_rms {
            visemes[SIL] = 1.0;
        } else {
            let openness = self.openness(rms);
            let target = if zero_crossing_rate(&mono) > self.fricative_zcr {
                SS
            } else {
                AA
            };
            visemes[target] = openness;
            visemes[SIL] = 1.0 - openness;
        }

        OracleFrame {
            visemes,
            laughter: 0.0,
            frame_delay_ms: 0,
        }
    }

    fn viseme_count(&self) -> usize {
        OVR_VISEME_COUNT
    }

    fn name(&self) -> &str {
        "energy"
    }
}

/// Average interleaved channels into normalized mono
fn downmix(chunk: &[i16], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    chunk
        .chunks_exact(channels)
        .map(|frame| {
            frame.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>() / channels as f32
        })
        .collect()
}

fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::resolve_channel;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin() * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_channel_constants_match_names() {
        assert_eq!(resolve_channel("sil").unwrap(), SIL);
        assert_eq!(resolve_channel("SS").unwrap(), SS);
        assert_eq!(resolve_channel("aa").unwrap(), AA);
    }

    #[test]
    fn test_silence_is_sil() {
        let mut oracle = EnergyOracle::default();
        oracle.prepare(16_000, 4096).unwrap();
        let out = oracle.process_chunk(&[0; 160], 1);
        assert_eq!(out.visemes.len(), OVR_VISEME_COUNT);
        assert_eq!(out.visemes[SIL], 1.0);
        assert_eq!(out.visemes.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_loud_tone_is_open_vowel() {
        let mut oracle = EnergyOracle::default();
        oracle.prepare(16_000, 4096).unwrap();
        let out = oracle.process_chunk(&sine(220.0, 0.6, 16_000, 160), 1);
        assert_eq!(out.visemes[AA], 1.0);
        assert_eq!(out.visemes[SIL], 0.0);
    }

    #[test]
    fn test_noisy_chunk_is_fricative() {
        let mut oracle = EnergyOracle::default();
        oracle.prepare(16_000, 4096).unwrap();
        let hiss: Vec<i16> = (0..160).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect();
        let out = oracle.process_chunk(&hiss, 1);
        assert!(out.visemes[SS] > 0.5);
        assert_eq!(out.visemes[AA], 0.0);
    }

    #[test]
    fn test_stereo_downmix() {
        // Opposite-phase channels cancel to silence
        let chunk: Vec<i16> = (0..320).map(|i| if i % 2 == 0 { 10_000 } else { -10_000 }).collect();
        let mut oracle = EnergyOracle::default();
        oracle.prepare(16_000, 4096).unwrap();
        assert_eq!(oracle.process_chunk(&chunk, 2).visemes[SIL], 1.0);
    }

    #[test]
    fn test_prepare_rejects_bad_configuration() {
        assert!(EnergyOracle::default().prepare(0, 4096).is_err());
        assert!(EnergyOracle::new(0.5, 0.1, 0.25).prepare(16_000, 4096).is_err());
    }
}

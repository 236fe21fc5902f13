//! WAV loading into interleaved 16-bit PCM

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

/// Inputs this short cannot hold a header plus any audio
pub const MIN_WAV_BYTES: usize = 44;

/// Header size assumed when falling back to default parameters
pub const FALLBACK_HEADER_SIZE: usize = 44;

const FALLBACK_SAMPLE_RATE: u32 = 44_100;
const FALLBACK_CHANNELS: u16 = 2;

/// Audio rejected before the pipeline starts
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Audio buffer too short: {len} bytes (need more than 44)")]
    TooShort { len: usize },

    #[error("Invalid WAV header: {0}")]
    InvalidHeader(String),

    #[error("Invalid audio parameters: {channels} channel(s) at {sample_rate} Hz")]
    InvalidParameters { channels: u16, sample_rate: u32 },

    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),
}

/// Decoded audio, samples interleaved by channel
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmAudio {
    /// Validate parameters and wrap interleaved samples
    pub fn new(samples: Vec<i16>, channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        if channels == 0 || sample_rate == 0 {
            return Err(AudioError::InvalidParameters {
                channels,
                sample_rate,
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Samples per channel in one chunk of `chunk_ms`
    pub fn chunk_frames(&self, chunk_ms: u32) -> usize {
        (u64::from(self.sample_rate) * u64::from(chunk_ms) / 1000) as usize
    }

    /// Complete interleaved chunks of `chunk_ms` each; a trailing partial chunk is dropped
    pub fn chunks(&self, chunk_ms: u32) -> Result<std::slice::ChunksExact<'_, i16>, AudioError> {
        let chunk_frames = self.chunk_frames(chunk_ms);
        if chunk_frames == 0 {
            return Err(AudioError::InvalidParameters {
                channels: self.channels,
                sample_rate: self.sample_rate,
            });
        }
        Ok(self
            .samples
            .chunks_exact(chunk_frames * usize::from(self.channels)))
    }
}

/// Decode a WAV file held in memory.
///
/// With `fallback_on_bad_header`, bytes whose header cannot be parsed are
/// read as 16-bit stereo at 44.1kHz after a 44-byte header.
pub fn load_wav_bytes(bytes: &[u8], fallback_on_bad_header: bool) -> Result<PcmAudio, AudioError> {
    if bytes.len() <= MIN_WAV_BYTES {
        return Err(AudioError::TooShort { len: bytes.len() });
    }

    let reader = match WavReader::new(Cursor::new(bytes)) {
        Ok(reader) => reader,
        Err(e) if fallback_on_bad_header => {
            tracing::warn!(
                "WAV header unreadable ({}), assuming {} Hz {}-channel 16-bit PCM",
                e,
                FALLBACK_SAMPLE_RATE,
                FALLBACK_CHANNELS
            );
            return Ok(raw_pcm16(&bytes[FALLBACK_HEADER_SIZE..]));
        }
        Err(e) => return Err(AudioError::InvalidHeader(e.to_string())),
    };

    let spec = reader.spec();
    tracing::debug!(
        "WAV: {} Hz, {} channel(s), {} bits {:?}",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples: Vec<i16> = match spec.sample_format {
        SampleFormat::Int => {
            let bits = u32::from(spec.bits_per_sample);
            if bits == 0 || bits > 32 {
                return Err(AudioError::UnsupportedFormat(format!("{bits}-bit integer PCM")));
            }
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| to_i16(s, bits)))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::InvalidHeader(e.to_string()))?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::InvalidHeader(e.to_string()))?,
    };

    PcmAudio::new(samples, spec.channels, spec.sample_rate)
}

/// Rescale an integer sample of `bits` width to 16 bits
fn to_i16(sample: i32, bits: u32) -> i16 {
    if bits > 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}

fn raw_pcm16(payload: &[u8]) -> PcmAudio {
    let samples = payload
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    PcmAudio {
        samples,
        channels: FALLBACK_CHANNELS,
        sample_rate: FALLBACK_SAMPLE_RATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_too_short_rejected() {
        assert!(matches!(
            load_wav_bytes(&[0u8; 44], false),
            Err(AudioError::TooShort { len: 44 })
        ));
        assert!(matches!(
            load_wav_bytes(&[], true),
            Err(AudioError::TooShort { len: 0 })
        ));
    }

    #[test]
    fn test_garbage_header_rejected() {
        let bytes = vec![7u8; 200];
        assert!(matches!(
            load_wav_bytes(&bytes, false),
            Err(AudioError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_garbage_header_fallback() {
        let mut bytes = vec![0u8; 44];
        for s in [100i16, -100, 200, -200] {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let audio = load_wav_bytes(&bytes, true).unwrap();
        assert_eq!(audio.sample_rate, 44_100);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.samples, vec![100, -100, 200, -200]);
    }

    #[test]
    fn test_load_mono_wav() {
        let samples: Vec<i16> = (0..1600).map(|i| (i % 100) as i16).collect();
        let audio = load_wav_bytes(&wav_bytes(1, 16_000, &samples), false).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples, samples);
        assert!((audio.duration_secs() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_chunks_are_interleaved_and_complete() {
        // 48kHz stereo, 25ms: two full 10ms chunks and a dropped half chunk
        let samples = vec![0i16; 48 * 25 * 2];
        let audio = PcmAudio::new(samples, 2, 48_000).unwrap();
        assert_eq!(audio.chunk_frames(10), 480);

        let chunks: Vec<_> = audio.chunks(10).unwrap().collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 960));
    }

    #[test]
    fn test_zero_length_chunk_rejected() {
        let audio = PcmAudio::new(vec![0; 10], 1, 50).unwrap();
        assert!(audio.chunks(10).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            PcmAudio::new(vec![], 0, 16_000),
            Err(AudioError::InvalidParameters { channels: 0, .. })
        ));
        assert!(matches!(
            PcmAudio::new(vec![], 1, 0),
            Err(AudioError::InvalidParameters { sample_rate: 0, .. })
        ));
    }

    #[test]
    fn test_bit_depth_rescale() {
        assert_eq!(to_i16(1 << 22, 24), 1 << 14);
        assert_eq!(to_i16(-128, 8), i16::MIN);
        assert_eq!(to_i16(1234, 16), 1234);
    }
}

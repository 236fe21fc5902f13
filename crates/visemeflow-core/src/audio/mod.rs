//! Audio input: WAV decoding and fixed-cadence chunking

mod wav;

pub use wav::{load_wav_bytes, AudioError, PcmAudio, FALLBACK_HEADER_SIZE, MIN_WAV_BYTES};

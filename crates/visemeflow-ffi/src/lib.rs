//! C FFI bindings for VisemeFlow - for game engine / host integration
//!
//! Build: cargo build --release -p visemeflow-ffi
//! This generates a dylib/staticlib exposing `visemeflow_*` functions.
//! Every call is self-contained: the host passes audio or frames in and gets
//! an owned result back, which it must release with `visemeflow_free_result`.

use std::ffi::{c_char, c_void, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use visemeflow_core::{
    Config, DepthPolicy, EnergyOracle, OracleError, OracleFrame, Pipeline, PipelineResult,
    RawFrame, VisemeOracle,
};

/// Smoothing settings passed by value from the host
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VisemeFlowSettings {
    pub enable_interpolation: bool,
    /// Block size and smoothing depth, clamped to 1..=24
    pub max_interpolation_frames: u32,
    pub strict_consonant_lock: bool,
    /// Must be at least 1
    pub min_hold_frames: u32,
    /// Choose the smoothing depth from speech tempo and skip block clustering
    pub tempo_adaptive: bool,
}

impl VisemeFlowSettings {
    fn to_config(self) -> Config {
        let mut config = Config::default();
        config.interpolation.enable_interpolation = self.enable_interpolation;
        config.interpolation.max_interpolation_frames = self.max_interpolation_frames;
        config.interpolation.strict_consonant_lock = self.strict_consonant_lock;
        config.interpolation.min_hold_frames = self.min_hold_frames as usize;
        if self.tempo_adaptive {
            config.depth_policy = DepthPolicy::TempoAdaptive;
        }
        config
    }
}

impl Default for VisemeFlowSettings {
    fn default() -> Self {
        let defaults = Config::default();
        Self {
            enable_interpolation: defaults.interpolation.enable_interpolation,
            max_interpolation_frames: defaults.interpolation.max_interpolation_frames,
            strict_consonant_lock: defaults.interpolation.strict_consonant_lock,
            min_hold_frames: defaults.interpolation.min_hold_frames as u32,
            tempo_adaptive: defaults.depth_policy == DepthPolicy::TempoAdaptive,
        }
    }
}

/// Prepare callback: return false to abort before any chunk is classified
pub type PrepareFn =
    unsafe extern "C" fn(user_data: *mut c_void, sample_rate: u32, buffer_size: usize) -> bool;

/// Classify one chunk of interleaved PCM.
///
/// Writes `viseme_count` weights to `visemes_out` and one laughter score to
/// `laughter_out`. Returning false yields a silent frame. Weights outside
/// [0, 1] fail the whole call.
pub type ProcessFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    samples: *const i16,
    sample_count: usize,
    channels: u16,
    visemes_out: *mut f32,
    laughter_out: *mut f32,
) -> bool;

/// Host-provided classifier
#[repr(C)]
pub struct VisemeFlowOracle {
    pub user_data: *mut c_void,
    pub viseme_count: usize,
    /// Optional
    pub prepare: Option<PrepareFn>,
    pub process: Option<ProcessFn>,
}

/// Adapts the host callbacks to the oracle trait
struct CallbackOracle<'a> {
    callbacks: &'a VisemeFlowOracle,
}

impl VisemeOracle for CallbackOracle<'_> {
    fn prepare(&mut self, sample_rate: u32, buffer_size: usize) -> Result<(), OracleError> {
        if self.callbacks.process.is_none() {
            return Err(OracleError::InvalidConfiguration(
                "process callback is null".to_string(),
            ));
        }
        match self.callbacks.prepare {
            Some(prepare) => {
                // SAFETY: the host guarantees the callback and user_data are valid for this call
                if unsafe { prepare(self.callbacks.user_data, sample_rate, buffer_size) } {
                    Ok(())
                } else {
                    Err(OracleError::InitFailed("host prepare callback failed".to_string()))
                }
            }
            None => Ok(()),
        }
    }

    fn process_chunk(&mut self, chunk: &[i16], channels: u16) -> OracleFrame {
        let mut visemes = vec![0.0f32; self.callbacks.viseme_count];
        let mut laughter = 0.0f32;

        if let Some(process) = self.callbacks.process {
            // SAFETY: both output buffers are sized as the host declared
            let ok = unsafe {
                process(
                    self.callbacks.user_data,
                    chunk.as_ptr(),
                    chunk.len(),
                    channels,
                    visemes.as_mut_ptr(),
                    &mut laughter,
                )
            };
            if !ok {
                tracing::warn!("Host oracle failed on a chunk, emitting a silent frame");
                visemes.fill(0.0);
                laughter = 0.0;
            }
        }

        OracleFrame {
            visemes,
            laughter,
            frame_delay_ms: 0,
        }
    }

    fn viseme_count(&self) -> usize {
        self.callbacks.viseme_count
    }

    fn name(&self) -> &str {
        "host"
    }
}

/// Result struct returned to foreign callers.
///
/// `frames` holds `frame_count * viseme_count` weights, frame-major;
/// `laughter` holds `frame_count` scores. Both are null when empty.
#[repr(C)]
pub struct VisemeFlowResult {
    pub success: bool,
    pub frames: *mut f32,
    pub laughter: *mut f32,
    pub frame_count: usize,
    pub viseme_count: usize,
    pub frame_duration_secs: f32,
    pub error_message: *mut c_char,
    pub total_us: u64,
}

/// Default settings (interpolation on, 6 frames, consonant lock on, hold 2)
#[no_mangle]
pub extern "C" fn visemeflow_default_settings() -> VisemeFlowSettings {
    VisemeFlowSettings::default()
}

/// Cook a WAV file held in memory into a viseme track
///
/// # Safety
/// - wav must point to wav_len bytes
/// - settings may be null for defaults
/// - oracle may be null to use the built-in energy oracle; otherwise its
///   callbacks must stay valid for the duration of the call
#[no_mangle]
pub unsafe extern "C" fn visemeflow_cook(
    wav: *const u8,
    wav_len: usize,
    settings: *const VisemeFlowSettings,
    oracle: *const VisemeFlowOracle,
) -> VisemeFlowResult {
    tracing::debug!("visemeflow_cook called with {} bytes", wav_len);

    if wav.is_null() {
        return error_result("WAV buffer is null");
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        let bytes = std::slice::from_raw_parts(wav, wav_len);
        let config = read_settings(settings).to_config();

        let pipeline = match Pipeline::new(&config) {
            Ok(p) => p,
            Err(e) => return error_result(&e.to_string()),
        };

        let cooked = match oracle.as_ref() {
            Some(callbacks) => pipeline.cook(bytes, &mut CallbackOracle { callbacks }),
            None => pipeline.cook(bytes, &mut EnergyOracle::default()),
        };

        match cooked {
            Ok(result) => success_result(result),
            Err(e) => {
                tracing::debug!("visemeflow_cook failed: {}", e);
                error_result(&e.to_string())
            }
        }
    }));

    result.unwrap_or_else(|e| panic_result("visemeflow_cook", e))
}

/// Post-process frames the host already classified
///
/// # Safety
/// - frames must point to frame_count * viseme_count floats, frame-major
/// - laughter may be null, otherwise it must point to frame_count floats
/// - settings may be null for defaults
#[no_mangle]
pub unsafe extern "C" fn visemeflow_process_frames(
    frames: *const f32,
    frame_count: usize,
    viseme_count: usize,
    laughter: *const f32,
    settings: *const VisemeFlowSettings,
) -> VisemeFlowResult {
    tracing::debug!(
        "visemeflow_process_frames called with {} x {}",
        frame_count,
        viseme_count
    );

    let Some(total) = frame_count.checked_mul(viseme_count) else {
        return error_result("frame buffer size overflows");
    };
    if frames.is_null() && total > 0 {
        return error_result("frame buffer is null");
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        let weights: &[f32] = if total == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(frames, total)
        };
        let scores: Option<&[f32]> = if laughter.is_null() || frame_count == 0 {
            None
        } else {
            Some(std::slice::from_raw_parts(laughter, frame_count))
        };

        let raw: Vec<RawFrame> = (0..frame_count)
            .map(|i| {
                let visemes = weights[i * viseme_count..(i + 1) * viseme_count].to_vec();
                RawFrame::new(visemes, scores.map_or(0.0, |s| s[i]))
            })
            .collect();

        let config = read_settings(settings).to_config();
        match Pipeline::new(&config).and_then(|p| p.process(raw)) {
            Ok(result) => success_result(result),
            Err(e) => error_result(&e.to_string()),
        }
    }));

    result.unwrap_or_else(|e| panic_result("visemeflow_process_frames", e))
}

/// Free a VisemeFlowResult's buffers
///
/// # Safety
/// Only call this once per result
#[no_mangle]
pub unsafe extern "C" fn visemeflow_free_result(result: VisemeFlowResult) {
    if !result.frames.is_null() {
        let len = result.frame_count * result.viseme_count;
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(result.frames, len)));
    }
    if !result.laughter.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
            result.laughter,
            result.frame_count,
        )));
    }
    if !result.error_message.is_null() {
        let _ = CString::from_raw(result.error_message);
    }
}

/// Get the library version
#[no_mangle]
pub extern "C" fn visemeflow_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

unsafe fn read_settings(settings: *const VisemeFlowSettings) -> VisemeFlowSettings {
    settings.as_ref().copied().unwrap_or_default()
}

/// Leak a buffer to the host; empty buffers become null
fn into_raw_buffer(values: Vec<f32>) -> *mut f32 {
    if values.is_empty() {
        return ptr::null_mut();
    }
    Box::into_raw(values.into_boxed_slice()) as *mut f32
}

fn success_result(result: PipelineResult) -> VisemeFlowResult {
    let sequence = result.sequence;
    let frame_count = sequence.len();
    let viseme_count = sequence.viseme_count();
    let frame_duration_secs = sequence.frame_duration_secs();

    let mut weights = Vec::with_capacity(frame_count * viseme_count);
    let mut laughter = Vec::with_capacity(frame_count);
    for frame in sequence.into_frames() {
        weights.extend_from_slice(&frame.visemes);
        laughter.push(frame.laughter);
    }

    VisemeFlowResult {
        success: true,
        frames: into_raw_buffer(weights),
        laughter: into_raw_buffer(laughter),
        frame_count,
        viseme_count,
        frame_duration_secs,
        error_message: ptr::null_mut(),
        total_us: result.timings.total_us,
    }
}

fn error_result(msg: &str) -> VisemeFlowResult {
    VisemeFlowResult {
        success: false,
        frames: ptr::null_mut(),
        laughter: ptr::null_mut(),
        frame_count: 0,
        viseme_count: 0,
        frame_duration_secs: 0.0,
        error_message: CString::new(msg)
            .map(|s| s.into_raw())
            .unwrap_or(ptr::null_mut()),
        total_us: 0,
    }
}

fn panic_result(function: &str, payload: Box<dyn std::any::Any + Send>) -> VisemeFlowResult {
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!("PANIC caught in {}: {}", function, msg);
    error_result(&format!("Internal error: {}", msg))
}

//! C ABI surface
//!
//! A thin handle-based wrapper so hosts and IPC bridges written in other
//! languages can drive the engine. The contract mirrors the in-process
//! API:
//!
//! - `volumod_processor_process` is called from exactly one (audio)
//!   thread at a time.
//! - The command/state entry points are called from exactly one control
//!   thread at a time; they never block the audio thread.
//!
//! All entry points tolerate null handles and report failure through the
//! wire [`Response`] or a non-zero return code instead of crashing.

use crate::effects::{CompressionMode, EqPreset, NoiseReductionMode};
use crate::pipeline::{Controller, EngineState, Processor, ProcessorConfig};
use crate::wire::{Command, CommandType, MeterData, Response, StateInfo};
use std::cell::UnsafeCell;
use tracing::warn;

/// Clean exit
pub const EXIT_OK: i32 = 0;

/// Engine initialization failed
pub const EXIT_INIT_FAILED: i32 = 1;

/// Audio device could not be opened (reported by hosting CLIs)
pub const EXIT_DEVICE_FAILED: i32 = 2;

/// Opaque handle owning a processor and its control handle.
///
/// The two cells are intentionally independent: the audio thread only
/// touches `processor`, control threads only touch `controller`.
pub struct EngineHandle {
    processor: UnsafeCell<Processor>,
    controller: UnsafeCell<Controller>,
}

// SAFETY: the C contract pins `processor` to one thread and `controller`
// to another; the two never alias the same interior data (they
// communicate through the atomics/slots inside SharedControl).
unsafe impl Sync for EngineHandle {}
unsafe impl Send for EngineHandle {}

/// Create a processor. Returns null if the stream format is invalid.
#[no_mangle]
pub extern "C" fn volumod_processor_new(sample_rate: u32, channels: u32) -> *mut EngineHandle {
    let config = ProcessorConfig {
        sample_rate,
        channels: channels as usize,
        ..ProcessorConfig::default()
    };
    match Processor::new(config) {
        Ok((processor, controller)) => Box::into_raw(Box::new(EngineHandle {
            processor: UnsafeCell::new(processor),
            controller: UnsafeCell::new(controller),
        })),
        Err(err) => {
            warn!(%err, "processor construction failed");
            std::ptr::null_mut()
        }
    }
}

/// Process one interleaved block in place.
///
/// # Safety
/// `handle` must be null or a live pointer from `volumod_processor_new`;
/// `samples` must point to `frame_count * channels` valid f32s. Must not
/// be called concurrently with itself on the same handle.
#[no_mangle]
pub unsafe extern "C" fn volumod_processor_process(
    handle: *mut EngineHandle,
    samples: *mut f32,
    frame_count: u32,
    channels: u32,
) {
    if handle.is_null() || samples.is_null() {
        return;
    }
    let len = frame_count as usize * channels as usize;
    let buffer = std::slice::from_raw_parts_mut(samples, len);
    let processor = &mut *(*handle).processor.get();
    processor.process(buffer);
}

/// Execute an encoded wire [`Command`], writing an encoded [`Response`]
/// into `response_buf`. Returns the number of bytes written, or -1 if
/// the buffer was too small.
///
/// # Safety
/// `request` must point to `request_len` valid bytes and `response_buf`
/// to `response_cap` writable bytes. Must not be called concurrently
/// with itself on the same handle.
#[no_mangle]
pub unsafe extern "C" fn volumod_processor_command(
    handle: *mut EngineHandle,
    request: *const u8,
    request_len: usize,
    response_buf: *mut u8,
    response_cap: usize,
) -> isize {
    let response = if handle.is_null() || request.is_null() {
        Response::error("Processor not initialized")
    } else {
        let bytes = std::slice::from_raw_parts(request, request_len);
        let controller = &mut *(*handle).controller.get();
        match Command::decode(bytes) {
            Ok(command) => dispatch_command(controller, &command),
            Err(err) => Response::error(err.to_string()),
        }
    };

    let encoded = response.encode();
    if response_buf.is_null() || encoded.len() > response_cap {
        return -1;
    }
    std::ptr::copy_nonoverlapping(encoded.as_ptr(), response_buf, encoded.len());
    encoded.len() as isize
}

/// C-layout engine state snapshot
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumodState {
    pub is_active: u8,
    pub is_bypassed: u8,
    pub input_db: f32,
    pub output_db: f32,
    pub gain_reduction_db: f32,
    pub frames_processed: u64,
    pub underruns: u64,
}

/// Fill `out` with the current engine state. Returns `EXIT_OK` on
/// success, `EXIT_INIT_FAILED` for a null handle.
///
/// # Safety
/// `out` must be null or point to a writable [`VolumodState`].
#[no_mangle]
pub unsafe extern "C" fn volumod_processor_get_state(
    handle: *const EngineHandle,
    out: *mut VolumodState,
) -> i32 {
    if handle.is_null() || out.is_null() {
        return EXIT_INIT_FAILED;
    }
    let controller = &*(*handle).controller.get();
    let snapshot = controller.snapshot();
    *out = VolumodState {
        is_active: (snapshot.state == EngineState::Active) as u8,
        is_bypassed: snapshot.bypassed as u8,
        input_db: snapshot.input_level_db,
        output_db: snapshot.output_level_db,
        gain_reduction_db: snapshot.gain_reduction_db,
        frames_processed: snapshot.frames_processed,
        underruns: snapshot.underruns,
    };
    EXIT_OK
}

/// Destroy a processor handle. Null is tolerated.
///
/// # Safety
/// `handle` must be null or a pointer from `volumod_processor_new` that
/// has not already been destroyed; no other thread may still use it.
#[no_mangle]
pub unsafe extern "C" fn volumod_processor_destroy(handle: *mut EngineHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Map a decoded command onto the control surface
pub(crate) fn dispatch_command(controller: &mut Controller, command: &Command) -> Response {
    let cmd_type = match CommandType::try_from(command.cmd_type) {
        Ok(cmd_type) => cmd_type,
        Err(err) => return Response::error(err.to_string()),
    };

    match cmd_type {
        CommandType::SetBypass => controller.set_bypass(command.param_int != 0),
        CommandType::SetPreset => {
            let preset = EqPreset::from_str(&command.param_string)
                .or_else(|| EqPreset::from_index(command.param_int));
            match preset {
                Some(preset) => controller.set_eq_preset(preset),
                None => {
                    return Response::error(format!(
                        "Unknown EQ preset: {:?}",
                        command.param_string
                    ))
                }
            }
        }
        CommandType::SetNormalizerTarget => {
            controller.set_normalizer_target(command.param_float)
        }
        CommandType::SetCompressionMode => {
            let mode = CompressionMode::from_index(command.param_int)
                .or_else(|| CompressionMode::from_str(&command.param_string));
            match mode {
                Some(mode) => controller.set_compression_mode(mode),
                None => {
                    return Response::error(format!(
                        "Unknown compression mode: {}",
                        command.param_int
                    ))
                }
            }
        }
        CommandType::SetNoiseMode => {
            let mode = NoiseReductionMode::from_index(command.param_int)
                .or_else(|| NoiseReductionMode::from_str(&command.param_string));
            match mode {
                Some(mode) => controller.set_noise_reduction_mode(mode),
                None => {
                    return Response::error(format!(
                        "Unknown noise mode: {}",
                        command.param_int
                    ))
                }
            }
        }
        CommandType::SetEqBand => {
            controller.set_eq_band(command.param_int.max(0) as usize, command.param_float)
        }
        CommandType::StartNoiseLearn => controller.start_noise_learning(),
        CommandType::StopNoiseLearn => controller.stop_noise_learning(),
        CommandType::Reset => controller.reset(),
        CommandType::GetState => {}
        CommandType::GetLevels => {
            let snapshot = controller.snapshot();
            let meters = MeterData {
                input_peak_db: snapshot.input_peak_db,
                input_rms_db: snapshot.input_level_db,
                output_peak_db: snapshot.output_peak_db,
                output_rms_db: snapshot.output_level_db,
                gain_reduction: snapshot.gain_reduction_db,
                timestamp_ms: 0,
            };
            let mut response = Response::ok(state_info(controller));
            response.data = meters.encode();
            return response;
        }
    }

    Response::ok(state_info(controller))
}

fn state_info(controller: &Controller) -> StateInfo {
    let snapshot = controller.snapshot();
    StateInfo {
        is_active: snapshot.state == EngineState::Active,
        is_bypassed: snapshot.bypassed,
        input_db: snapshot.input_level_db,
        output_db: snapshot.output_level_db,
        gain_reduction_db: snapshot.gain_reduction_db,
        preset_name: snapshot.eq_preset.name().to_string(),
    }
}

//! Lock-free control plane
//!
//! Parameters flow from control threads to the audio thread through two
//! primitives, neither of which ever blocks the audio thread:
//!
//! - **Scalar parameters** (bypass, enables, target level, mode enums,
//!   individual EQ band gains) live in plain atomics, stored by the
//!   [`Controller`] and sampled once per block by the processor.
//! - **Composite parameters** (a whole EQ curve, a full compressor
//!   settings struct, a reset request) travel through single-producer/
//!   single-consumer [`ParamSlot`]s. A slot holds at most one pending
//!   update per command kind; publishing a new update of the same kind
//!   overwrites the unconsumed older one, so the queue is bounded and
//!   always applies the most recent request.
//!
//! The audio thread drains the slots at the top of every `process` call,
//! before any DSP runs.

use crate::effects::{
    CompressionMode, CompressorSettings, EqPreset, NoiseReductionMode, EQ_BAND_COUNT,
};
use crate::pipeline::meters::EngineMeters;
use crate::pipeline::EngineState;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use volumod_core::math::clamp;
use volumod_loudness::{MAX_TARGET_LUFS, MIN_TARGET_LUFS};

/// Stages of the processing chain, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NoiseReducer = 0,
    Normalizer = 1,
    Compressor = 2,
    Equalizer = 3,
    Limiter = 4,
}

/// Number of chain stages
pub(crate) const STAGE_COUNT: usize = 5;

/// A complete EQ curve applied in one step
#[derive(Debug, Clone, Copy)]
pub(crate) struct EqCurveUpdate {
    pub preset: EqPreset,
    pub gains: [f32; EQ_BAND_COUNT],
}

/// Single-producer/single-consumer parameter slot (seqlock)
///
/// The producer is the single `Controller`; the consumer is the audio
/// thread. The sequence counter is odd while a write is in progress, so
/// the consumer can detect and retry a torn read. The consumer's retry
/// window is bounded by the producer's handful of store instructions.
pub(crate) struct ParamSlot<T> {
    seq: CachePadded<AtomicUsize>,
    pending: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is mediated by the seqlock protocol; T is
// Copy so a retried read never observes a partially-dropped value.
unsafe impl<T: Copy + Send> Sync for ParamSlot<T> {}

impl<T: Copy> ParamSlot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            seq: CachePadded::new(AtomicUsize::new(0)),
            pending: AtomicBool::new(false),
            value: UnsafeCell::new(initial),
        }
    }

    /// Publish an update (producer side). Overwrites any unconsumed
    /// update already in the slot.
    pub fn publish(&self, value: T) {
        let seq = self.seq.load(Ordering::Relaxed);
        // Odd sequence: write in progress
        self.seq.store(seq.wrapping_add(1), Ordering::Release);
        // SAFETY: single producer; concurrent consumer reads are detected
        // through the sequence counter and retried
        unsafe { std::ptr::write_volatile(self.value.get(), value) };
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
        self.pending.store(true, Ordering::Release);
    }

    /// Take the pending update, if any (consumer side)
    pub fn take(&self) -> Option<T> {
        if !self.pending.swap(false, Ordering::Acquire) {
            return None;
        }
        loop {
            let begin = self.seq.load(Ordering::Acquire);
            if begin & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            // SAFETY: a torn read is detected by the sequence check below
            // and retried; T: Copy makes the transient value harmless
            let value = unsafe { std::ptr::read_volatile(self.value.get()) };
            let end = self.seq.load(Ordering::Acquire);
            if begin == end {
                return Some(value);
            }
        }
    }
}

/// State shared between the audio thread and the controller
pub(crate) struct SharedControl {
    pub bypass: AtomicBool,
    pub stage_enabled: [AtomicBool; STAGE_COUNT],
    pub target_lufs: AtomicU32,
    pub compression_mode: AtomicU8,
    pub noise_mode: AtomicU8,
    pub voice_enhance: AtomicBool,
    pub learn_noise: AtomicBool,
    pub eq_band_gains: [AtomicU32; EQ_BAND_COUNT],
    pub eq_output_gain_db: AtomicU32,
    pub eq_preset: AtomicU8,
    pub state: AtomicU8,

    pub eq_curve_slot: ParamSlot<EqCurveUpdate>,
    pub compressor_slot: ParamSlot<CompressorSettings>,
    pub reset_pending: AtomicBool,

    pub meters: EngineMeters,
}

impl SharedControl {
    pub fn new(target_lufs: f32) -> Self {
        Self {
            bypass: AtomicBool::new(false),
            stage_enabled: std::array::from_fn(|_| AtomicBool::new(true)),
            target_lufs: AtomicU32::new(target_lufs.to_bits()),
            compression_mode: AtomicU8::new(CompressionMode::default().index()),
            noise_mode: AtomicU8::new(NoiseReductionMode::default().index()),
            voice_enhance: AtomicBool::new(false),
            learn_noise: AtomicBool::new(false),
            eq_band_gains: std::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
            eq_output_gain_db: AtomicU32::new(0.0_f32.to_bits()),
            eq_preset: AtomicU8::new(EqPreset::default().index()),
            state: AtomicU8::new(EngineState::Idle.index()),
            eq_curve_slot: ParamSlot::new(EqCurveUpdate {
                preset: EqPreset::Flat,
                gains: [0.0; EQ_BAND_COUNT],
            }),
            compressor_slot: ParamSlot::new(CompressorSettings::default()),
            reset_pending: AtomicBool::new(false),
            meters: EngineMeters::new(),
        }
    }
}

/// Best-effort snapshot of engine state for UIs and bridges
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub state: EngineState,
    pub bypassed: bool,
    pub input_level_db: f32,
    pub input_peak_db: f32,
    pub output_level_db: f32,
    pub output_peak_db: f32,
    pub gain_reduction_db: f32,
    pub frames_processed: u64,
    pub underruns: u64,
    pub eq_preset: EqPreset,
}

/// Control-thread handle to a running [`Processor`](crate::Processor)
///
/// Exactly one controller exists per processor (the composite slots are
/// single-producer), which is why the mutating methods take `&mut self`.
/// None of them ever block or allocate on the audio thread's behalf.
pub struct Controller {
    shared: Arc<SharedControl>,
}

impl Controller {
    pub(crate) fn new(shared: Arc<SharedControl>) -> Self {
        Self { shared }
    }

    /// Engage or release bypass
    pub fn set_bypass(&mut self, bypass: bool) {
        self.shared.bypass.store(bypass, Ordering::Relaxed);
        debug!(bypass, "bypass set");
    }

    /// Flip bypass; returns the new state
    pub fn toggle_bypass(&mut self) -> bool {
        let was = self.shared.bypass.fetch_xor(true, Ordering::Relaxed);
        !was
    }

    /// Current bypass state
    pub fn is_bypassed(&self) -> bool {
        self.shared.bypass.load(Ordering::Relaxed)
    }

    /// Set the loudness target (clamped to -60..0 LUFS)
    pub fn set_normalizer_target(&mut self, target_lufs: f32) {
        let clamped = clamp(target_lufs, MIN_TARGET_LUFS, MAX_TARGET_LUFS);
        self.shared
            .target_lufs
            .store(clamped.to_bits(), Ordering::Relaxed);
    }

    /// Select the compressor mode
    pub fn set_compression_mode(&mut self, mode: CompressionMode) {
        self.shared
            .compression_mode
            .store(mode.index(), Ordering::Relaxed);
        debug!(mode = mode.as_str(), "compression mode set");
    }

    /// Apply custom compressor settings (takes effect atomically at the
    /// next block boundary)
    pub fn set_compressor_settings(&mut self, mut settings: CompressorSettings) {
        settings.validate();
        self.shared.compressor_slot.publish(settings);
    }

    /// Select the noise reduction mode
    pub fn set_noise_reduction_mode(&mut self, mode: NoiseReductionMode) {
        self.shared.noise_mode.store(mode.index(), Ordering::Relaxed);
        debug!(mode = mode.as_str(), "noise reduction mode set");
    }

    /// Apply an EQ preset. The whole curve lands in one block boundary,
    /// never half-applied.
    pub fn set_eq_preset(&mut self, preset: EqPreset) {
        let gains = preset.gains();
        self.shared.eq_curve_slot.publish(EqCurveUpdate { preset, gains });
        // Mirror into the scalar gains so per-band reads stay coherent
        for (atomic, gain) in self.shared.eq_band_gains.iter().zip(gains) {
            atomic.store(gain.to_bits(), Ordering::Relaxed);
        }
        self.shared.eq_preset.store(preset.index(), Ordering::Relaxed);
        debug!(preset = preset.name(), "eq preset set");
    }

    /// Set one EQ band gain (clamped to ±24 dB); marks the curve Custom
    pub fn set_eq_band(&mut self, band: usize, gain_db: f32) {
        if let Some(atomic) = self.shared.eq_band_gains.get(band) {
            atomic.store(clamp(gain_db, -24.0, 24.0).to_bits(), Ordering::Relaxed);
            self.shared
                .eq_preset
                .store(EqPreset::Custom.index(), Ordering::Relaxed);
        }
    }

    /// Set the EQ master output gain
    pub fn set_eq_output_gain(&mut self, gain_db: f32) {
        self.shared
            .eq_output_gain_db
            .store(clamp(gain_db, -24.0, 24.0).to_bits(), Ordering::Relaxed);
    }

    /// Toggle the noise reducer's voice-band shaping
    pub fn enable_voice_enhancement(&mut self, enabled: bool) {
        self.shared.voice_enhance.store(enabled, Ordering::Relaxed);
    }

    /// Begin learning a fresh noise profile
    pub fn start_noise_learning(&mut self) {
        self.shared.learn_noise.store(true, Ordering::Relaxed);
    }

    /// Stop noise learning, keeping the learned floor
    pub fn stop_noise_learning(&mut self) {
        self.shared.learn_noise.store(false, Ordering::Relaxed);
    }

    /// Enable or disable one chain stage at runtime
    pub fn set_stage_enabled(&mut self, stage: Stage, enabled: bool) {
        self.shared.stage_enabled[stage as usize].store(enabled, Ordering::Relaxed);
    }

    /// Input/output RMS levels in dB
    pub fn get_levels(&self) -> (f32, f32) {
        (
            self.shared.meters.input_rms_db(),
            self.shared.meters.output_rms_db(),
        )
    }

    /// Frames processed and underrun count
    pub fn get_stats(&self) -> (u64, u64) {
        (
            self.shared.meters.frames_processed(),
            self.shared.meters.underruns(),
        )
    }

    /// Request a full engine reset at the next block boundary
    pub fn reset(&mut self) {
        self.shared.reset_pending.store(true, Ordering::Release);
    }

    /// Snapshot the engine state for reporting
    pub fn snapshot(&self) -> StateSnapshot {
        let meters = &self.shared.meters;
        StateSnapshot {
            state: EngineState::from_index(self.shared.state.load(Ordering::Relaxed)),
            bypassed: self.is_bypassed(),
            input_level_db: meters.input_rms_db(),
            input_peak_db: meters.input_peak_db(),
            output_level_db: meters.output_rms_db(),
            output_peak_db: meters.output_peak_db(),
            gain_reduction_db: meters.gain_reduction_db(),
            frames_processed: meters.frames_processed(),
            underruns: meters.underruns(),
            eq_preset: EqPreset::from_index(self.shared.eq_preset.load(Ordering::Relaxed) as i32)
                .unwrap_or(EqPreset::Custom),
        }
    }
}

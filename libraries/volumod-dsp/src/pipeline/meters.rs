//! Thread-safe metering
//!
//! Atomic storage for meter values shared between the audio thread
//! (writer) and control threads (readers). Floats are stored as raw bits
//! in `AtomicU32`s; all accesses are relaxed because meters are
//! best-effort snapshots with no ordering relationship between fields.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use volumod_core::math::SILENCE_FLOOR_DB;

/// Atomic meter block written by the audio thread
pub struct EngineMeters {
    input_rms_db: AtomicU32,
    input_peak_db: AtomicU32,
    output_rms_db: AtomicU32,
    output_peak_db: AtomicU32,
    gain_reduction_db: AtomicU32,
    frames_processed: AtomicU64,
    underruns: AtomicU64,
}

impl Default for EngineMeters {
    fn default() -> Self {
        Self {
            input_rms_db: AtomicU32::new(SILENCE_FLOOR_DB.to_bits()),
            input_peak_db: AtomicU32::new(SILENCE_FLOOR_DB.to_bits()),
            output_rms_db: AtomicU32::new(SILENCE_FLOOR_DB.to_bits()),
            output_peak_db: AtomicU32::new(SILENCE_FLOOR_DB.to_bits()),
            gain_reduction_db: AtomicU32::new(0.0_f32.to_bits()),
            frames_processed: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }
}

impl EngineMeters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_levels(&self, rms_db: f32, peak_db: f32) {
        self.input_rms_db.store(rms_db.to_bits(), Ordering::Relaxed);
        self.input_peak_db.store(peak_db.to_bits(), Ordering::Relaxed);
    }

    pub fn set_output_levels(&self, rms_db: f32, peak_db: f32) {
        self.output_rms_db.store(rms_db.to_bits(), Ordering::Relaxed);
        self.output_peak_db.store(peak_db.to_bits(), Ordering::Relaxed);
    }

    pub fn set_gain_reduction_db(&self, val: f32) {
        self.gain_reduction_db.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn add_frames(&self, frames: u64) {
        self.frames_processed.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn add_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn input_rms_db(&self) -> f32 {
        f32::from_bits(self.input_rms_db.load(Ordering::Relaxed))
    }

    pub fn input_peak_db(&self) -> f32 {
        f32::from_bits(self.input_peak_db.load(Ordering::Relaxed))
    }

    pub fn output_rms_db(&self) -> f32 {
        f32::from_bits(self.output_rms_db.load(Ordering::Relaxed))
    }

    pub fn output_peak_db(&self) -> f32 {
        f32::from_bits(self.output_peak_db.load(Ordering::Relaxed))
    }

    pub fn gain_reduction_db(&self) -> f32 {
        f32::from_bits(self.gain_reduction_db.load(Ordering::Relaxed))
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.set_input_levels(SILENCE_FLOOR_DB, SILENCE_FLOOR_DB);
        self.set_output_levels(SILENCE_FLOOR_DB, SILENCE_FLOOR_DB);
        self.set_gain_reduction_db(0.0);
        self.frames_processed.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
    }
}

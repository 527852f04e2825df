//! VoluMod DSP
//!
//! The real-time processing chain of VoluMod: an always-on engine that
//! sits between a program's audio source and the output device and keeps
//! loudness and clarity perceptually consistent without user
//! intervention.
//!
//! Per block the chain runs noise reduction → loudness normalization →
//! compression → equalization → limiting, in place, under a hard
//! real-time deadline. Parameters are changed from other threads through
//! a lock-free control plane; metering flows back through atomics.
//!
//! # Example
//!
//! ```rust
//! use volumod_dsp::{Processor, ProcessorConfig};
//! use volumod_dsp::effects::EqPreset;
//!
//! let (mut processor, mut controller) =
//!     Processor::new(ProcessorConfig::default()).unwrap();
//!
//! // Control thread: adjust parameters at any time
//! controller.set_normalizer_target(-16.0);
//! controller.set_eq_preset(EqPreset::Speech);
//!
//! // Audio thread: process interleaved stereo blocks in place
//! let mut block = vec![0.0_f32; 512 * 2];
//! processor.process(&mut block);
//! ```

pub mod effects;
mod error;
pub mod ffi;
mod pipeline;
pub mod test_utils;
pub mod wire;

pub use error::{EngineError, Result};
pub use pipeline::{
    Controller, EngineMeters, EngineState, Processor, ProcessorConfig, Stage, StateSnapshot,
};

/// Default host block size in frames; the chain itself is block-size
/// agnostic
pub const DEFAULT_BUFFER_SIZE: usize = 512;

//! Audio effects processing
//!
//! The four in-crate stages of the VoluMod chain, plus the common trait
//! they share with the loudness normalizer:
//! - **NoiseReducer**: wide-band adaptive gate with a learned noise floor
//! - **Compressor**: soft-knee feed-forward dynamics with auto makeup
//! - **Equalizer**: 10-band parametric EQ on ISO octave centers
//! - **Limiter**: brick-wall peak limiter with instant attack
//!
//! All effects operate in place on interleaved f32 blocks and are
//! real-time safe: construction allocates whatever fixed state is needed,
//! `process()` never allocates.

mod compressor;
mod equalizer;
mod limiter;
mod loudness_impl;
mod noise_reducer;

pub use compressor::{CompressionMode, Compressor, CompressorSettings};
pub use equalizer::{EqPreset, Equalizer, EQ_BAND_COUNT, ISO_BAND_FREQUENCIES};
pub use limiter::Limiter;
pub use noise_reducer::{NoiseProfile, NoiseReducer, NoiseReductionMode};

use volumod_core::AudioBlock;

/// Trait shared by every stage in the processing chain
///
/// # Safety
/// - `process()` must NOT allocate memory (real-time constraint)
/// - Implementations must be Send so the chain can live on the audio
///   thread while control handles live elsewhere
pub trait AudioEffect: Send {
    /// Process one block in place
    fn process(&mut self, block: &mut AudioBlock);

    /// Reset internal state (filters, envelopes); configuration survives
    fn reset(&mut self);

    /// Enable/disable the effect
    fn set_enabled(&mut self, enabled: bool);

    /// Check if the effect is enabled
    fn is_enabled(&self) -> bool;

    /// Effect name (for state reporting and debugging)
    fn name(&self) -> &'static str;
}

//! Streaming loudness estimation and normalization for VoluMod
//!
//! This crate provides:
//! - A two-stage K-weighting prefilter (high-shelf + high-pass)
//! - A gated integrated-loudness estimator that runs per block on the
//!   audio thread (no allocations, no locks)
//! - A loudness normalizer that drives program material toward a target
//!   LUFS level with smoothed broadband gain
//!
//! # Architecture
//!
//! ```text
//! During playback (per block):
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Audio Block │ ──► │ K-Weighting  │ ──► │  Gated        │
//! └─────────────┘     └──────────────┘     │  Integration  │
//!        │                                 └───────┬───────┘
//!        │            ┌──────────────┐             │
//!        └──────────► │ Smoothed Gain│ ◄───────────┘
//!                     └──────────────┘
//! ```
//!
//! Unlike an offline analyzer, the estimator never sees the whole track:
//! it accumulates energy block by block and the normalizer converges on
//! the target as the integration settles.

#![deny(unsafe_code)]

mod error;
mod estimator;
mod kweight;
mod normalizer;

pub use error::{LoudnessError, Result};
pub use estimator::{BlockMeasurement, IntegrationWeighting, LoudnessEstimator};
pub use kweight::KWeighting;
pub use normalizer::LoudnessNormalizer;

/// Default normalization target (-14 LUFS, common for streaming platforms)
pub const DEFAULT_TARGET_LUFS: f32 = -14.0;

/// Lowest accepted normalization target
pub const MIN_TARGET_LUFS: f32 = -60.0;

/// Highest accepted normalization target
pub const MAX_TARGET_LUFS: f32 = 0.0;

/// Blocks quieter than this are excluded from integration and left
/// untouched by the normalizer (absolute gate)
pub const GATE_THRESHOLD_LUFS: f32 = -70.0;

/// Maximum boost the normalizer will apply (dB)
pub const MAX_GAIN_DB: f32 = 12.0;

/// Maximum attenuation the normalizer will apply (dB)
pub const MIN_GAIN_DB: f32 = -24.0;

/// Offset applied to mean-square power when expressing loudness in LUFS
/// (ITU-R BS.1770)
pub const LUFS_OFFSET: f64 = -0.691;

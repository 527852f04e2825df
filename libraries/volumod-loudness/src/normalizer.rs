//! Loudness normalization
//!
//! Drives integrated program loudness toward a configured target by
//! applying a smoothed broadband gain per block. The gain decision comes
//! from the gated streaming estimator; a 100 ms one-pole smoother keeps
//! the applied gain free of discontinuities across blocks.

use crate::estimator::{IntegrationWeighting, LoudnessEstimator};
use crate::error::Result;
use crate::{
    DEFAULT_TARGET_LUFS, MAX_GAIN_DB, MAX_TARGET_LUFS, MIN_GAIN_DB, MIN_TARGET_LUFS,
};
use tracing::debug;
use volumod_core::math::{clamp, db_to_linear, linear_to_db};
use volumod_core::AudioBlock;

/// Gain smoothing time constant (ms). The smoother advances once per
/// block, so the per-block coefficient is derived from the block length.
const GAIN_SMOOTH_MS: f32 = 100.0;

/// Streaming loudness normalizer
///
/// # Example
///
/// ```ignore
/// use volumod_loudness::LoudnessNormalizer;
///
/// let mut normalizer = LoudnessNormalizer::new(48_000, 2)?;
/// normalizer.set_target_lufs(-14.0);
///
/// // Per audio callback (block is an &mut AudioBlock):
/// normalizer.process(&mut block);
/// ```
pub struct LoudnessNormalizer {
    estimator: LoudnessEstimator,
    target_lufs: f32,
    current_gain: f32,
    smooth_tau_samples: f32,
    enabled: bool,
}

impl LoudnessNormalizer {
    /// Create a normalizer for the given stream format
    pub fn new(sample_rate: u32, channels: usize) -> Result<Self> {
        let estimator = LoudnessEstimator::new(sample_rate, channels)?;
        debug!(sample_rate, channels, "loudness normalizer ready");
        Ok(Self {
            estimator,
            target_lufs: DEFAULT_TARGET_LUFS,
            current_gain: 1.0,
            smooth_tau_samples: GAIN_SMOOTH_MS * sample_rate as f32 / 1000.0,
            enabled: true,
        })
    }

    /// Set the normalization target. Out-of-range values are clamped into
    /// the supported range rather than rejected.
    pub fn set_target_lufs(&mut self, target: f32) {
        self.target_lufs = clamp(target, MIN_TARGET_LUFS, MAX_TARGET_LUFS);
    }

    /// Current normalization target
    pub fn target_lufs(&self) -> f32 {
        self.target_lufs
    }

    /// Select the integration weighting of the underlying estimator
    pub fn set_weighting(&mut self, weighting: IntegrationWeighting) {
        self.estimator.set_weighting(weighting);
    }

    /// Integrated loudness measured so far
    pub fn integrated_lufs(&self) -> Option<f64> {
        self.estimator.integrated_lufs()
    }

    /// Short-term loudness for metering
    pub fn short_term_lufs(&self) -> Option<f64> {
        self.estimator.short_term_lufs()
    }

    /// Gain currently being applied, in dB
    pub fn current_gain_db(&self) -> f32 {
        linear_to_db(self.current_gain)
    }

    /// Enable or disable the normalizer
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the normalizer is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Measure and normalize one block in place.
    ///
    /// Blocks below the absolute gate are left completely untouched: no
    /// integration update and no gain application, so silence stays
    /// bit-exact silence.
    pub fn process(&mut self, block: &mut AudioBlock) {
        if !self.enabled || block.is_empty() {
            return;
        }

        let measurement = self.estimator.process_block(block);
        if measurement.gated {
            return;
        }

        if let Some(integrated) = self.estimator.integrated_lufs() {
            let gain_db = clamp(
                self.target_lufs - integrated as f32,
                MIN_GAIN_DB,
                MAX_GAIN_DB,
            );
            let target_gain = db_to_linear(gain_db);
            let alpha = 1.0 - (-(block.frame_count() as f32) / self.smooth_tau_samples).exp();
            self.current_gain += alpha * (target_gain - self.current_gain);
        }

        block.apply_gain(self.current_gain);
    }

    /// Clear measurement state and return the gain to unity
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.current_gain = 1.0;
    }
}

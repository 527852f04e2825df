//! Gated integrated-loudness estimation
//!
//! Streams K-weighted block energy into a running gated integration. The
//! estimator is the measurement half of the normalizer: it never applies
//! gain, it only answers "how loud has the program been so far".
//!
//! Block loudness is the channel-averaged K-weighted mean square,
//! expressed in LUFS. Blocks below the absolute gate are excluded from
//! integration entirely so long stretches of silence do not drag the
//! estimate down.

use crate::error::{LoudnessError, Result};
use crate::kweight::KWeighting;
use crate::{GATE_THRESHOLD_LUFS, LUFS_OFFSET};
use volumod_core::math::SILENCE_FLOOR_DB;
use volumod_core::{AudioBlock, MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

/// Exponential window for the short-term meter (seconds)
const SHORT_TERM_WINDOW_SECS: f64 = 3.0;

/// How blocks are weighted in the running integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationWeighting {
    /// Each block contributes its mean square weighted by its frame
    /// count. Longer blocks weigh more heavily, matching the behavior of
    /// the deployed engine this one replaces.
    #[default]
    FrameWeighted,

    /// Each block contributes equally regardless of length. Conventional
    /// when the host delivers fixed-size blocks; documented alternative
    /// for variable-block hosts.
    PerBlock,
}

/// Result of feeding one block to the estimator
#[derive(Debug, Clone, Copy)]
pub struct BlockMeasurement {
    /// Loudness of this block alone (LUFS)
    pub block_lufs: f64,
    /// True if the block fell below the absolute gate and was excluded
    pub gated: bool,
}

/// Streaming gated loudness estimator
#[derive(Debug, Clone)]
pub struct LoudnessEstimator {
    kweight: KWeighting,
    weighting: IntegrationWeighting,

    // Running gated integration. The accumulator grows without bound by
    // design: this is integrated (whole-program) loudness, so its
    // responsiveness to new material decays as the session ages.
    integrated_sum: f64,
    weight_sum: f64,

    // Exponentially-windowed short-term energy, metering only
    short_term_mean_sq: f64,
    short_term_primed: bool,

    sample_rate: f32,
    channels: usize,
}

impl LoudnessEstimator {
    /// Create an estimator for the given stream format
    pub fn new(sample_rate: u32, channels: usize) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(LoudnessError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(LoudnessError::InvalidChannelCount(channels));
        }
        Ok(Self {
            kweight: KWeighting::new(sample_rate as f32),
            weighting: IntegrationWeighting::default(),
            integrated_sum: 0.0,
            weight_sum: 0.0,
            short_term_mean_sq: 0.0,
            short_term_primed: false,
            sample_rate: sample_rate as f32,
            channels,
        })
    }

    /// Select the integration weighting. Takes effect for subsequent
    /// blocks; already-integrated energy keeps its original weight.
    pub fn set_weighting(&mut self, weighting: IntegrationWeighting) {
        self.weighting = weighting;
    }

    /// Current weighting
    pub fn weighting(&self) -> IntegrationWeighting {
        self.weighting
    }

    /// Measure one block and, unless it is gated, fold it into the
    /// integration. Mono blocks are measured as dual mono.
    pub fn process_block(&mut self, block: &AudioBlock) -> BlockMeasurement {
        let frames = block.frame_count();
        if frames == 0 {
            return BlockMeasurement {
                block_lufs: SILENCE_FLOOR_DB as f64,
                gated: true,
            };
        }

        let mut block_sum = 0.0_f64;
        for frame in 0..frames {
            let left = block.get(frame, 0);
            let right = if self.channels > 1 {
                block.get(frame, 1)
            } else {
                left
            };
            let (kl, kr) = self.kweight.process_frame(left, right);
            block_sum += (kl * kl + kr * kr) as f64;
        }

        let mean_sq = block_sum / (frames as f64 * 2.0);
        let block_lufs = if mean_sq > 0.0 {
            LUFS_OFFSET + 10.0 * mean_sq.log10()
        } else {
            SILENCE_FLOOR_DB as f64
        };

        let gated = block_lufs < GATE_THRESHOLD_LUFS as f64;
        if !gated {
            let weight = match self.weighting {
                IntegrationWeighting::FrameWeighted => frames as f64,
                IntegrationWeighting::PerBlock => 1.0,
            };
            self.integrated_sum += mean_sq * weight;
            self.weight_sum += weight;

            // Exponential approximation of a 3 s short-term window
            let alpha =
                1.0 - (-(frames as f64) / (SHORT_TERM_WINDOW_SECS * self.sample_rate as f64)).exp();
            if self.short_term_primed {
                self.short_term_mean_sq += alpha * (mean_sq - self.short_term_mean_sq);
            } else {
                self.short_term_mean_sq = mean_sq;
                self.short_term_primed = true;
            }
        }

        BlockMeasurement { block_lufs, gated }
    }

    /// Integrated loudness over all ungated blocks so far, or `None`
    /// before any ungated block has been seen
    pub fn integrated_lufs(&self) -> Option<f64> {
        if self.weight_sum > 0.0 && self.integrated_sum > 0.0 {
            Some(LUFS_OFFSET + 10.0 * (self.integrated_sum / self.weight_sum).log10())
        } else {
            None
        }
    }

    /// Short-term (~3 s) loudness for metering. Never feeds the gain
    /// decision.
    pub fn short_term_lufs(&self) -> Option<f64> {
        if self.short_term_primed && self.short_term_mean_sq > 0.0 {
            Some(LUFS_OFFSET + 10.0 * self.short_term_mean_sq.log10())
        } else {
            None
        }
    }

    /// Clear all measurement state
    pub fn reset(&mut self) {
        self.kweight.reset();
        self.integrated_sum = 0.0;
        self.weight_sum = 0.0;
        self.short_term_mean_sq = 0.0;
        self.short_term_primed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_block(buf: &mut [f32], amplitude: f32, freq: f32, sample_rate: f32, offset: usize) {
        for (i, frame) in buf.chunks_exact_mut(2).enumerate() {
            let t = (offset + i) as f32 / sample_rate;
            let s = (2.0 * PI * freq * t).sin() * amplitude;
            frame[0] = s;
            frame[1] = s;
        }
    }

    #[test]
    fn rejects_invalid_formats() {
        assert!(LoudnessEstimator::new(100, 2).is_err());
        assert!(LoudnessEstimator::new(48_000, 0).is_err());
        assert!(LoudnessEstimator::new(48_000, 3).is_err());
        assert!(LoudnessEstimator::new(48_000, 2).is_ok());
    }

    #[test]
    fn silence_is_gated_and_never_integrates() {
        let mut est = LoudnessEstimator::new(48_000, 2).unwrap();
        let mut buf = vec![0.0_f32; 1024];
        for _ in 0..50 {
            let block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
            let m = est.process_block(&block);
            assert!(m.gated);
        }
        assert!(est.integrated_lufs().is_none());
        assert!(est.short_term_lufs().is_none());
    }

    #[test]
    fn steady_sine_integrates_to_plausible_lufs() {
        let sr = 48_000;
        let mut est = LoudnessEstimator::new(sr, 2).unwrap();
        let mut buf = vec![0.0_f32; 1024];
        let mut offset = 0;
        for _ in 0..200 {
            sine_block(&mut buf, 0.1, 1_000.0, sr as f32, offset);
            offset += 512;
            let block = AudioBlock::new(&mut buf, sr, 2).unwrap();
            let m = est.process_block(&block);
            assert!(!m.gated);
        }

        // -20 dBFS peak sine: channel-averaged mean square of 0.005 plus
        // a little K-weighting lift near 1 kHz
        let lufs = est.integrated_lufs().unwrap();
        assert!(lufs > -26.0 && lufs < -20.0, "integrated {}", lufs);

        // Steady signal: short-term agrees with integrated
        let st = est.short_term_lufs().unwrap();
        assert!((st - lufs).abs() < 1.0, "short-term {} vs integrated {}", st, lufs);
    }

    #[test]
    fn gated_blocks_do_not_dilute_integration() {
        let sr = 48_000;
        let mut est = LoudnessEstimator::new(sr, 2).unwrap();
        let mut buf = vec![0.0_f32; 1024];

        let mut offset = 0;
        for _ in 0..50 {
            sine_block(&mut buf, 0.1, 1_000.0, sr as f32, offset);
            offset += 512;
            let block = AudioBlock::new(&mut buf, sr, 2).unwrap();
            est.process_block(&block);
        }
        let before = est.integrated_lufs().unwrap();

        // A long run of silence must not move the integrated value
        buf.fill(0.0);
        for _ in 0..200 {
            let block = AudioBlock::new(&mut buf, sr, 2).unwrap();
            est.process_block(&block);
        }
        let after = est.integrated_lufs().unwrap();
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn per_block_weighting_matches_for_fixed_blocks() {
        // With a constant block size the two weightings agree exactly
        let sr = 48_000;
        let mut frame_weighted = LoudnessEstimator::new(sr, 2).unwrap();
        let mut per_block = LoudnessEstimator::new(sr, 2).unwrap();
        per_block.set_weighting(IntegrationWeighting::PerBlock);

        let mut buf = vec![0.0_f32; 1024];
        let mut offset = 0;
        for _ in 0..100 {
            sine_block(&mut buf, 0.2, 440.0, sr as f32, offset);
            offset += 512;
            let block = AudioBlock::new(&mut buf, sr, 2).unwrap();
            frame_weighted.process_block(&block);
            let block = AudioBlock::new(&mut buf, sr, 2).unwrap();
            per_block.process_block(&block);
        }

        let a = frame_weighted.integrated_lufs().unwrap();
        let b = per_block.integrated_lufs().unwrap();
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn mono_measures_as_dual_mono() {
        let sr = 48_000;
        let mut stereo = LoudnessEstimator::new(sr, 2).unwrap();
        let mut mono = LoudnessEstimator::new(sr, 1).unwrap();

        let mut stereo_buf = vec![0.0_f32; 1024];
        let mut mono_buf = vec![0.0_f32; 512];
        let mut offset = 0;
        for _ in 0..40 {
            sine_block(&mut stereo_buf, 0.25, 500.0, sr as f32, offset);
            for (i, s) in mono_buf.iter_mut().enumerate() {
                *s = stereo_buf[i * 2];
            }
            offset += 512;

            let block = AudioBlock::new(&mut stereo_buf, sr, 2).unwrap();
            stereo.process_block(&block);
            let block = AudioBlock::new(&mut mono_buf, sr, 1).unwrap();
            mono.process_block(&block);
        }

        let a = stereo.integrated_lufs().unwrap();
        let b = mono.integrated_lufs().unwrap();
        assert!((a - b).abs() < 1e-6, "stereo {} mono {}", a, b);
    }

    #[test]
    fn reset_clears_integration() {
        let sr = 48_000;
        let mut est = LoudnessEstimator::new(sr, 2).unwrap();
        let mut buf = vec![0.1_f32; 1024];
        let block = AudioBlock::new(&mut buf, sr, 2).unwrap();
        est.process_block(&block);
        assert!(est.integrated_lufs().is_some());

        est.reset();
        assert!(est.integrated_lufs().is_none());
        assert!(est.short_term_lufs().is_none());
    }
}

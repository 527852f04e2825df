//! Audio block
//!
//! The unit of real-time processing: a borrowed view over one host
//! callback's worth of interleaved f32 samples. The host owns the
//! storage; the engine borrows it for the duration of one `process` call
//! and never retains a reference afterward.
//!
//! Samples are nominally in `[-1.0, 1.0]` but may temporarily exceed that
//! range inside the chain before the limiter.

use crate::error::{CoreError, Result};
use crate::{MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

/// Interleaved audio block borrowed from the host
#[derive(Debug)]
pub struct AudioBlock<'a> {
    samples: &'a mut [f32],
    sample_rate: u32,
    channels: usize,
}

impl<'a> AudioBlock<'a> {
    /// Wrap an interleaved buffer. The buffer length must be a whole
    /// number of frames; a trailing partial frame is rejected.
    pub fn new(samples: &'a mut [f32], sample_rate: u32, channels: usize) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(CoreError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(CoreError::InvalidChannelCount(channels));
        }
        if samples.len() % channels != 0 {
            return Err(CoreError::PartialFrame {
                len: samples.len(),
                channels,
            });
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Number of interleaved channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True if the block holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Read one sample; out-of-range indices return 0.0
    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> f32 {
        if channel >= self.channels {
            return 0.0;
        }
        self.samples
            .get(frame * self.channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Write one sample; out-of-range indices are a no-op
    #[inline]
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        if channel >= self.channels {
            return;
        }
        if let Some(sample) = self.samples.get_mut(frame * self.channels + channel) {
            *sample = value;
        }
    }

    /// Maximum absolute sample value in the block
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |p, s| p.max(s.abs()))
    }

    /// Root-mean-square over all samples; 0.0 for an empty block
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_sq / self.samples.len() as f32).sqrt()
    }

    /// Multiply every sample by `gain` in place
    pub fn apply_gain(&mut self, gain: f32) {
        for sample in self.samples.iter_mut() {
            *sample *= gain;
        }
    }

    /// Add `other * gain` sample-wise. A length mismatch is a no-op.
    pub fn mix(&mut self, other: &[f32], gain: f32) {
        if other.len() != self.samples.len() {
            return;
        }
        for (dst, src) in self.samples.iter_mut().zip(other.iter()) {
            *dst += src * gain;
        }
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Deep copy of the sample data
    pub fn clone_samples(&self) -> Vec<f32> {
        self.samples.to_vec()
    }

    /// Direct read access to the interleaved samples
    #[inline]
    pub fn samples(&self) -> &[f32] {
        self.samples
    }

    /// Direct write access to the interleaved samples
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        self.samples
    }
}

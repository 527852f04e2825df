//! The processor: chain owner and audio-thread entry point
//!
//! Per block, when not bypassed: drain pending control updates, measure
//! input, run noise reduction → normalization → compression → EQ →
//! limiting, then publish output meters. The whole path is
//! allocation-free; everything the stages need was sized at construction.

use crate::effects::{
    AudioEffect, CompressionMode, Compressor, EqPreset, Equalizer, Limiter, NoiseReducer,
    NoiseReductionMode, EQ_BAND_COUNT,
};
use crate::error::Result;
use crate::pipeline::{Controller, EngineState, SharedControl, Stage, STAGE_COUNT};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use volumod_core::math::linear_to_db;
use volumod_core::AudioBlock;
use volumod_loudness::{LoudnessNormalizer, DEFAULT_TARGET_LUFS};

/// Engine configuration, fixed at construction. The `enable_*` flags are
/// the static wiring of the chain; stages can additionally be toggled at
/// runtime through the [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub enable_noise_reduction: bool,
    pub enable_normalization: bool,
    pub enable_compression: bool,
    pub enable_equalizer: bool,
    pub enable_limiter: bool,
    pub target_lufs: f32,
    pub limiter_ceiling_db: f32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            enable_noise_reduction: true,
            enable_normalization: true,
            enable_compression: true,
            enable_equalizer: true,
            enable_limiter: true,
            target_lufs: DEFAULT_TARGET_LUFS,
            limiter_ceiling_db: -0.5,
        }
    }
}

/// Audio-thread view of the scalar parameters, used to detect changes
/// without re-applying every value on every block
struct CachedScalars {
    target_bits: u32,
    compression_mode: u8,
    noise_mode: u8,
    voice_enhance: bool,
    learn_noise: bool,
    eq_gain_bits: [u32; EQ_BAND_COUNT],
    eq_output_bits: u32,
    stage_enabled: [bool; STAGE_COUNT],
}

impl CachedScalars {
    fn new(target_lufs: f32) -> Self {
        Self {
            target_bits: target_lufs.to_bits(),
            compression_mode: CompressionMode::default().index(),
            noise_mode: NoiseReductionMode::default().index(),
            voice_enhance: false,
            learn_noise: false,
            eq_gain_bits: [0.0_f32.to_bits(); EQ_BAND_COUNT],
            eq_output_bits: 0.0_f32.to_bits(),
            stage_enabled: [true; STAGE_COUNT],
        }
    }
}

/// The always-on processing chain
pub struct Processor {
    config: ProcessorConfig,

    noise_reducer: NoiseReducer,
    normalizer: LoudnessNormalizer,
    compressor: Compressor,
    equalizer: Equalizer,
    limiter: Limiter,

    shared: Arc<SharedControl>,
    cached: CachedScalars,
    secs_per_frame: f64,
}

impl Processor {
    /// Build the chain and its control handle
    pub fn new(config: ProcessorConfig) -> Result<(Self, Controller)> {
        // The normalizer validates the stream format for the whole chain
        let mut normalizer = LoudnessNormalizer::new(config.sample_rate, config.channels)?;
        normalizer.set_target_lufs(config.target_lufs);

        let sample_rate = config.sample_rate as f32;
        let mut limiter = Limiter::new(sample_rate);
        limiter.set_ceiling_db(config.limiter_ceiling_db);

        let shared = Arc::new(SharedControl::new(normalizer.target_lufs()));
        let controller = Controller::new(Arc::clone(&shared));

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            target_lufs = config.target_lufs,
            "processor ready"
        );

        let processor = Self {
            cached: CachedScalars::new(normalizer.target_lufs()),
            noise_reducer: NoiseReducer::new(sample_rate),
            normalizer,
            compressor: Compressor::new(sample_rate),
            equalizer: Equalizer::new(sample_rate),
            limiter,
            shared,
            secs_per_frame: 1.0 / config.sample_rate as f64,
            config,
        };
        Ok((processor, controller))
    }

    /// Engine configuration
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process one interleaved block in place.
    ///
    /// While bypassed the block is returned untouched and meters are not
    /// updated, so the host signal passes through bit-exact.
    pub fn process(&mut self, samples: &mut [f32]) {
        let start = Instant::now();

        self.drain_control();

        if self.shared.bypass.load(Ordering::Relaxed) {
            self.shared
                .state
                .store(EngineState::Bypassed.index(), Ordering::Relaxed);
            return;
        }
        self.shared
            .state
            .store(EngineState::Active.index(), Ordering::Relaxed);

        let mut block =
            match AudioBlock::new(samples, self.config.sample_rate, self.config.channels) {
                Ok(block) => block,
                // Malformed host buffer: leave the audio untouched
                Err(_) => return,
            };
        if block.is_empty() {
            return;
        }

        let meters = &self.shared.meters;
        meters.set_input_levels(linear_to_db(block.rms()), linear_to_db(block.peak()));

        if self.config.enable_noise_reduction {
            self.noise_reducer.process(&mut block);
        }
        if self.config.enable_normalization {
            AudioEffect::process(&mut self.normalizer, &mut block);
        }
        if self.config.enable_compression {
            self.compressor.process(&mut block);
            meters.set_gain_reduction_db(self.compressor.gain_reduction_db());
        }
        if self.config.enable_equalizer {
            self.equalizer.process(&mut block);
        }
        if self.config.enable_limiter {
            self.limiter.process(&mut block);
        }

        meters.set_output_levels(linear_to_db(block.rms()), linear_to_db(block.peak()));
        let frames = block.frame_count();
        meters.add_frames(frames as u64);

        let deadline = frames as f64 * self.secs_per_frame;
        if start.elapsed().as_secs_f64() > deadline {
            meters.add_underrun();
        }
    }

    /// Reset every stage and the meters. Configuration and the learned
    /// noise profile survive.
    pub fn reset(&mut self) {
        self.noise_reducer.reset();
        AudioEffect::reset(&mut self.normalizer);
        self.compressor.reset();
        self.equalizer.reset();
        self.limiter.reset();
        self.shared.meters.reset();
    }

    /// Fold pending control-plane updates into the stages. Runs at the
    /// top of every `process` call, before any DSP.
    fn drain_control(&mut self) {
        if self.shared.reset_pending.swap(false, Ordering::Acquire) {
            self.reset();
        }

        // Composite updates first: they land atomically per kind
        if let Some(update) = self.shared.eq_curve_slot.take() {
            self.equalizer.set_gains(update.preset, update.gains);
            for (cached, gain) in self.cached.eq_gain_bits.iter_mut().zip(update.gains) {
                *cached = gain.to_bits();
            }
        }
        if let Some(settings) = self.shared.compressor_slot.take() {
            self.compressor.set_settings(settings);
        }

        // Scalar parameters: apply only what changed
        let target_bits = self.shared.target_lufs.load(Ordering::Relaxed);
        if target_bits != self.cached.target_bits {
            self.cached.target_bits = target_bits;
            self.normalizer.set_target_lufs(f32::from_bits(target_bits));
        }

        let mode = self.shared.compression_mode.load(Ordering::Relaxed);
        if mode != self.cached.compression_mode {
            self.cached.compression_mode = mode;
            if let Some(mode) = CompressionMode::from_index(mode as i32) {
                self.compressor.set_mode(mode);
            }
        }

        let mode = self.shared.noise_mode.load(Ordering::Relaxed);
        if mode != self.cached.noise_mode {
            self.cached.noise_mode = mode;
            if let Some(mode) = NoiseReductionMode::from_index(mode as i32) {
                self.noise_reducer.set_mode(mode);
            }
        }

        let voice = self.shared.voice_enhance.load(Ordering::Relaxed);
        if voice != self.cached.voice_enhance {
            self.cached.voice_enhance = voice;
            self.noise_reducer.set_voice_enhance(voice);
        }

        let learn = self.shared.learn_noise.load(Ordering::Relaxed);
        if learn != self.cached.learn_noise {
            self.cached.learn_noise = learn;
            if learn {
                self.noise_reducer.start_learning();
            } else {
                self.noise_reducer.stop_learning();
            }
        }

        for band in 0..EQ_BAND_COUNT {
            let bits = self.shared.eq_band_gains[band].load(Ordering::Relaxed);
            if bits != self.cached.eq_gain_bits[band] {
                self.cached.eq_gain_bits[band] = bits;
                self.equalizer.set_band_gain(band, f32::from_bits(bits));
            }
        }

        let bits = self.shared.eq_output_gain_db.load(Ordering::Relaxed);
        if bits != self.cached.eq_output_bits {
            self.cached.eq_output_bits = bits;
            self.equalizer.set_output_gain_db(f32::from_bits(bits));
        }

        for index in 0..STAGE_COUNT {
            let enabled = self.shared.stage_enabled[index].load(Ordering::Relaxed);
            if enabled != self.cached.stage_enabled[index] {
                self.cached.stage_enabled[index] = enabled;
                match index {
                    i if i == Stage::NoiseReducer as usize => {
                        self.noise_reducer.set_enabled(enabled)
                    }
                    i if i == Stage::Normalizer as usize => self.normalizer.set_enabled(enabled),
                    i if i == Stage::Compressor as usize => self.compressor.set_enabled(enabled),
                    i if i == Stage::Equalizer as usize => self.equalizer.set_enabled(enabled),
                    _ => self.limiter.set_enabled(enabled),
                }
            }
        }
    }

    /// Noise reduction stage (read-only, for inspection and tests)
    pub fn noise_reducer(&self) -> &NoiseReducer {
        &self.noise_reducer
    }

    /// Normalization stage
    pub fn normalizer(&self) -> &LoudnessNormalizer {
        &self.normalizer
    }

    /// Compression stage
    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    /// EQ stage
    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }

    /// Limiting stage
    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Active EQ preset name, for state reporting
    pub fn preset_name(&self) -> &'static str {
        EqPreset::from_index(self.shared.eq_preset.load(Ordering::Relaxed) as i32)
            .unwrap_or(EqPreset::Custom)
            .name()
    }
}

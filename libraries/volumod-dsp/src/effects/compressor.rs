//! Dynamic range compressor
//!
//! Feed-forward soft-knee compressor with musical preset modes. Level
//! detection is linked across channels (the louder channel drives the
//! gain computer) so the stereo image stays put, and the envelope runs
//! in the dB domain with separate attack/release time constants.

use super::AudioEffect;
use serde::{Deserialize, Serialize};
use volumod_core::math::{db_to_linear, linear_to_db};
use volumod_core::{AudioBlock, EnvelopeFollower};

/// Compression preset modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// 2:1 over -20 dB, wide knee. For already-consistent material.
    Gentle,
    /// 4:1 over -18 dB. The general-purpose default.
    #[default]
    Moderate,
    /// 8:1 over -15 dB, fast. For very dynamic material.
    Aggressive,
    /// 20:1 just under full scale: effectively a safety clamp.
    Limiting,
}

impl CompressionMode {
    /// Settings for this mode
    pub fn settings(&self) -> CompressorSettings {
        match self {
            Self::Gentle => CompressorSettings {
                threshold_db: -20.0,
                ratio: 2.0,
                attack_ms: 20.0,
                release_ms: 200.0,
                knee_db: 6.0,
                makeup_gain_db: 2.0,
            },
            Self::Moderate => CompressorSettings {
                threshold_db: -18.0,
                ratio: 4.0,
                attack_ms: 10.0,
                release_ms: 150.0,
                knee_db: 4.0,
                makeup_gain_db: 4.0,
            },
            Self::Aggressive => CompressorSettings {
                threshold_db: -15.0,
                ratio: 8.0,
                attack_ms: 5.0,
                release_ms: 100.0,
                knee_db: 2.0,
                makeup_gain_db: 6.0,
            },
            Self::Limiting => CompressorSettings {
                threshold_db: -1.0,
                ratio: 20.0,
                attack_ms: 0.5,
                release_ms: 50.0,
                knee_db: 0.0,
                makeup_gain_db: 0.0,
            },
        }
    }

    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gentle" => Some(Self::Gentle),
            "moderate" => Some(Self::Moderate),
            "aggressive" => Some(Self::Aggressive),
            "limiting" => Some(Self::Limiting),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
            Self::Limiting => "limiting",
        }
    }

    /// Mode from its wire index
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Gentle),
            1 => Some(Self::Moderate),
            2 => Some(Self::Aggressive),
            3 => Some(Self::Limiting),
            _ => None,
        }
    }

    /// Wire index of this mode
    pub fn index(&self) -> u8 {
        match self {
            Self::Gentle => 0,
            Self::Moderate => 1,
            Self::Aggressive => 2,
            Self::Limiting => 3,
        }
    }
}

/// Compressor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressorSettings {
    /// Threshold in dB (-60 to 0)
    pub threshold_db: f32,
    /// Compression ratio (1 to 20)
    pub ratio: f32,
    /// Attack time in ms (0.1 to 500)
    pub attack_ms: f32,
    /// Release time in ms (10 to 2000)
    pub release_ms: f32,
    /// Soft knee width in dB (0 = hard knee)
    pub knee_db: f32,
    /// Makeup gain applied after compression (dB)
    pub makeup_gain_db: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        CompressionMode::default().settings()
    }
}

impl CompressorSettings {
    /// Clamp all fields into their documented ranges
    pub fn validate(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 500.0);
        self.release_ms = self.release_ms.clamp(10.0, 2_000.0);
        self.knee_db = self.knee_db.clamp(0.0, 12.0);
        self.makeup_gain_db = self.makeup_gain_db.clamp(0.0, 24.0);
    }
}

/// Soft-knee feed-forward compressor
pub struct Compressor {
    settings: CompressorSettings,
    mode: CompressionMode,
    enabled: bool,

    // dB-domain level envelope: fed the per-frame peak in dB, smoothed
    // with the configured attack/release
    envelope: EnvelopeFollower,

    makeup_linear: f32,
    gain_reduction_db: f32,
    sample_rate: f32,
}

impl Compressor {
    /// Create a compressor in the default mode
    pub fn new(sample_rate: f32) -> Self {
        Self::with_mode(CompressionMode::default(), sample_rate)
    }

    /// Create a compressor in a specific mode
    pub fn with_mode(mode: CompressionMode, sample_rate: f32) -> Self {
        let settings = mode.settings();
        Self {
            settings,
            mode,
            enabled: true,
            envelope: EnvelopeFollower::new(settings.attack_ms, settings.release_ms, sample_rate),
            makeup_linear: db_to_linear(settings.makeup_gain_db),
            gain_reduction_db: 0.0,
            sample_rate,
        }
    }

    /// Switch modes in place. The envelope carries over so audio stays
    /// continuous across the change.
    pub fn set_mode(&mut self, mode: CompressionMode) {
        self.mode = mode;
        self.apply_settings(mode.settings());
    }

    /// Current mode
    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    /// Apply custom settings (clamped to valid ranges)
    pub fn set_settings(&mut self, mut settings: CompressorSettings) {
        settings.validate();
        self.apply_settings(settings);
    }

    /// Current settings
    pub fn settings(&self) -> CompressorSettings {
        self.settings
    }

    /// Gain reduction currently applied, as a positive dB amount
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn apply_settings(&mut self, settings: CompressorSettings) {
        self.settings = settings;
        self.envelope
            .set_times(settings.attack_ms, settings.release_ms, self.sample_rate);
        self.makeup_linear = db_to_linear(settings.makeup_gain_db);
    }

    /// Static gain curve: gain reduction (≤ 0 dB) for an envelope level
    #[inline]
    fn gain_reduction_at(&self, level_db: f32) -> f32 {
        let threshold = self.settings.threshold_db;
        let ratio = self.settings.ratio;
        let knee = self.settings.knee_db;

        if knee <= 0.0 {
            // Hard knee
            if level_db <= threshold {
                0.0
            } else {
                (threshold + (level_db - threshold) / ratio) - level_db
            }
        } else if level_db < threshold - knee / 2.0 {
            0.0
        } else if level_db > threshold + knee / 2.0 {
            (threshold + (level_db - threshold) / ratio) - level_db
        } else {
            // Quadratic join inside the knee
            let over = level_db - (threshold - knee / 2.0);
            (1.0 / ratio - 1.0) * over * over / (2.0 * knee)
        }
    }
}

impl AudioEffect for Compressor {
    fn process(&mut self, block: &mut AudioBlock) {
        if !self.enabled || block.is_empty() {
            return;
        }

        let channels = block.channels();
        for frame in 0..block.frame_count() {
            // Linked detection: the louder channel drives the gain computer
            let mut peak = 0.0_f32;
            for ch in 0..channels {
                peak = peak.max(block.get(frame, ch).abs());
            }

            let level_db = linear_to_db(peak);
            let envelope_db = self.envelope.track(level_db);
            let gr_db = self.gain_reduction_at(envelope_db);
            let gain = db_to_linear(gr_db) * self.makeup_linear;

            for ch in 0..channels {
                let s = block.get(frame, ch);
                block.set(frame, ch, s * gain);
            }

            self.gain_reduction_db = -gr_db;
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.gain_reduction_db = 0.0;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &'static str {
        "Compressor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn mode_table() {
        let gentle = CompressionMode::Gentle.settings();
        assert_eq!(gentle.ratio, 2.0);
        assert_eq!(gentle.threshold_db, -20.0);

        let limiting = CompressionMode::Limiting.settings();
        assert_eq!(limiting.ratio, 20.0);
        assert_eq!(limiting.threshold_db, -1.0);
        assert_eq!(limiting.knee_db, 0.0);
    }

    #[test]
    fn mode_string_round_trip() {
        for mode in [
            CompressionMode::Gentle,
            CompressionMode::Moderate,
            CompressionMode::Aggressive,
            CompressionMode::Limiting,
        ] {
            assert_eq!(CompressionMode::from_str(mode.as_str()), Some(mode));
            assert_eq!(CompressionMode::from_index(mode.index() as i32), Some(mode));
        }
        assert_eq!(CompressionMode::from_str("extreme"), None);
    }

    #[test]
    fn settings_validation_clamps() {
        let mut settings = CompressorSettings {
            threshold_db: -100.0,
            ratio: 50.0,
            attack_ms: 0.001,
            release_ms: 9_000.0,
            knee_db: 40.0,
            makeup_gain_db: 90.0,
        };
        settings.validate();
        assert_eq!(settings.threshold_db, -60.0);
        assert_eq!(settings.ratio, 20.0);
        assert_eq!(settings.attack_ms, 0.1);
        assert_eq!(settings.release_ms, 2_000.0);
        assert_eq!(settings.knee_db, 12.0);
        assert_eq!(settings.makeup_gain_db, 24.0);
    }

    #[test]
    fn static_curve_hard_knee() {
        let mut comp = Compressor::new(SR);
        comp.set_settings(CompressorSettings {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
            knee_db: 0.0,
            makeup_gain_db: 0.0,
        });

        // Below threshold: nothing
        assert_eq!(comp.gain_reduction_at(-30.0), 0.0);
        assert_eq!(comp.gain_reduction_at(-20.0), 0.0);

        // 4 dB over at 4:1 -> 3 dB of reduction
        assert!((comp.gain_reduction_at(-16.0) - (-3.0)).abs() < 1e-5);
        // 10 dB over -> 7.5 dB of reduction
        assert!((comp.gain_reduction_at(-10.0) - (-7.5)).abs() < 1e-5);
    }

    #[test]
    fn limiting_mode_curve_at_full_scale() {
        let comp = Compressor::with_mode(CompressionMode::Limiting, SR);
        // threshold -1, ratio 20, hard knee: at 0 dB the curve gives
        // (-1 + 1/20) - 0 = -0.95 dB
        let gr = comp.gain_reduction_at(0.0);
        assert!((gr - (-0.95)).abs() < 1e-5, "got {}", gr);
    }

    #[test]
    fn soft_knee_joins_smoothly() {
        let mut comp = Compressor::new(SR);
        comp.set_settings(CompressorSettings {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
            knee_db: 6.0,
            makeup_gain_db: 0.0,
        });

        // Continuous at both knee edges
        let below = comp.gain_reduction_at(-23.0 - 1e-3);
        let at_start = comp.gain_reduction_at(-23.0 + 1e-3);
        assert!((below - at_start).abs() < 0.01);

        let at_end = comp.gain_reduction_at(-17.0 - 1e-3);
        let above = comp.gain_reduction_at(-17.0 + 1e-3);
        assert!((at_end - above).abs() < 0.01);

        // Monotone: more input level never means less reduction magnitude
        let mut prev = 0.0;
        for i in 0..100 {
            let level = -30.0 + i as f32 * 0.25;
            let gr = comp.gain_reduction_at(level);
            assert!(gr <= prev + 1e-6);
            prev = gr;
        }
    }

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::with_mode(CompressionMode::Aggressive, SR);
        // Kill makeup so the comparison is pure gain reduction
        let mut settings = comp.settings();
        settings.makeup_gain_db = 0.0;
        comp.set_settings(settings);

        let mut buf = vec![0.8_f32; 9_600]; // 100 ms of loud DC-ish signal
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);

        // Past the attack, output is clearly reduced
        let tail = &buf[8_000..];
        assert!(tail.iter().all(|&s| s < 0.7), "not reduced: {}", tail[0]);
        assert!(comp.gain_reduction_db() > 0.0);
    }

    #[test]
    fn gain_reduction_meter_is_positive() {
        let mut comp = Compressor::with_mode(CompressionMode::Moderate, SR);
        let mut buf = vec![0.9_f32; 4_096];
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);
        assert!(comp.gain_reduction_db() >= 0.0);

        // Quiet material: once the envelope has released down to the
        // actual level, the meter falls back to zero
        let mut comp = Compressor::with_mode(CompressionMode::Moderate, SR);
        let mut buf = vec![0.001_f32; 19_200]; // 200 ms
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);
        assert!(comp.gain_reduction_db() >= 0.0);
        assert!(comp.gain_reduction_db() < 0.5);
    }

    #[test]
    fn stereo_channels_get_identical_gain() {
        let mut comp = Compressor::with_mode(CompressionMode::Aggressive, SR);

        // Left channel loud, right channel quiet; the ratio between the
        // channels must be preserved exactly (linked detection)
        let mut buf: Vec<f32> = (0..2_048).flat_map(|_| [0.8_f32, 0.2_f32]).collect();
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);

        for frame in buf.chunks_exact(2) {
            assert!((frame[0] / frame[1] - 4.0).abs() < 1e-3);
        }
    }

    #[test]
    fn mode_switch_keeps_envelope() {
        let mut comp = Compressor::with_mode(CompressionMode::Gentle, SR);
        let mut buf = vec![0.5_f32; 4_096];
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);

        comp.set_mode(CompressionMode::Aggressive);
        assert_eq!(comp.mode(), CompressionMode::Aggressive);

        // Processing continues without a reset; output stays finite and
        // bounded
        let mut buf = vec![0.5_f32; 4_096];
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);
        assert!(buf.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    #[test]
    fn reset_clears_state() {
        let mut comp = Compressor::new(SR);
        let mut buf = vec![0.9_f32; 4_096];
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);

        comp.reset();
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn disabled_compressor_bypassed() {
        let mut comp = Compressor::with_mode(CompressionMode::Aggressive, SR);
        comp.set_enabled(false);

        let mut buf = vec![0.8_f32; 256];
        let original = buf.clone();
        let mut block = AudioBlock::new(&mut buf, 48_000, 2).unwrap();
        comp.process(&mut block);
        assert_eq!(buf, original);
    }
}

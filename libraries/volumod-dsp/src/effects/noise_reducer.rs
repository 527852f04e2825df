//! Wide-band noise reduction
//!
//! A sample-wise gate that attenuates material below a learned or
//! adaptively-tracked noise floor. The gate only ever attenuates; it
//! introduces no gain above unity, so speech sitting above the floor
//! passes untouched.
//!
//! An optional voice-enhancement path shapes the gated signal with a
//! 300 Hz high-pass and a gentle 2.5 kHz presence peak, per channel.

use super::AudioEffect;
use serde::{Deserialize, Serialize};
use volumod_core::math::{clamp, db_to_linear, linear_to_db};
use volumod_core::{AudioBlock, Biquad, FilterType, MAX_CHANNELS};

/// EMA rate for explicit noise learning
const LEARN_UPDATE_RATE: f32 = 0.1;

/// EMA rate for adaptive floor tracking (much slower than learning)
const ADAPTIVE_UPDATE_RATE: f32 = 0.01;

/// Blocks within this margin above the floor are considered "quiet" and
/// allowed to refine the adaptive floor estimate
const ADAPTIVE_QUIET_MARGIN_DB: f32 = 10.0;

/// Floor assumed before anything has been learned
const UNLEARNED_FLOOR_DB: f32 = -60.0;

/// Voice enhancement high-pass cutoff (Hz)
const VOICE_HPF_HZ: f32 = 300.0;

/// Voice enhancement presence peak center (Hz)
const VOICE_PRESENCE_HZ: f32 = 2_500.0;

/// Voice enhancement presence peak gain (dB)
const VOICE_PRESENCE_GAIN_DB: f32 = 3.0;

/// Gate aggressiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseReductionMode {
    /// 6 dB maximum attenuation
    Light,
    /// 12 dB maximum attenuation
    Moderate,
    /// 20 dB maximum attenuation
    Aggressive,
    /// Floor and depth track the program material
    #[default]
    Adaptive,
}

impl NoiseReductionMode {
    /// Default gate depth for this mode (dB)
    pub fn default_reduction_db(&self) -> f32 {
        match self {
            Self::Light => 6.0,
            Self::Moderate => 12.0,
            Self::Aggressive => 20.0,
            Self::Adaptive => 10.0,
        }
    }

    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "moderate" => Some(Self::Moderate),
            "aggressive" => Some(Self::Aggressive),
            "adaptive" => Some(Self::Adaptive),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
            Self::Adaptive => "adaptive",
        }
    }

    /// Mode from its wire index
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Light),
            1 => Some(Self::Moderate),
            2 => Some(Self::Aggressive),
            3 => Some(Self::Adaptive),
            _ => None,
        }
    }

    /// Wire index of this mode
    pub fn index(&self) -> u8 {
        match self {
            Self::Light => 0,
            Self::Moderate => 1,
            Self::Aggressive => 2,
            Self::Adaptive => 3,
        }
    }
}

/// Learned characteristics of the background noise
#[derive(Debug, Clone, Copy)]
pub struct NoiseProfile {
    /// Estimated noise floor (dB RMS)
    pub floor_db: f32,
    /// True once at least one block has been learned
    pub is_learned: bool,
    /// EMA rate applied while learning
    pub update_rate: f32,
}

impl Default for NoiseProfile {
    fn default() -> Self {
        Self {
            floor_db: UNLEARNED_FLOOR_DB,
            is_learned: false,
            update_rate: LEARN_UPDATE_RATE,
        }
    }
}

/// Wide-band adaptive noise gate with optional voice-band shaping
pub struct NoiseReducer {
    enabled: bool,
    mode: NoiseReductionMode,
    reduction_db: f32,
    voice_enhance: bool,
    learn_noise: bool,
    profile: NoiseProfile,
    voice_hpf: [Biquad; MAX_CHANNELS],
    voice_presence: [Biquad; MAX_CHANNELS],
}

impl NoiseReducer {
    /// Create a gate for the given sample rate
    pub fn new(sample_rate: f32) -> Self {
        let hpf = Biquad::new(
            FilterType::Highpass,
            VOICE_HPF_HZ,
            sample_rate,
            std::f32::consts::FRAC_1_SQRT_2,
            0.0,
        );
        let presence = Biquad::new(
            FilterType::Peak,
            VOICE_PRESENCE_HZ,
            sample_rate,
            1.0,
            VOICE_PRESENCE_GAIN_DB,
        );
        let mode = NoiseReductionMode::default();
        Self {
            enabled: true,
            mode,
            reduction_db: mode.default_reduction_db(),
            voice_enhance: false,
            learn_noise: false,
            profile: NoiseProfile::default(),
            voice_hpf: [hpf; MAX_CHANNELS],
            voice_presence: [presence; MAX_CHANNELS],
        }
    }

    /// Select the gate mode. Non-adaptive modes pin the gate depth to the
    /// mode default; adaptive mode recomputes depth per block.
    pub fn set_mode(&mut self, mode: NoiseReductionMode) {
        self.mode = mode;
        self.reduction_db = mode.default_reduction_db();
    }

    /// Current gate mode
    pub fn mode(&self) -> NoiseReductionMode {
        self.mode
    }

    /// Override the gate depth (clamped to 0..30 dB)
    pub fn set_reduction_db(&mut self, reduction_db: f32) {
        self.reduction_db = clamp(reduction_db, 0.0, 30.0);
    }

    /// Current gate depth (dB)
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    /// Toggle the voice-band shaping path
    pub fn set_voice_enhance(&mut self, enabled: bool) {
        self.voice_enhance = enabled;
    }

    /// Whether voice-band shaping is active
    pub fn voice_enhance(&self) -> bool {
        self.voice_enhance
    }

    /// Begin learning a fresh noise profile from incoming blocks
    pub fn start_learning(&mut self) {
        self.profile = NoiseProfile::default();
        self.learn_noise = true;
    }

    /// Stop updating the noise profile; the learned floor is kept
    pub fn stop_learning(&mut self) {
        self.learn_noise = false;
    }

    /// Whether learning is active
    pub fn is_learning(&self) -> bool {
        self.learn_noise
    }

    /// Current noise profile
    pub fn profile(&self) -> NoiseProfile {
        self.profile
    }

    fn update_profile(&mut self, rms_db: f32) {
        if self.learn_noise {
            if self.profile.is_learned {
                self.profile.floor_db += self.profile.update_rate * (rms_db - self.profile.floor_db);
            } else {
                self.profile.floor_db = rms_db;
                self.profile.is_learned = true;
            }
        }

        if self.mode == NoiseReductionMode::Adaptive {
            // Only quiet blocks refine the floor; louder blocks are program
            // material, not noise
            if rms_db < self.profile.floor_db + ADAPTIVE_QUIET_MARGIN_DB {
                self.profile.floor_db += ADAPTIVE_UPDATE_RATE * (rms_db - self.profile.floor_db);
            }
            self.reduction_db = clamp(-(self.profile.floor_db + 40.0), 6.0, 24.0);
        }
    }
}

impl AudioEffect for NoiseReducer {
    fn process(&mut self, block: &mut AudioBlock) {
        if !self.enabled || block.is_empty() {
            return;
        }

        let rms_db = linear_to_db(block.rms());
        self.update_profile(rms_db);

        let threshold = self.profile.floor_db + self.reduction_db / 2.0;
        let channels = block.channels();

        for frame in 0..block.frame_count() {
            for ch in 0..channels {
                let sample = block.get(frame, ch);
                let input_db = linear_to_db(sample.abs());

                let mut out = if input_db < threshold {
                    let depth = (threshold - input_db).min(self.reduction_db);
                    sample * db_to_linear(-depth)
                } else {
                    sample
                };

                if self.voice_enhance {
                    out = self.voice_presence[ch].process(self.voice_hpf[ch].process(out));
                }

                block.set(frame, ch, out);
            }
        }
    }

    fn reset(&mut self) {
        // Filter state only; the learned profile survives a reset
        for filter in self.voice_hpf.iter_mut().chain(self.voice_presence.iter_mut()) {
            filter.reset();
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &'static str {
        "Noise Reducer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48_000;

    fn rms_db_of(samples: &[f32]) -> f32 {
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        linear_to_db((sum_sq / samples.len() as f32).sqrt())
    }

    fn process_buf(reducer: &mut NoiseReducer, buf: &mut [f32]) {
        let mut block = AudioBlock::new(buf, SR, 2).unwrap();
        reducer.process(&mut block);
    }

    #[test]
    fn mode_defaults() {
        assert_eq!(NoiseReductionMode::Light.default_reduction_db(), 6.0);
        assert_eq!(NoiseReductionMode::Moderate.default_reduction_db(), 12.0);
        assert_eq!(NoiseReductionMode::Aggressive.default_reduction_db(), 20.0);
        assert_eq!(NoiseReductionMode::Adaptive.default_reduction_db(), 10.0);
    }

    #[test]
    fn mode_string_round_trip() {
        for mode in [
            NoiseReductionMode::Light,
            NoiseReductionMode::Moderate,
            NoiseReductionMode::Aggressive,
            NoiseReductionMode::Adaptive,
        ] {
            assert_eq!(NoiseReductionMode::from_str(mode.as_str()), Some(mode));
            assert_eq!(NoiseReductionMode::from_index(mode.index() as i32), Some(mode));
        }
        assert_eq!(NoiseReductionMode::from_str("nope"), None);
        assert_eq!(NoiseReductionMode::from_index(9), None);
    }

    #[test]
    fn learning_captures_the_floor() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.start_learning();

        // Steady -40 dB RMS "noise"
        let level = db_to_linear(-40.0);
        let mut buf = vec![level; 1024];
        for _ in 0..20 {
            process_buf(&mut reducer, &mut buf);
            buf.fill(level);
        }
        reducer.stop_learning();

        let profile = reducer.profile();
        assert!(profile.is_learned);
        assert!(
            (profile.floor_db - (-40.0)).abs() < 1.0,
            "learned floor {}",
            profile.floor_db
        );
    }

    #[test]
    fn gate_attenuates_below_floor_material() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.start_learning();

        let noise_amp = db_to_linear(-50.0);
        let mut buf = vec![noise_amp; 1024];
        for _ in 0..20 {
            process_buf(&mut reducer, &mut buf);
            buf.fill(noise_amp);
        }
        reducer.stop_learning();
        reducer.set_mode(NoiseReductionMode::Aggressive);

        // Constant-level signal at the floor: every sample is below
        // threshold = floor + reduction/2, so everything is attenuated
        buf.fill(noise_amp);
        process_buf(&mut reducer, &mut buf);
        let out_db = rms_db_of(&buf);
        assert!(
            out_db < -55.0,
            "noise at the floor should be pushed down, got {} dB",
            out_db
        );
    }

    #[test]
    fn signal_above_threshold_passes_unchanged() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.start_learning();
        let mut buf = vec![db_to_linear(-50.0); 1024];
        for _ in 0..10 {
            let level = db_to_linear(-50.0);
            buf.fill(level);
            process_buf(&mut reducer, &mut buf);
        }
        reducer.stop_learning();
        reducer.set_mode(NoiseReductionMode::Moderate);

        // A loud constant signal sits far above threshold
        let loud = db_to_linear(-15.0);
        buf.fill(loud);
        process_buf(&mut reducer, &mut buf);
        for &s in &buf {
            assert_eq!(s, loud);
        }
    }

    #[test]
    fn gate_never_amplifies() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.set_mode(NoiseReductionMode::Aggressive);

        let mut buf: Vec<f32> = (0..2048)
            .map(|i| ((i as f32 * 0.37).sin() * 0.3))
            .collect();
        let original = buf.clone();
        process_buf(&mut reducer, &mut buf);

        for (out, orig) in buf.iter().zip(original.iter()) {
            assert!(out.abs() <= orig.abs() + 1e-7);
        }
    }

    #[test]
    fn adaptive_mode_tracks_quiet_material() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.set_mode(NoiseReductionMode::Adaptive);

        // Quiet blocks near the initial floor pull the estimate along
        let level = db_to_linear(-58.0);
        let mut buf = vec![level; 1024];
        for _ in 0..500 {
            buf.fill(level);
            process_buf(&mut reducer, &mut buf);
        }
        let floor = reducer.profile().floor_db;
        assert!(floor < -56.0, "adaptive floor should approach -58, got {}", floor);

        // Depth follows the floor: clamp(-(floor + 40), 6, 24)
        let expected = clamp(-(floor + 40.0), 6.0, 24.0);
        assert!((reducer.reduction_db() - expected).abs() < 1e-5);
    }

    #[test]
    fn empty_block_is_a_no_op() {
        let mut reducer = NoiseReducer::new(SR as f32);
        let mut buf: Vec<f32> = vec![];
        let mut block = AudioBlock::new(&mut buf, SR, 2).unwrap();
        reducer.process(&mut block);
        assert!(!reducer.profile().is_learned);
    }

    #[test]
    fn disabled_reducer_bypassed() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.set_mode(NoiseReductionMode::Aggressive);
        reducer.set_enabled(false);

        let mut buf = vec![0.0001; 512];
        let original = buf.clone();
        process_buf(&mut reducer, &mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn voice_enhance_keeps_presence_band() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.set_mode(NoiseReductionMode::Light);
        reducer.set_voice_enhance(true);

        // 2.5 kHz tone passes the HPF and lands on the presence peak
        let mut buf: Vec<f32> = (0..SR as usize)
            .flat_map(|i| {
                let s = (2.0 * std::f32::consts::PI * 2_500.0 * i as f32 / SR as f32).sin() * 0.1;
                [s, s]
            })
            .collect();
        let in_db = rms_db_of(&buf);
        for chunk in buf.chunks_mut(1024) {
            let mut block = AudioBlock::new(chunk, SR, 2).unwrap();
            reducer.process(&mut block);
        }
        let out_db = rms_db_of(&buf);
        assert!(
            out_db > in_db + 1.0,
            "presence peak should lift 2.5 kHz: in {} out {}",
            in_db,
            out_db
        );
    }

    #[test]
    fn reduction_is_clamped() {
        let mut reducer = NoiseReducer::new(SR as f32);
        reducer.set_reduction_db(99.0);
        assert_eq!(reducer.reduction_db(), 30.0);
        reducer.set_reduction_db(-5.0);
        assert_eq!(reducer.reduction_db(), 0.0);
    }
}

//! 10-band parametric equalizer
//!
//! Fixed-frequency peak filters on the ISO octave centers, processed in
//! series per channel. Filter state is strictly per channel; sharing it
//! would smear the stereo image.

use super::AudioEffect;
use serde::{Deserialize, Serialize};
use volumod_core::math::{clamp, db_to_linear};
use volumod_core::{AudioBlock, Biquad, FilterType, MAX_CHANNELS};

/// Number of EQ bands
pub const EQ_BAND_COUNT: usize = 10;

/// ISO octave band centers (Hz)
pub const ISO_BAND_FREQUENCIES: [f32; EQ_BAND_COUNT] = [
    31.0, 62.0, 125.0, 250.0, 500.0, 1_000.0, 2_000.0, 4_000.0, 8_000.0, 16_000.0,
];

/// Band gain limits (dB)
const MAX_BAND_GAIN_DB: f32 = 24.0;

/// Octave-bandwidth Q shared by all bands
const BAND_Q: f32 = std::f32::consts::SQRT_2;

/// Equalizer presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqPreset {
    /// All bands at 0 dB
    #[default]
    Flat,
    /// Midrange intelligibility for spoken word
    Speech,
    /// Gentle smile for general listening
    Music,
    /// Enhanced low end
    BassBoost,
    /// Enhanced high end
    TrebleBoost,
    /// Equal-loudness contour for low listening levels
    Loudness,
    /// Rising high-frequency compensation
    HearingAid,
    /// Tamed extremes for late-night listening
    NightMode,
    /// User-defined band gains
    Custom,
}

impl EqPreset {
    /// Gain curve for this preset (dB per band)
    pub fn gains(&self) -> [f32; EQ_BAND_COUNT] {
        match self {
            Self::Flat | Self::Custom => [0.0; EQ_BAND_COUNT],
            Self::Speech => [-6.0, -4.0, -2.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -2.0],
            Self::Music => [2.0, 1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 2.0, 2.0, 1.0],
            Self::BassBoost => [6.0, 5.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            Self::TrebleBoost => [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 5.0, 6.0],
            Self::Loudness => [6.0, 4.0, 1.0, 0.0, -1.0, 0.0, 1.0, 3.0, 4.0, 3.0],
            Self::HearingAid => [0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 5.0, 7.0, 9.0, 10.0],
            Self::NightMode => [-8.0, -6.0, -3.0, -1.0, 0.0, 2.0, 2.0, 1.0, 0.0, -1.0],
        }
    }

    /// Preset name for state reporting
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Speech => "speech",
            Self::Music => "music",
            Self::BassBoost => "bass_boost",
            Self::TrebleBoost => "treble_boost",
            Self::Loudness => "loudness",
            Self::HearingAid => "hearing_aid",
            Self::NightMode => "night_mode",
            Self::Custom => "custom",
        }
    }

    /// Parse from string (for settings persistence and wire commands)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Some(Self::Flat),
            "speech" => Some(Self::Speech),
            "music" => Some(Self::Music),
            "bass_boost" => Some(Self::BassBoost),
            "treble_boost" => Some(Self::TrebleBoost),
            "loudness" => Some(Self::Loudness),
            "hearing_aid" => Some(Self::HearingAid),
            "night_mode" => Some(Self::NightMode),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Preset from its wire index
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Flat),
            1 => Some(Self::Speech),
            2 => Some(Self::Music),
            3 => Some(Self::BassBoost),
            4 => Some(Self::TrebleBoost),
            5 => Some(Self::Loudness),
            6 => Some(Self::HearingAid),
            7 => Some(Self::NightMode),
            8 => Some(Self::Custom),
            _ => None,
        }
    }

    /// Wire index of this preset
    pub fn index(&self) -> u8 {
        match self {
            Self::Flat => 0,
            Self::Speech => 1,
            Self::Music => 2,
            Self::BassBoost => 3,
            Self::TrebleBoost => 4,
            Self::Loudness => 5,
            Self::HearingAid => 6,
            Self::NightMode => 7,
            Self::Custom => 8,
        }
    }
}

/// One EQ band: a peak filter per channel
struct EqBand {
    center_hz: f32,
    gain_db: f32,
    q: f32,
    filters: [Biquad; MAX_CHANNELS],
}

impl EqBand {
    fn new(center_hz: f32, sample_rate: f32) -> Self {
        let filter = Biquad::new(FilterType::Peak, center_hz, sample_rate, BAND_Q, 0.0);
        Self {
            center_hz,
            gain_db: 0.0,
            q: BAND_Q,
            filters: [filter; MAX_CHANNELS],
        }
    }

    fn set_gain(&mut self, gain_db: f32, sample_rate: f32) {
        self.gain_db = clamp(gain_db, -MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        for filter in &mut self.filters {
            filter.configure(FilterType::Peak, self.center_hz, sample_rate, self.q, self.gain_db);
            // Clear delay state so the new curve starts from rest instead
            // of ringing against stale history
            filter.reset();
        }
    }
}

/// 10-band parametric EQ with presets and master output gain
pub struct Equalizer {
    bands: [EqBand; EQ_BAND_COUNT],
    preset: EqPreset,
    output_gain_db: f32,
    enabled: bool,
    sample_rate: f32,
}

impl Equalizer {
    /// Create a flat equalizer
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bands: ISO_BAND_FREQUENCIES.map(|freq| EqBand::new(freq, sample_rate)),
            preset: EqPreset::Flat,
            output_gain_db: 0.0,
            enabled: true,
            sample_rate,
        }
    }

    /// Set one band's gain (clamped to ±24 dB); marks the curve Custom
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        if let Some(band) = self.bands.get_mut(index) {
            band.set_gain(gain_db, self.sample_rate);
            self.preset = EqPreset::Custom;
        }
    }

    /// Gain of one band, or None for an out-of-range index
    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(|b| b.gain_db)
    }

    /// Center frequency of one band
    pub fn band_frequency(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(|b| b.center_hz)
    }

    /// Apply a preset curve to all bands at once
    pub fn set_preset(&mut self, preset: EqPreset) {
        let gains = preset.gains();
        for (band, gain) in self.bands.iter_mut().zip(gains) {
            band.set_gain(gain, self.sample_rate);
        }
        self.preset = preset;
    }

    /// Apply an explicit gain set, tagging it with the preset it came from
    pub fn set_gains(&mut self, preset: EqPreset, gains: [f32; EQ_BAND_COUNT]) {
        for (band, gain) in self.bands.iter_mut().zip(gains) {
            band.set_gain(gain, self.sample_rate);
        }
        self.preset = preset;
    }

    /// All band gains
    pub fn gains(&self) -> [f32; EQ_BAND_COUNT] {
        let mut gains = [0.0; EQ_BAND_COUNT];
        for (gain, band) in gains.iter_mut().zip(&self.bands) {
            *gain = band.gain_db;
        }
        gains
    }

    /// Active preset
    pub fn preset(&self) -> EqPreset {
        self.preset
    }

    /// Master output gain (clamped to ±24 dB)
    pub fn set_output_gain_db(&mut self, gain_db: f32) {
        self.output_gain_db = clamp(gain_db, -MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
    }

    /// Current master output gain
    pub fn output_gain_db(&self) -> f32 {
        self.output_gain_db
    }

    /// True when every band is at 0 dB and there is no output gain
    fn is_identity(&self) -> bool {
        self.output_gain_db == 0.0 && self.bands.iter().all(|b| b.gain_db == 0.0)
    }
}

impl AudioEffect for Equalizer {
    fn process(&mut self, block: &mut AudioBlock) {
        if !self.enabled || block.is_empty() || self.is_identity() {
            return;
        }

        let output_gain = db_to_linear(self.output_gain_db);
        let channels = block.channels();

        for frame in 0..block.frame_count() {
            for ch in 0..channels {
                let mut sample = block.get(frame, ch);
                for band in &mut self.bands {
                    if band.gain_db != 0.0 {
                        sample = band.filters[ch].process(sample);
                    }
                }
                block.set(frame, ch, sample * output_gain);
            }
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            for filter in &mut band.filters {
                filter.reset();
            }
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &'static str {
        "Equalizer"
    }
}

//! K-weighting prefilter
//!
//! The two-stage filter cascade used before mean-square loudness
//! measurement (ITU-R BS.1770 style): a high-shelf that models the
//! acoustic effect of the head (+4 dB above ~1.5 kHz) followed by a
//! high-pass that removes inaudible low-frequency energy (~38 Hz).
//!
//! Each channel gets its own filter pair; state is never shared.

use volumod_core::{Biquad, FilterType, MAX_CHANNELS};

/// High-shelf stage center frequency (Hz)
const SHELF_HZ: f32 = 1_500.0;

/// High-shelf stage gain (dB)
const SHELF_GAIN_DB: f32 = 4.0;

/// High-pass stage cutoff (Hz)
const HIGHPASS_HZ: f32 = 38.0;

/// High-pass stage Q
const HIGHPASS_Q: f32 = 0.5;

/// Per-channel two-stage K-weighting cascade
#[derive(Debug, Clone)]
pub struct KWeighting {
    shelf: [Biquad; MAX_CHANNELS],
    highpass: [Biquad; MAX_CHANNELS],
}

impl KWeighting {
    /// Build the cascade for a sample rate
    pub fn new(sample_rate: f32) -> Self {
        let shelf = Biquad::new(
            FilterType::HighShelf,
            SHELF_HZ,
            sample_rate,
            std::f32::consts::FRAC_1_SQRT_2,
            SHELF_GAIN_DB,
        );
        let highpass = Biquad::new(FilterType::Highpass, HIGHPASS_HZ, sample_rate, HIGHPASS_Q, 0.0);
        Self {
            shelf: [shelf; MAX_CHANNELS],
            highpass: [highpass; MAX_CHANNELS],
        }
    }

    /// Run one stereo frame through the cascade
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let kl = self.highpass[0].process(self.shelf[0].process(left));
        let kr = self.highpass[1].process(self.shelf[1].process(right));
        (kl, kr)
    }

    /// Clear all filter state
    pub fn reset(&mut self) {
        for filter in self.shelf.iter_mut().chain(self.highpass.iter_mut()) {
            filter.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn weighted_rms(kw: &mut KWeighting, freq: f32, sample_rate: f32, seconds: f32) -> f32 {
        let n = (sample_rate * seconds) as usize;
        let mut sum_sq = 0.0;
        let mut count = 0;
        for i in 0..n {
            let s = (2.0 * PI * freq * i as f32 / sample_rate).sin() * 0.5;
            let (kl, _) = kw.process_frame(s, s);
            if i >= n / 2 {
                sum_sq += kl * kl;
                count += 1;
            }
        }
        (sum_sq / count as f32).sqrt()
    }

    #[test]
    fn shelf_boosts_high_frequencies() {
        let sr = 48_000.0;
        let mut kw = KWeighting::new(sr);
        let mid = weighted_rms(&mut kw, 1_000.0, sr, 0.5);
        kw.reset();
        let high = weighted_rms(&mut kw, 8_000.0, sr, 0.5);

        // The shelf should lift 8 kHz noticeably above 1 kHz
        let ratio_db = 20.0 * (high / mid).log10();
        assert!(
            ratio_db > 2.0 && ratio_db < 5.0,
            "shelf lift was {} dB",
            ratio_db
        );
    }

    #[test]
    fn highpass_rejects_subsonic_energy() {
        let sr = 48_000.0;
        let mut kw = KWeighting::new(sr);
        let sub = weighted_rms(&mut kw, 10.0, sr, 2.0);
        kw.reset();
        let mid = weighted_rms(&mut kw, 1_000.0, sr, 2.0);

        assert!(sub < mid * 0.25, "10 Hz rms {} vs 1 kHz rms {}", sub, mid);
    }

    #[test]
    fn channels_do_not_share_state() {
        let mut kw = KWeighting::new(48_000.0);
        // Drive only the left channel; the right output must stay silent
        for i in 0..1_000 {
            let s = ((i as f32) * 0.1).sin();
            let (_, kr) = kw.process_frame(s, 0.0);
            assert_eq!(kr, 0.0);
        }
    }

    #[test]
    fn reset_restores_silence() {
        let mut kw = KWeighting::new(48_000.0);
        kw.process_frame(1.0, 1.0);
        kw.reset();
        let (kl, kr) = kw.process_frame(0.0, 0.0);
        assert_eq!((kl, kr), (0.0, 0.0));
    }
}

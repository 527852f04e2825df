//! Brick-wall peak limiter
//!
//! The final safety stage of the chain. The limiter holds a gain
//! envelope in (0, 1]: when the per-frame peak would exceed the ceiling
//! the envelope snaps down instantly to exactly the ratio needed, and it
//! relaxes back toward unity with a one-pole release when the program
//! falls below the ceiling again.
//!
//! Because the attack is instantaneous and computed from the current
//! frame's peak, no output sample ever exceeds the ceiling, including
//! the first sample of an overshoot.

use super::AudioEffect;
use volumod_core::math::{clamp, db_to_linear, smooth_coef};
use volumod_core::AudioBlock;

/// Default output ceiling (dBFS)
const DEFAULT_CEILING_DB: f32 = -0.5;

/// Default release time (ms)
const DEFAULT_RELEASE_MS: f32 = 50.0;

/// Brick-wall limiter with instant attack and smoothed release
pub struct Limiter {
    ceiling_db: f32,
    ceiling_linear: f32,
    release_ms: f32,
    release_coef: f32,
    envelope: f32,
    enabled: bool,
    sample_rate: f32,
}

impl Limiter {
    /// Create a limiter with the default -0.5 dBFS ceiling
    pub fn new(sample_rate: f32) -> Self {
        Self {
            ceiling_db: DEFAULT_CEILING_DB,
            ceiling_linear: db_to_linear(DEFAULT_CEILING_DB),
            release_ms: DEFAULT_RELEASE_MS,
            release_coef: smooth_coef(DEFAULT_RELEASE_MS, sample_rate),
            envelope: 1.0,
            enabled: true,
            sample_rate,
        }
    }

    /// Set the output ceiling (clamped to -20..0 dBFS)
    pub fn set_ceiling_db(&mut self, ceiling_db: f32) {
        self.ceiling_db = clamp(ceiling_db, -20.0, 0.0);
        self.ceiling_linear = db_to_linear(self.ceiling_db);
    }

    /// Current ceiling (dBFS)
    pub fn ceiling_db(&self) -> f32 {
        self.ceiling_db
    }

    /// Set the release time (clamped to 10..2000 ms)
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = clamp(release_ms, 10.0, 2_000.0);
        self.release_coef = smooth_coef(self.release_ms, self.sample_rate);
    }

    /// Current gain envelope, 1.0 when idle
    pub fn envelope(&self) -> f32 {
        self.envelope
    }
}

impl AudioEffect for Limiter {
    fn process(&mut self, block: &mut AudioBlock) {
        if !self.enabled || block.is_empty() {
            return;
        }

        let channels = block.channels();
        for frame in 0..block.frame_count() {
            let mut peak = 0.0_f32;
            for ch in 0..channels {
                peak = peak.max(block.get(frame, ch).abs());
            }

            if peak > self.ceiling_linear {
                let target = self.ceiling_linear / peak;
                if self.envelope == 0.0 || target < self.envelope {
                    // Instant attack: exactly the gain that puts this
                    // frame at the ceiling
                    self.envelope = target;
                } else {
                    // Still limiting, but less than before: relax toward
                    // unity without letting this frame overshoot
                    self.envelope += self.release_coef * (1.0 - self.envelope);
                    if self.envelope > target {
                        self.envelope = target;
                    }
                }
            } else {
                self.envelope += self.release_coef * (1.0 - self.envelope);
            }

            if self.envelope < 1.0 {
                for ch in 0..channels {
                    let s = block.get(frame, ch);
                    block.set(frame, ch, s * self.envelope);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.envelope = 1.0;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &'static str {
        "Limiter"
    }
}

//! Signal measurement helpers for the test suites

use volumod_core::math::linear_to_db;

/// Peak absolute sample value
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |p, s| p.max(s.abs()))
}

/// Root-mean-square level; 0.0 for an empty slice
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// RMS level in dBFS (-120 dB floor for silence)
pub fn rms_dbfs(samples: &[f32]) -> f32 {
    linear_to_db(rms(samples))
}

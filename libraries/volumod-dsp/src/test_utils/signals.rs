//! Test signal generation
//!
//! Stereo interleaved generators for the signals the verification suites
//! lean on: sines, white and pink noise, and square waves.

use std::f32::consts::PI;

/// Generate a stereo sine wave
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
///
/// # Returns
/// Stereo interleaved samples (L, R, L, R, ...)
pub fn generate_sine_wave(
    frequency: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_frames * 2);

    for i in 0..num_frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency * t).sin() * amplitude;
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

/// Generate stereo white noise (uniform distribution)
pub fn generate_white_noise(sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_frames * 2);

    for _ in 0..num_frames {
        let sample = (rand::random::<f32>() * 2.0 - 1.0) * amplitude;
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

/// Generate stereo pink noise (1/f, Paul Kellett's refined method)
pub fn generate_pink_noise(sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_frames * 2);

    let mut b0 = 0.0_f32;
    let mut b1 = 0.0_f32;
    let mut b2 = 0.0_f32;
    let mut b3 = 0.0_f32;
    let mut b4 = 0.0_f32;
    let mut b5 = 0.0_f32;
    let mut b6 = 0.0_f32;

    for _ in 0..num_frames {
        let white = rand::random::<f32>() * 2.0 - 1.0;

        b0 = 0.99886 * b0 + white * 0.0555179;
        b1 = 0.99332 * b1 + white * 0.0750759;
        b2 = 0.96900 * b2 + white * 0.1538520;
        b3 = 0.86650 * b3 + white * 0.3104856;
        b4 = 0.55000 * b4 + white * 0.5329522;
        b5 = -0.7616 * b5 - white * 0.0168980;

        let pink = b0 + b1 + b2 + b3 + b4 + b5 + b6 + white * 0.5362;
        b6 = white * 0.115926;

        let sample = (pink * 0.11) * amplitude;
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

/// Generate a stereo square wave
pub fn generate_square_wave(
    frequency: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_frames = (sample_rate as f32 * duration) as usize;
    let mut samples = Vec::with_capacity(num_frames * 2);

    let period = sample_rate as f32 / frequency;

    for i in 0..num_frames {
        let phase = (i as f32 % period) / period;
        let sample = if phase < 0.5 { amplitude } else { -amplitude };
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

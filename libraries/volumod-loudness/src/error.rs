//! Error types for loudness estimation

use thiserror::Error;

/// Result type alias using `LoudnessError`
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur when building loudness components
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-2)")]
    InvalidChannelCount(usize),
}

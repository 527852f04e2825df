//! Error types for the core primitives

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised when constructing core components
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-2)")]
    InvalidChannelCount(usize),

    /// Buffer length is not a whole number of frames
    #[error("Buffer of {len} samples is not a whole number of {channels}-channel frames")]
    PartialFrame { len: usize, channels: usize },
}

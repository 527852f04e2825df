//! Engine-level errors
use thiserror::Error;

/// Result type alias using `EngineError`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the processing engine and its FFI boundary
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid stream format at construction
    #[error(transparent)]
    Core(#[from] volumod_core::CoreError),

    /// Invalid stream format reported by the loudness stage
    #[error(transparent)]
    Loudness(#[from] volumod_loudness::LoudnessError),

    /// Command issued against a missing processor handle
    #[error("Processor not initialized")]
    Uninitialized,

    /// Wire command type outside the known range
    #[error("Unknown command: {0}")]
    UnknownCommand(u8),

    /// Wire payload failed to decode
    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}

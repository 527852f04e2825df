//! Processing pipeline
//!
//! The [`Processor`] owns the five chain stages and runs them in a fixed
//! order per block; the [`Controller`] is its lock-free control-thread
//! handle. Metering flows back through atomics.

mod control;
mod meters;
mod processor;

pub use control::{Controller, Stage, StateSnapshot};
pub use meters::EngineMeters;
pub use processor::{Processor, ProcessorConfig};

pub(crate) use control::{SharedControl, STAGE_COUNT};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Constructed, no block processed yet
    #[default]
    Idle,
    /// Actively processing
    Active,
    /// Passing audio through untouched
    Bypassed,
    /// Unusable (reported for missing handles at the FFI boundary)
    Error,
}

impl EngineState {
    /// Wire index of this state
    pub fn index(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Active => 1,
            Self::Bypassed => 2,
            Self::Error => 3,
        }
    }

    /// State from its wire index; unknown values map to `Error`
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Idle,
            1 => Self::Active,
            2 => Self::Bypassed,
            _ => Self::Error,
        }
    }
}

//! Utilities shared by the integration test suites
//!
//! Standard test signals plus the measurement helpers the suites use to
//! judge them. Kept in the library (rather than duplicated per test
//! file) so every suite measures the same way.

pub mod analysis;
pub mod signals;

pub use analysis::{peak, rms, rms_dbfs};
pub use signals::{
    generate_pink_noise, generate_sine_wave, generate_square_wave, generate_white_noise,
};

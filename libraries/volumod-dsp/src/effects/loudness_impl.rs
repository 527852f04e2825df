//! Chain-stage integration for the loudness normalizer
//!
//! The normalizer lives in `volumod-loudness`; this adapter lets the
//! pipeline treat it like any other stage.

use super::AudioEffect;
use volumod_core::AudioBlock;
use volumod_loudness::LoudnessNormalizer;

impl AudioEffect for LoudnessNormalizer {
    fn process(&mut self, block: &mut AudioBlock) {
        LoudnessNormalizer::process(self, block)
    }

    fn reset(&mut self) {
        LoudnessNormalizer::reset(self)
    }

    fn set_enabled(&mut self, enabled: bool) {
        LoudnessNormalizer::set_enabled(self, enabled)
    }

    fn is_enabled(&self) -> bool {
        LoudnessNormalizer::is_enabled(self)
    }

    fn name(&self) -> &'static str {
        "Loudness Normalizer"
    }
}

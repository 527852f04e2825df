//! Property-based checks over the math primitives, the dynamics stages,
//! and the wire codec

use proptest::prelude::*;
use volumod_core::math::{clamp, db_to_linear, linear_to_db};
use volumod_core::AudioBlock;
use volumod_dsp::effects::{AudioEffect, CompressionMode, Compressor, Limiter};
use volumod_dsp::wire::Command;
use volumod_dsp::{Processor, ProcessorConfig};

proptest! {
    #[test]
    fn db_linear_round_trip(db in -120.0_f32..24.0) {
        let back = linear_to_db(db_to_linear(db));
        prop_assert!((back - db).abs() < 1e-3, "{} -> {}", db, back);
    }

    #[test]
    fn clamp_is_idempotent(v in -1_000.0_f32..1_000.0, lo in -10.0_f32..0.0, hi in 0.0_f32..10.0) {
        let once = clamp(v, lo, hi);
        prop_assert_eq!(clamp(once, lo, hi), once);
        prop_assert!(once >= lo && once <= hi);
    }

    #[test]
    fn compressor_reduction_is_never_negative(
        samples in prop::collection::vec(-1.5_f32..1.5, 64..1024),
    ) {
        let mut samples = samples;
        if samples.len() % 2 == 1 {
            samples.pop();
        }
        let mut comp = Compressor::with_mode(CompressionMode::Aggressive, 48_000.0);
        let mut block = AudioBlock::new(&mut samples, 48_000, 2).unwrap();
        comp.process(&mut block);
        prop_assert!(comp.gain_reduction_db() >= 0.0);
        prop_assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn limiter_bound_holds_for_any_block(
        samples in prop::collection::vec(-2.0_f32..2.0, 64..1024),
    ) {
        let mut samples = samples;
        if samples.len() % 2 == 1 {
            samples.pop();
        }
        let mut limiter = Limiter::new(48_000.0);
        let ceiling = db_to_linear(limiter.ceiling_db());
        let mut block = AudioBlock::new(&mut samples, 48_000, 2).unwrap();
        limiter.process(&mut block);
        for &s in samples.iter() {
            prop_assert!(s.abs() <= ceiling + 1e-5, "sample {} over {}", s, ceiling);
        }
    }

    #[test]
    fn command_codec_round_trips(
        cmd_type in 0_u8..=10,
        param_int in any::<i32>(),
        param_float in -1_000.0_f32..1_000.0,
        param_string in "[a-z_]{0,24}",
        param_bytes in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let cmd = Command {
            cmd_type,
            param_int,
            param_float,
            param_string,
            param_bytes,
        };
        let decoded = Command::decode(&cmd.encode()).unwrap();
        prop_assert_eq!(decoded, cmd);
    }

    #[test]
    fn setters_are_idempotent(target in -60.0_f32..0.0, band in 0_usize..10, gain in -24.0_f32..24.0) {
        let (_p1, mut c1) = Processor::new(ProcessorConfig::default()).unwrap();
        let (_p2, mut c2) = Processor::new(ProcessorConfig::default()).unwrap();

        c1.set_normalizer_target(target);
        c1.set_eq_band(band, gain);

        c2.set_normalizer_target(target);
        c2.set_normalizer_target(target);
        c2.set_eq_band(band, gain);
        c2.set_eq_band(band, gain);

        let s1 = c1.snapshot();
        let s2 = c2.snapshot();
        prop_assert_eq!(s1.eq_preset, s2.eq_preset);
        prop_assert_eq!(s1.bypassed, s2.bypassed);
    }
}

#[test]
fn silence_after_reset_is_silence_for_every_stage() {
    use volumod_dsp::effects::{Equalizer, EqPreset, NoiseReducer};

    let mut comp = Compressor::with_mode(CompressionMode::Aggressive, 48_000.0);
    let mut limiter = Limiter::new(48_000.0);
    let mut eq = Equalizer::new(48_000.0);
    eq.set_preset(EqPreset::Loudness);
    let mut gate = NoiseReducer::new(48_000.0);
    gate.set_voice_enhance(true);

    // Drive everything hard, then reset and feed silence
    let mut loud = vec![0.9_f32; 2_048];
    for stage in [
        &mut comp as &mut dyn AudioEffect,
        &mut limiter,
        &mut eq,
        &mut gate,
    ] {
        let mut block = AudioBlock::new(&mut loud, 48_000, 2).unwrap();
        stage.process(&mut block);
        stage.reset();

        let mut silence = vec![0.0_f32; 1_024];
        let mut block = AudioBlock::new(&mut silence, 48_000, 2).unwrap();
        stage.process(&mut block);
        assert!(
            silence.iter().all(|&s| s.abs() < 1e-6),
            "{} leaked signal after reset",
            stage.name()
        );
    }
}

//! Integration tests for the effect chain
//!
//! These tests verify the block-level guarantees of the chain: bypass at zero
//! mix, agreement with the voice filters at full mix, linear blending,
//! reset behaviour, long-run stability and the reference impulse response.

use filteroid_core::domain::{
    AudioBuffer, BiquadCoeffs, EffectChain, Mode, ProcessSpec, VoiceFilter, VoiceKind,
};
use proptest::prelude::*;

fn prepared_chain(sample_rate: f32, block_size: usize, channels: usize) -> EffectChain {
    let mut chain = EffectChain::new();
    chain
        .prepare(ProcessSpec::new(sample_rate, block_size, channels))
        .unwrap();
    chain
}

fn generate_sine_wave(frequency: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| 2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate)
        .map(|phase| phase.sin())
        .collect()
}

fn generate_noise(num_samples: usize, mut seed: u32) -> Vec<f32> {
    (0..num_samples)
        .map(|_| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        })
        .collect()
}

fn stereo(left: Vec<f32>, right: Vec<f32>) -> AudioBuffer {
    AudioBuffer::from_channels(vec![left, right]).unwrap()
}

/// Apply the mode's voices directly, without the chain
fn reference_wet(input: &AudioBuffer, mode: Mode, sample_rate: f32) -> AudioBuffer {
    let spec = ProcessSpec::new(sample_rate, input.num_samples(), input.num_channels());
    let mut wet = input.clone();
    for &kind in mode.voices() {
        let mut voice = VoiceFilter::new(kind);
        voice.prepare(&spec);
        voice.process(&mut wet);
    }
    wet
}

fn mode_strategy() -> impl Strategy<Value = Mode> {
    (0i32..3).prop_map(Mode::from_index)
}

fn buffer_strategy() -> impl Strategy<Value = AudioBuffer> {
    (1usize..700).prop_flat_map(|len| {
        (
            prop::collection::vec(-1.0f32..1.0, len),
            prop::collection::vec(-1.0f32..1.0, len),
        )
            .prop_map(|(left, right)| stereo(left, right))
    })
}

// ============================================================================
// BLEND PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_zero_mix_is_identity(buffer in buffer_strategy(), mode in mode_strategy()) {
        let mut chain = prepared_chain(48000.0, 256, 2);
        let mut processed = buffer.clone();
        chain.process_block(&mut processed, mode, 0.0);
        prop_assert_eq!(processed, buffer);
    }

    #[test]
    fn prop_mix_is_linear(
        buffer in buffer_strategy(),
        mode in mode_strategy(),
        mix in 0.0f32..=1.0,
    ) {
        let mut chain = prepared_chain(44100.0, 256, 2);
        let wet = reference_wet(&buffer, mode, 44100.0);

        let mut processed = buffer.clone();
        chain.process_block(&mut processed, mode, mix);

        // Below the wet threshold the chain returns the dry signal unchanged
        let effective = if mix < chain.config().wet_threshold { 0.0 } else { mix };
        for ch in 0..2 {
            let rows = buffer.channel(ch).iter().zip(wet.channel(ch)).zip(processed.channel(ch));
            for ((&dry, &w), &out) in rows {
                let expected = dry * (1.0 - effective) + w * effective;
                prop_assert!(
                    (out - expected).abs() <= 1e-5,
                    "expected {}, got {} (mix {})", expected, out, mix
                );
            }
        }
    }
}

#[test]
fn test_full_wet_matches_voice_filters() {
    for sample_rate in [22050.0, 44100.0, 48000.0, 96000.0] {
        let input = stereo(generate_noise(2048, 7), generate_sine_wave(1000.0, sample_rate, 2048));

        for mode in Mode::ALL {
            let mut chain = prepared_chain(sample_rate, 2048, 2);
            let mut processed = input.clone();
            chain.process_block(&mut processed, mode, 1.0);

            assert_eq!(
                processed,
                reference_wet(&input, mode, sample_rate),
                "{} at {sample_rate} Hz",
                mode.name()
            );
        }
    }
}

#[test]
fn test_custom_is_telephone_then_radio() {
    let input = stereo(generate_noise(1024, 3), generate_noise(1024, 4));
    let spec = ProcessSpec::new(48000.0, 1024, 2);

    let mut expected = input.clone();
    let mut telephone = VoiceFilter::telephone();
    let mut radio = VoiceFilter::radio();
    telephone.prepare(&spec);
    radio.prepare(&spec);
    telephone.process(&mut expected);
    radio.process(&mut expected);

    let mut chain = prepared_chain(48000.0, 1024, 2);
    let mut processed = input;
    chain.process_block(&mut processed, Mode::Custom, 1.0);
    assert_eq!(processed, expected);
}

#[test]
fn test_order_of_voices_matters() {
    let spec = ProcessSpec::new(48000.0, 4096, 1);
    let input = AudioBuffer::from_channels(vec![generate_noise(4096, 11)]).unwrap();

    let run = |order: [VoiceKind; 2]| {
        let mut signal = input.clone();
        let mut intermediate = None;
        for kind in order {
            let mut voice = VoiceFilter::new(kind);
            voice.prepare(&spec);
            voice.process(&mut signal);
            intermediate.get_or_insert_with(|| signal.clone());
        }
        (intermediate.unwrap(), signal)
    };

    let (tel_first_mid, tel_then_radio) = run([VoiceKind::Telephone, VoiceKind::Radio]);
    let (radio_first_mid, radio_then_tel) = run([VoiceKind::Radio, VoiceKind::Telephone]);

    assert_ne!(tel_then_radio, radio_then_tel);
    // The signal between the two voices is very different in each order
    assert!((tel_first_mid.peak() - radio_first_mid.peak()).abs() > 0.05);
}

// ============================================================================
// STATE
// ============================================================================

#[test]
fn test_reset_is_idempotent() {
    let fresh = prepared_chain(48000.0, 256, 2);
    let mut chain = fresh.clone();

    let mut buffer = stereo(generate_noise(1000, 1), generate_noise(1000, 2));
    chain.process_block(&mut buffer, Mode::Custom, 0.7);
    assert_ne!(chain.voice(VoiceKind::Radio), fresh.voice(VoiceKind::Radio));

    for _ in 0..3 {
        chain.reset();
        for kind in VoiceKind::ALL {
            assert_eq!(chain.voice(kind), fresh.voice(kind));
        }
    }

    // A reset chain behaves exactly like a freshly prepared one
    let input = stereo(generate_noise(300, 5), generate_noise(300, 6));
    let mut a = input.clone();
    let mut b = input;
    chain.process_block(&mut a, Mode::Radio, 1.0);
    fresh.clone().process_block(&mut b, Mode::Radio, 1.0);
    assert_eq!(a, b);
}

#[test]
fn test_sine_sweep_stays_bounded() {
    const SAMPLE_RATE: f32 = 48000.0;
    const BLOCK: usize = 512;
    const SECONDS: usize = 10;

    let total = SAMPLE_RATE as usize * SECONDS;
    let (f0, f1) = (20.0_f64, SAMPLE_RATE as f64 / 2.0);
    let ratio = (f1 / f0).ln();

    for mode in Mode::ALL {
        let mut chain = prepared_chain(SAMPLE_RATE, BLOCK, 2);
        let mut block = AudioBuffer::new(2, BLOCK);
        let mut phase = 0.0_f64;
        let mut peak = 0.0_f32;
        let mut n = 0;

        while n < total {
            let len = BLOCK.min(total - n);
            block.set_num_samples(len);
            for i in 0..len {
                // Exponential sweep, full scale
                let t = (n + i) as f64 / total as f64;
                let freq = f0 * (ratio * t).exp();
                phase += 2.0 * std::f64::consts::PI * freq / SAMPLE_RATE as f64;
                let s = phase.sin() as f32;
                block.channel_mut(0)[i] = s;
                block.channel_mut(1)[i] = -s;
            }

            chain.process_block(&mut block, mode, 1.0);
            for ch in 0..2 {
                for &s in block.channel(ch) {
                    assert!(s.is_finite(), "{} produced {s} at sample {n}", mode.name());
                    peak = peak.max(s.abs());
                }
            }
            n += len;
        }

        assert!(peak < 4.0, "{} peaked at {peak}", mode.name());
        assert!(peak > 0.5, "{} swallowed the sweep (peak {peak})", mode.name());
    }
}

// ============================================================================
// REFERENCE SCENARIO
// ============================================================================

#[test]
fn test_telephone_impulse_response_at_44100() {
    const SAMPLE_RATE: f32 = 44100.0;
    const BLOCK: usize = 512;

    let mut chain = prepared_chain(SAMPLE_RATE, BLOCK, 2);
    let mut buffer = AudioBuffer::new(2, BLOCK);
    buffer.channel_mut(0)[0] = 1.0;
    chain.process_block(&mut buffer, Mode::Telephone, 1.0);

    // Two direct-form I sections in series, straight from the coefficients
    let [hp_spec, lp_spec] = VoiceKind::Telephone.stage_specs();
    let sections = [
        BiquadCoeffs::design(&hp_spec, SAMPLE_RATE),
        BiquadCoeffs::design(&lp_spec, SAMPLE_RATE),
    ];
    let mut expected: Vec<f32> = (0..BLOCK).map(|n| if n == 0 { 1.0 } else { 0.0 }).collect();
    for c in sections {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0_f32, 0.0_f32, 0.0_f32, 0.0_f32);
        for sample in expected.iter_mut() {
            let x = *sample;
            let y = c.b0 * x + c.b1 * x1 + c.b2 * x2 - c.a1 * y1 - c.a2 * y2;
            (x2, x1, y2, y1) = (x1, x, y1, y);
            *sample = y;
        }
    }

    for (n, (&out, &exp)) in buffer.channel(0).iter().zip(&expected).enumerate() {
        assert!((out - exp).abs() < 1e-6, "sample {n}: expected {exp}, got {out}");
    }

    // The band-pass response starts positive, swings negative and dies away
    let response = buffer.channel(0);
    assert!(response[0] > 0.0);
    assert!(response[..64].iter().any(|&s| s < 0.0));
    assert!(response[BLOCK - 16..].iter().all(|s| s.abs() < 1e-3));

    assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
}

//! Integration tests for the parameter-driven processor
//!
//! Covers the path a host takes: configuration file to processor, control
//! thread writes racing the audio loop, and the bypass policies.

use filteroid_core::domain::{
    AudioBuffer, BypassPolicy, ChainConfig, EffectChain, FilteroidConfig, Mode,
    ParameterSnapshot, ProcessSpec, SharedParameters, VoiceProcessor,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn dc_buffer(channels: usize, frames: usize, value: f32) -> AudioBuffer {
    AudioBuffer::from_channels(vec![vec![value; frames]; channels]).unwrap()
}

#[tokio::test]
async fn test_processor_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("filteroid.toml");
    tokio::fs::write(
        &path,
        r#"
        [processing]
        sample_rate = 44100
        block_size = 128
        channels = 2

        [params]
        mode = "radio"
        mix = 0.5
        "#,
    )
    .await
    .unwrap();

    let config = FilteroidConfig::load_from_file(&path).await.unwrap();
    let mut processor = VoiceProcessor::with_parameters(config.params, config.chain);
    processor.prepare(config.processing.to_spec()).unwrap();

    let mut buffer = dc_buffer(2, 128, 0.5);
    let used = processor.process(&mut buffer);
    assert_eq!(used.mode, Mode::Radio);
    assert_eq!(used.mix, 0.5);

    let mut chain = EffectChain::new();
    chain.prepare(ProcessSpec::new(44100.0, 128, 2)).unwrap();
    let mut expected = dc_buffer(2, 128, 0.5);
    chain.process_block(&mut expected, Mode::Radio, 0.5);
    assert_eq!(buffer, expected);
}

#[tokio::test]
async fn test_saved_defaults_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("defaults.toml");

    FilteroidConfig::default().save_to_file(&path).await.unwrap();
    let loaded = FilteroidConfig::load_from_file(&path).await.unwrap();

    assert_eq!(loaded, FilteroidConfig::default());
    assert_eq!(loaded.params, ParameterSnapshot::default());
}

#[test]
fn test_control_thread_writes_during_processing() {
    let params = Arc::new(SharedParameters::default());
    let mut processor = VoiceProcessor::new(Arc::clone(&params), ChainConfig::default());
    processor
        .prepare(ProcessSpec::new(48000.0, 64, 2))
        .unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let control = {
        let params = Arc::clone(&params);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut i = 0_i32;
            while running.load(Ordering::Relaxed) {
                params.set_mode_index(i % 4);
                params.set_mix((i % 11) as f32 / 10.0);
                params.set_enabled(i % 7 != 0);
                i = i.wrapping_add(1);
                thread::yield_now();
            }
        })
    };

    for n in 0..2000 {
        let mut buffer = dc_buffer(2, 64, if n % 2 == 0 { 0.9 } else { -0.9 });
        let used = processor.process(&mut buffer);
        assert!((0.0..=1.0).contains(&used.mix));
        assert!(buffer.channel(0).iter().all(|s| s.is_finite()));
    }

    running.store(false, Ordering::Relaxed);
    control.join().unwrap();
}

#[test]
fn test_bypass_policies() {
    for (policy, expected_peak) in [(BypassPolicy::PassThrough, 0.3), (BypassPolicy::Silence, 0.0)] {
        let config = ChainConfig {
            bypass: policy,
            ..ChainConfig::default()
        };
        let initial = ParameterSnapshot {
            enabled: false,
            ..ParameterSnapshot::default()
        };
        let mut processor = VoiceProcessor::with_parameters(initial, config);
        processor
            .prepare(ProcessSpec::new(48000.0, 32, 1))
            .unwrap();

        let mut buffer = dc_buffer(1, 32, 0.3);
        processor.process(&mut buffer);
        assert_eq!(buffer.peak(), expected_peak, "{policy:?}");
    }
}

#[test]
fn test_mode_switch_matches_fresh_chain() {
    let params = Arc::new(SharedParameters::default());
    let mut processor = VoiceProcessor::new(Arc::clone(&params), ChainConfig::default());
    processor
        .prepare(ProcessSpec::new(48000.0, 256, 2))
        .unwrap();

    processor.process(&mut dc_buffer(2, 256, 0.4));
    params.set_mode(Mode::Custom);
    let mut switched = dc_buffer(2, 256, 0.4);
    processor.process(&mut switched);

    // History was cleared on the switch, so Custom starts from rest
    let mut chain = EffectChain::new();
    chain.prepare(ProcessSpec::new(48000.0, 256, 2)).unwrap();
    let mut expected = dc_buffer(2, 256, 0.4);
    chain.process_block(&mut expected, Mode::Custom, 1.0);
    assert_eq!(switched, expected);
}

//! Mode routing and wet/dry blending
//!
//! `EffectChain` owns one filter per voice plus a scratch buffer sized at
//! prepare time. Every block is copied into the scratch buffer, run through
//! the voices the mode selects, and crossfaded back over the dry input.
//!
//! Real-time contract of `process_block`: no allocation, no locks, no
//! logging, no panics in release builds.

use crate::domain::audio::{AudioBuffer, AudioError, ProcessSpec, Result};
use crate::domain::params::{clamp_mix, Mode};
use crate::domain::voice::{VoiceFilter, VoiceKind};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Wet amounts below this skip filtering entirely
///
/// Below the threshold the output is exactly the input; above it the blend
/// applies. The step is inaudible at this level.
pub const DEFAULT_WET_THRESHOLD: f32 = 0.001;

/// What the caller does with a block while the effect is disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassPolicy {
    /// Leave the input untouched
    #[default]
    PassThrough,
    /// Replace the block with silence
    Silence,
}

/// Tuning knobs of the chain and its caller-level gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Early-exit threshold for the wet amount
    pub wet_threshold: f32,
    /// Clear filter history when the mode changes between blocks
    pub reset_on_mode_change: bool,
    /// Behaviour while disabled
    pub bypass: BypassPolicy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            wet_threshold: DEFAULT_WET_THRESHOLD,
            reset_on_mode_change: true,
            bypass: BypassPolicy::default(),
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.wet_threshold) {
            return Err(AudioError::InvalidConfiguration(format!(
                "wet threshold must be in [0, 1), got {}",
                self.wet_threshold
            )));
        }
        Ok(())
    }
}

/// Routes blocks through the mode-selected voices and blends wet with dry
#[derive(Debug, Clone)]
pub struct EffectChain {
    voices: [VoiceFilter; 2],
    scratch: AudioBuffer,
    spec: Option<ProcessSpec>,
    config: ChainConfig,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            voices: VoiceKind::ALL.map(VoiceFilter::new),
            scratch: AudioBuffer::new(0, 0),
            spec: None,
            config,
        }
    }

    /// Prepare both voices and size the scratch buffer
    ///
    /// Fails fast on an invalid spec. Never call from the audio thread: this
    /// is where all allocation happens. Re-preparing starts from fresh state.
    pub fn prepare(&mut self, spec: ProcessSpec) -> Result<()> {
        spec.validate()?;
        self.config.validate()?;

        for voice in &mut self.voices {
            voice.prepare(&spec);
        }
        self.scratch = AudioBuffer::new(spec.num_channels, spec.max_block_size);
        self.spec = Some(spec);

        info!(
            sample_rate = spec.sample_rate,
            max_block_size = spec.max_block_size,
            channels = spec.num_channels,
            wet_threshold = self.config.wet_threshold,
            "Effect chain prepared"
        );
        Ok(())
    }

    /// Process one block in place
    ///
    /// `mix` is clamped to [0, 1]. Blocks longer than the prepared maximum
    /// are handled in consecutive chunks; channels beyond the prepared count
    /// stay dry. Prepared channels the block does not carry keep their
    /// filter history untouched. Calling before `prepare` leaves the block untouched.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer, mode: Mode, mix: f32) {
        let Some(spec) = self.spec else {
            debug_assert!(false, "process_block called before prepare");
            return;
        };
        debug_assert!(
            buffer.num_channels() <= spec.num_channels,
            "block has {} channels, chain was prepared for {}",
            buffer.num_channels(),
            spec.num_channels
        );

        let mix = clamp_mix(mix);
        if mix < self.config.wet_threshold {
            return;
        }

        let dry_gain = 1.0 - mix;
        let channels = buffer.num_channels().min(spec.num_channels);
        let total = buffer.num_samples();
        let mut offset = 0;

        while offset < total {
            let len = (total - offset).min(spec.max_block_size);

            self.scratch.copy_region_from(buffer, offset, len);
            for voice in mode.voices() {
                self.voices[voice.index()].process_channels(&mut self.scratch, channels);
            }

            for ch in 0..channels {
                let wet = self.scratch.channel(ch);
                let dry = &mut buffer.channel_mut(ch)[offset..offset + len];
                for (d, &w) in dry.iter_mut().zip(wet) {
                    *d = *d * dry_gain + w * mix;
                }
            }

            offset += len;
        }
    }

    /// Process a block using a raw host mode value
    pub fn process_block_raw(&mut self, buffer: &mut AudioBuffer, mode: i32, mix: f32) {
        self.process_block(buffer, Mode::from_index(mode), mix);
    }

    /// Clear the filter history of both voices
    ///
    /// The scratch buffer is left alone; the next block overwrites it.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    pub fn spec(&self) -> Option<&ProcessSpec> {
        self.spec.as_ref()
    }

    /// Sample rate of the last prepare, for diagnostics
    pub fn sample_rate(&self) -> Option<f32> {
        self.spec.map(|s| s.sample_rate)
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn voice(&self, kind: VoiceKind) -> &VoiceFilter {
        &self.voices[kind.index()]
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}

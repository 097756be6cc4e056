//! Parameter-driven front end of the effect chain
//!
//! `VoiceProcessor` is what an audio callback owns: it takes one parameter
//! snapshot per block, applies the bypass policy while disabled, clears
//! filter history on mode changes and re-enables, and hands the block to
//! the chain.

use crate::domain::audio::{AudioBuffer, ProcessSpec, Result};
use crate::domain::chain::{BypassPolicy, ChainConfig, EffectChain};
use crate::domain::params::{Mode, ParameterSnapshot, SharedParameters};
use std::sync::Arc;
use tracing::info;

/// Display name of the effect
pub const PROCESSOR_NAME: &str = "paranoidFilteroid";

pub struct VoiceProcessor {
    chain: EffectChain,
    params: Arc<SharedParameters>,
    bypass: BypassPolicy,
    reset_on_mode_change: bool,
    last_mode: Option<Mode>,
    was_enabled: bool,
}

impl VoiceProcessor {
    pub fn new(params: Arc<SharedParameters>, config: ChainConfig) -> Self {
        Self {
            chain: EffectChain::with_config(config),
            params,
            bypass: config.bypass,
            reset_on_mode_change: config.reset_on_mode_change,
            last_mode: None,
            was_enabled: true,
        }
    }

    /// Build a processor with its own parameter store seeded from `initial`
    pub fn with_parameters(initial: ParameterSnapshot, config: ChainConfig) -> Self {
        Self::new(Arc::new(SharedParameters::new(initial)), config)
    }

    pub fn prepare(&mut self, spec: ProcessSpec) -> Result<()> {
        self.chain.prepare(spec)?;
        self.last_mode = None;
        self.was_enabled = true;

        let params = self.params.snapshot();
        info!(
            mode = params.mode.name(),
            mix = params.mix,
            enabled = params.enabled,
            bypass = ?self.bypass,
            "Processor ready"
        );
        Ok(())
    }

    /// Process one block in place and return the parameters it used
    pub fn process(&mut self, buffer: &mut AudioBuffer) -> ParameterSnapshot {
        let params = self.params.snapshot();

        if !params.enabled {
            if self.bypass == BypassPolicy::Silence {
                buffer.clear();
            }
            self.was_enabled = false;
            return params;
        }

        let mode_changed = self.last_mode.is_some_and(|m| m != params.mode);
        if !self.was_enabled || (self.reset_on_mode_change && mode_changed) {
            self.chain.reset();
        }
        self.was_enabled = true;
        self.last_mode = Some(params.mode);

        self.chain.process_block(buffer, params.mode, params.mix);
        params
    }

    pub fn reset(&mut self) {
        self.chain.reset();
    }

    pub fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    /// Handle for control-thread writes
    pub fn parameters(&self) -> &Arc<SharedParameters> {
        &self.params
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }

    pub fn bypass_policy(&self) -> BypassPolicy {
        self.bypass
    }
}

//! Voice character filters
//!
//! Each voice is a fixed two-stage biquad cascade. The stage designs live in
//! data (`VoiceKind::stage_specs`) so a single generic `BiquadStage` serves
//! every variant and the Custom mode is a plain concatenation of cascades.

use crate::domain::audio::{AudioBuffer, ProcessSpec};
use crate::domain::biquad::{BiquadStage, FilterSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Design constants for the voice cascades
pub mod design {
    /// Telephone band lower edge (rumble removal)
    pub const TELEPHONE_HIGH_PASS_HZ: f32 = 300.0;
    pub const TELEPHONE_HIGH_PASS_Q: f32 = 1.0;
    /// Telephone band upper edge (sibilance removal)
    pub const TELEPHONE_LOW_PASS_HZ: f32 = 3400.0;
    pub const TELEPHONE_LOW_PASS_Q: f32 = 1.0;

    /// Radio rumble filter
    pub const RADIO_HIGH_PASS_HZ: f32 = 100.0;
    pub const RADIO_HIGH_PASS_Q: f32 = 0.7;
    /// Radio presence peak
    pub const RADIO_PRESENCE_HZ: f32 = 3500.0;
    pub const RADIO_PRESENCE_Q: f32 = 2.0;
    /// +6 dB as an amplitude factor
    pub const RADIO_PRESENCE_GAIN: f32 = 2.0;
}

/// Number of biquads in every voice cascade
pub const STAGES_PER_VOICE: usize = 2;

/// Which voice character a filter produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceKind {
    /// Narrow 300–3400 Hz band
    Telephone,
    /// Rumble cut plus presence boost
    Radio,
}

impl VoiceKind {
    pub const ALL: [VoiceKind; 2] = [VoiceKind::Telephone, VoiceKind::Radio];

    /// Slot of this voice in per-voice arrays
    pub const fn index(self) -> usize {
        match self {
            VoiceKind::Telephone => 0,
            VoiceKind::Radio => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            VoiceKind::Telephone => "Telephone",
            VoiceKind::Radio => "Radio",
        }
    }

    /// Ordered stage designs; stage 1 always removes low end first
    pub const fn stage_specs(self) -> [FilterSpec; STAGES_PER_VOICE] {
        use design::*;
        match self {
            VoiceKind::Telephone => [
                FilterSpec::high_pass(TELEPHONE_HIGH_PASS_HZ, TELEPHONE_HIGH_PASS_Q),
                FilterSpec::low_pass(TELEPHONE_LOW_PASS_HZ, TELEPHONE_LOW_PASS_Q),
            ],
            VoiceKind::Radio => [
                FilterSpec::high_pass(RADIO_HIGH_PASS_HZ, RADIO_HIGH_PASS_Q),
                FilterSpec::peaking(RADIO_PRESENCE_HZ, RADIO_PRESENCE_Q, RADIO_PRESENCE_GAIN),
            ],
        }
    }
}

/// A fixed cascade of biquad stages giving one voice character
///
/// Stages are owned by value and processed strictly in order; the cascade
/// is not commutative once the peaking stage is involved.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceFilter {
    kind: VoiceKind,
    stages: [BiquadStage; STAGES_PER_VOICE],
    sample_rate: f32,
}

impl VoiceFilter {
    pub fn new(kind: VoiceKind) -> Self {
        Self {
            kind,
            stages: kind.stage_specs().map(BiquadStage::new),
            sample_rate: 0.0,
        }
    }

    pub fn telephone() -> Self {
        Self::new(VoiceKind::Telephone)
    }

    pub fn radio() -> Self {
        Self::new(VoiceKind::Radio)
    }

    /// Prepare every stage for the same rate and channel layout
    ///
    /// Cutoffs above Nyquist for very low sample rates are a caller
    /// precondition and are not corrected here.
    pub fn prepare(&mut self, spec: &ProcessSpec) {
        self.sample_rate = spec.sample_rate;
        for (stage, filter) in self.stages.iter_mut().zip(self.kind.stage_specs()) {
            stage.prepare(spec.sample_rate, spec.num_channels, filter);
        }
        debug!(
            voice = self.kind.name(),
            sample_rate = spec.sample_rate,
            channels = spec.num_channels,
            "Voice filter prepared"
        );
    }

    /// Run stage 1 then stage 2 over the whole buffer, in place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        self.process_channels(buffer, buffer.num_channels());
    }

    /// Like `process`, restricted to the first `channels` channels
    pub fn process_channels(&mut self, buffer: &mut AudioBuffer, channels: usize) {
        for stage in &mut self.stages {
            stage.process_channels(buffer, channels);
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    pub fn kind(&self) -> VoiceKind {
        self.kind
    }

    pub fn stages(&self) -> &[BiquadStage] {
        &self.stages
    }

    /// Sample rate of the last prepare (0 before the first)
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Combined linear magnitude of the cascade at `freq`
    pub fn magnitude_at(&self, freq: f32) -> f32 {
        self.stages.iter().map(|s| s.magnitude_at(freq)).product()
    }
}

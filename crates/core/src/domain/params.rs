//! Effect parameters and their lock-free storage
//!
//! Three parameters drive the processor: `mode`, `mix` and `enabled`. A
//! control thread writes them at any time; the audio thread takes one
//! snapshot per block with a single relaxed load per parameter.

use crate::domain::biquad::FilterSpec;
use crate::domain::voice::VoiceKind;
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// Parameter identifiers as published to a host
pub const MODE_ID: &str = "mode";
pub const MIX_ID: &str = "mix";
pub const ENABLED_ID: &str = "enabled";

/// Default wet amount (fully wet)
pub const DEFAULT_MIX: f32 = 1.0;
/// Default enabled state
pub const DEFAULT_ENABLED: bool = true;

/// Routing mode of the effect chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Narrowband phone voice
    #[default]
    Telephone = 0,
    /// Bright presence voice
    Radio = 1,
    /// Telephone followed by Radio
    Custom = 2,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Telephone, Mode::Radio, Mode::Custom];
    pub const NAMES: [&'static str; 3] = ["Telephone", "Radio", "Custom"];

    /// Decode a raw host value; anything unknown falls back to Telephone
    pub const fn from_index(index: i32) -> Self {
        match index {
            1 => Mode::Radio,
            2 => Mode::Custom,
            _ => Mode::Telephone,
        }
    }

    pub const fn index(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Voice filters applied in this mode, in processing order
    pub const fn voices(self) -> &'static [VoiceKind] {
        match self {
            Mode::Telephone => &[VoiceKind::Telephone],
            Mode::Radio => &[VoiceKind::Radio],
            Mode::Custom => &[VoiceKind::Telephone, VoiceKind::Radio],
        }
    }

    /// The full biquad cascade of this mode, in processing order
    pub fn stage_specs(self) -> impl Iterator<Item = FilterSpec> {
        self.voices().iter().flat_map(|voice| voice.stage_specs())
    }
}

/// Clamp a wet amount to [0, 1]; NaN counts as fully dry
#[inline]
pub fn clamp_mix(mix: f32) -> f32 {
    if mix.is_nan() {
        0.0
    } else {
        mix.clamp(0.0, 1.0)
    }
}

/// Plain-value view of all parameters for one block
///
/// Also the explicit starting configuration of a processor and the shape
/// persisted under `[params]` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSnapshot {
    pub mode: Mode,
    pub mix: f32,
    pub enabled: bool,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            mix: DEFAULT_MIX,
            enabled: DEFAULT_ENABLED,
        }
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Value domain of a published parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    Choice {
        options: &'static [&'static str],
        default: usize,
    },
    Float {
        min: f32,
        max: f32,
        default: f32,
    },
    Bool {
        default: bool,
    },
}

/// Descriptor of one published parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ParameterKind,
}

/// Everything a host shell needs to expose the parameters
pub const PARAMETER_LAYOUT: [ParameterInfo; 3] = [
    ParameterInfo {
        id: MODE_ID,
        name: "Mode",
        kind: ParameterKind::Choice {
            options: &Mode::NAMES,
            default: Mode::Telephone as usize,
        },
    },
    ParameterInfo {
        id: MIX_ID,
        name: "Mix",
        kind: ParameterKind::Float {
            min: 0.0,
            max: 1.0,
            default: DEFAULT_MIX,
        },
    },
    ParameterInfo {
        id: ENABLED_ID,
        name: "Enabled",
        kind: ParameterKind::Bool {
            default: DEFAULT_ENABLED,
        },
    },
];

/// Look up a parameter descriptor by id
pub fn parameter_info(id: &str) -> Option<&'static ParameterInfo> {
    PARAMETER_LAYOUT.iter().find(|info| info.id == id)
}

// ============================================================================
// SHARED STORE
// ============================================================================

/// Lock-free parameter store shared between control and audio threads
///
/// Each value sits in its own cache line. Mix is stored as raw `f32` bits
/// and clamped by the reader, mode as the raw host index and decoded with
/// the Telephone fallback.
#[derive(Debug)]
pub struct SharedParameters {
    mode: CachePadded<AtomicI32>,
    mix: CachePadded<AtomicU32>,
    enabled: CachePadded<AtomicBool>,
}

impl SharedParameters {
    pub fn new(initial: ParameterSnapshot) -> Self {
        Self {
            mode: CachePadded::new(AtomicI32::new(initial.mode.index())),
            mix: CachePadded::new(AtomicU32::new(initial.mix.to_bits())),
            enabled: CachePadded::new(AtomicBool::new(initial.enabled)),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode.index(), Ordering::Relaxed);
    }

    /// Store a raw choice index exactly as a host delivered it
    pub fn set_mode_index(&self, index: i32) {
        self.mode.store(index, Ordering::Relaxed);
    }

    pub fn set_mix(&self, mix: f32) {
        self.mix.store(mix.to_bits(), Ordering::Relaxed);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Overwrite every parameter, e.g. when restoring saved state
    pub fn apply(&self, snapshot: ParameterSnapshot) {
        self.set_mode(snapshot.mode);
        self.set_mix(snapshot.mix);
        self.set_enabled(snapshot.enabled);
    }

    /// One load per parameter; safe on the audio thread
    #[inline]
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            mode: Mode::from_index(self.mode.load(Ordering::Relaxed)),
            mix: clamp_mix(f32::from_bits(self.mix.load(Ordering::Relaxed))),
            enabled: self.enabled.load(Ordering::Relaxed),
        }
    }
}

impl Default for SharedParameters {
    fn default() -> Self {
        Self::new(ParameterSnapshot::default())
    }
}

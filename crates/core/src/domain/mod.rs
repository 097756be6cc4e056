//! Domain entities and business rules

pub mod audio;
pub mod biquad;
pub mod voice;
pub mod params;
pub mod chain;
pub mod processor;
pub mod config;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioBuffer, AudioError, ProcessSpec};
pub use biquad::{BiquadCoeffs, BiquadStage, FilterKind, FilterSpec};
pub use chain::{BypassPolicy, ChainConfig, EffectChain, DEFAULT_WET_THRESHOLD};
pub use config::{ConfigError, FilteroidConfig, ProcessingConfig};
pub use params::{
    Mode, ParameterInfo, ParameterKind, ParameterSnapshot, SharedParameters, PARAMETER_LAYOUT,
};
pub use processor::VoiceProcessor;
pub use voice::{VoiceFilter, VoiceKind};

//! Filteroid core: telephone and radio voice filtering
//!
//! The `domain` tree holds the biquad cascade, the mode-routed effect chain
//! with its wet/dry blend, the lock-free parameter store and the TOML
//! configuration layer. Nothing on the processing path allocates, locks or
//! logs.

pub mod domain;

//! Configuration management for Filteroid
//!
//! This module provides:
//! - Processing settings (sample rate, block size, channels)
//! - Chain tuning and the initial parameter values
//! - TOML persistence with async load/save

use crate::domain::audio::{AudioError, ProcessSpec};
use crate::domain::chain::ChainConfig;
use crate::domain::params::ParameterSnapshot;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Processing settings used to prepare the chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Largest block the host will deliver, in frames
    pub block_size: usize,

    /// Number of audio channels
    pub channels: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            channels: 2,
        }
    }
}

impl ProcessingConfig {
    pub fn to_spec(&self) -> ProcessSpec {
        ProcessSpec::new(self.sample_rate as f32, self.block_size, self.channels)
    }
}

/// Complete Filteroid configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteroidConfig {
    pub processing: ProcessingConfig,
    pub chain: ChainConfig,
    pub params: ParameterSnapshot,
}

impl FilteroidConfig {
    /// Check every section before anything is prepared with it
    pub fn validate(&self) -> Result<()> {
        self.processing.to_spec().validate()?;
        self.chain.validate()?;

        let mix = self.params.mix;
        if !(0.0..=1.0).contains(&mix) {
            return Err(ConfigError::Invalid(format!(
                "mix must be in [0, 1], got {mix}"
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;

        debug!(?config, "Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration, falling back to defaults
    ///
    /// A missing file yields the defaults. A corrupt or invalid file is
    /// copied aside as `*.toml.corrupt` and the defaults are returned.
    #[instrument(skip(path))]
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !fs::try_exists(path).await.unwrap_or(false) {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }

        match Self::load_from_file(path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load config, using defaults"
                );

                let backup_path = path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                Self::default()
            }
        }
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_toml_string()?).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}

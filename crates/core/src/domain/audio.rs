//! Audio buffer and processing-spec abstractions
//!
//! This module defines the platform-agnostic types the DSP chain consumes:
//! the processing specification handed over at prepare time and the planar
//! sample buffer processed in place every block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while configuring the audio subsystem
///
/// None of these are ever produced on the real-time path; they surface from
/// `prepare` and from buffer construction only.
#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    /// Invalid configuration handed to `prepare` or a constructor
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Processing configuration handed to every component at prepare time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Largest block the host will ever deliver, in samples per channel
    pub max_block_size: usize,
    /// Number of audio channels
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f32, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }

    /// Nyquist frequency for this spec
    pub fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    /// Check the spec before anything gets allocated from it
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.max_block_size == 0 {
            return Err(AudioError::InvalidConfiguration(
                "maximum block size must be at least one sample".to_string(),
            ));
        }
        if self.num_channels == 0 {
            return Err(AudioError::InvalidConfiguration(
                "channel count must be at least one".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_block_size: 512,
            num_channels: 2,
        }
    }
}

/// Rectangular planar sample buffer (channels × samples)
///
/// Storage is allocated once with a fixed per-channel capacity. The active
/// length can be changed within that capacity without touching the heap,
/// which is what lets the chain reuse a single scratch buffer every block.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    num_channels: usize,
    capacity: usize,
    num_samples: usize,
}

impl AudioBuffer {
    /// Create a silent buffer with `num_samples` active samples per channel
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            data: vec![0.0; num_channels * num_samples],
            num_channels,
            capacity: num_samples,
            num_samples,
        }
    }

    /// Build a buffer from per-channel sample vectors
    ///
    /// Every channel must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let num_samples = channels.first().map_or(0, Vec::len);
        if let Some(bad) = channels.iter().find(|c| c.len() != num_samples) {
            return Err(AudioError::InvalidConfiguration(format!(
                "channels must be rectangular: expected {num_samples} samples, found {}",
                bad.len()
            )));
        }

        let num_channels = channels.len();
        let data = channels.into_iter().flatten().collect();
        Ok(Self {
            data,
            num_channels,
            capacity: num_samples,
            num_samples,
        })
    }

    /// Deinterleave frames of `num_channels` samples into a planar buffer
    pub fn from_interleaved(samples: &[f32], num_channels: usize) -> Result<Self> {
        if num_channels == 0 {
            return Err(AudioError::InvalidConfiguration(
                "channel count must be at least one".to_string(),
            ));
        }
        if samples.len() % num_channels != 0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "{} interleaved samples do not divide into {num_channels} channels",
                samples.len()
            )));
        }

        let frames = samples.len() / num_channels;
        let mut buffer = Self::new(num_channels, frames);
        for (frame_idx, frame) in samples.chunks_exact(num_channels).enumerate() {
            for (ch, &sample) in frame.iter().enumerate() {
                buffer.data[ch * frames + frame_idx] = sample;
            }
        }
        Ok(buffer)
    }

    /// Interleave the active region back into frames
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_channels * self.num_samples);
        for n in 0..self.num_samples {
            for ch in 0..self.num_channels {
                out.push(self.data[ch * self.capacity + n]);
            }
        }
        out
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Active samples per channel
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Samples per channel that fit without reallocating
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples == 0 || self.num_channels == 0
    }

    /// Change the active length, clamped to the capacity
    pub fn set_num_samples(&mut self, num_samples: usize) {
        debug_assert!(
            num_samples <= self.capacity,
            "requested {num_samples} samples, capacity is {}",
            self.capacity
        );
        self.num_samples = num_samples.min(self.capacity);
    }

    /// Read-only view of one channel's active samples
    ///
    /// Panics if `channel` is out of range.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        assert!(channel < self.num_channels, "channel {channel} out of range");
        let start = channel * self.capacity;
        &self.data[start..start + self.num_samples]
    }

    /// Mutable view of one channel's active samples
    ///
    /// Panics if `channel` is out of range.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        assert!(channel < self.num_channels, "channel {channel} out of range");
        let start = channel * self.capacity;
        &mut self.data[start..start + self.num_samples]
    }

    /// Silence the active region
    pub fn clear(&mut self) {
        for ch in 0..self.num_channels {
            self.channel_mut(ch).fill(0.0);
        }
    }

    /// Copy `len` samples starting at `offset` of every shared channel of
    /// `source` into the start of this buffer
    ///
    /// The active length becomes `len` (clamped to capacity). Channels of
    /// `self` beyond `source.num_channels()` keep their previous contents.
    /// Never allocates.
    pub fn copy_region_from(&mut self, source: &AudioBuffer, offset: usize, len: usize) {
        let len = len
            .min(self.capacity)
            .min(source.num_samples.saturating_sub(offset));
        self.num_samples = len;
        if len == 0 {
            return;
        }

        let channels = self.num_channels.min(source.num_channels);
        for ch in 0..channels {
            let src_start = ch * source.capacity + offset;
            let dst_start = ch * self.capacity;
            self.data[dst_start..dst_start + len]
                .copy_from_slice(&source.data[src_start..src_start + len]);
        }
    }

    /// Copy the whole active region of `source`
    pub fn copy_from(&mut self, source: &AudioBuffer) {
        self.copy_region_from(source, 0, source.num_samples);
    }

    /// Largest absolute sample across all channels
    pub fn peak(&self) -> f32 {
        (0..self.num_channels)
            .flat_map(|ch| self.channel(ch).iter())
            .fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }
}

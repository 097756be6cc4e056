//! Second-order IIR filter stage
//!
//! The single building block of every voice cascade: RBJ cookbook
//! coefficients computed at prepare time, Direct Form I state per channel,
//! and a per-sample path that never allocates, locks or logs.

use crate::domain::audio::AudioBuffer;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::trace;

/// Response shape of a biquad stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Attenuates below the cutoff
    HighPass,
    /// Attenuates above the cutoff
    LowPass,
    /// Boosts or cuts around the centre frequency
    Peaking,
}

/// Immutable design of one biquad stage
///
/// Preconditions: `frequency_hz` below Nyquist of the rate it is prepared
/// at, `q > 0`, `gain_linear > 0`. These are documented, not checked on the
/// processing path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Cutoff (high/low-pass) or centre (peaking) frequency in Hz
    pub frequency_hz: f32,
    pub q: f32,
    /// Peak gain as a linear amplitude factor; ignored by pass filters
    pub gain_linear: f32,
}

impl FilterSpec {
    pub const fn high_pass(frequency_hz: f32, q: f32) -> Self {
        Self {
            kind: FilterKind::HighPass,
            frequency_hz,
            q,
            gain_linear: 1.0,
        }
    }

    pub const fn low_pass(frequency_hz: f32, q: f32) -> Self {
        Self {
            kind: FilterKind::LowPass,
            frequency_hz,
            q,
            gain_linear: 1.0,
        }
    }

    pub const fn peaking(frequency_hz: f32, q: f32, gain_linear: f32) -> Self {
        Self {
            kind: FilterKind::Peaking,
            frequency_hz,
            q,
            gain_linear,
        }
    }

    /// Whether the design is realisable at `sample_rate`
    pub fn is_valid_for(&self, sample_rate: f32) -> bool {
        self.frequency_hz > 0.0
            && self.frequency_hz < sample_rate * 0.5
            && self.q > 0.0
            && self.gain_linear > 0.0
    }
}

// ============================================================================
// COEFFICIENTS
// ============================================================================

/// Biquad filter coefficients
///
/// Normalised so that a0 == 1; the hot path never divides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Design coefficients for `spec` at `sample_rate`
    #[must_use]
    pub fn design(spec: &FilterSpec, sample_rate: f32) -> Self {
        match spec.kind {
            FilterKind::HighPass => Self::high_pass(sample_rate, spec.frequency_hz, spec.q),
            FilterKind::LowPass => Self::low_pass(sample_rate, spec.frequency_hz, spec.q),
            FilterKind::Peaking => {
                Self::peaking(sample_rate, spec.frequency_hz, spec.q, spec.gain_linear)
            }
        }
    }

    /// Calculate coefficients for a second-order high-pass filter
    #[must_use]
    pub fn high_pass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Calculate coefficients for a second-order low-pass filter
    #[must_use]
    pub fn low_pass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 - cos_w0) / 2.0;
        let b1 = 1.0 - cos_w0;
        let b2 = (1.0 - cos_w0) / 2.0;

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Calculate coefficients for a peaking filter
    ///
    /// `gain_linear` is the amplitude factor at the centre frequency, so
    /// 2.0 gives roughly +6 dB. The cookbook's `A` is its square root.
    #[must_use]
    pub fn peaking(sample_rate: f32, freq: f32, q: f32, gain_linear: f32) -> Self {
        let a = gain_linear.sqrt();
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;

        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude of the transfer function at `freq`, as a linear factor
    ///
    /// Evaluated in double precision; meant for diagnostics, not the
    /// processing path.
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * std::f64::consts::PI * f64::from(freq) / f64::from(sample_rate);
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;

        let num = Complex::new(f64::from(self.b0), 0.0)
            + z1 * f64::from(self.b1)
            + z2 * f64::from(self.b2);
        let den = Complex::new(1.0, 0.0) + z1 * f64::from(self.a1) + z2 * f64::from(self.a2);

        (num.norm() / den.norm()) as f32
    }
}

// ============================================================================
// STATE
// ============================================================================

/// Direct Form I history for one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    // Previous input samples (x[n-1], x[n-2])
    x1: f32,
    x2: f32,
    // Previous output samples (y[n-1], y[n-2])
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, x: f32, c: &BiquadCoeffs) -> f32 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// STAGE
// ============================================================================

/// One biquad with independent history per audio channel
///
/// Unprepared stages have no channel state and pass samples through.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadStage {
    spec: FilterSpec,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
    sample_rate: f32,
}

impl BiquadStage {
    pub fn new(spec: FilterSpec) -> Self {
        Self {
            spec,
            coeffs: BiquadCoeffs::default(),
            states: Vec::new(),
            sample_rate: 0.0,
        }
    }

    /// Compute coefficients and size channel state
    ///
    /// Must run before any processing and never on the audio thread. Calling
    /// again with a new rate recomputes and zeroes the history; no attempt is
    /// made to smooth across the change.
    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize, spec: FilterSpec) {
        debug_assert!(
            spec.is_valid_for(sample_rate),
            "filter {spec:?} is not realisable at {sample_rate} Hz"
        );

        self.spec = spec;
        self.sample_rate = sample_rate;
        self.coeffs = BiquadCoeffs::design(&spec, sample_rate);
        self.states.clear();
        self.states.resize(num_channels, BiquadState::default());

        trace!(
            kind = ?spec.kind,
            freq = spec.frequency_hz,
            q = spec.q,
            sample_rate,
            num_channels,
            "Biquad stage prepared"
        );
    }

    /// Filter one sample of `channel`
    ///
    /// Channels outside the prepared range pass through unchanged.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, x: f32) -> f32 {
        let coeffs = self.coeffs;
        match self.states.get_mut(channel) {
            Some(state) => state.process(x, &coeffs),
            None => x,
        }
    }

    /// Filter every prepared channel of `buffer` in place
    pub fn process_buffer(&mut self, buffer: &mut AudioBuffer) {
        self.process_channels(buffer, buffer.num_channels());
    }

    /// Filter only the first `channels` channels of `buffer`
    ///
    /// History of the remaining channels is left untouched.
    pub fn process_channels(&mut self, buffer: &mut AudioBuffer, channels: usize) {
        let coeffs = self.coeffs;
        let channels = channels
            .min(buffer.num_channels())
            .min(self.states.len());
        for ch in 0..channels {
            let state = &mut self.states[ch];
            for sample in buffer.channel_mut(ch) {
                *sample = state.process(*sample, &coeffs);
            }
        }
    }

    /// Zero the history of every channel
    pub fn reset(&mut self) {
        self.states.iter_mut().for_each(BiquadState::reset);
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.states.len()
    }

    pub fn is_prepared(&self) -> bool {
        !self.states.is_empty()
    }

    pub fn state(&self, channel: usize) -> Option<&BiquadState> {
        self.states.get(channel)
    }

    /// Linear magnitude response at `freq` for the prepared sample rate
    pub fn magnitude_at(&self, freq: f32) -> f32 {
        self.coeffs.magnitude_at(freq, self.sample_rate)
    }
}

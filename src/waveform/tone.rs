use serde::Deserialize;
use std::f64::consts::PI;
use tracing::{debug, warn};

use super::{IqSample, SampleClock, WaveformBuffer};
use crate::error::{Result, VectorError};

/// How a tone populates the quadrature channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Synthesis {
    /// Real cosine in I, Q held at zero
    #[default]
    Real,
    /// Complex exponential: cosine in I, sine in Q
    Complex,
}

/// A single sinusoidal component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub amplitude: f64,
    pub phase_deg: f64,
}

impl Tone {
    pub fn new(frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            frequency_hz,
            amplitude,
            phase_deg: 0.0,
        }
    }

    pub fn with_phase(mut self, phase_deg: f64) -> Self {
        self.phase_deg = phase_deg;
        self
    }

    fn validate(&self, clock: &SampleClock, strict_nyquist: bool) -> Result<()> {
        if !self.frequency_hz.is_finite() {
            return Err(VectorError::invalid(format!(
                "tone frequency must be finite, got {}",
                self.frequency_hz
            )));
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(VectorError::invalid(format!(
                "tone amplitude must be a non-negative number, got {}",
                self.amplitude
            )));
        }
        if !self.phase_deg.is_finite() {
            return Err(VectorError::invalid(format!(
                "tone phase must be finite, got {}",
                self.phase_deg
            )));
        }

        if self.frequency_hz.abs() >= clock.nyquist() {
            if strict_nyquist {
                return Err(VectorError::invalid(format!(
                    "tone at {} Hz is at or above Nyquist ({} Hz)",
                    self.frequency_hz,
                    clock.nyquist()
                )));
            }
            warn!(
                "Tone at {} Hz is at or above Nyquist ({} Hz); samples will alias to {} Hz",
                self.frequency_hz,
                clock.nyquist(),
                alias_frequency(self.frequency_hz, clock.sample_rate())
            );
        }
        if self.amplitude > 1.0 {
            warn!(
                "Tone at {} Hz has amplitude {} > 1.0; quantization will clamp it",
                self.frequency_hz, self.amplitude
            );
        }
        Ok(())
    }
}

/// Frequency a tone at `frequency_hz` appears at once sampled at
/// `sample_rate`, folded into [-fs/2, fs/2]
pub fn alias_frequency(frequency_hz: f64, sample_rate: f64) -> f64 {
    frequency_hz - sample_rate * (frequency_hz / sample_rate).round()
}

/// Synthesize the sum of `tones` over `clock`.
///
/// Tones are superposed before any scaling and the sum is not normalized,
/// so keeping the combined amplitude inside [-1, 1] is up to the caller.
pub fn generate(
    clock: &SampleClock,
    tones: &[Tone],
    synthesis: Synthesis,
    strict_nyquist: bool,
) -> Result<WaveformBuffer> {
    if tones.is_empty() {
        return Err(VectorError::invalid("at least one tone is required"));
    }
    for tone in tones {
        tone.validate(clock, strict_nyquist)?;
    }

    let mut samples = vec![IqSample::default(); clock.sample_count()];
    for tone in tones {
        let omega = 2.0 * PI * tone.frequency_hz;
        let phase = tone.phase_deg.to_radians();
        for (n, sample) in samples.iter_mut().enumerate() {
            let theta = omega * clock.time(n) + phase;
            sample.i += tone.amplitude * theta.cos();
            if synthesis == Synthesis::Complex {
                sample.q += tone.amplitude * theta.sin();
            }
        }
    }

    debug!(
        "Synthesized {} samples from {} tone(s) ({:?})",
        samples.len(),
        tones.len(),
        synthesis
    );

    Ok(WaveformBuffer {
        clock: *clock,
        samples,
    })
}

pub mod tone;

pub use tone::{alias_frequency, generate, Synthesis, Tone};

use crate::error::{Result, VectorError};

/// IQ sample pair (In-phase, Quadrature), nominally in [-1.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IqSample {
    pub i: f64,
    pub q: f64,
}

impl IqSample {
    pub fn new(i: f64, q: f64) -> Self {
        Self { i, q }
    }

    /// Largest absolute component
    pub fn peak(&self) -> f64 {
        self.i.abs().max(self.q.abs())
    }
}

/// Sample rate and length of a synthesized waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    sample_rate: f64,
    sample_count: usize,
}

impl SampleClock {
    pub fn new(sample_rate: f64, sample_count: usize) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(VectorError::invalid(format!(
                "sample rate must be positive, got {} Hz",
                sample_rate
            )));
        }
        if sample_count == 0 {
            return Err(VectorError::invalid("sample count must be at least 1"));
        }
        Ok(Self {
            sample_rate,
            sample_count,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Time of sample `n` in seconds
    pub fn time(&self, n: usize) -> f64 {
        n as f64 / self.sample_rate
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate
    }
}

/// Synthesized samples, index-aligned with the clock that produced them
#[derive(Debug, Clone)]
pub struct WaveformBuffer {
    clock: SampleClock,
    samples: Vec<IqSample>,
}

impl WaveformBuffer {
    /// Wrap existing samples. The clock's sample count is taken from `samples`.
    pub fn from_samples(sample_rate: f64, samples: Vec<IqSample>) -> Result<Self> {
        let clock = SampleClock::new(sample_rate, samples.len())?;
        Ok(Self { clock, samples })
    }

    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }

    pub fn samples(&self) -> &[IqSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute I or Q component in the buffer
    pub fn peak(&self) -> f64 {
        self.samples.iter().map(IqSample::peak).fold(0.0, f64::max)
    }
}

//! Run configuration
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line flags. Defaults produce the AT86RF215 bring-up vector:
//! a 125 kHz real tone sampled at 2 MHz, 64 samples, 14-bit words.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, VectorError};
use crate::quantizer::RoundingMode;
use crate::serializer::{LvdsFraming, OutputFormat};
use crate::waveform::{Synthesis, Tone};

pub const DEFAULT_OUTPUT: &str = "iq-samples-for-vhdl-ram.txt";

/// Tone as written in a config file or on the command line.
/// A missing amplitude falls back to [`VectorConfig::amplitude`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    #[serde(default)]
    pub amplitude: Option<f64>,
    #[serde(default)]
    pub phase_deg: f64,
}

impl ToneSpec {
    pub fn new(frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            amplitude: None,
            phase_deg: 0.0,
        }
    }

    pub fn resolve(&self, default_amplitude: f64) -> Tone {
        Tone::new(self.frequency_hz, self.amplitude.unwrap_or(default_amplitude))
            .with_phase(self.phase_deg)
    }
}

/// Parses `FREQ[:AMP[:PHASE_DEG]]`, e.g. `125e3`, `125e3:0.5`, `-50e3:0.25:90`
impl FromStr for ToneSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(format!("expected FREQ[:AMP[:PHASE]], got '{}'", s));
        }
        let number = |field: &str, what: &str| -> std::result::Result<f64, String> {
            field
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid tone {} '{}'", what, field))
        };

        let mut spec = ToneSpec::new(number(parts[0], "frequency")?);
        if let Some(amp) = parts.get(1) {
            spec.amplitude = Some(number(amp, "amplitude")?);
        }
        if let Some(phase) = parts.get(2) {
            spec.phase_deg = number(phase, "phase")?;
        }
        Ok(spec)
    }
}

/// Everything needed for one generator run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorConfig {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Number of complex samples to emit
    pub sample_count: usize,
    /// Amplitude for tones that don't set their own
    pub amplitude: f64,
    pub tones: Vec<ToneSpec>,
    pub synthesis: Synthesis,
    pub bit_width: u32,
    pub rounding: RoundingMode,
    /// Reject tones at or above Nyquist instead of warning
    pub strict_nyquist: bool,
    pub format: OutputFormat,
    pub output_path: PathBuf,
    /// Optional float32 WAV dump of the waveform
    pub wav_path: Option<PathBuf>,
    /// Optional PSD CSV
    pub psd_path: Option<PathBuf>,
    pub lvds: LvdsFraming,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 2e6,
            sample_count: 64,
            amplitude: 1.0,
            tones: vec![ToneSpec::new(125e3)],
            synthesis: Synthesis::Real,
            bit_width: 14,
            rounding: RoundingMode::Nearest,
            strict_nyquist: false,
            format: OutputFormat::Bits,
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            wav_path: None,
            psd_path: None,
            lvds: LvdsFraming::default(),
        }
    }
}

impl VectorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VectorError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| VectorError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| VectorError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Tones with the default amplitude filled in
    pub fn resolved_tones(&self) -> Vec<Tone> {
        self.tones
            .iter()
            .map(|spec| spec.resolve(self.amplitude))
            .collect()
    }
}

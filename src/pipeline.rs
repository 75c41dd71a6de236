use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::VectorConfig;
use crate::error::Result;
use crate::output::{wav_sample_rate, write_lines_atomic, write_waveform_wav};
use crate::quantizer::{quantize, ClampReport, QuantizationProfile};
use crate::serializer::{render, OutputFormat};
use crate::spectrum::power_spectral_density;
use crate::waveform::{generate, SampleClock};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub sample_count: usize,
    pub lines_written: usize,
    pub bit_width: u32,
    pub full_scale_code: i64,
    pub clamp: ClampReport,
    /// Strongest PSD bin of the synthesized waveform (Hz, dB)
    pub peak_bin: Option<(f64, f64)>,
    /// Diagnostic files (PSD, WAV) that could not be written
    pub diagnostic_errors: Vec<String>,
}

/// Generate, quantize and serialize one test vector.
///
/// The vector is rendered completely in memory and then written atomically.
/// An `Err` always means nothing was written to `config.output_path`.
/// Diagnostic outputs are produced after the vector is in place; a failure
/// there is logged and listed in [`RunSummary::diagnostic_errors`].
pub fn run(config: &VectorConfig) -> Result<RunSummary> {
    let clock = SampleClock::new(config.sample_rate, config.sample_count)?;
    let tones = config.resolved_tones();
    let profile = QuantizationProfile::new(config.bit_width, config.rounding)?;
    if config.wav_path.is_some() {
        wav_sample_rate(clock.sample_rate())?;
    }

    info!(
        "Generating {} samples at {} Hz ({:.3} ms) from {} tone(s), {:?} synthesis",
        clock.sample_count(),
        clock.sample_rate(),
        clock.duration_secs() * 1000.0,
        tones.len(),
        config.synthesis
    );
    for tone in &tones {
        debug!(
            "  tone: {} Hz, amplitude {}, phase {} deg",
            tone.frequency_hz, tone.amplitude, tone.phase_deg
        );
    }

    let waveform = generate(&clock, &tones, config.synthesis, config.strict_nyquist)?;

    let (quantized, clamp) = quantize(&waveform, &profile)?;
    info!(
        "Quantized to {} bits (full scale {}, {:?} rounding)",
        profile.bit_width(),
        profile.full_scale_code(),
        profile.rounding()
    );

    let lines = render(&quantized, config.format, &config.lvds)?;
    write_lines_atomic(&config.output_path, &lines)?;
    info!(
        "Wrote {} {:?} line(s) to {}",
        lines.len(),
        config.format,
        config.output_path.display()
    );

    let spectrum = power_spectral_density(&waveform);
    let peak_bin = spectrum.peak();
    if let Some((freq, power)) = peak_bin {
        debug!("Strongest PSD bin: {:.1} Hz at {:.2} dB", freq, power);
    }

    let mut diagnostic_errors = Vec::new();
    if let Some(psd_path) = &config.psd_path {
        match spectrum.write_csv(psd_path) {
            Ok(()) => info!("Wrote PSD to {}", psd_path.display()),
            Err(e) => {
                warn!("PSD not written: {}", e);
                diagnostic_errors.push(e.to_string());
            }
        }
    }
    if let Some(wav_path) = &config.wav_path {
        match write_waveform_wav(wav_path, &waveform) {
            Ok(()) => info!("Wrote waveform WAV to {}", wav_path.display()),
            Err(e) => {
                warn!("Waveform WAV not written: {}", e);
                diagnostic_errors.push(e.to_string());
            }
        }
    }

    Ok(RunSummary {
        output_path: config.output_path.clone(),
        format: config.format,
        sample_count: clock.sample_count(),
        lines_written: lines.len(),
        bit_width: profile.bit_width(),
        full_scale_code: profile.full_scale_code(),
        clamp,
        peak_bin,
        diagnostic_errors,
    })
}

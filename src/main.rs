use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use iq_vectors::config::{ToneSpec, VectorConfig};
use iq_vectors::pipeline;
use iq_vectors::quantizer::RoundingMode;
use iq_vectors::serializer::OutputFormat;
use iq_vectors::waveform::Synthesis;

/// Generate fixed-point I/Q test vectors for HDL memory initialization
#[derive(Parser, Debug)]
#[command(name = "iq-vectors")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML configuration file; command-line flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file for the test vector
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Sample rate (Hz)
    #[arg(short = 'r', long)]
    sample_rate: Option<f64>,

    /// Number of complex samples to emit
    #[arg(short = 'n', long = "samples")]
    sample_count: Option<usize>,

    /// Tone as FREQ[:AMP[:PHASE_DEG]]; repeat to superpose tones
    #[arg(
        short,
        long = "tone",
        value_name = "FREQ[:AMP[:PHASE]]",
        allow_hyphen_values = true
    )]
    tones: Vec<ToneSpec>,

    /// Amplitude for tones without an explicit one
    #[arg(short, long)]
    amplitude: Option<f64>,

    /// Real cosines (Q = 0) or complex exponentials (sine in Q)
    #[arg(long, value_enum)]
    synthesis: Option<Synthesis>,

    /// Output word width in bits (2-32)
    #[arg(short, long = "bits")]
    bit_width: Option<u32>,

    /// Rounding applied when scaling to integer codes
    #[arg(long, value_enum)]
    rounding: Option<RoundingMode>,

    /// Reject tones at or above Nyquist instead of warning; `=false` turns it off
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    strict_nyquist: Option<bool>,

    /// Output line format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Zero words before the LVDS payload
    #[arg(long)]
    lvds_preamble: Option<usize>,

    /// Zero words after the LVDS payload
    #[arg(long)]
    lvds_trailer: Option<usize>,

    /// Total LVDS frame length in words; the payload loops to fill it
    #[arg(long)]
    lvds_total: Option<usize>,

    /// Also write the float waveform as a stereo float32 WAV (for inspectrum)
    #[arg(long, value_name = "FILE")]
    wav: Option<PathBuf>,

    /// Also write the power spectral density as CSV
    #[arg(long, value_name = "FILE")]
    psd: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Layer explicitly given flags over `config`
    fn apply(self, mut config: VectorConfig) -> VectorConfig {
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(count) = self.sample_count {
            config.sample_count = count;
        }
        if !self.tones.is_empty() {
            config.tones = self.tones;
        }
        if let Some(amplitude) = self.amplitude {
            config.amplitude = amplitude;
        }
        if let Some(synthesis) = self.synthesis {
            config.synthesis = synthesis;
        }
        if let Some(bits) = self.bit_width {
            config.bit_width = bits;
        }
        if let Some(rounding) = self.rounding {
            config.rounding = rounding;
        }
        if let Some(strict) = self.strict_nyquist {
            config.strict_nyquist = strict;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(words) = self.lvds_preamble {
            config.lvds.preamble_words = words;
        }
        if let Some(words) = self.lvds_trailer {
            config.lvds.trailer_words = words;
        }
        if let Some(words) = self.lvds_total {
            config.lvds.total_words = Some(words);
        }
        if let Some(path) = self.wav {
            config.wav_path = Some(path);
        }
        if let Some(path) = self.psd {
            config.psd_path = Some(path);
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            VectorConfig::load(path)?
        }
        None => VectorConfig::default(),
    };
    let config = args.apply(base);

    let summary = match pipeline::run(&config) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Test vector generation failed: {}", e);
            return Err(e).with_context(|| {
                format!("no vector written to {}", config.output_path.display())
            });
        }
    };

    if !summary.clamp.is_clean() {
        warn!(
            "{} of {} sample(s) were clamped to the {}-bit rails; the vector is saturated",
            summary.clamp.clamped_samples, summary.sample_count, summary.bit_width
        );
    }

    println!(
        "Saved {} {}-bit line(s) ({} samples, full scale {}) to {}",
        summary.lines_written,
        match summary.format {
            OutputFormat::Lvds => 32,
            _ => summary.bit_width,
        },
        summary.sample_count,
        summary.full_scale_code,
        summary.output_path.display()
    );
    if !summary.clamp.is_clean() {
        println!(
            "Clamped: {} component(s) in {} sample(s), peak |x| = {:.4}",
            summary.clamp.clamped_components,
            summary.clamp.clamped_samples,
            summary.clamp.peak_magnitude
        );
    }
    for failure in &summary.diagnostic_errors {
        println!("Diagnostic output skipped: {}", failure);
    }

    Ok(())
}

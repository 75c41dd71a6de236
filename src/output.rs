use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, VectorError};
use crate::waveform::WaveformBuffer;

/// Write `lines` to `path`, each terminated by a single `\n`.
///
/// The data goes to a temporary file in the destination directory and is
/// renamed over `path` only once everything has been flushed. On any error
/// the temporary file is removed and `path` is left untouched.
pub fn write_lines_atomic<P: AsRef<Path>>(path: P, lines: &[String]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(|e| VectorError::io(path, e))?;
    let mut writer = BufWriter::new(tmp);
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| VectorError::io(path, e))?;
    }

    let tmp = writer
        .into_inner()
        .map_err(|e| VectorError::io(path, e.into_error()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| VectorError::io(path, e))?;
    tmp.persist(path).map_err(|e| VectorError::io(path, e.error))?;

    debug!("Wrote {} line(s) to {}", lines.len(), path.display());
    Ok(())
}

/// WAV headers carry the rate as a `u32`, so only integral rates up to
/// `u32::MAX` can be written
pub fn wav_sample_rate(sample_rate: f64) -> Result<u32> {
    if sample_rate.fract() != 0.0 || sample_rate < 1.0 || sample_rate > u32::MAX as f64 {
        return Err(VectorError::invalid(format!(
            "WAV needs an integral sample rate, got {} Hz",
            sample_rate
        )));
    }
    Ok(sample_rate as u32)
}

/// Write the waveform as a stereo float32 WAV (I = left, Q = right) for inspectrum and SDR++
pub fn write_waveform_wav<P: AsRef<Path>>(path: P, waveform: &WaveformBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: wav_sample_rate(waveform.clock().sample_rate())?,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;

    for sample in waveform.samples() {
        writer.write_sample(sample.i as f32)?;
        writer.write_sample(sample.q as f32)?;
    }

    writer.finalize()?;
    debug!("Wrote diagnostic WAV to {}", path.as_ref().display());
    Ok(())
}

use rustfft::{num_complex::Complex, FftPlanner};
use std::path::Path;

use crate::error::Result;
use crate::output::write_lines_atomic;
use crate::waveform::WaveformBuffer;

/// Floor applied before taking the log so empty bins stay finite
const POWER_FLOOR: f64 = 1e-30;

/// Power spectral density of a waveform, DC in the middle
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub frequencies_hz: Vec<f64>,
    pub power_db: Vec<f64>,
}

impl Spectrum {
    /// Strongest bin as (frequency in Hz, power in dB)
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies_hz
            .iter()
            .zip(self.power_db.iter())
            .map(|(&f, &p)| (f, p))
            .fold(None, |best, (f, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((f, p)),
            })
    }

    pub fn len(&self) -> usize {
        self.power_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power_db.is_empty()
    }

    /// Write `frequency_hz,power_db` rows with a header line
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut lines = Vec::with_capacity(self.len() + 1);
        lines.push("frequency_hz,power_db".to_string());
        for (f, p) in self.frequencies_hz.iter().zip(self.power_db.iter()) {
            lines.push(format!("{},{:.6}", f, p));
        }
        write_lines_atomic(path, &lines)
    }
}

/// Compute `10*log10((|FFT(x)|/N)^2)` over the whole buffer, fft-shifted.
/// No window is applied.
pub fn power_spectral_density(waveform: &WaveformBuffer) -> Spectrum {
    let n = waveform.len();
    if n == 0 {
        return Spectrum {
            frequencies_hz: Vec::new(),
            power_db: Vec::new(),
        };
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f64>> = waveform
        .samples()
        .iter()
        .map(|s| Complex::new(s.i, s.q))
        .collect();
    fft.process(&mut buffer);

    let mut power_db: Vec<f64> = buffer
        .iter()
        .map(|c| {
            let power = c.norm_sqr() / (n * n) as f64;
            10.0 * power.max(POWER_FLOOR).log10()
        })
        .collect();
    // Move negative frequencies in front of DC
    power_db.rotate_right(n / 2);

    let fs = waveform.clock().sample_rate();
    let bin_hz = fs / n as f64;
    let frequencies_hz = (0..n)
        .map(|k| (k as f64 - (n / 2) as f64) * bin_hz)
        .collect();

    Spectrum {
        frequencies_hz,
        power_db,
    }
}

//! Fixed-point quantization of normalized I/Q samples.
//!
//! Each component in [-1, 1] is scaled by the full-scale code
//! `2^(bits-1) - 1` and clamped to the signed range of the word. Components
//! outside [-1, 1] never wrap: they saturate at the rail and are counted in a
//! [`ClampReport`].

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, VectorError};
use crate::waveform::WaveformBuffer;

pub const MIN_BIT_WIDTH: u32 = 2;
pub const MAX_BIT_WIDTH: u32 = 32;

/// How scaled components are turned into integer codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Round half away from zero; +1.0 and -1.0 map to the positive and negative rails
    #[default]
    Nearest,
    /// Truncate toward zero, as a plain integer cast does
    Truncate,
}

/// Word format of a quantized component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationProfile {
    bit_width: u32,
    rounding: RoundingMode,
}

impl QuantizationProfile {
    pub fn new(bit_width: u32, rounding: RoundingMode) -> Result<Self> {
        if !(MIN_BIT_WIDTH..=MAX_BIT_WIDTH).contains(&bit_width) {
            return Err(VectorError::invalid(format!(
                "bit width must be between {} and {}, got {}",
                MIN_BIT_WIDTH, MAX_BIT_WIDTH, bit_width
            )));
        }
        Ok(Self {
            bit_width,
            rounding,
        })
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Largest positive code, also the scale factor: `2^(bits-1) - 1`
    pub fn full_scale_code(&self) -> i64 {
        (1i64 << (self.bit_width - 1)) - 1
    }

    /// Most negative code: `-2^(bits-1)`
    pub fn min_code(&self) -> i64 {
        -(1i64 << (self.bit_width - 1))
    }

    pub fn contains(&self, code: i64) -> bool {
        (self.min_code()..=self.full_scale_code()).contains(&code)
    }

    /// Quantize one component. Returns the code and whether it was clamped.
    ///
    /// Only components strictly outside [-1, 1] count as clamped; landing on
    /// a rail from an in-range value is normal full-scale behavior.
    pub fn quantize(&self, component: f64) -> (i64, bool) {
        let full_scale = self.full_scale_code();
        let min = self.min_code();
        let overflowed = component.abs() > 1.0;

        let code = match self.rounding {
            RoundingMode::Nearest => {
                if component >= 1.0 {
                    full_scale
                } else if component <= -1.0 {
                    min
                } else {
                    // f64::round rounds half away from zero
                    ((component * full_scale as f64).round() as i64).clamp(min, full_scale)
                }
            }
            RoundingMode::Truncate => {
                let scaled = (component * full_scale as f64).trunc();
                if scaled >= full_scale as f64 {
                    full_scale
                } else if scaled <= min as f64 {
                    min
                } else {
                    scaled as i64
                }
            }
        };

        (code, overflowed)
    }
}

/// Signed codes for one I/Q sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantizedSample {
    pub i_code: i64,
    pub q_code: i64,
}

impl QuantizedSample {
    pub fn new(i_code: i64, q_code: i64) -> Self {
        Self { i_code, q_code }
    }
}

/// Quantized samples together with the profile that produced them
#[derive(Debug, Clone)]
pub struct QuantizedBuffer {
    profile: QuantizationProfile,
    samples: Vec<QuantizedSample>,
}

impl QuantizedBuffer {
    /// Wrap codes produced elsewhere. Codes are not range-checked here; the
    /// serializer rejects anything the profile cannot hold.
    pub fn from_codes(profile: QuantizationProfile, samples: Vec<QuantizedSample>) -> Self {
        Self { profile, samples }
    }

    pub fn profile(&self) -> &QuantizationProfile {
        &self.profile
    }

    pub fn samples(&self) -> &[QuantizedSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Summary of components that had to be saturated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClampReport {
    /// Clamped I or Q components
    pub clamped_components: usize,
    /// Samples with at least one clamped component
    pub clamped_samples: usize,
    pub first_clamped_index: Option<usize>,
    /// Largest absolute input component seen
    pub peak_magnitude: f64,
}

impl ClampReport {
    pub fn is_clean(&self) -> bool {
        self.clamped_components == 0
    }
}

/// Quantize every sample of `waveform` with `profile`.
///
/// Fails on non-finite input. Out-of-range input is clamped, counted and
/// logged as a warning; the run continues.
pub fn quantize(
    waveform: &WaveformBuffer,
    profile: &QuantizationProfile,
) -> Result<(QuantizedBuffer, ClampReport)> {
    let mut report = ClampReport::default();
    let mut samples = Vec::with_capacity(waveform.len());

    for (index, sample) in waveform.samples().iter().enumerate() {
        if !sample.i.is_finite() || !sample.q.is_finite() {
            return Err(VectorError::invalid(format!(
                "sample {} is not finite (I={}, Q={})",
                index, sample.i, sample.q
            )));
        }

        let (i_code, i_clamped) = profile.quantize(sample.i);
        let (q_code, q_clamped) = profile.quantize(sample.q);

        let clamped = i_clamped as usize + q_clamped as usize;
        if clamped > 0 {
            report.clamped_components += clamped;
            report.clamped_samples += 1;
            if report.first_clamped_index.is_none() {
                report.first_clamped_index = Some(index);
            }
        }
        report.peak_magnitude = report.peak_magnitude.max(sample.peak());

        samples.push(QuantizedSample::new(i_code, q_code));
    }

    if report.is_clean() {
        debug!(
            "Quantized {} samples to {} bits (full scale {})",
            samples.len(),
            profile.bit_width(),
            profile.full_scale_code()
        );
    } else {
        warn!(
            "Quantization overflow: clamped {} component(s) in {} sample(s), \
             first at index {}, peak |x| = {:.4}",
            report.clamped_components,
            report.clamped_samples,
            report.first_clamped_index.unwrap_or_default(),
            report.peak_magnitude
        );
    }

    Ok((
        QuantizedBuffer {
            profile: *profile,
            samples,
        },
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::IqSample;

    fn profile(bits: u32) -> QuantizationProfile {
        QuantizationProfile::new(bits, RoundingMode::Nearest).unwrap()
    }

    fn buffer(samples: &[(f64, f64)]) -> WaveformBuffer {
        let samples = samples.iter().map(|&(i, q)| IqSample::new(i, q)).collect();
        WaveformBuffer::from_samples(2e6, samples).unwrap()
    }

    #[test]
    fn test_profile_codes() {
        let p = profile(4);
        assert_eq!(p.full_scale_code(), 7);
        assert_eq!(p.min_code(), -8);

        let p = profile(14);
        assert_eq!(p.full_scale_code(), 8191);
        assert_eq!(p.min_code(), -8192);

        let p = profile(32);
        assert_eq!(p.full_scale_code(), i32::MAX as i64);
        assert_eq!(p.min_code(), i32::MIN as i64);
    }

    #[test]
    fn test_profile_rejects_bad_width() {
        assert!(QuantizationProfile::new(1, RoundingMode::Nearest).is_err());
        assert!(QuantizationProfile::new(0, RoundingMode::Nearest).is_err());
        assert!(QuantizationProfile::new(33, RoundingMode::Nearest).is_err());
        assert!(QuantizationProfile::new(2, RoundingMode::Nearest).is_ok());
    }

    #[test]
    fn test_full_scale_rails() {
        let p = profile(4);
        assert_eq!(p.quantize(1.0), (7, false));
        assert_eq!(p.quantize(-1.0), (-8, false));
        assert_eq!(p.quantize(0.0), (0, false));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        let p = profile(4);
        assert_eq!(p.quantize(0.5).0, 4);
        assert_eq!(p.quantize(-0.5).0, -4);
        assert_eq!(p.quantize(0.2).0, 1);
        assert_eq!(p.quantize(-0.2).0, -1);
    }

    #[test]
    fn test_out_of_range_saturates() {
        let p = profile(4);
        assert_eq!(p.quantize(1.3), (7, true));
        assert_eq!(p.quantize(-1.3), (-8, true));
        assert_eq!(p.quantize(1e12), (7, true));
    }

    #[test]
    fn test_truncate_matches_firmware_table() {
        let p = QuantizationProfile::new(14, RoundingMode::Truncate).unwrap();
        let angle = |n: f64| (2.0 * std::f64::consts::PI * 125e3 * n / 2e6).cos();
        assert_eq!(p.quantize(angle(0.0)).0, 0x1FFF);
        assert_eq!(p.quantize(angle(1.0)).0, 0x1D8F);
        assert_eq!(p.quantize(angle(2.0)).0, 0x169F);
        assert_eq!(p.quantize(-1.0).0, -8191);
        assert_eq!(p.quantize(-1.5), (-8192, true));
        assert_eq!(p.quantize(1.5), (8191, true));
    }

    #[test]
    fn test_quantize_buffer_is_index_aligned() {
        let input = buffer(&[(0.5, 0.0), (-0.5, 0.0)]);
        let (quantized, report) = quantize(&input, &profile(4)).unwrap();
        assert!(report.is_clean());
        assert_eq!(
            quantized.samples(),
            &[QuantizedSample::new(4, 0), QuantizedSample::new(-4, 0)]
        );
        assert_eq!(quantized.profile().bit_width(), 4);
    }

    #[test]
    fn test_clamp_report_counts() {
        let input = buffer(&[(0.1, 0.1), (1.3, -1.3), (0.0, 1.3), (0.9, 0.0)]);
        let (quantized, report) = quantize(&input, &profile(14)).unwrap();

        assert_eq!(report.clamped_components, 3);
        assert_eq!(report.clamped_samples, 2);
        assert_eq!(report.first_clamped_index, Some(1));
        assert!((report.peak_magnitude - 1.3).abs() < 1e-12);

        assert_eq!(quantized.samples()[1], QuantizedSample::new(8191, -8192));
        assert_eq!(quantized.samples()[2], QuantizedSample::new(0, 8191));
    }

    #[test]
    fn test_non_finite_sample_fails() {
        let input = buffer(&[(0.0, 0.0), (f64::NAN, 0.0)]);
        assert!(matches!(
            quantize(&input, &profile(8)),
            Err(VectorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_all_codes_within_profile() {
        let samples: Vec<(f64, f64)> = (0..=200)
            .map(|k| {
                let x = -2.0 + k as f64 * 0.02;
                (x, -x)
            })
            .collect();
        for bits in [2, 3, 8, 14, 16, 32] {
            let p = profile(bits);
            let (quantized, _) = quantize(&buffer(&samples), &p).unwrap();
            assert!(quantized
                .samples()
                .iter()
                .all(|s| p.contains(s.i_code) && p.contains(s.q_code)));
        }
    }
}

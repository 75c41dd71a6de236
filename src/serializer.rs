//! Two's-complement text rendering of quantized I/Q codes.
//!
//! The default format is one binary word per line, I before Q for every
//! sample, MSB first, exactly `bit_width` characters. That layout is what a
//! `$readmemb` / VHDL textio RAM initializer reads into successive memory
//! words, so ordering and width must never drift.

use serde::Deserialize;

use crate::error::{Result, VectorError};
use crate::quantizer::{QuantizationProfile, QuantizedBuffer, MAX_BIT_WIDTH, MIN_BIT_WIDTH};

/// Field width of each component inside an AT86RF215 LVDS word
pub const LVDS_FIELD_BITS: u32 = 14;
const LVDS_I_SYNC: u32 = 0b10;
const LVDS_Q_SYNC: u32 = 0b01;

/// Line format of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One binary word per component (`$readmemb`)
    #[default]
    Bits,
    /// One hex word per component (`$readmemh`)
    Hex,
    /// One 32-bit AT86RF215 LVDS word per sample, in binary
    Lvds,
}

/// Zero padding and looping around the LVDS payload, as loaded into the TX DMA buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LvdsFraming {
    pub preamble_words: usize,
    pub trailer_words: usize,
    /// Total words in the frame; the payload repeats to fill it.
    /// `None` emits the payload exactly once.
    pub total_words: Option<usize>,
}

/// Render `code` as a `bit_width`-character two's-complement string, MSB first
pub fn encode(code: i64, bit_width: u32) -> Result<String> {
    let raw = twos_complement(code, bit_width)?;
    Ok(format!("{:0width$b}", raw, width = bit_width as usize))
}

/// Range-check `code` and map it to `(2^bits + code) mod 2^bits`
fn twos_complement(code: i64, bit_width: u32) -> Result<i64> {
    check_width(bit_width)?;
    let modulus = 1i64 << bit_width;
    let half = modulus / 2;
    if code < -half || code >= half {
        return Err(VectorError::EncodingRange { code, bit_width });
    }
    Ok((code + modulus) % modulus)
}

/// Parse a two's-complement binary string back into a signed code
pub fn decode(bits: &str) -> Result<i64> {
    let bit_width = bits.len() as u32;
    check_width(bit_width)?;
    if !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(VectorError::invalid(format!(
            "'{}' is not a binary string",
            bits
        )));
    }

    let raw = i64::from_str_radix(bits, 2)
        .map_err(|e| VectorError::invalid(format!("'{}': {}", bits, e)))?;
    let modulus = 1i64 << bit_width;
    Ok(if raw >= modulus / 2 { raw - modulus } else { raw })
}

/// Render `code` as upper-case hex, masked to `bit_width` bits
pub fn encode_hex(code: i64, bit_width: u32) -> Result<String> {
    let raw = twos_complement(code, bit_width)?;
    let digits = bit_width.div_ceil(4) as usize;
    Ok(format!("{:0digits$X}", raw, digits = digits))
}

/// Pack one I/Q pair as `[10][I13..I0][01][Q13..Q0]`
pub fn pack_lvds_word(i_code: i64, q_code: i64) -> Result<u32> {
    let field = |code: i64| twos_complement(code, LVDS_FIELD_BITS).map(|raw| raw as u32);
    let i = field(i_code)?;
    let q = field(q_code)?;
    Ok((LVDS_I_SYNC << 30) | (i << 16) | (LVDS_Q_SYNC << 14) | q)
}

/// Binary strings for every component, interleaved I0, Q0, I1, Q1, ...
pub fn to_bitstrings(buffer: &QuantizedBuffer) -> Result<Vec<String>> {
    interleave(buffer, encode)
}

/// Render the whole buffer in `format`, one entry per output line.
///
/// Everything is rendered before any file is touched, so an encoding fault
/// aborts the run without leaving partial output behind.
pub fn render(
    buffer: &QuantizedBuffer,
    format: OutputFormat,
    framing: &LvdsFraming,
) -> Result<Vec<String>> {
    match format {
        OutputFormat::Bits => to_bitstrings(buffer),
        OutputFormat::Hex => interleave(buffer, encode_hex),
        OutputFormat::Lvds => {
            check_lvds_profile(buffer.profile())?;
            let words = lvds_frame(buffer, framing)?;
            Ok(words.iter().map(|w| format!("{:032b}", w)).collect())
        }
    }
}

/// Packed LVDS words with preamble, looped payload and trailer
pub fn lvds_frame(buffer: &QuantizedBuffer, framing: &LvdsFraming) -> Result<Vec<u32>> {
    check_lvds_profile(buffer.profile())?;

    let payload = buffer
        .samples()
        .iter()
        .map(|s| pack_lvds_word(s.i_code, s.q_code))
        .collect::<Result<Vec<u32>>>()?;
    if payload.is_empty() {
        return Err(VectorError::invalid("LVDS frame needs at least one sample"));
    }

    let padding = framing.preamble_words + framing.trailer_words;
    let payload_words = match framing.total_words {
        Some(total) if total <= padding => {
            return Err(VectorError::invalid(format!(
                "LVDS frame of {} words leaves no room for payload \
                 after {} preamble and {} trailer words",
                total, framing.preamble_words, framing.trailer_words
            )));
        }
        Some(total) => total - padding,
        None => payload.len(),
    };

    let mut frame = Vec::with_capacity(padding + payload_words);
    frame.extend(std::iter::repeat(0u32).take(framing.preamble_words));
    frame.extend(payload.iter().copied().cycle().take(payload_words));
    frame.extend(std::iter::repeat(0u32).take(framing.trailer_words));
    Ok(frame)
}

fn interleave(
    buffer: &QuantizedBuffer,
    encoder: fn(i64, u32) -> Result<String>,
) -> Result<Vec<String>> {
    let bit_width = buffer.profile().bit_width();
    let mut lines = Vec::with_capacity(buffer.len() * 2);
    for sample in buffer.samples() {
        lines.push(encoder(sample.i_code, bit_width)?);
        lines.push(encoder(sample.q_code, bit_width)?);
    }
    Ok(lines)
}

fn check_width(bit_width: u32) -> Result<()> {
    if !(MIN_BIT_WIDTH..=MAX_BIT_WIDTH).contains(&bit_width) {
        return Err(VectorError::invalid(format!(
            "bit width must be between {} and {}, got {}",
            MIN_BIT_WIDTH, MAX_BIT_WIDTH, bit_width
        )));
    }
    Ok(())
}

fn check_lvds_profile(profile: &QuantizationProfile) -> Result<()> {
    if profile.bit_width() != LVDS_FIELD_BITS {
        return Err(VectorError::invalid(format!(
            "LVDS words carry {}-bit I/Q fields, profile is {} bits",
            LVDS_FIELD_BITS,
            profile.bit_width()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantizer::{QuantizedSample, RoundingMode};

    fn buffer(bits: u32, codes: &[(i64, i64)]) -> QuantizedBuffer {
        let profile = QuantizationProfile::new(bits, RoundingMode::Nearest).unwrap();
        let samples = codes
            .iter()
            .map(|&(i, q)| QuantizedSample::new(i, q))
            .collect();
        QuantizedBuffer::from_codes(profile, samples)
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(7, 4).unwrap(), "0111");
        assert_eq!(encode(-8, 4).unwrap(), "1000");
        assert_eq!(encode(-1, 4).unwrap(), "1111");
        assert_eq!(encode(0, 14).unwrap(), "00000000000000");
        assert_eq!(encode(8191, 14).unwrap(), "01111111111111");
        assert_eq!(encode(-8191, 14).unwrap(), "10000000000001");
        assert_eq!(encode(-2, 2).unwrap(), "10");
        assert_eq!(encode(i32::MIN as i64, 32).unwrap(), format!("1{}", "0".repeat(31)));
    }

    #[test]
    fn test_encode_out_of_range() {
        assert!(matches!(
            encode(8, 4),
            Err(VectorError::EncodingRange { code: 8, bit_width: 4 })
        ));
        assert!(matches!(
            encode(-9, 4),
            Err(VectorError::EncodingRange { code: -9, bit_width: 4 })
        ));
        assert!(matches!(encode(0, 1), Err(VectorError::InvalidParameter(_))));
        assert!(matches!(encode(0, 33), Err(VectorError::InvalidParameter(_))));
    }

    #[test]
    fn test_round_trip_exhaustive_small_widths() {
        for bits in 2..=12u32 {
            let half = 1i64 << (bits - 1);
            for code in -half..half {
                let s = encode(code, bits).unwrap();
                assert_eq!(s.len(), bits as usize);
                assert_eq!(decode(&s).unwrap(), code, "bits={} code={}", bits, code);
            }
        }
    }

    #[test]
    fn test_round_trip_boundaries_wide_widths() {
        for bits in 13..=32u32 {
            let half = 1i64 << (bits - 1);
            for code in [-half, -half + 1, -1, 0, 1, half / 3, -half / 3, half - 2, half - 1] {
                let s = encode(code, bits).unwrap();
                assert_eq!(s.len(), bits as usize);
                assert_eq!(decode(&s).unwrap(), code, "bits={} code={}", bits, code);
            }
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("01a1").is_err());
        assert!(decode("1").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(0, 14).unwrap(), "0000");
        assert_eq!(encode_hex(8191, 14).unwrap(), "1FFF");
        assert_eq!(encode_hex(-8192, 14).unwrap(), "2000");
        assert_eq!(encode_hex(i32::MIN as i64, 32).unwrap(), "80000000");
        assert!(matches!(
            encode_hex(8192, 14),
            Err(VectorError::EncodingRange { code: 8192, bit_width: 14 })
        ));
        assert_eq!(encode_hex(-8191, 14).unwrap(), "2001");
        assert_eq!(encode_hex(-1, 4).unwrap(), "F");
        assert_eq!(encode_hex(-1, 5).unwrap(), "1F");
    }

    #[test]
    fn test_interleaving_order() {
        // I = [0.5, -0.5], Q = [0, 0] at 4 bits
        let lines = to_bitstrings(&buffer(4, &[(4, 0), (-4, 0)])).unwrap();
        assert_eq!(lines, vec!["0100", "0000", "1100", "0000"]);
    }

    #[test]
    fn test_render_aborts_on_unclamped_code() {
        let framing = LvdsFraming::default();
        let result = render(&buffer(4, &[(1, 0), (9, 0)]), OutputFormat::Bits, &framing);
        assert!(matches!(result, Err(VectorError::EncodingRange { code: 9, .. })));
    }

    #[test]
    fn test_pack_lvds_word() {
        assert_eq!(pack_lvds_word(0x1FFF, 0).unwrap(), 0x9FFF_4000);
        assert_eq!(pack_lvds_word(0, 0).unwrap(), 0x8000_4000);
        assert_eq!(pack_lvds_word(-1, -1).unwrap(), 0xBFFF_7FFF);
        assert_eq!(pack_lvds_word(-8192, 8191).unwrap(), 0xA000_5FFF);
        assert!(pack_lvds_word(8192, 0).is_err());
    }

    #[test]
    fn test_lvds_frame_padding_and_loop() {
        let framing = LvdsFraming {
            preamble_words: 2,
            trailer_words: 1,
            total_words: Some(8),
        };
        let frame = lvds_frame(&buffer(14, &[(1, 0), (2, 0)]), &framing).unwrap();
        let w1 = pack_lvds_word(1, 0).unwrap();
        let w2 = pack_lvds_word(2, 0).unwrap();
        assert_eq!(frame, vec![0, 0, w1, w2, w1, w2, w1, 0]);
    }

    #[test]
    fn test_lvds_frame_without_total_emits_payload_once() {
        let framing = LvdsFraming {
            preamble_words: 1,
            trailer_words: 1,
            total_words: None,
        };
        let frame = lvds_frame(&buffer(14, &[(1, 0), (2, 0)]), &framing).unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame[0], 0);
        assert_eq!(frame[3], 0);
    }

    #[test]
    fn test_lvds_rejects_bad_configuration() {
        let framing = LvdsFraming {
            preamble_words: 32,
            trailer_words: 16,
            total_words: Some(48),
        };
        assert!(lvds_frame(&buffer(14, &[(1, 0)]), &framing).is_err());
        let default_framing = LvdsFraming::default();
        assert!(render(&buffer(12, &[(1, 0)]), OutputFormat::Lvds, &default_framing).is_err());
    }

    #[test]
    fn test_render_lvds_lines_are_32_bits() {
        let framing = LvdsFraming::default();
        let lines = render(&buffer(14, &[(0x1FFF, 0)]), OutputFormat::Lvds, &framing).unwrap();
        assert_eq!(lines, vec!["10011111111111110100000000000000"]);
    }
}

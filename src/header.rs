//! SEG-Y text, reel and trace header parsing
//!
//! Only 32-bit sample formats are handled: every trace is a 240-byte header
//! followed by `sample_count` big-endian 4-byte words.

use crate::config::{Coordinate, FieldLayout, FieldSpec, TRACE_HEADER_SIZE};
use crate::ebcdic;
use crate::error::{Result, RssError};
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Size of the EBCDIC card-image header
pub const TEXT_HEADER_SIZE: usize = 3200;

/// Size of the binary reel header following the text header
pub const REEL_HEADER_SIZE: usize = 400;

/// Offset of the first trace
pub const DATA_START: u64 = (TEXT_HEADER_SIZE + REEL_HEADER_SIZE) as u64;

const CARD_LINES: usize = 40;
const CARD_WIDTH: usize = 80;

/// Bytes per sample; the only width supported
pub const SAMPLE_SIZE: usize = 4;

/// Sample encodings accepted for ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SampleFormat {
    /// 4-byte IBM hexadecimal floating point
    IbmFloat = 1,
    /// 4-byte IEEE754 floating point
    IeeeFloat = 5,
}

impl SampleFormat {
    /// Resolve a reel-header format code
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            1 => Ok(SampleFormat::IbmFloat),
            5 => Ok(SampleFormat::IeeeFloat),
            other => Err(RssError::UnsupportedFormat(describe_format(other).to_string())),
        }
    }
}

/// Textual description of a SEG-Y sample format code
pub fn describe_format(code: u16) -> &'static str {
    match code {
        1 => "4-byte IBM floating-point",
        2 => "4-byte, twos complement integer",
        3 => "2-byte, twos complement integer",
        4 => "4-byte fixed-point with gain",
        5 => "4-byte IEEE floating-point",
        8 => "1-byte twos complement integer",
        _ => "unknown",
    }
}

/// Measurement system of the survey coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialUnit {
    Unknown,
    Meters,
    Feet,
}

impl SpatialUnit {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => SpatialUnit::Meters,
            2 => SpatialUnit::Feet,
            _ => SpatialUnit::Unknown,
        }
    }
}

/// File-wide values from the binary reel header
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReelHeader {
    pub sample_interval_ms: f64,
    pub sample_count: usize,
    pub format: SampleFormat,
    pub units: SpatialUnit,
    /// Trace header plus samples, in bytes
    pub trace_size: usize,
    pub trace_count: usize,
}

impl ReelHeader {
    /// Parse the 400-byte reel block of a file of `file_size` bytes
    pub fn from_bytes(block: &[u8], file_size: u64) -> Result<Self> {
        if block.len() < REEL_HEADER_SIZE {
            return Err(RssError::TruncatedFile {
                expected: DATA_START,
                actual: (TEXT_HEADER_SIZE + block.len()) as u64,
            });
        }

        let sample_interval_us = BigEndian::read_u16(&block[16..18]);
        let sample_count = BigEndian::read_u16(&block[20..22]) as usize;
        let format = SampleFormat::from_code(BigEndian::read_u16(&block[24..26]))?;
        let units = SpatialUnit::from_code(BigEndian::read_u16(&block[54..56]));

        let trace_size = sample_count * SAMPLE_SIZE + TRACE_HEADER_SIZE;
        let data_bytes = file_size.saturating_sub(DATA_START);
        if data_bytes % trace_size as u64 != 0 {
            return Err(RssError::VariableTraceLength {
                data_bytes,
                trace_size: trace_size as u64,
            });
        }

        Ok(Self {
            sample_interval_ms: sample_interval_us as f64 / 1000.0,
            sample_count,
            format,
            units,
            trace_size,
            trace_count: (data_bytes / trace_size as u64) as usize,
        })
    }
}

fn read_block(source: &Path, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut file = File::open(source)?;
    let file_size = file.metadata()?.len();
    if file_size < offset + len as u64 {
        return Err(RssError::TruncatedFile {
            expected: offset + len as u64,
            actual: file_size,
        });
    }
    file.seek(SeekFrom::Start(offset))?;
    let mut block = vec![0u8; len];
    file.read_exact(&mut block)?;
    Ok(block)
}

/// Split a decoded 3200-byte header into its 40 card lines
pub fn text_header_lines(block: &[u8]) -> Result<Vec<String>> {
    if block.len() < TEXT_HEADER_SIZE {
        return Err(RssError::TruncatedFile {
            expected: TEXT_HEADER_SIZE as u64,
            actual: block.len() as u64,
        });
    }
    Ok(block[..TEXT_HEADER_SIZE]
        .chunks(CARD_WIDTH)
        .take(CARD_LINES)
        .map(ebcdic::decode)
        .collect())
}

/// Decode a text header block into 40 newline-terminated lines
pub fn decode_text_header(block: &[u8]) -> Result<String> {
    let lines = text_header_lines(block)?;
    let mut text = String::with_capacity(TEXT_HEADER_SIZE + CARD_LINES);
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

/// Read and decode the text header of a SEG-Y file
pub fn parse_text_header(source: impl AsRef<Path>) -> Result<String> {
    let block = read_block(source.as_ref(), 0, TEXT_HEADER_SIZE)?;
    decode_text_header(&block)
}

/// Read the reel header of a SEG-Y file and validate the trace layout
pub fn parse_reel_header(source: impl AsRef<Path>) -> Result<ReelHeader> {
    let source = source.as_ref();
    let file_size = std::fs::metadata(source)?.len();
    let block = read_block(source, TEXT_HEADER_SIZE as u64, REEL_HEADER_SIZE)?;
    ReelHeader::from_bytes(&block, file_size)
}

/// Per-trace positioning values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHeader {
    pub inline: i32,
    pub crossline: i32,
    pub cdpx: f64,
    pub cdpy: f64,
    /// Scalar actually applied to the scaled coordinates
    pub scalar: i32,
}

/// Read one big-endian integer field from a trace header
pub fn read_field(header: &[u8], spec: &FieldSpec) -> Result<i64> {
    let bytes = header.get(spec.range()).ok_or_else(|| {
        RssError::InvalidFieldLayout(format!(
            "field at byte {} runs past the {}-byte header",
            spec.byte,
            header.len()
        ))
    })?;
    match (spec.width, spec.signed) {
        (2, true) => Ok(BigEndian::read_i16(bytes) as i64),
        (2, false) => Ok(BigEndian::read_u16(bytes) as i64),
        (4, true) => Ok(BigEndian::read_i32(bytes) as i64),
        (4, false) => Ok(BigEndian::read_u32(bytes) as i64),
        (width, _) => Err(RssError::InvalidFieldLayout(format!(
            "field at byte {} has width {}, expected 2 or 4",
            spec.byte, width
        ))),
    }
}

/// Apply a SEG-Y coordinate scalar: positive multiplies, negative divides
///
/// A zero scalar is treated as 1.
pub fn apply_scalar(value: i64, scalar: i32) -> f64 {
    match scalar {
        0 => value as f64,
        s if s > 0 => value as f64 * s as f64,
        s => value as f64 / s.unsigned_abs() as f64,
    }
}

/// Extract the configured fields from a 240-byte trace header
pub fn parse_trace_header(
    bytes: &[u8],
    layout: &FieldLayout,
    scalar_override: Option<i32>,
) -> Result<TraceHeader> {
    if bytes.len() < TRACE_HEADER_SIZE {
        return Err(RssError::TruncatedFile {
            expected: TRACE_HEADER_SIZE as u64,
            actual: bytes.len() as u64,
        });
    }

    layout.validate()?;

    let scalar = match scalar_override {
        Some(scalar) => scalar,
        None => read_field(bytes, &layout.scalar)? as i32,
    };
    let coordinate = |spec: &FieldSpec, which: Coordinate| -> Result<f64> {
        let raw = read_field(bytes, spec)?;
        Ok(if layout.is_scaled(which) {
            apply_scalar(raw, scalar)
        } else {
            raw as f64
        })
    };

    Ok(TraceHeader {
        inline: read_field(bytes, &layout.inline)? as i32,
        crossline: read_field(bytes, &layout.crossline)? as i32,
        cdpx: coordinate(&layout.cdpx, Coordinate::CdpX)?,
        cdpy: coordinate(&layout.cdpy, Coordinate::CdpY)?,
        scalar,
    })
}

/// Convert an IBM System/360 single precision word to IEEE754
pub fn ibm_to_ieee(word: u32) -> f32 {
    let sign = if word >> 31 == 1 { -1.0 } else { 1.0 };
    let exponent = ((word >> 24) & 0x7f) as i32;
    let fraction = word & 0x00ff_ffff;
    if fraction == 0 {
        return sign as f32 * 0.0;
    }
    // value = 0.fraction (base 16) * 16^(exponent - 64)
    let value = fraction as f64 * 2f64.powi(4 * (exponent - 64) - 24);
    (sign * value) as f32
}

/// Decode big-endian sample words into `out`
pub fn decode_samples_into(bytes: &[u8], format: SampleFormat, out: &mut [f32]) -> Result<()> {
    if bytes.len() != out.len() * SAMPLE_SIZE {
        return Err(RssError::InvalidVolume(format!(
            "sample block of {} bytes does not hold {} samples",
            bytes.len(),
            out.len()
        )));
    }
    match format {
        SampleFormat::IbmFloat => {
            for (sample, word) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_SIZE)) {
                *sample = ibm_to_ieee(BigEndian::read_u32(word));
            }
        }
        SampleFormat::IeeeFloat => BigEndian::read_f32_into(bytes, out),
    }
    Ok(())
}

/// Decode the sample block of one trace given a reel-header format code
pub fn decode_samples(bytes: &[u8], format_code: u16) -> Result<Vec<f32>> {
    let format = SampleFormat::from_code(format_code)?;
    let mut out = vec![0.0f32; bytes.len() / SAMPLE_SIZE];
    decode_samples_into(bytes, format, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn reel_block(interval_us: u16, ns: u16, format: u16, units: u16) -> Vec<u8> {
        let mut block = vec![0u8; REEL_HEADER_SIZE];
        BigEndian::write_u16(&mut block[16..18], interval_us);
        BigEndian::write_u16(&mut block[20..22], ns);
        BigEndian::write_u16(&mut block[24..26], format);
        BigEndian::write_u16(&mut block[54..56], units);
        block
    }

    #[test]
    fn test_reel_header_fields() {
        let block = reel_block(4000, 1001, 1, 1);
        let file_size = DATA_START + 3 * (1001 * 4 + 240);
        let reel = ReelHeader::from_bytes(&block, file_size).unwrap();
        assert_eq!(reel.sample_interval_ms, 4.0);
        assert_eq!(reel.sample_count, 1001);
        assert_eq!(reel.format, SampleFormat::IbmFloat);
        assert_eq!(reel.units, SpatialUnit::Meters);
        assert_eq!(reel.trace_size, 4244);
        assert_eq!(reel.trace_count, 3);
    }

    #[test]
    fn test_reel_header_ieee_example() {
        let block = reel_block(1000, 1501, 5, 1);
        let trace_size = 240 + 4 * 1501;
        let reel = ReelHeader::from_bytes(&block, DATA_START + 120 * trace_size as u64).unwrap();
        assert_eq!(reel.format, SampleFormat::IeeeFloat);
        assert_eq!(reel.trace_size, trace_size);
        assert_eq!(reel.trace_count, 120);
    }

    #[test]
    fn test_reel_header_rejects_integer_formats() {
        let block = reel_block(4000, 10, 2, 0);
        let err = ReelHeader::from_bytes(&block, DATA_START + 280).unwrap_err();
        match err {
            RssError::UnsupportedFormat(desc) => assert_eq!(desc, "4-byte, twos complement integer"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_reel_header_variable_trace_length() {
        let block = reel_block(4000, 10, 5, 0);
        let err = ReelHeader::from_bytes(&block, DATA_START + 281).unwrap_err();
        assert!(matches!(err, RssError::VariableTraceLength { trace_size: 280, .. }));
    }

    #[test]
    fn test_truncated_text_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x40; 100]).unwrap();
        let err = parse_text_header(file.path()).unwrap_err();
        assert!(matches!(err, RssError::TruncatedFile { expected: 3200, actual: 100 }));
    }

    #[test]
    fn test_text_header_is_byte_exact() {
        let mut expected = String::new();
        for i in 1..=40 {
            expected.push_str(&format!("{:<80}\n", format!("C{:02} LINE {}", i, i * 7)));
        }
        let block = ebcdic::encode(&expected.replace('\n', ""));
        assert_eq!(block.len(), TEXT_HEADER_SIZE);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&block).unwrap();
        file.write_all(&[0u8; REEL_HEADER_SIZE]).unwrap();
        assert_eq!(parse_text_header(file.path()).unwrap(), expected);
    }

    fn trace_header(inline: i32, crossline: i32, cdpx: i32, cdpy: i32, scalar: i16) -> Vec<u8> {
        let mut hdr = vec![0u8; TRACE_HEADER_SIZE];
        BigEndian::write_i16(&mut hdr[70..72], scalar);
        BigEndian::write_i32(&mut hdr[180..184], cdpx);
        BigEndian::write_i32(&mut hdr[184..188], cdpy);
        BigEndian::write_i32(&mut hdr[188..192], inline);
        BigEndian::write_i32(&mut hdr[192..196], crossline);
        hdr
    }

    #[test]
    fn test_trace_header_default_layout() {
        let hdr = trace_header(1253, 1430, 40_000_000, 75_000_000, -100);
        let parsed = parse_trace_header(&hdr, &FieldLayout::default(), None).unwrap();
        assert_eq!(parsed.inline, 1253);
        assert_eq!(parsed.crossline, 1430);
        assert_eq!(parsed.cdpx, 400_000.0);
        assert_eq!(parsed.cdpy, 750_000.0);
        assert_eq!(parsed.scalar, -100);
    }

    #[test]
    fn test_trace_header_scalar_override_and_zero() {
        let hdr = trace_header(1, 2, 15, -4, -100);
        let parsed = parse_trace_header(&hdr, &FieldLayout::default(), Some(10)).unwrap();
        assert_eq!(parsed.cdpx, 150.0);
        assert_eq!(parsed.cdpy, -40.0);

        let parsed = parse_trace_header(&hdr, &FieldLayout::default(), Some(0)).unwrap();
        assert_eq!(parsed.cdpx, 15.0);
    }

    #[test]
    fn test_trace_header_custom_layout() {
        let mut hdr = trace_header(0, 0, 1000, 2000, 10);
        BigEndian::write_i32(&mut hdr[8..12], 77);
        BigEndian::write_u16(&mut hdr[20..22], 40_000);
        let layout = FieldLayout::default()
            .with_inline(FieldSpec::signed(9, 4))
            .with_crossline(FieldSpec {
                byte: 21,
                width: 2,
                signed: false,
            })
            .with_scaled(vec![Coordinate::CdpY]);
        let parsed = parse_trace_header(&hdr, &layout, None).unwrap();
        assert_eq!(parsed.inline, 77);
        assert_eq!(parsed.crossline, 40_000);
        assert_eq!(parsed.cdpx, 1000.0);
        assert_eq!(parsed.cdpy, 20_000.0);
    }

    #[test]
    fn test_trace_header_rejects_bad_layout() {
        let hdr = trace_header(1, 2, 3, 4, 1);
        let past_end = FieldLayout::default().with_inline(FieldSpec::signed(239, 4));
        assert!(matches!(
            parse_trace_header(&hdr, &past_end, None),
            Err(RssError::InvalidFieldLayout(_))
        ));
        let odd_width = FieldLayout::default().with_crossline(FieldSpec::signed(193, 3));
        assert!(matches!(
            parse_trace_header(&hdr, &odd_width, None),
            Err(RssError::InvalidFieldLayout(_))
        ));
    }

    #[test]
    fn test_read_field_checks_range_and_width() {
        let hdr = trace_header(1253, 0, 0, 0, 0);
        assert_eq!(read_field(&hdr, &FieldSpec::signed(189, 4)).unwrap(), 1253);
        assert!(read_field(&hdr, &FieldSpec::signed(239, 4)).is_err());
        assert!(read_field(&hdr, &FieldSpec::signed(189, 3)).is_err());
        assert!(read_field(&hdr[..100], &FieldSpec::signed(189, 4)).is_err());
    }

    #[test]
    fn test_ibm_to_ieee_known_values() {
        assert_eq!(ibm_to_ieee(0x4110_0000), 1.0);
        assert_eq!(ibm_to_ieee(0xC276_A000), -118.625);
        assert_eq!(ibm_to_ieee(0x4080_0000), 0.5);
        assert_eq!(ibm_to_ieee(0x0000_0000), 0.0);
    }

    #[test]
    fn test_decode_samples_ieee_and_ibm() {
        let mut ieee = Vec::new();
        for v in [1.5f32, -2.25, 0.0] {
            ieee.write_f32::<BigEndian>(v).unwrap();
        }
        assert_eq!(decode_samples(&ieee, 5).unwrap(), vec![1.5, -2.25, 0.0]);

        let mut ibm = Vec::new();
        ibm.write_u32::<BigEndian>(0x4110_0000).unwrap();
        ibm.write_u32::<BigEndian>(0xC276_A000).unwrap();
        assert_eq!(decode_samples(&ibm, 1).unwrap(), vec![1.0, -118.625]);

        assert!(matches!(decode_samples(&ibm, 3), Err(RssError::UnsupportedFormat(_))));
    }
}

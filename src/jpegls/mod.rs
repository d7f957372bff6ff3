//
// jpegls/mod.rs
// Dicom-Sco-To-Bto-rs
//
// JPEG-LS (ITU-T T.87) decoding of the single-component, non-interleaved codestreams synthesized
// for each tomosynthesis frame, lossless and near-lossless.
//
// Thales Matheus Mendonça Santos - October 2026

mod bit_reader;
mod context;
mod scan;
mod stream;

use thiserror::Error;

use self::bit_reader::BitReader;
use self::context::CodingParameters;
use self::scan::ScanDecoder;

const EOI_CODE: u8 = 0xD9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JpegLsError {
    #[error("codestream does not start with SOI")]
    MissingStartOfImage,

    #[error("codestream ended inside a marker segment")]
    UnexpectedEnd,

    #[error("unsupported frame marker 0xFF{0:02X}")]
    UnsupportedMarker(u8),

    #[error("unsupported JPEG-LS feature: {0}")]
    Unsupported(&'static str),

    #[error("invalid {0} parameter")]
    InvalidParameter(&'static str),

    #[error("invalid encoded data: {0}")]
    InvalidData(&'static str),

    #[error("scan data ended before every sample was decoded")]
    ScanExhausted,
}

/// SOF55 frame header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u16,
    pub height: u16,
    pub bits_per_sample: u8,
    pub component_count: u8,
}

/// LSE preset coding parameters; zero fields select the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetParameters {
    pub max_value: u16,
    pub threshold1: u16,
    pub threshold2: u16,
    pub threshold3: u16,
    pub reset: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHeader {
    pub near: u8,
    pub interleave_mode: u8,
    pub point_transform: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub frame: FrameInfo,
    pub near: u8,
    /// Row-major samples, right-aligned.
    pub samples: Vec<u16>,
    /// Set when every sample was reconstructed but the scan did not end cleanly.
    pub trailing: Option<String>,
}

pub fn decode(codestream: &[u8]) -> Result<DecodedImage, JpegLsError> {
    let header = stream::read_header(codestream)?;
    let params = CodingParameters::new(
        header.frame.bits_per_sample,
        header.scan.near,
        header.preset.as_ref(),
    )?;

    let mut reader = BitReader::new(&codestream[header.scan_data_offset..]);
    let samples = ScanDecoder::new(&header.frame, params).decode(&mut reader)?;

    let remainder = reader.finish();
    let trailing = if remainder.leftover_bits >= 8 || remainder.nonzero_padding {
        Some(format!(
            "{} bit(s) of scan data left after the last sample",
            remainder.leftover_bits
        ))
    } else if remainder.marker != Some(EOI_CODE) {
        Some(match remainder.marker {
            Some(code) => format!("scan ended at marker 0xFF{:02X} instead of EOI", code),
            None => "scan ended without EOI".to_string(),
        })
    } else {
        None
    };

    Ok(DecodedImage {
        frame: header.frame,
        near: header.scan.near,
        samples,
        trailing,
    })
}

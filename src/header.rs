//
// header.rs
// Dicom-Sco-To-Bto-rs
//
// Reads the fixed-offset scalar fields at the start of the vendor imaging blob.
//
// Thales Matheus Mendonça Santos - October 2026

use serde::{Deserialize, Serialize};

use crate::blob::PrivateImagingBlob;
use crate::error::{ConversionError, Result};
use crate::rebuild::EncodingVariant;

const FRAME_COUNT_OFFSET: usize = 20;
const COLUMNS_OFFSET: usize = 24;
const ROWS_OFFSET: usize = 28;
const BITS_STORED_OFFSET: usize = 32;
const LOSSY_TOLERANCE_OFFSET: usize = 36;

/// Scalar fields of the vendor blob header.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlobHeader {
    pub frame_count: u16,
    pub columns: u16,
    pub rows: u16,
    pub bits_stored: u8,
    /// Zero for a lossless stream, otherwise the near-lossless NEAR value.
    pub lossy_tolerance: u8,
}

/// Per-frame geometry shared by the codestream header and the rebuilt dataset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub rows: u16,
    pub columns: u16,
    pub bits_stored: u8,
}

impl FrameGeometry {
    pub fn samples_per_frame(&self) -> usize {
        usize::from(self.rows) * usize::from(self.columns)
    }
}

impl BlobHeader {
    pub fn read(blob: &PrivateImagingBlob) -> Result<Self> {
        let header = BlobHeader {
            frame_count: read_u16_le(blob, FRAME_COUNT_OFFSET)?,
            columns: read_u16_le(blob, COLUMNS_OFFSET)?,
            rows: read_u16_le(blob, ROWS_OFFSET)?,
            bits_stored: read_u8(blob, BITS_STORED_OFFSET)?,
            lossy_tolerance: read_u8(blob, LOSSY_TOLERANCE_OFFSET)?,
        };

        if !(1..=16).contains(&header.bits_stored) {
            return Err(ConversionError::InvalidHeader(format!(
                "bits stored must be within 1..=16, found {}",
                header.bits_stored
            )));
        }

        Ok(header)
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            rows: self.rows,
            columns: self.columns,
            bits_stored: self.bits_stored,
        }
    }

    pub fn encoding(&self) -> EncodingVariant {
        EncodingVariant::for_tolerance(self.lossy_tolerance)
    }
}

fn read_u16_le(blob: &PrivateImagingBlob, offset: usize) -> Result<u16> {
    let bytes = blob.read_at(offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u8(blob: &PrivateImagingBlob, offset: usize) -> Result<u8> {
    Ok(blob.read_at(offset, 1)?[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(frames: u16, columns: u16, rows: u16, bits: u8, near: u8) -> Vec<u8> {
        let mut bytes = vec![0xAA_u8; 40];
        bytes[20..22].copy_from_slice(&frames.to_le_bytes());
        bytes[24..26].copy_from_slice(&columns.to_le_bytes());
        bytes[28..30].copy_from_slice(&rows.to_le_bytes());
        bytes[32] = bits;
        bytes[36] = near;
        bytes
    }

    #[test]
    fn fields_are_read_little_endian_at_fixed_offsets() {
        let blob = PrivateImagingBlob::from(header_bytes(61, 0x0D00, 0x0A01, 12, 3));
        let header = BlobHeader::read(&blob).expect("header");
        assert_eq!(
            header,
            BlobHeader {
                frame_count: 61,
                columns: 0x0D00,
                rows: 0x0A01,
                bits_stored: 12,
                lossy_tolerance: 3,
            }
        );
        assert_eq!(header.encoding(), EncodingVariant::JpegLsNearLossless);
        assert_eq!(header.geometry().samples_per_frame(), 0x0D00 * 0x0A01);
    }

    #[test]
    fn short_blob_is_truncated() {
        let mut bytes = header_bytes(1, 2, 2, 8, 0);
        bytes.truncate(36);
        let err = BlobHeader::read(&PrivateImagingBlob::from(bytes)).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::TruncatedBlob { offset: 36, .. }
        ));
    }

    #[test]
    fn bits_stored_out_of_range_is_rejected() {
        for bits in [0_u8, 17] {
            let blob = PrivateImagingBlob::from(header_bytes(1, 2, 2, bits, 0));
            assert!(matches!(
                BlobHeader::read(&blob),
                Err(ConversionError::InvalidHeader(_))
            ));
        }
    }
}

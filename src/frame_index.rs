//
// frame_index.rs
// Dicom-Sco-To-Bto-rs
//
// Reads the trailing frame offset table of the vendor blob and carves out the raw per-frame payloads.
//
// Thales Matheus Mendonça Santos - October 2026

use std::ops::Range;

use tracing::debug;

use crate::blob::PrivateImagingBlob;
use crate::error::{ConversionError, Result};

/// The offset table starts this many bytes before the end of the blob.
pub const INDEX_TABLE_REGION: usize = 1024;

/// Raw entropy-coded payload of one frame, borrowed from the blob.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RawFrame<'a> {
    pub index: usize,
    pub bytes: &'a [u8],
}

/// `frame_count + 1` start offsets; the last entry is the end sentinel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrameIndexTable {
    entries: Vec<i32>,
}

impl FrameIndexTable {
    pub fn read(blob: &PrivateImagingBlob, frame_count: u16) -> Result<Self> {
        let table_start =
            blob.len()
                .checked_sub(INDEX_TABLE_REGION)
                .ok_or(ConversionError::TruncatedBlob {
                    offset: 0,
                    needed: INDEX_TABLE_REGION,
                    len: blob.len(),
                })?;

        let entries = (0..=usize::from(frame_count))
            .map(|i| {
                let bytes = blob.read_at(table_start + i * 4, 4)?;
                Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table_start, ?entries, "Read frame index table");
        Ok(Self { entries })
    }

    pub fn frame_count(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    pub fn entries(&self) -> &[i32] {
        &self.entries
    }

    /// Byte range `[entry[i], entry[i + 1] - 1)` of frame `i`.
    ///
    /// The byte preceding each next frame offset is not part of the frame payload.
    pub fn frame_range(&self, frame: usize) -> Result<Range<usize>> {
        let (start, end) = match (self.entries.get(frame), self.entries.get(frame + 1)) {
            (Some(&start), Some(&end)) => (start, end),
            _ => {
                return Err(ConversionError::MissingData(format!(
                    "frame {} is not present in the index table ({} frame(s))",
                    frame,
                    self.frame_count()
                )))
            }
        };

        let length = i64::from(end) - i64::from(start) - 1;
        if start < 0 || length < 0 {
            return Err(ConversionError::InvalidFrameRange { frame, start, end });
        }

        let start = start as usize;
        Ok(start..start + length as usize)
    }

    pub fn slice<'a>(&self, blob: &'a PrivateImagingBlob, frame: usize) -> Result<RawFrame<'a>> {
        let range = self.frame_range(frame)?;
        let bytes = blob.read_at(range.start, range.len())?;
        Ok(RawFrame {
            index: frame,
            bytes,
        })
    }

    /// Every frame in index order.
    pub fn slice_all<'a>(&self, blob: &'a PrivateImagingBlob) -> Result<Vec<RawFrame<'a>>> {
        (0..self.frame_count())
            .map(|frame| self.slice(blob, frame))
            .collect()
    }
}

//
// blob.rs
// Dicom-Sco-To-Bto-rs
//
// Reassembles the vendor imaging blob scattered across the items of the Hologic private sequence.
//
// Thales Matheus Mendonça Santos - October 2026

use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::InMemDicomObject;
use tracing::debug;

use crate::dicom_access::ElementAccess;
use crate::error::{ConversionError, Result};

/// Private creator reserving the imaging attributes.
pub const HOLOGIC_CREATOR: &str = "HOLOGIC, Inc.";
/// Private group holding the imaging attributes.
pub const HOLOGIC_GROUP: u16 = 0x7E01;
/// Sequence with the full imaging resolution blob.
pub const FULL_RESOLUTION_OFFSET: u8 = 0x10;
/// Sequence with the lower imaging resolution blob.
pub const LOWER_RESOLUTION_OFFSET: u8 = 0x11;
/// OB fragment inside each sequence item.
pub const IMAGING_DATA_OFFSET: u8 = 0x12;

/// Which private sequence feeds the blob.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ImagingResolution {
    #[default]
    Full,
    Lower,
}

impl ImagingResolution {
    fn element_offset(self) -> u8 {
        match self {
            ImagingResolution::Full => FULL_RESOLUTION_OFFSET,
            ImagingResolution::Lower => LOWER_RESOLUTION_OFFSET,
        }
    }
}

/// Contiguous vendor payload: header fields, frame data and the trailing index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateImagingBlob {
    bytes: Vec<u8>,
}

impl PrivateImagingBlob {
    /// Concatenate the imaging data fragments of the selected private sequence, in item order.
    pub fn assemble(
        obj: &InMemDicomObject<StandardDataDictionary>,
        resolution: ImagingResolution,
    ) -> Result<Self> {
        let offset = resolution.element_offset();
        let sequence_tag = obj
            .private_tag(HOLOGIC_GROUP, HOLOGIC_CREATOR, offset)
            .ok_or_else(|| missing_tag(offset, "private creator not found"))?;
        let items = obj
            .element_items(sequence_tag)
            .filter(|items| !items.is_empty())
            .ok_or_else(|| missing_tag(offset, "sequence absent or empty"))?;

        // Items normally repeat the creator element; fall back to the parent's block otherwise.
        let parent_data_tag = dicom::core::Tag(
            HOLOGIC_GROUP,
            (sequence_tag.element() & 0xFF00) | u16::from(IMAGING_DATA_OFFSET),
        );

        let mut fragments = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let data_tag = item
                .private_tag(HOLOGIC_GROUP, HOLOGIC_CREATOR, IMAGING_DATA_OFFSET)
                .unwrap_or(parent_data_tag);
            let data = item.element_bytes(data_tag).ok_or_else(|| {
                missing_tag(
                    IMAGING_DATA_OFFSET,
                    &format!("absent from sequence item {}", index + 1),
                )
            })?;
            debug!(item = index, bytes = data.len(), "Collected imaging data fragment");
            fragments.push(data);
        }

        Ok(Self::from_fragments(fragments.iter().map(|f| &**f)))
    }

    pub fn from_fragments<'a>(fragments: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut bytes = Vec::new();
        for fragment in fragments {
            bytes.extend_from_slice(fragment);
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bounds-checked view of `needed` bytes at `offset`.
    pub(crate) fn read_at(&self, offset: usize, needed: usize) -> Result<&[u8]> {
        offset
            .checked_add(needed)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(ConversionError::TruncatedBlob {
                offset,
                needed,
                len: self.bytes.len(),
            })
    }
}

impl From<Vec<u8>> for PrivateImagingBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

fn missing_tag(offset: u8, reason: &str) -> ConversionError {
    ConversionError::MissingData(format!(
        "Input file doesn't seem to contain the required private tags ({:04X},xx{:02X}): {}",
        HOLOGIC_GROUP, offset, reason
    ))
}

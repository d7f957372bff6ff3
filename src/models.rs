//
// models.rs
// Dicom-Sco-To-Bto-rs
//
// Serializable summaries reported by the converter and the blob inspector.
//
// Thales Matheus Mendonça Santos - October 2026

use serde::{Deserialize, Serialize};

use crate::header::BlobHeader;
use crate::rebuild::EncodingVariant;

/// Outcome of one successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub header: BlobHeader,
    pub encoding: EncodingVariant,
    pub blob_length: usize,
    pub frames: usize,
    pub sop_instance_uid: String,
    pub transfer_syntax: String,
    pub suppressed_decode_faults: usize,
}

/// Location of one raw frame inside the blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    pub index: usize,
    pub offset: usize,
    pub length: usize,
}

/// Everything the inspector can tell about a blob without decoding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobSummary {
    pub header: BlobHeader,
    pub encoding: EncodingVariant,
    pub encoding_uid: String,
    pub blob_length: usize,
    pub index_table: Vec<i32>,
    pub frames: Vec<FrameSummary>,
    /// Hex dump of the synthesized codestream header of the first frame.
    pub codestream_header: Option<String>,
}

/// Per-directory tally for batch conversions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub converted: usize,
    pub failed: Vec<String>,
}

//
// error.rs
// Dicom-Sco-To-Bto-rs
//
// Error taxonomy shared by every conversion stage, from blob assembly to transcoding.
//
// Thales Matheus Mendonça Santos - October 2026

use dicom::core::Tag;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Truncated imaging blob: read of {needed} byte(s) at offset {offset} exceeds blob length {len}")]
    TruncatedBlob {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("Invalid range for frame {frame}: start={start}, end={end}")]
    InvalidFrameRange { frame: usize, start: i32, end: i32 },

    #[error("Invalid blob header: {0}")]
    InvalidHeader(String),

    #[error("Cannot propagate attribute {tag}: {reason}")]
    PropagatedAttribute { tag: Tag, reason: String },

    #[error("Failed to decode frame {frame}: {message}")]
    Decode { frame: usize, message: String },

    #[error("Failed to build file meta group: {0}")]
    FileMeta(String),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

//
// lib.rs
// Dicom-Sco-To-Bto-rs
//
// Exposes the conversion stages and re-exports the pipeline entry points for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - October 2026

// Stages in pipeline order, followed by the boundary and utility modules.
pub mod blob;
pub mod header;
pub mod frame_index;
pub mod codestream;
pub mod rebuild;
pub mod decoder;
pub mod jpegls;
pub mod transcode;
pub mod convert;

pub mod batch;
pub mod cli;
pub mod dicom_access;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod models;
pub mod storage;

pub use cli::{run as run_cli, Cli, Commands};
pub use convert::{ConversionOptions, ConvertedFile, ScoConverter};
pub use decoder::{DecodeFault, DecodeRequest, FrameDecoder, JpegLsDecoder};
pub use error::ConversionError;

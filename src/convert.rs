//
// convert.rs
// Dicom-Sco-To-Bto-rs
//
// Pipeline entry point: Hologic SCO dataset in, uncompressed multi-frame BTO object out.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use anyhow::Context;
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, DefaultDicomObject, InMemDicomObject};
use tracing::{debug, info};

use crate::blob::{ImagingResolution, PrivateImagingBlob};
use crate::codestream::synthesize_all;
use crate::decoder::FrameDecoder;
use crate::error::Result;
use crate::frame_index::FrameIndexTable;
use crate::header::BlobHeader;
use crate::models::ConversionSummary;
use crate::rebuild::{DatasetRebuilder, RebuiltDataset};
use crate::storage::persist_atomically;
use crate::transcode::{TranscodePipeline, UncompressedTransferSyntax};

/// Knobs exposed on the command line.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ConversionOptions {
    pub resolution: ImagingResolution,
    pub transfer_syntax: UncompressedTransferSyntax,
}

/// Final in-memory Part 10 object together with what was learned on the way.
pub struct ConvertedFile {
    pub object: DefaultDicomObject,
    pub summary: ConversionSummary,
}

/// Converter with an injected decode transform.
pub struct ScoConverter<D> {
    pipeline: TranscodePipeline<D>,
    options: ConversionOptions,
}

impl<D: FrameDecoder> ScoConverter<D> {
    pub fn new(decoder: D, options: ConversionOptions) -> Self {
        Self {
            pipeline: TranscodePipeline::new(decoder),
            options,
        }
    }

    /// Blob extraction, codestream synthesis and dataset rebuild, stopping before decoding.
    pub fn rebuild(
        &self,
        source: &InMemDicomObject<StandardDataDictionary>,
        rebuilder: &DatasetRebuilder,
    ) -> Result<(BlobHeader, usize, RebuiltDataset)> {
        let blob = PrivateImagingBlob::assemble(source, self.options.resolution)?;
        debug!(bytes = blob.len(), "Assembled private imaging blob");

        let header = BlobHeader::read(&blob)?;
        info!(
            frames = header.frame_count,
            rows = header.rows,
            columns = header.columns,
            bits_stored = header.bits_stored,
            near = header.lossy_tolerance,
            "Read imaging blob header"
        );

        let table = FrameIndexTable::read(&blob, header.frame_count)?;
        let frames = table.slice_all(&blob)?;
        let codestreams = synthesize_all(&frames, &header.geometry(), header.lossy_tolerance);

        let rebuilt = rebuilder.rebuild(source, &header, codestreams)?;
        Ok((header, blob.len(), rebuilt))
    }

    pub fn convert_object(
        &self,
        source: &InMemDicomObject<StandardDataDictionary>,
    ) -> Result<ConvertedFile> {
        let (header, blob_length, rebuilt) =
            self.rebuild(source, &DatasetRebuilder::with_generated_uid())?;
        let encoding = rebuilt.variant;
        let sop_instance_uid = rebuilt.sop_instance_uid().unwrap_or_default();

        let native = self.pipeline.decode(rebuilt)?;
        let frames = native.frame_count;
        let suppressed_decode_faults = native.suppressed_faults;
        let object = native.into_file_object(self.options.transfer_syntax)?;

        Ok(ConvertedFile {
            object,
            summary: ConversionSummary {
                header,
                encoding,
                blob_length,
                frames,
                sop_instance_uid,
                transfer_syntax: self.options.transfer_syntax.uid().to_string(),
                suppressed_decode_faults,
            },
        })
    }

    /// Convert `input` and persist the result at `output`; nothing is written on failure.
    pub fn convert_file(&self, input: &Path, output: &Path) -> anyhow::Result<ConversionSummary> {
        let source = open_file(input)
            .context("Input file doesn't seem to have a valid DICOM header")?;
        let converted = self
            .convert_object(&source)
            .with_context(|| format!("Failed to convert {:?}", input))?;

        persist_atomically(&converted.object, output)?;
        info!(
            frames = converted.summary.frames,
            sop_instance_uid = %converted.summary.sop_instance_uid,
            "Saved {:?}",
            output
        );
        Ok(converted.summary)
    }
}

//
// inspect.rs
// Dicom-Sco-To-Bto-rs
//
// Reports the header, frame table and codestream header of a Hologic SCO without decoding any frame.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use anyhow::{Context, Result};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, InMemDicomObject};

use crate::blob::{ImagingResolution, PrivateImagingBlob};
use crate::codestream::{synthesize, HEADER_LEN};
use crate::error;
use crate::frame_index::FrameIndexTable;
use crate::header::BlobHeader;
use crate::models::{BlobSummary, FrameSummary};

pub fn summarize(
    obj: &InMemDicomObject<StandardDataDictionary>,
    resolution: ImagingResolution,
) -> error::Result<BlobSummary> {
    let blob = PrivateImagingBlob::assemble(obj, resolution)?;
    let header = BlobHeader::read(&blob)?;
    let table = FrameIndexTable::read(&blob, header.frame_count)?;

    let frames = (0..table.frame_count())
        .map(|index| {
            let range = table.frame_range(index)?;
            Ok(FrameSummary {
                index,
                offset: range.start,
                length: range.len(),
            })
        })
        .collect::<error::Result<Vec<_>>>()?;

    let codestream_header = if table.frame_count() > 0 {
        let first = table.slice(&blob, 0)?;
        let codestream = synthesize(first.bytes, &header.geometry(), header.lossy_tolerance);
        Some(hex::encode_upper(&codestream.as_bytes()[..HEADER_LEN]))
    } else {
        None
    };

    let encoding = header.encoding();
    Ok(BlobSummary {
        header,
        encoding,
        encoding_uid: encoding.uid().to_string(),
        blob_length: blob.len(),
        index_table: table.entries().to_vec(),
        frames,
        codestream_header,
    })
}

pub fn inspect_file(path: &Path, resolution: ImagingResolution) -> Result<BlobSummary> {
    let obj = open_file(path).context("Failed to open DICOM file")?;
    summarize(&obj, resolution).with_context(|| format!("Failed to inspect {:?}", path))
}

pub fn print_summary(path: &Path, summary: &BlobSummary, json: bool) -> Result<()> {
    if json {
        let text =
            serde_json::to_string_pretty(summary).context("Failed to serialize to JSON")?;
        println!("{}", text);
        return Ok(());
    }

    let header = &summary.header;
    println!("{}", "=".repeat(80));
    println!("Hologic SCO: {:?}", path.file_name().unwrap_or(path.as_os_str()));
    println!("{}", "=".repeat(80));

    println!("BLOB");
    println!("  Length:          {} bytes", summary.blob_length);
    println!("  Frames:          {}", header.frame_count);
    println!("  Rows x Columns:  {} x {}", header.rows, header.columns);
    println!("  Bits Stored:     {}", header.bits_stored);
    println!("  Lossy Tolerance: {}", header.lossy_tolerance);
    println!(
        "  Encoding:        {:?} ({})",
        summary.encoding, summary.encoding_uid
    );

    if let Some(codestream_header) = &summary.codestream_header {
        println!("\nCODESTREAM HEADER (frame 0)");
        println!("  {}", codestream_header);
    }

    println!("\nFRAMES");
    let preview = summary.frames.iter().take(16);
    for frame in preview {
        println!(
            "  Frame {:03}: offset {:>10} | {:>10} bytes",
            frame.index, frame.offset, frame.length
        );
    }
    if summary.frames.len() > 16 {
        println!("  ... {} more frames omitted", summary.frames.len() - 16);
    }

    Ok(())
}

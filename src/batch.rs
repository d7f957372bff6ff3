use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::convert::ScoConverter;
use crate::decoder::FrameDecoder;
use crate::models::BatchReport;
use crate::storage::derived_output_path;

/// Convert every `*.dcm` under `dir` into `output_dir/<stem>_bto.dcm`.
///
/// A failing file is logged and counted; it does not stop the others.
pub fn process_directory<D: FrameDecoder>(
    dir: &Path,
    output_dir: &Path,
    converter: &ScoConverter<D>,
) -> Result<BatchReport> {
    info!(directory = ?dir, output = ?output_dir, "Processing directory");
    fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "dcm"))
        .collect();

    info!("Found {} file(s).", files.len());

    let results: Vec<_> = files
        .par_iter()
        .map(|entry| {
            let path = entry.path();
            let output = derived_output_path(output_dir, path);
            (path, converter.convert_file(path, &output))
        })
        .collect();

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok(summary) => {
                info!(frames = summary.frames, "Converted {:?}", path);
                report.converted += 1;
            }
            Err(e) => {
                error!("Failed on {:?}: {:#}", path, e);
                report.failed.push(path.display().to_string());
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionOptions;
    use crate::decoder::JpegLsDecoder;
    use tempfile::tempdir;

    #[test]
    fn non_sco_files_are_reported_as_failures() {
        let input = tempdir().expect("input dir");
        let output = tempdir().expect("output dir");
        fs::write(input.path().join("broken.dcm"), b"not dicom").expect("write");
        fs::write(input.path().join("notes.txt"), b"ignored").expect("write");

        let converter = ScoConverter::new(JpegLsDecoder, ConversionOptions::default());
        let report = process_directory(input.path(), output.path(), &converter).expect("batch");

        assert_eq!(report.converted, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].ends_with("broken.dcm"));
        assert!(!output.path().join("broken_bto.dcm").exists());
    }
}

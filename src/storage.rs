//
// storage.rs
// Dicom-Sco-To-Bto-rs
//
// All-or-nothing persistence of the converted file: write to a sibling temporary file, then rename.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, InMemDicomObject};
use tracing::debug;

/// Write `obj` to `output` so that either the complete file appears or nothing does.
pub fn persist_atomically(
    obj: &FileDicomObject<InMemDicomObject<StandardDataDictionary>>,
    output: &Path,
) -> Result<()> {
    let parent = output_dir(output);
    fs::create_dir_all(&parent).context("Failed to create output directory")?;

    // Removed on drop unless persisted, so every early return cleans up.
    let staging = tempfile::Builder::new()
        .prefix(".sco-to-bto-")
        .suffix(".partial")
        .tempfile_in(&parent)
        .context("Failed to create temporary output file")?;
    debug!(staging = ?staging.path(), "Writing converted file");

    obj.write_to_file(staging.path())
        .context("Failed to write output file")?;
    staging
        .persist(output)
        .with_context(|| format!("Failed to move output file into place at {:?}", output))?;
    Ok(())
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<stem>_bto.dcm` inside `dir`.
pub fn derived_output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "dicom".to_string());
    dir.join(format!("{}_bto.dcm", stem))
}

fn sanitize_filename(input: &str) -> String {
    // Keep only ASCII word characters and a few safe separators to avoid filesystem surprises.
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
    use dicom::object::FileMetaTableBuilder;
    use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
    use tempfile::tempdir;

    fn tiny_object() -> FileDicomObject<InMemDicomObject<StandardDataDictionary>> {
        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.13.1.3")
            .media_storage_sop_instance_uid("2.25.7")
            .build()
            .expect("meta");
        let mut obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
        obj.put(DataElement::new(
            Tag(0x0010, 0x0020),
            VR::LO,
            PrimitiveValue::from("PAT123"),
        ));
        obj
    }

    #[test]
    fn persisted_file_leaves_no_staging_files() {
        let dir = tempdir().expect("tmpdir");
        let output = dir.path().join("nested").join("out.dcm");

        persist_atomically(&tiny_object(), &output).expect("persist");

        assert!(output.exists());
        let leftovers: Vec<_> = fs::read_dir(output.parent().expect("parent"))
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
        dicom::object::open_file(&output).expect("readable output");
    }

    #[test]
    fn derived_path_is_sanitized() {
        let path = derived_output_path(Path::new("/out"), Path::new("/in/weird name$.dcm"));
        assert_eq!(path, Path::new("/out/weirdname_bto.dcm"));
    }
}

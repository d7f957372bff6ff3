//
// transcode.rs
// Dicom-Sco-To-Bto-rs
//
// Decodes the encapsulated JPEG-LS frames of a rebuilt dataset and re-assembles it in an
// uncompressed transfer syntax ready to be persisted.
//
// Thales Matheus Mendonça Santos - October 2026

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::{EXPLICIT_VR_LITTLE_ENDIAN, IMPLICIT_VR_LITTLE_ENDIAN};
use dicom_dictionary_std::tags;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::decoder::{DecodeFault, DecodeRequest, FrameDecoder};
use crate::dicom_access::ElementAccess;
use crate::error::{ConversionError, Result};
use crate::rebuild::{RebuiltDataset, BREAST_TOMOSYNTHESIS_IMAGE_STORAGE};

/// Supported uncompressed transfer syntaxes for the persisted output.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum UncompressedTransferSyntax {
    #[default]
    ExplicitVRLittleEndian,
    ImplicitVRLittleEndian,
}

impl UncompressedTransferSyntax {
    pub fn uid(self) -> &'static str {
        match self {
            UncompressedTransferSyntax::ExplicitVRLittleEndian => EXPLICIT_VR_LITTLE_ENDIAN.uid(),
            UncompressedTransferSyntax::ImplicitVRLittleEndian => IMPLICIT_VR_LITTLE_ENDIAN.uid(),
        }
    }
}

/// Rebuilt dataset whose pixel data now holds native 16-bit little-endian samples.
#[derive(Debug, Clone)]
pub struct NativeDataset {
    pub object: InMemDicomObject<StandardDataDictionary>,
    pub frame_count: usize,
    /// Frames whose trailing decoder state was tolerated.
    pub suppressed_faults: usize,
}

impl NativeDataset {
    /// Attach a fresh file meta group and produce the complete Part 10 object.
    pub fn into_file_object(
        self,
        target_ts: UncompressedTransferSyntax,
    ) -> Result<FileDicomObject<InMemDicomObject<StandardDataDictionary>>> {
        let sop_class_uid = self
            .object
            .element_str(tags::SOP_CLASS_UID)
            .unwrap_or_else(|| BREAST_TOMOSYNTHESIS_IMAGE_STORAGE.to_string());
        let sop_instance_uid = self
            .object
            .element_str(tags::SOP_INSTANCE_UID)
            .ok_or_else(|| ConversionError::MissingData("SOP Instance UID".to_string()))?;

        let file_meta = FileMetaTableBuilder::new()
            .transfer_syntax(target_ts.uid())
            .media_storage_sop_class_uid(sop_class_uid.as_str())
            .media_storage_sop_instance_uid(sop_instance_uid.as_str())
            .build()
            .map_err(|e| ConversionError::FileMeta(e.to_string()))?;

        let mut file_obj =
            FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, file_meta);
        for elem in self.object {
            file_obj.put(elem);
        }

        Ok(file_obj)
    }
}

/// Runs the injected decode transform over every frame of a rebuilt dataset.
pub struct TranscodePipeline<D> {
    decoder: D,
}

impl<D: FrameDecoder> TranscodePipeline<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn decode(&self, rebuilt: RebuiltDataset) -> Result<NativeDataset> {
        let expected_samples = rebuilt.geometry.samples_per_frame();
        info!(
            frames = rebuilt.frame_count,
            transfer_syntax = rebuilt.variant.uid(),
            "Decoding encapsulated frames"
        );

        // Frames are independent; collect keeps them in index order.
        let decoded = rebuilt
            .fragments()
            .par_iter()
            .enumerate()
            .map(|(frame, fragment)| {
                let request = DecodeRequest {
                    frame,
                    geometry: rebuilt.geometry,
                    variant: rebuilt.variant,
                };
                self.decode_one(fragment, &request, expected_samples)
            })
            .collect::<Result<Vec<_>>>()?;

        let suppressed_faults = decoded.iter().filter(|(_, suppressed)| *suppressed).count();
        let mut pixel_bytes = Vec::with_capacity(decoded.len() * expected_samples * 2);
        for (samples, _) in &decoded {
            pixel_bytes.extend(samples.iter().flat_map(|v| v.to_le_bytes()));
        }

        // Replace the encapsulated pixel data with native samples.
        let mut object = rebuilt.object;
        object.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::from(pixel_bytes),
        ));

        Ok(NativeDataset {
            object,
            frame_count: rebuilt.frame_count,
            suppressed_faults,
        })
    }

    fn decode_one(
        &self,
        fragment: &[u8],
        request: &DecodeRequest,
        expected_samples: usize,
    ) -> Result<(Vec<u16>, bool)> {
        let (samples, suppressed) = match self.decoder.decode_frame(fragment, request) {
            Ok(samples) => (samples, false),
            Err(DecodeFault::TrailingState { samples, detail }) => {
                warn!(frame = request.frame, %detail, "Ignoring trailing decoder state");
                (samples, true)
            }
            Err(DecodeFault::Fatal(message)) => {
                return Err(ConversionError::Decode {
                    frame: request.frame,
                    message,
                })
            }
        };

        if samples.len() != expected_samples {
            return Err(ConversionError::Decode {
                frame: request.frame,
                message: format!(
                    "decoder produced {} sample(s), expected {}",
                    samples.len(),
                    expected_samples
                ),
            });
        }

        debug!(frame = request.frame, bytes = fragment.len(), "Decoded frame");
        Ok((samples, suppressed))
    }
}

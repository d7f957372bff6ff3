//
// rebuild.rs
// Dicom-Sco-To-Bto-rs
//
// Rebuilds a public Breast Tomosynthesis dataset from the source SCO: copies the public attributes,
// overwrites identity and geometry, and attaches one encapsulated JPEG-LS fragment per frame.
//
// Thales Matheus Mendonça Santos - October 2026

use dicom::core::value::{DataSetSequence, PixelFragmentSequence, Value};
use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::mem::InMemElement;
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::codestream::Codestream;
use crate::dicom_access::{is_private, ElementAccess};
use crate::error::{ConversionError, Result};
use crate::header::{BlobHeader, FrameGeometry};

/// Breast Tomosynthesis Image Storage.
pub const BREAST_TOMOSYNTHESIS_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.13.1.3";
pub const MONOCHROME2: &str = "MONOCHROME2";
pub const BITS_ALLOCATED: u16 = 16;

/// JPEG-LS flavour of the encapsulated frames, chosen by the blob's lossy tolerance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum EncodingVariant {
    JpegLsLossless,
    JpegLsNearLossless,
}

impl EncodingVariant {
    pub fn for_tolerance(near: u8) -> Self {
        if near == 0 {
            EncodingVariant::JpegLsLossless
        } else {
            EncodingVariant::JpegLsNearLossless
        }
    }

    pub fn uid(self) -> &'static str {
        match self {
            EncodingVariant::JpegLsLossless => "1.2.840.10008.1.2.4.80",
            EncodingVariant::JpegLsNearLossless => "1.2.840.10008.1.2.4.81",
        }
    }
}

/// Fresh globally unique identifier under the UUID-derived `2.25` root.
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// Output of the rebuild stage: encapsulated pixel data, one fragment per frame.
#[derive(Debug, Clone)]
pub struct RebuiltDataset {
    pub object: InMemDicomObject<StandardDataDictionary>,
    pub variant: EncodingVariant,
    pub geometry: FrameGeometry,
    pub frame_count: usize,
}

impl RebuiltDataset {
    pub fn fragments(&self) -> &[Vec<u8>] {
        match self.object.element(tags::PIXEL_DATA).map(|e| e.value()) {
            Ok(Value::PixelSequence(seq)) => seq.fragments(),
            _ => &[],
        }
    }

    pub fn sop_instance_uid(&self) -> Option<String> {
        self.object.element_str(tags::SOP_INSTANCE_UID)
    }
}

pub struct DatasetRebuilder {
    sop_instance_uid: String,
}

impl DatasetRebuilder {
    pub fn new(sop_instance_uid: impl Into<String>) -> Self {
        Self {
            sop_instance_uid: sop_instance_uid.into(),
        }
    }

    pub fn with_generated_uid() -> Self {
        Self::new(generate_uid())
    }

    pub fn rebuild(
        &self,
        source: &InMemDicomObject<StandardDataDictionary>,
        header: &BlobHeader,
        codestreams: Vec<Codestream>,
    ) -> Result<RebuiltDataset> {
        let mut object = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);

        // Copy all public attributes except the original pixel data.
        for elem in source.iter() {
            let tag = elem.header().tag;
            if is_private(tag) || tag == tags::PIXEL_DATA {
                continue;
            }
            object.put(propagate(elem)?);
        }
        debug!(copied = object.iter().count(), "Copied public attributes");

        object.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(BREAST_TOMOSYNTHESIS_IMAGE_STORAGE),
        ));
        object.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(self.sop_instance_uid.as_str()),
        ));

        let replacements = [
            (tags::COLUMNS, header.columns),
            (tags::ROWS, header.rows),
            (tags::BITS_ALLOCATED, BITS_ALLOCATED),
            (tags::BITS_STORED, u16::from(header.bits_stored)),
            (tags::HIGH_BIT, u16::from(header.bits_stored).saturating_sub(1)),
            (tags::SAMPLES_PER_PIXEL, 1),
        ];
        for (tag, value) in replacements {
            object.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
        }
        if !object.has_element(tags::PIXEL_REPRESENTATION) {
            object.put(DataElement::new(
                tags::PIXEL_REPRESENTATION,
                VR::US,
                PrimitiveValue::from(0_u16),
            ));
        }
        object.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from(MONOCHROME2),
        ));

        let frame_count = codestreams.len();
        object.put(DataElement::new(
            tags::NUMBER_OF_FRAMES,
            VR::IS,
            PrimitiveValue::from(frame_count.to_string()),
        ));

        let fragments: Vec<Vec<u8>> = codestreams
            .into_iter()
            .map(Codestream::into_fragment)
            .collect();
        object.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            Value::PixelSequence(PixelFragmentSequence::new(Vec::<u32>::new(), fragments)),
        ));

        let variant = header.encoding();
        info!(
            frames = frame_count,
            rows = header.rows,
            columns = header.columns,
            bits_stored = header.bits_stored,
            transfer_syntax = variant.uid(),
            "Rebuilt tomosynthesis dataset"
        );

        Ok(RebuiltDataset {
            object,
            variant,
            geometry: header.geometry(),
            frame_count,
        })
    }
}

/// Clone an element for the output, dropping private attributes nested in sequences.
fn propagate(elem: &InMemElement) -> Result<InMemElement> {
    let tag = elem.header().tag;
    let vr = elem.header().vr;
    let inconsistent = |reason: &str| ConversionError::PropagatedAttribute {
        tag,
        reason: reason.to_string(),
    };

    match elem.value() {
        Value::Primitive(PrimitiveValue::Empty) => Ok(elem.clone()),
        Value::Primitive(_) if vr == VR::SQ => {
            Err(inconsistent("sequence element holds a primitive value"))
        }
        Value::Primitive(_) => Ok(elem.clone()),
        Value::Sequence(seq) => {
            if vr != VR::SQ && vr != VR::UN {
                return Err(inconsistent(&format!("sequence value under VR {:?}", vr)));
            }
            let items = seq
                .items()
                .iter()
                .map(strip_private)
                .collect::<Result<Vec<_>>>()?;
            Ok(DataElement::new(
                tag,
                VR::SQ,
                Value::Sequence(DataSetSequence::from(items)),
            ))
        }
        Value::PixelSequence(_) => Err(inconsistent("encapsulated fragments outside pixel data")),
    }
}

fn strip_private(
    item: &InMemDicomObject<StandardDataDictionary>,
) -> Result<InMemDicomObject<StandardDataDictionary>> {
    let mut out = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    for elem in item.iter() {
        if is_private(elem.header().tag) {
            continue;
        }
        out.put(propagate(elem)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codestream::synthesize;
    use dicom::core::Tag;

    fn header(frames: u16, near: u8) -> BlobHeader {
        BlobHeader {
            frame_count: frames,
            columns: 50,
            rows: 100,
            bits_stored: 10,
            lossy_tolerance: near,
        }
    }

    fn source() -> InMemDicomObject<StandardDataDictionary> {
        let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
        obj.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from("PAT123"),
        ));
        obj.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from("1.2.840.10008.5.1.4.1.1.7"),
        ));
        obj.put(DataElement::new(
            tags::ROWS,
            VR::US,
            PrimitiveValue::from(4_u16),
        ));
        obj.put(DataElement::new(
            Tag(0x7E01, 0x0010),
            VR::LO,
            PrimitiveValue::from("HOLOGIC, Inc."),
        ));
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::from(vec![1_u8, 2, 3, 4]),
        ));

        let mut item = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
        item.put(DataElement::new(
            tags::CODE_VALUE,
            VR::SH,
            PrimitiveValue::from("T-04000"),
        ));
        item.put(DataElement::new(
            Tag(0x0019, 0x1001),
            VR::LO,
            PrimitiveValue::from("vendor"),
        ));
        obj.put(DataElement::new(
            tags::ANATOMIC_REGION_SEQUENCE,
            VR::SQ,
            Value::Sequence(DataSetSequence::from(vec![item])),
        ));
        obj
    }

    fn us(obj: &InMemDicomObject<StandardDataDictionary>, tag: Tag) -> u16 {
        obj.element(tag).expect("element").to_int::<u16>().expect("u16")
    }

    #[test]
    fn public_attributes_survive_and_geometry_is_overwritten() {
        let codestreams = vec![synthesize(&[1, 2, 3], &header(1, 0).geometry(), 0)];
        let rebuilt = DatasetRebuilder::new("2.25.1")
            .rebuild(&source(), &header(1, 0), codestreams)
            .expect("rebuild");
        let obj = &rebuilt.object;

        assert_eq!(obj.element_str(tags::PATIENT_ID).as_deref(), Some("PAT123"));
        assert_eq!(
            obj.element_str(tags::SOP_CLASS_UID).as_deref(),
            Some(BREAST_TOMOSYNTHESIS_IMAGE_STORAGE)
        );
        assert_eq!(rebuilt.sop_instance_uid().as_deref(), Some("2.25.1"));
        assert_eq!(us(obj, tags::ROWS), 100);
        assert_eq!(us(obj, tags::COLUMNS), 50);
        assert_eq!(us(obj, tags::BITS_ALLOCATED), 16);
        assert_eq!(us(obj, tags::BITS_STORED), 10);
        assert_eq!(us(obj, tags::HIGH_BIT), 9);
        assert_eq!(us(obj, tags::PIXEL_REPRESENTATION), 0);
        assert_eq!(
            obj.element_str(tags::PHOTOMETRIC_INTERPRETATION).as_deref(),
            Some(MONOCHROME2)
        );
        assert_eq!(obj.element_str(tags::NUMBER_OF_FRAMES).as_deref(), Some("1"));
        assert_eq!(rebuilt.variant, EncodingVariant::JpegLsLossless);
    }

    #[test]
    fn private_attributes_are_removed_at_every_level() {
        let rebuilt = DatasetRebuilder::new("2.25.2")
            .rebuild(&source(), &header(0, 0), Vec::new())
            .expect("rebuild");
        assert!(rebuilt.object.iter().all(|e| !is_private(e.header().tag)));

        let items = rebuilt
            .object
            .element_items(tags::ANATOMIC_REGION_SEQUENCE)
            .expect("sequence");
        assert_eq!(items.len(), 1);
        assert!(items[0].has_element(tags::CODE_VALUE));
        assert!(!items[0].has_element(Tag(0x0019, 0x1001)));
    }

    #[test]
    fn fragments_are_even_and_in_frame_order() {
        let geometry = header(3, 4).geometry();
        let codestreams = vec![
            synthesize(&[0xA0], &geometry, 4),
            synthesize(&[0xB0, 0xB1], &geometry, 4),
            synthesize(&[], &geometry, 4),
        ];
        let rebuilt = DatasetRebuilder::new("2.25.3")
            .rebuild(&source(), &header(3, 4), codestreams)
            .expect("rebuild");

        let fragments = rebuilt.fragments();
        assert_eq!(fragments.len(), 3);
        assert!(fragments.iter().all(|f| f.len() % 2 == 0));
        assert_eq!(fragments[0][25], 0xA0);
        assert_eq!(&fragments[1][25..27], &[0xB0, 0xB1]);
        assert_eq!(fragments[1].len(), 30);
        assert_eq!(rebuilt.variant, EncodingVariant::JpegLsNearLossless);
        assert_eq!(rebuilt.frame_count, 3);
    }

    #[test]
    fn zero_frames_give_empty_pixel_data() {
        let rebuilt = DatasetRebuilder::new("2.25.4")
            .rebuild(&source(), &header(0, 0), Vec::new())
            .expect("rebuild");
        assert!(rebuilt.fragments().is_empty());
        assert_eq!(
            rebuilt.object.element_str(tags::NUMBER_OF_FRAMES).as_deref(),
            Some("0")
        );
    }

    #[test]
    fn sequence_with_primitive_value_is_inconsistent() {
        let mut src = source();
        src.put(DataElement::new(
            tags::REFERENCED_STUDY_SEQUENCE,
            VR::SQ,
            PrimitiveValue::from("not a sequence"),
        ));
        let err = DatasetRebuilder::new("2.25.5")
            .rebuild(&src, &header(0, 0), Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::PropagatedAttribute { tag, .. } if tag == tags::REFERENCED_STUDY_SEQUENCE
        ));
    }

    #[test]
    fn variant_follows_tolerance() {
        assert_eq!(EncodingVariant::for_tolerance(0), EncodingVariant::JpegLsLossless);
        for near in 1..=255_u8 {
            assert_eq!(
                EncodingVariant::for_tolerance(near),
                EncodingVariant::JpegLsNearLossless
            );
        }
    }

    #[test]
    fn generated_uids_are_unique_and_valid() {
        let a = generate_uid();
        let b = generate_uid();
        assert_ne!(a, b);
        assert!(a.starts_with("2.25."));
        assert!(a.len() <= 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c == '.'));
    }
}

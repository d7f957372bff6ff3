use std::borrow::Cow;

use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::InMemDicomObject;

/// Small helper trait to pull typed values out of an in-memory dataset,
/// including attributes stored under a reserved private block.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn element_bytes(&self, tag: Tag) -> Option<Cow<'_, [u8]>>;
    fn element_items(&self, tag: Tag) -> Option<&[InMemDicomObject<StandardDataDictionary>]>;
    fn has_element(&self, tag: Tag) -> bool;

    /// Resolves `(group, block << 8 | offset)` by looking up the private
    /// creator element `(group, 00xx)` whose value matches `creator`.
    fn private_tag(&self, group: u16, creator: &str, offset: u8) -> Option<Tag> {
        (0x0010_u16..=0x00FF).find_map(|block| {
            let value = self.element_str(Tag(group, block))?;
            (value.trim_matches(|c: char| c == '\0' || c.is_whitespace()) == creator)
                .then(|| Tag(group, (block << 8) | u16::from(offset)))
        })
    }
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    fn element_bytes(&self, tag: Tag) -> Option<Cow<'_, [u8]>> {
        self.element(tag).ok().and_then(|e| e.to_bytes().ok())
    }

    fn element_items(&self, tag: Tag) -> Option<&[InMemDicomObject<StandardDataDictionary>]> {
        self.element(tag).ok().and_then(|e| e.items())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}

/// Odd group numbers are reserved for private attributes.
pub fn is_private(tag: Tag) -> bool {
    tag.group() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, VR};

    #[test]
    fn private_tag_follows_the_reserved_block() {
        let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
        obj.put(DataElement::new(
            Tag(0x7E01, 0x0010),
            VR::LO,
            PrimitiveValue::from("OTHER VENDOR"),
        ));
        obj.put(DataElement::new(
            Tag(0x7E01, 0x0011),
            VR::LO,
            PrimitiveValue::from("HOLOGIC, Inc. "),
        ));

        assert_eq!(
            obj.private_tag(0x7E01, "HOLOGIC, Inc.", 0x12),
            Some(Tag(0x7E01, 0x1112))
        );
        assert_eq!(obj.private_tag(0x7E01, "ACME", 0x12), None);
    }

    #[test]
    fn odd_groups_are_private() {
        assert!(is_private(Tag(0x7E01, 0x1010)));
        assert!(is_private(Tag(0x0029, 0x0010)));
        assert!(!is_private(Tag(0x0010, 0x0010)));
        assert!(!is_private(Tag(0x7FE0, 0x0010)));
    }
}

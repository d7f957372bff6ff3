//
// decoder.rs
// Dicom-Sco-To-Bto-rs
//
// Decode transform contract for the synthesized JPEG-LS frames, plus the default implementation
// backed by the crate's JPEG-LS scan decoder.
//
// Thales Matheus Mendonça Santos - October 2026

use thiserror::Error;
use tracing::debug;

use crate::header::FrameGeometry;
use crate::jpegls;
use crate::rebuild::EncodingVariant;

/// What the decoder needs to know about the frame it is given.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DecodeRequest {
    pub frame: usize,
    pub geometry: FrameGeometry,
    pub variant: EncodingVariant,
}

#[derive(Error, Debug)]
pub enum DecodeFault {
    /// The scan ended with undrained bits or stray bytes before EOI.
    /// Every sample was reconstructed; `samples` holds them.
    #[error("trailing decoder state: {detail}")]
    TrailingState { samples: Vec<u16>, detail: String },

    #[error("{0}")]
    Fatal(String),
}

/// Entropy decoder for one encapsulated frame.
///
/// Implementations return exactly `rows * columns` samples, one per pixel,
/// right-aligned in a `u16` regardless of the stored precision.
pub trait FrameDecoder: Send + Sync {
    fn decode_frame(&self, codestream: &[u8], request: &DecodeRequest) -> Result<Vec<u16>, DecodeFault>;
}

impl<T: FrameDecoder + ?Sized> FrameDecoder for &T {
    fn decode_frame(&self, codestream: &[u8], request: &DecodeRequest) -> Result<Vec<u16>, DecodeFault> {
        (**self).decode_frame(codestream, request)
    }
}

impl<T: FrameDecoder + ?Sized> FrameDecoder for Box<T> {
    fn decode_frame(&self, codestream: &[u8], request: &DecodeRequest) -> Result<Vec<u16>, DecodeFault> {
        (**self).decode_frame(codestream, request)
    }
}

/// Lossless and near-lossless JPEG-LS decoding of single-component frames.
#[derive(Debug, Default, Copy, Clone)]
pub struct JpegLsDecoder;

impl FrameDecoder for JpegLsDecoder {
    fn decode_frame(&self, codestream: &[u8], request: &DecodeRequest) -> Result<Vec<u16>, DecodeFault> {
        let image = jpegls::decode(codestream).map_err(|e| DecodeFault::Fatal(e.to_string()))?;

        let geometry = &request.geometry;
        if image.frame.height != geometry.rows
            || image.frame.width != geometry.columns
            || image.frame.bits_per_sample != geometry.bits_stored
        {
            return Err(DecodeFault::Fatal(format!(
                "frame header {}x{} ({} bits) does not match {}x{} ({} bits)",
                image.frame.height,
                image.frame.width,
                image.frame.bits_per_sample,
                geometry.rows,
                geometry.columns,
                geometry.bits_stored
            )));
        }
        if EncodingVariant::for_tolerance(image.near) != request.variant {
            return Err(DecodeFault::Fatal(format!(
                "NEAR {} is not valid for {:?}",
                image.near, request.variant
            )));
        }

        debug!(frame = request.frame, samples = image.samples.len(), "Decoded JPEG-LS frame");
        match image.trailing {
            Some(detail) => Err(DecodeFault::TrailingState {
                samples: image.samples,
                detail,
            }),
            None => Ok(image.samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codestream::synthesize;

    const TWO_BY_TWO: FrameGeometry = FrameGeometry {
        rows: 2,
        columns: 2,
        bits_stored: 8,
    };

    fn request(geometry: FrameGeometry, variant: EncodingVariant) -> DecodeRequest {
        DecodeRequest {
            frame: 0,
            geometry,
            variant,
        }
    }

    #[test]
    fn decodes_a_lossless_frame() {
        let codestream = synthesize(&[0x07, 0x0E, 0x00, 0x40, 0x40], &TWO_BY_TWO, 0).into_fragment();
        let samples = JpegLsDecoder
            .decode_frame(&codestream, &request(TWO_BY_TWO, EncodingVariant::JpegLsLossless))
            .expect("decode");
        assert_eq!(samples, vec![10, 20, 30, 40]);
    }

    #[test]
    fn leftover_scan_data_is_a_trailing_state() {
        let codestream = synthesize(&[0xF0, 0xAB], &TWO_BY_TWO, 0).into_fragment();
        match JpegLsDecoder
            .decode_frame(&codestream, &request(TWO_BY_TWO, EncodingVariant::JpegLsLossless))
        {
            Err(DecodeFault::TrailingState { samples, .. }) => assert_eq!(samples, vec![0; 4]),
            other => panic!("expected trailing state, got {:?}", other),
        }
    }

    #[test]
    fn geometry_mismatch_is_fatal() {
        let codestream = synthesize(&[0xF0], &TWO_BY_TWO, 0).into_fragment();
        let wider = FrameGeometry {
            columns: 3,
            ..TWO_BY_TWO
        };
        assert!(matches!(
            JpegLsDecoder.decode_frame(&codestream, &request(wider, EncodingVariant::JpegLsLossless)),
            Err(DecodeFault::Fatal(_))
        ));
    }

    #[test]
    fn near_lossless_frame_needs_the_near_lossless_variant() {
        let codestream = synthesize(&[0xF0], &TWO_BY_TWO, 2).into_fragment();
        let decoded = JpegLsDecoder
            .decode_frame(&codestream, &request(TWO_BY_TWO, EncodingVariant::JpegLsNearLossless))
            .expect("decode");
        assert_eq!(decoded, vec![0; 4]);
        assert!(matches!(
            JpegLsDecoder.decode_frame(&codestream, &request(TWO_BY_TWO, EncodingVariant::JpegLsLossless)),
            Err(DecodeFault::Fatal(_))
        ));
    }

    #[test]
    fn boxed_decoders_forward_to_the_inner_decoder() {
        struct Constant;
        impl FrameDecoder for Constant {
            fn decode_frame(&self, _: &[u8], request: &DecodeRequest) -> Result<Vec<u16>, DecodeFault> {
                Ok(vec![7; request.geometry.samples_per_frame()])
            }
        }

        let boxed: Box<dyn FrameDecoder> = Box::new(Constant);
        let lossless = request(TWO_BY_TWO, EncodingVariant::JpegLsLossless);
        assert_eq!(boxed.decode_frame(&[], &lossless).expect("decode"), vec![7; 4]);
    }
}

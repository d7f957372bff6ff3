//
// codestream.rs
// Dicom-Sco-To-Bto-rs
//
// Wraps each raw frame payload in a minimal JPEG-LS interchange codestream (SOI, SOF55, SOS, data, EOI).
//
// Thales Matheus Mendonça Santos - October 2026

use rayon::prelude::*;

use crate::frame_index::RawFrame;
use crate::header::FrameGeometry;

/// Start of image.
pub const SOI: [u8; 2] = [0xFF, 0xD8];
/// Start of JPEG-LS frame.
pub const SOF55: [u8; 2] = [0xFF, 0xF7];
/// Start of scan.
pub const SOS: [u8; 2] = [0xFF, 0xDA];
/// End of image.
pub const EOI: [u8; 2] = [0xFF, 0xD9];

const SOF55_SEGMENT_LEN: u16 = 11;
const SOS_SEGMENT_LEN: u16 = 8;

/// Bytes written before the raw payload.
pub const HEADER_LEN: usize = 2 + 2 + SOF55_SEGMENT_LEN as usize + 2 + SOS_SEGMENT_LEN as usize;

/// One synthesized single-component, non-interleaved JPEG-LS codestream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Codestream(Vec<u8>);

impl Codestream {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entropy-coded bytes between the scan header and EOI.
    pub fn payload(&self) -> &[u8] {
        &self.0[HEADER_LEN..self.0.len() - EOI.len()]
    }

    /// Pixel data fragments must have an even length.
    pub fn into_fragment(self) -> Vec<u8> {
        let mut bytes = self.0;
        if bytes.len() % 2 == 1 {
            bytes.push(0x00);
        }
        bytes
    }
}

/// Build the codestream around `raw` without touching the entropy-coded data.
///
/// Marker segment fields are big-endian as mandated by ISO/IEC 14495-1.
pub fn synthesize(raw: &[u8], geometry: &FrameGeometry, near: u8) -> Codestream {
    let mut out = Vec::with_capacity(HEADER_LEN + raw.len() + EOI.len());

    out.extend_from_slice(&SOI);

    out.extend_from_slice(&SOF55);
    out.extend_from_slice(&SOF55_SEGMENT_LEN.to_be_bytes());
    out.push(geometry.bits_stored); // P
    out.extend_from_slice(&geometry.rows.to_be_bytes()); // Y
    out.extend_from_slice(&geometry.columns.to_be_bytes()); // X
    out.push(0x01); // Nf
    out.extend_from_slice(&[0x01, 0x11, 0x00]); // C1, H1=1 V1=1, Tq1

    out.extend_from_slice(&SOS);
    out.extend_from_slice(&SOS_SEGMENT_LEN.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x01, 0x00]); // Ns, C1, Tm1
    out.push(near);
    out.extend_from_slice(&[0x00, 0x00]); // ILV, Al/Ah

    out.extend_from_slice(raw);
    out.extend_from_slice(&EOI);

    Codestream(out)
}

/// Synthesize every frame; output order matches frame order.
pub fn synthesize_all(frames: &[RawFrame<'_>], geometry: &FrameGeometry, near: u8) -> Vec<Codestream> {
    frames
        .par_iter()
        .map(|frame| synthesize(frame.bytes, geometry, near))
        .collect()
}

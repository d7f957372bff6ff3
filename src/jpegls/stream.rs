// Marker segment parsing up to the start of the entropy-coded scan.

use super::{FrameInfo, JpegLsError, PresetParameters, ScanHeader};

const MARKER_START: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const SOF55: u8 = 0xF7;
const LSE: u8 = 0xF8;

/// LSE id for preset coding parameters; mapping tables use other ids.
const PRESET_CODING_PARAMETERS_ID: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StreamHeader {
    pub frame: FrameInfo,
    pub preset: Option<PresetParameters>,
    pub scan: ScanHeader,
    /// Offset of the first entropy-coded byte.
    pub scan_data_offset: usize,
}

pub(super) fn read_header(data: &[u8]) -> Result<StreamHeader, JpegLsError> {
    if data.len() < 2 || data[0] != MARKER_START || data[1] != SOI {
        return Err(JpegLsError::MissingStartOfImage);
    }

    let mut position = 2;
    let mut frame = None;
    let mut preset = None;

    loop {
        let code = read_marker(data, &mut position)?;
        match code {
            SOF55 => frame = Some(read_frame(segment(data, &mut position)?)?),
            LSE => {
                let body = segment(data, &mut position)?;
                if body.first() == Some(&PRESET_CODING_PARAMETERS_ID) {
                    preset = Some(read_preset(body)?);
                }
            }
            SOS => {
                let frame = frame.ok_or(JpegLsError::InvalidData("scan before frame header"))?;
                let scan = read_scan(segment(data, &mut position)?)?;
                return Ok(StreamHeader {
                    frame,
                    preset,
                    scan,
                    scan_data_offset: position,
                });
            }
            EOI => return Err(JpegLsError::InvalidData("end of image before any scan")),
            // Baseline/progressive/lossless JPEG frames; not JPEG-LS.
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                return Err(JpegLsError::UnsupportedMarker(code))
            }
            _ => {
                segment(data, &mut position)?;
            }
        }
    }
}

fn read_marker(data: &[u8], position: &mut usize) -> Result<u8, JpegLsError> {
    if data.get(*position) != Some(&MARKER_START) {
        return Err(JpegLsError::InvalidData("expected a marker"));
    }
    // Any number of fill bytes may precede the marker code.
    while data.get(*position) == Some(&MARKER_START) {
        *position += 1;
    }
    let code = *data.get(*position).ok_or(JpegLsError::UnexpectedEnd)?;
    *position += 1;
    Ok(code)
}

/// Returns the segment body (after the length field) and advances past it.
fn segment<'a>(data: &'a [u8], position: &mut usize) -> Result<&'a [u8], JpegLsError> {
    let length = usize::from(read_u16(data, *position)?);
    if length < 2 {
        return Err(JpegLsError::InvalidData("segment length"));
    }
    let body = data
        .get(*position + 2..*position + length)
        .ok_or(JpegLsError::UnexpectedEnd)?;
    *position += length;
    Ok(body)
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, JpegLsError> {
    match data.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(JpegLsError::UnexpectedEnd),
    }
}

fn read_frame(body: &[u8]) -> Result<FrameInfo, JpegLsError> {
    if body.len() < 6 {
        return Err(JpegLsError::UnexpectedEnd);
    }
    let frame = FrameInfo {
        bits_per_sample: body[0],
        height: read_u16(body, 1)?,
        width: read_u16(body, 3)?,
        component_count: body[5],
    };

    if !(2..=16).contains(&frame.bits_per_sample) {
        return Err(JpegLsError::InvalidParameter("bits per sample"));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(JpegLsError::InvalidParameter("frame dimensions"));
    }
    if frame.component_count != 1 {
        return Err(JpegLsError::Unsupported("multi-component frames"));
    }
    Ok(frame)
}

fn read_preset(body: &[u8]) -> Result<PresetParameters, JpegLsError> {
    Ok(PresetParameters {
        max_value: read_u16(body, 1)?,
        threshold1: read_u16(body, 3)?,
        threshold2: read_u16(body, 5)?,
        threshold3: read_u16(body, 7)?,
        reset: read_u16(body, 9)?,
    })
}

fn read_scan(body: &[u8]) -> Result<ScanHeader, JpegLsError> {
    let component_count = *body.first().ok_or(JpegLsError::UnexpectedEnd)?;
    if component_count != 1 {
        return Err(JpegLsError::Unsupported("multi-component scans"));
    }
    // Ns, Cs1 Tm1, NEAR, ILV, Al/Ah
    let fields = body.get(3..6).ok_or(JpegLsError::UnexpectedEnd)?;
    let scan = ScanHeader {
        near: fields[0],
        interleave_mode: fields[1],
        point_transform: fields[2] & 0x0F,
    };
    if scan.point_transform != 0 {
        return Err(JpegLsError::Unsupported("point transform"));
    }
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(near: u8) -> Vec<u8> {
        vec![
            0xFF, 0xD8, //
            0xFF, 0xF7, 0x00, 0x0B, 0x0C, 0x00, 0x03, 0x00, 0x05, 0x01, 0x01, 0x11, 0x00, //
            0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, near, 0x00, 0x00, //
            0x55, 0xFF, 0xD9,
        ]
    }

    #[test]
    fn reads_frame_and_scan_fields() {
        let parsed = read_header(&header(2)).expect("header");
        assert_eq!(
            parsed.frame,
            FrameInfo {
                width: 5,
                height: 3,
                bits_per_sample: 12,
                component_count: 1
            }
        );
        assert_eq!(parsed.scan.near, 2);
        assert_eq!(parsed.preset, None);
        assert_eq!(parsed.scan_data_offset, 25);
    }

    #[test]
    fn preset_parameters_and_application_segments_are_handled() {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB]);
        data.extend_from_slice(&[
            0xFF, 0xF8, 0x00, 0x0D, 0x01, 0x0F, 0xFF, 0x00, 0x12, 0x00, 0x45, 0x01, 0x2C, 0x00,
            0x40,
        ]);
        data.extend_from_slice(&header(0)[2..]);

        let parsed = read_header(&data).expect("header");
        assert_eq!(
            parsed.preset,
            Some(PresetParameters {
                max_value: 4095,
                threshold1: 18,
                threshold2: 69,
                threshold3: 300,
                reset: 64
            })
        );
    }

    #[test]
    fn rejects_streams_without_soi_or_scan() {
        assert_eq!(
            read_header(&[0x00, 0x01]),
            Err(JpegLsError::MissingStartOfImage)
        );
        assert_eq!(
            read_header(&[0xFF, 0xD8, 0xFF, 0xD9]),
            Err(JpegLsError::InvalidData("end of image before any scan"))
        );
        assert_eq!(
            read_header(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x02]),
            Err(JpegLsError::UnsupportedMarker(0xC0))
        );
    }
}

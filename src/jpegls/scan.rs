// Sample-by-sample decoding of one single-component scan (ITU-T T.87 regular and run modes).

use super::bit_reader::BitReader;
use super::context::{CodingParameters, RegularContext, RunModeContext};
use super::{FrameInfo, JpegLsError};

/// Run length order per run index.
const J: [u32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13,
    14, 15,
];
const CONTEXT_COUNT: usize = 365;
const MAX_ERROR_MAGNITUDE: i32 = 65535;

pub(super) struct ScanDecoder {
    params: CodingParameters,
    width: usize,
    height: usize,
    contexts: Vec<RegularContext>,
    run_contexts: [RunModeContext; 2],
    run_index: usize,
}

impl ScanDecoder {
    pub fn new(frame: &FrameInfo, params: CodingParameters) -> Self {
        let a = params.initial_a();
        Self {
            params,
            width: usize::from(frame.width),
            height: usize::from(frame.height),
            contexts: vec![RegularContext::new(a); CONTEXT_COUNT],
            run_contexts: [RunModeContext::new(0, a), RunModeContext::new(1, a)],
            run_index: 0,
        }
    }

    pub fn decode(mut self, reader: &mut BitReader<'_>) -> Result<Vec<u16>, JpegLsError> {
        let width = self.width;
        let mut samples = Vec::with_capacity(width * self.height);

        // Lines carry one guard sample on each side; sample x lives at index x + 1.
        let mut previous = vec![0_i32; width + 2];
        let mut current = vec![0_i32; width + 2];

        for _ in 0..self.height {
            previous[width + 1] = previous[width];
            current[0] = previous[1];
            self.decode_line(reader, &previous, &mut current)?;

            samples.extend(current[1..=width].iter().map(|&v| v as u16));
            std::mem::swap(&mut previous, &mut current);
        }

        Ok(samples)
    }

    fn decode_line(
        &mut self,
        reader: &mut BitReader<'_>,
        previous: &[i32],
        current: &mut [i32],
    ) -> Result<(), JpegLsError> {
        let near = self.params.near;
        let mut x = 1;
        while x <= self.width {
            let ra = current[x - 1];
            let rb = previous[x];
            let rc = previous[x - 1];
            let rd = previous[x + 1];

            let d1 = rd - rb;
            let d2 = rb - rc;
            let d3 = rc - ra;

            if d1.abs() <= near && d2.abs() <= near && d3.abs() <= near {
                x += self.decode_run(reader, previous, current, x)?;
            } else {
                let qs = (self.params.quantize(d1) * 9 + self.params.quantize(d2)) * 9
                    + self.params.quantize(d3);
                current[x] = self.decode_regular(reader, qs, predict(ra, rb, rc))?;
                x += 1;
            }
        }
        Ok(())
    }

    fn decode_regular(
        &mut self,
        reader: &mut BitReader<'_>,
        qs: i32,
        predicted: i32,
    ) -> Result<i32, JpegLsError> {
        let sign = if qs < 0 { -1 } else { 1 };
        let params = self.params;
        let context = &mut self.contexts[(qs * sign) as usize];

        let k = context.golomb_parameter()?;
        let corrected = params.clamp(predicted + sign * context.bias());

        let mut error = unmap(decode_value(reader, k, params.limit, params.qbpp)?);
        if error.abs() > MAX_ERROR_MAGNITUDE {
            return Err(JpegLsError::InvalidData("prediction error out of range"));
        }
        if k == 0 {
            error ^= context.error_correction(params.near);
        }
        context.update(error, params.near, params.reset);

        Ok(params.reconstruct(corrected, sign * error))
    }

    /// Returns the number of samples written, interruption sample included.
    fn decode_run(
        &mut self,
        reader: &mut BitReader<'_>,
        previous: &[i32],
        current: &mut [i32],
        start: usize,
    ) -> Result<usize, JpegLsError> {
        let ra = current[start - 1];
        let remaining = self.width - start + 1;

        let mut count = 0;
        while reader.read_bit()? {
            let run = 1_usize << J[self.run_index];
            let chunk = run.min(remaining - count);
            count += chunk;
            // A line ending mid-run does not advance the run index.
            if chunk == run && self.run_index < J.len() - 1 {
                self.run_index += 1;
            }
            if count == remaining {
                break;
            }
        }
        if count != remaining {
            count += reader.read_bits(J[self.run_index])? as usize;
        }
        if count > remaining {
            return Err(JpegLsError::InvalidData("run exceeds the line"));
        }

        current[start..start + count].fill(ra);
        let end = start + count;
        if end > self.width {
            return Ok(count);
        }

        let rb = previous[end];
        current[end] = self.decode_run_interruption(reader, ra, rb)?;
        self.run_index = self.run_index.saturating_sub(1);
        Ok(count + 1)
    }

    fn decode_run_interruption(
        &mut self,
        reader: &mut BitReader<'_>,
        ra: i32,
        rb: i32,
    ) -> Result<i32, JpegLsError> {
        if (ra - rb).abs() <= self.params.near {
            let error = self.decode_interruption_error(reader, 1)?;
            Ok(self.params.reconstruct(ra, error))
        } else {
            let error = self.decode_interruption_error(reader, 0)?;
            let sign = if rb - ra < 0 { -1 } else { 1 };
            Ok(self.params.reconstruct(rb, error * sign))
        }
    }

    fn decode_interruption_error(
        &mut self,
        reader: &mut BitReader<'_>,
        context_index: usize,
    ) -> Result<i32, JpegLsError> {
        let params = self.params;
        let limit = params.limit - J[self.run_index] - 1;
        let context = &mut self.run_contexts[context_index];

        let k = context.golomb_parameter()?;
        let mapped = decode_value(reader, k, limit, params.qbpp)?;
        let error = context.error_value(mapped + context.interruption_type(), k);
        context.update(error, mapped, params.reset);
        Ok(error)
    }
}

/// Limited-length Golomb code: unary prefix, then `k` low bits or a `qbpp`-bit escape.
fn decode_value(
    reader: &mut BitReader<'_>,
    k: u32,
    limit: u32,
    qbpp: u32,
) -> Result<i32, JpegLsError> {
    let escape = limit
        .checked_sub(qbpp + 1)
        .ok_or(JpegLsError::InvalidParameter("LIMIT"))?;
    let high = reader.read_unary(escape)?;
    if high == escape {
        return Ok(reader.read_bits(qbpp)? as i32 + 1);
    }
    Ok(((high << k) | reader.read_bits(k)?) as i32)
}

fn unmap(mapped: i32) -> i32 {
    if mapped & 1 == 0 {
        mapped >> 1
    } else {
        -((mapped + 1) >> 1)
    }
}

/// Median edge detector.
fn predict(ra: i32, rb: i32, rc: i32) -> i32 {
    if rc >= ra.max(rb) {
        ra.min(rb)
    } else if rc <= ra.min(rb) {
        ra.max(rb)
    } else {
        ra + rb - rc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_edge_detector() {
        assert_eq!(predict(10, 0, 0), 10);
        assert_eq!(predict(10, 20, 30), 10);
        assert_eq!(predict(10, 20, 15), 15);
    }

    #[test]
    fn unmapping_alternates_sign() {
        let unmapped: Vec<i32> = (0..6).map(unmap).collect();
        assert_eq!(unmapped, vec![0, -1, 1, -2, 2, -3]);
    }

    #[test]
    fn escape_code_reads_qbpp_bits() {
        // 23 zeros, a one, then the 8-bit value 0x2A.
        let data = [0x00, 0x00, 0x01, 0x2A];
        let mut reader = BitReader::new(&data);
        assert_eq!(decode_value(&mut reader, 2, 32, 8).expect("value"), 0x2B);
    }
}

// MSB-first reader over JPEG-LS entropy-coded data.
//
// After a 0xFF data byte the encoder stuffs a zero bit, so the following byte carries only seven
// data bits. A 0xFF followed by a byte with its high bit set is a marker and ends the scan.

use super::JpegLsError;

const CACHE_BITS: u32 = u64::BITS;

pub(super) struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    cache: u64,
    valid_bits: u32,
    previous_ff: bool,
}

/// What remained of the scan once every sample was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ScanRemainder {
    /// Undecoded bits, cached or still in the buffer before the marker.
    pub leftover_bits: usize,
    /// Some cached bit after the last sample was set.
    pub nonzero_padding: bool,
    /// Marker code ending the scan, if any was found.
    pub marker: Option<u8>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            cache: 0,
            valid_bits: 0,
            previous_ff: false,
        }
    }

    fn at_marker(&self) -> bool {
        self.data.get(self.position) == Some(&0xFF)
            && self
                .data
                .get(self.position + 1)
                .map_or(true, |next| next & 0x80 != 0)
    }

    fn fill(&mut self) {
        while self.valid_bits <= CACHE_BITS - 8 {
            let Some(&byte) = self.data.get(self.position) else {
                break;
            };
            if self.at_marker() {
                break;
            }

            let (value, width) = if self.previous_ff {
                (u64::from(byte & 0x7F), 7)
            } else {
                (u64::from(byte), 8)
            };
            self.cache |= value << (CACHE_BITS - self.valid_bits - width);
            self.valid_bits += width;
            self.previous_ff = byte == 0xFF;
            self.position += 1;
        }
    }

    fn consume(&mut self, count: u32) {
        self.cache = if count >= CACHE_BITS {
            0
        } else {
            self.cache << count
        };
        self.valid_bits -= count;
    }

    pub fn read_bit(&mut self) -> Result<bool, JpegLsError> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read `count` bits (at most 32) as an unsigned value.
    pub fn read_bits(&mut self, count: u32) -> Result<u32, JpegLsError> {
        if count == 0 {
            return Ok(0);
        }
        if self.valid_bits < count {
            self.fill();
            if self.valid_bits < count {
                return Err(JpegLsError::ScanExhausted);
            }
        }
        let value = (self.cache >> (CACHE_BITS - count)) as u32;
        self.consume(count);
        Ok(value)
    }

    /// Count zero bits up to and including the next set bit; the unary prefix of a Golomb code.
    pub fn read_unary(&mut self, max_zeros: u32) -> Result<u32, JpegLsError> {
        let mut zeros = 0;
        loop {
            if self.valid_bits == 0 {
                self.fill();
                if self.valid_bits == 0 {
                    return Err(JpegLsError::ScanExhausted);
                }
            }
            // Bits past `valid_bits` are always zero, so a non-zero cache holds a valid set bit.
            if self.cache == 0 {
                zeros += self.valid_bits;
                self.consume(self.valid_bits);
            } else {
                let leading = self.cache.leading_zeros();
                zeros += leading;
                self.consume(leading + 1);
                if zeros > max_zeros {
                    return Err(JpegLsError::InvalidData("Golomb code exceeds its length limit"));
                }
                return Ok(zeros);
            }
            if zeros > max_zeros {
                return Err(JpegLsError::InvalidData("Golomb code exceeds its length limit"));
            }
        }
    }

    pub fn finish(mut self) -> ScanRemainder {
        self.fill();
        let mut end = self.position;
        while end < self.data.len()
            && !(self.data[end] == 0xFF
                && self.data.get(end + 1).map_or(true, |next| next & 0x80 != 0))
        {
            end += 1;
        }

        ScanRemainder {
            leftover_bits: self.valid_bits as usize + (end - self.position) * 8,
            nonzero_padding: self.cache != 0,
            marker: self.data.get(end + 1).copied(),
        }
    }
}

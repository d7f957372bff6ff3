// Coding parameters and the adaptive context state of a JPEG-LS scan.

use super::{JpegLsError, PresetParameters};

pub(super) const DEFAULT_RESET: i32 = 64;
const BASIC_T1: i32 = 3;
const BASIC_T2: i32 = 7;
const BASIC_T3: i32 = 21;
const MIN_C: i32 = -128;
const MAX_C: i32 = 127;
const MAX_K: u32 = 16;

/// Derived parameters shared by every sample of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct CodingParameters {
    pub max_value: i32,
    pub near: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
    pub reset: i32,
    pub range: i32,
    pub qbpp: u32,
    pub limit: u32,
}

impl CodingParameters {
    pub fn new(
        bits_per_sample: u8,
        near: u8,
        preset: Option<&PresetParameters>,
    ) -> Result<Self, JpegLsError> {
        let default_max = (1_i32 << bits_per_sample) - 1;
        let max_value = match preset.map(|p| i32::from(p.max_value)) {
            Some(value) if value != 0 => value,
            _ => default_max,
        };
        let near = i32::from(near);
        if near > (max_value / 2).min(255) {
            return Err(JpegLsError::InvalidParameter("NEAR"));
        }

        let (t1, t2, t3) = default_thresholds(max_value, near);
        let pick = |value: Option<u16>, fallback: i32| match value {
            Some(v) if v != 0 => i32::from(v),
            _ => fallback,
        };
        let threshold1 = pick(preset.map(|p| p.threshold1), t1);
        let threshold2 = pick(preset.map(|p| p.threshold2), t2);
        let threshold3 = pick(preset.map(|p| p.threshold3), t3);
        let reset = pick(preset.map(|p| p.reset), DEFAULT_RESET);
        if reset < 3 {
            return Err(JpegLsError::InvalidParameter("RESET"));
        }

        let range = (max_value + 2 * near) / (2 * near + 1) + 1;
        let qbpp = bit_count(range);
        let bpp = bit_count(max_value + 1).max(2);
        let limit = 2 * (bpp + bpp.max(8));

        Ok(Self {
            max_value,
            near,
            threshold1,
            threshold2,
            threshold3,
            reset,
            range,
            qbpp,
            limit,
        })
    }

    /// Initial value of the `A` accumulators.
    pub fn initial_a(&self) -> i32 {
        ((self.range + 32) / 64).max(2)
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(0, self.max_value)
    }

    /// Local gradient to one of the nine quantization regions, -4..=4.
    pub fn quantize(&self, gradient: i32) -> i32 {
        if gradient <= -self.threshold3 {
            -4
        } else if gradient <= -self.threshold2 {
            -3
        } else if gradient <= -self.threshold1 {
            -2
        } else if gradient < -self.near {
            -1
        } else if gradient <= self.near {
            0
        } else if gradient < self.threshold1 {
            1
        } else if gradient < self.threshold2 {
            2
        } else if gradient < self.threshold3 {
            3
        } else {
            4
        }
    }

    /// Dequantize `error` onto `predicted`, undoing the modulo reduction.
    pub fn reconstruct(&self, predicted: i32, error: i32) -> i32 {
        let step = 2 * self.near + 1;
        let mut value = predicted + error * step;
        if value < -self.near {
            value += self.range * step;
        } else if value > self.max_value + self.near {
            value -= self.range * step;
        }
        self.clamp(value)
    }
}

/// Smallest `n` with `2^n >= value`.
fn bit_count(value: i32) -> u32 {
    let mut bits = 0;
    while (1_i64 << bits) < i64::from(value) {
        bits += 1;
    }
    bits
}

fn clamp_threshold(value: i32, low: i32, max_value: i32) -> i32 {
    if value > max_value || value < low {
        low
    } else {
        value
    }
}

fn default_thresholds(max_value: i32, near: i32) -> (i32, i32, i32) {
    if max_value >= 128 {
        let factor = (max_value.min(4095) + 128) / 256;
        let t1 = clamp_threshold(factor * (BASIC_T1 - 2) + 2 + 3 * near, near + 1, max_value);
        let t2 = clamp_threshold(factor * (BASIC_T2 - 3) + 3 + 5 * near, t1, max_value);
        let t3 = clamp_threshold(factor * (BASIC_T3 - 4) + 4 + 7 * near, t2, max_value);
        (t1, t2, t3)
    } else {
        let factor = 256 / (max_value + 1);
        let t1 = clamp_threshold((BASIC_T1 / factor + 3 * near).max(2), near + 1, max_value);
        let t2 = clamp_threshold((BASIC_T2 / factor + 5 * near).max(3), t1, max_value);
        let t3 = clamp_threshold((BASIC_T3 / factor + 7 * near).max(4), t2, max_value);
        (t1, t2, t3)
    }
}

/// Statistics of one of the 365 regular-mode contexts.
#[derive(Debug, Clone, Copy)]
pub(super) struct RegularContext {
    a: i32,
    b: i32,
    c: i32,
    n: i32,
}

impl RegularContext {
    pub fn new(a: i32) -> Self {
        Self { a, b: 0, c: 0, n: 1 }
    }

    pub fn bias(&self) -> i32 {
        self.c
    }

    pub fn golomb_parameter(&self) -> Result<u32, JpegLsError> {
        let mut k = 0;
        while (self.n << k) < self.a {
            k += 1;
            if k >= MAX_K {
                return Err(JpegLsError::InvalidData("Golomb parameter out of range"));
            }
        }
        Ok(k)
    }

    /// All ones when the lossless k = 0 mapping is inverted for this context.
    pub fn error_correction(&self, near: i32) -> i32 {
        if near == 0 && 2 * self.b + self.n - 1 < 0 {
            -1
        } else {
            0
        }
    }

    pub fn update(&mut self, error: i32, near: i32, reset: i32) {
        self.a += error.abs();
        self.b += error * (2 * near + 1);
        if self.n == reset {
            self.a >>= 1;
            self.b >>= 1;
            self.n >>= 1;
        }
        self.n += 1;

        if self.b + self.n <= 0 {
            self.b += self.n;
            if self.b <= -self.n {
                self.b = -self.n + 1;
            }
            if self.c > MIN_C {
                self.c -= 1;
            }
        } else if self.b > 0 {
            self.b -= self.n;
            if self.b > 0 {
                self.b = 0;
            }
            if self.c < MAX_C {
                self.c += 1;
            }
        }
    }
}

/// Statistics of the two run interruption contexts.
#[derive(Debug, Clone, Copy)]
pub(super) struct RunModeContext {
    interruption_type: i32,
    a: i32,
    n: i32,
    nn: i32,
}

impl RunModeContext {
    pub fn new(interruption_type: i32, a: i32) -> Self {
        Self {
            interruption_type,
            a,
            n: 1,
            nn: 0,
        }
    }

    pub fn interruption_type(&self) -> i32 {
        self.interruption_type
    }

    pub fn golomb_parameter(&self) -> Result<u32, JpegLsError> {
        let temp = self.a + (self.n >> 1) * self.interruption_type;
        let mut n_test = self.n;
        let mut k = 0;
        while n_test < temp {
            n_test <<= 1;
            k += 1;
            if k >= MAX_K {
                return Err(JpegLsError::InvalidData("Golomb parameter out of range"));
            }
        }
        Ok(k)
    }

    /// Signed error from `mapped + interruption_type`.
    pub fn error_value(&self, temp: i32, k: u32) -> i32 {
        let map = temp & 1;
        let magnitude = (temp + map) / 2;
        if (k != 0 || 2 * self.nn >= self.n) == (map != 0) {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn update(&mut self, error: i32, mapped: i32, reset: i32) {
        if error < 0 {
            self.nn += 1;
        }
        self.a += (mapped + 1 - self.interruption_type) >> 1;
        if self.n == reset {
            self.a >>= 1;
            self.n >>= 1;
            self.nn >>= 1;
        }
        self.n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_lossless_defaults() {
        let params = CodingParameters::new(8, 0, None).expect("params");
        assert_eq!(
            (params.threshold1, params.threshold2, params.threshold3),
            (3, 7, 21)
        );
        assert_eq!(params.range, 256);
        assert_eq!(params.qbpp, 8);
        assert_eq!(params.limit, 32);
        assert_eq!(params.initial_a(), 4);
    }

    #[test]
    fn near_lossless_widens_thresholds_and_shrinks_range() {
        let params = CodingParameters::new(12, 3, None).expect("params");
        assert_eq!(
            (params.threshold1, params.threshold2, params.threshold3),
            (27, 82, 297)
        );
        assert_eq!(params.range, (4095 + 6) / 7 + 1);
        assert_eq!(params.limit, 48);
    }

    #[test]
    fn sixteen_bit_limit() {
        let params = CodingParameters::new(16, 0, None).expect("params");
        assert_eq!(params.qbpp, 16);
        assert_eq!(params.limit, 64);
    }

    #[test]
    fn near_above_half_the_range_is_rejected() {
        assert_eq!(
            CodingParameters::new(2, 2, None),
            Err(JpegLsError::InvalidParameter("NEAR"))
        );
    }

    #[test]
    fn reconstruction_wraps_modulo_range() {
        let params = CodingParameters::new(8, 0, None).expect("params");
        assert_eq!(params.reconstruct(250, 10), 4);
        assert_eq!(params.reconstruct(3, -10), 249);
        assert_eq!(params.reconstruct(10, 20), 30);
    }

    #[test]
    fn bias_correction_follows_negative_errors() {
        let mut context = RegularContext::new(4);
        context.update(-10, 0, DEFAULT_RESET);
        assert_eq!(context.bias(), -1);
        assert_eq!(context.golomb_parameter().expect("k"), 3);
    }
}

//! Packed integer compression model.
//!
//! A packed `u32` is written as a bucket prefix code followed by the offset of
//! the value inside that bucket. Small values land in the narrow low buckets,
//! so deltas near zero cost a handful of bits while any `u32` stays encodable.

use crate::error::{BitError, BitResult};
use crate::reader::BitReader;

/// Number of value buckets in a model.
pub const BUCKET_COUNT: usize = 16;

/// Longest prefix code a model may assign to a bucket.
pub const MAX_CODE_LENGTH: u8 = 15;

const BUCKET_OFFSETS: [u32; BUCKET_COUNT] = [
    0,
    1,
    2,
    4,
    8,
    16,
    32,
    96,
    352,
    1376,
    5472,
    38_240,
    300_384,
    2_397_536,
    19_174_752,
    153_392_480,
];

const BUCKET_SIZES: [u8; BUCKET_COUNT] = [0, 0, 1, 2, 3, 4, 6, 8, 10, 12, 15, 18, 21, 24, 27, 32];

const DEFAULT_CODE_LENGTHS: [u8; BUCKET_COUNT] = [2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 8, 8];

/// Canonical prefix-code model shared by packed writes and reads.
///
/// Writer and reader must use the same model; it is not transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionModel {
    code_lengths: [u8; BUCKET_COUNT],
    codes: [u16; BUCKET_COUNT],
    // Decode tables indexed by code length.
    first_code: [u16; MAX_CODE_LENGTH as usize + 1],
    first_index: [u8; MAX_CODE_LENGTH as usize + 1],
    count: [u8; MAX_CODE_LENGTH as usize + 1],
    sorted: [u8; BUCKET_COUNT],
}

/// Tables for the built-in code lengths, computed at compile time.
const DEFAULT_MODEL: CompressionModel = CompressionModel::build(DEFAULT_CODE_LENGTHS);

impl Default for CompressionModel {
    fn default() -> Self {
        DEFAULT_MODEL
    }
}

impl CompressionModel {
    /// Builds a model from per-bucket prefix code lengths.
    ///
    /// Every length must be in `1..=MAX_CODE_LENGTH` and the lengths must
    /// satisfy the Kraft inequality.
    pub fn from_code_lengths(code_lengths: [u8; BUCKET_COUNT]) -> BitResult<Self> {
        let limit = 1u32 << MAX_CODE_LENGTH;
        let mut kraft_sum = 0u32;
        for &len in &code_lengths {
            if len == 0 || len > MAX_CODE_LENGTH {
                return Err(BitError::InvalidBitCount {
                    bits: len as usize,
                    max_bits: MAX_CODE_LENGTH as usize,
                });
            }
            kraft_sum += 1 << (MAX_CODE_LENGTH - len);
        }
        if kraft_sum > limit {
            return Err(BitError::InvalidCodeLengths {
                kraft_sum,
                kraft_limit: limit,
            });
        }
        Ok(Self::build(code_lengths))
    }

    /// Assigns canonical codes. `code_lengths` must already be validated.
    const fn build(code_lengths: [u8; BUCKET_COUNT]) -> Self {
        // Stable insertion sort of bucket indices by code length.
        let mut sorted = [0u8; BUCKET_COUNT];
        let mut i = 0;
        while i < BUCKET_COUNT {
            let mut j = i;
            while j > 0 && code_lengths[sorted[j - 1] as usize] > code_lengths[i] {
                sorted[j] = sorted[j - 1];
                j -= 1;
            }
            sorted[j] = i as u8;
            i += 1;
        }

        let mut codes = [0u16; BUCKET_COUNT];
        let mut first_code = [0u16; MAX_CODE_LENGTH as usize + 1];
        let mut first_index = [0u8; MAX_CODE_LENGTH as usize + 1];
        let mut count = [0u8; MAX_CODE_LENGTH as usize + 1];

        let mut code = 0u32;
        let mut prev_len = 0u8;
        let mut pos = 0;
        while pos < BUCKET_COUNT {
            let bucket = sorted[pos] as usize;
            let len = code_lengths[bucket];
            code <<= len - prev_len;
            let slot = len as usize;
            if count[slot] == 0 {
                first_code[slot] = code as u16;
                first_index[slot] = pos as u8;
            }
            count[slot] += 1;
            codes[bucket] = code as u16;
            code += 1;
            prev_len = len;
            pos += 1;
        }

        Self {
            code_lengths,
            codes,
            first_code,
            first_index,
            count,
            sorted,
        }
    }

    /// Returns the bucket a value falls into.
    #[must_use]
    pub fn bucket_for(&self, value: u32) -> usize {
        BUCKET_OFFSETS.partition_point(|&offset| offset <= value) - 1
    }

    /// Returns the number of bits a packed write of `value` costs.
    #[must_use]
    pub fn encoded_bits(&self, value: u32) -> usize {
        let bucket = self.bucket_for(value);
        self.code_lengths[bucket] as usize + BUCKET_SIZES[bucket] as usize
    }

    /// Returns the prefix code and its length for a bucket.
    pub(crate) fn code(&self, bucket: usize) -> (u16, u8) {
        (self.codes[bucket], self.code_lengths[bucket])
    }

    pub(crate) const fn bucket_offset(bucket: usize) -> u32 {
        BUCKET_OFFSETS[bucket]
    }

    pub(crate) const fn bucket_size(bucket: usize) -> u8 {
        BUCKET_SIZES[bucket]
    }

    /// Reads one bucket prefix code.
    pub(crate) fn read_bucket(&self, reader: &mut BitReader<'_>) -> BitResult<usize> {
        let start = reader.bit_position();
        let mut code = 0u32;
        for len in 1..=MAX_CODE_LENGTH as usize {
            code = (code << 1) | u32::from(reader.read_bool()?);
            let count = u32::from(self.count[len]);
            if count == 0 {
                continue;
            }
            let first = u32::from(self.first_code[len]);
            if code >= first && code - first < count {
                let pos = self.first_index[len] as usize + (code - first) as usize;
                return Ok(self.sorted[pos] as usize);
            }
        }
        Err(BitError::InvalidPackedSymbol {
            bit_position: start,
        })
    }
}

pub(crate) const fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub(crate) const fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_offsets_are_contiguous() {
        for i in 0..BUCKET_COUNT - 1 {
            let span = 1u64 << BUCKET_SIZES[i];
            assert_eq!(
                u64::from(BUCKET_OFFSETS[i]) + span,
                u64::from(BUCKET_OFFSETS[i + 1]),
                "bucket {i} does not end where bucket {} starts",
                i + 1
            );
        }
        let last = BUCKET_COUNT - 1;
        let top = u64::from(BUCKET_OFFSETS[last]) + (1u64 << BUCKET_SIZES[last]);
        assert!(top > u64::from(u32::MAX));
    }

    #[test]
    fn bucket_for_edges() {
        let model = CompressionModel::default();
        assert_eq!(model.bucket_for(0), 0);
        assert_eq!(model.bucket_for(1), 1);
        assert_eq!(model.bucket_for(2), 2);
        assert_eq!(model.bucket_for(3), 2);
        assert_eq!(model.bucket_for(95), 6);
        assert_eq!(model.bucket_for(96), 7);
        assert_eq!(model.bucket_for(u32::MAX), BUCKET_COUNT - 1);
    }

    #[test]
    fn default_codes_are_canonical() {
        let model = CompressionModel::default();
        assert_eq!(model.code(0), (0b00, 2));
        assert_eq!(model.code(1), (0b01, 2));
        assert_eq!(model.code(2), (0b100, 3));
        assert_eq!(model.code(3), (0b101, 3));
        assert_eq!(model.code(4), (0b1100, 4));
        assert_eq!(model.code(15), (0b1111_1111, 8));
    }

    #[test]
    fn encoded_bits_small_values() {
        let model = CompressionModel::default();
        assert_eq!(model.encoded_bits(0), 2);
        assert_eq!(model.encoded_bits(1), 2);
        assert_eq!(model.encoded_bits(3), 4);
        assert_eq!(model.encoded_bits(u32::MAX), 8 + 32);
    }

    #[test]
    fn rejects_zero_length() {
        let mut lengths = DEFAULT_CODE_LENGTHS;
        lengths[3] = 0;
        let err = CompressionModel::from_code_lengths(lengths).unwrap_err();
        assert!(matches!(err, BitError::InvalidBitCount { bits: 0, .. }));
    }

    #[test]
    fn rejects_oversubscribed_lengths() {
        let err = CompressionModel::from_code_lengths([1; BUCKET_COUNT]).unwrap_err();
        assert!(matches!(err, BitError::InvalidCodeLengths { .. }));
    }

    #[test]
    fn accepts_flat_lengths() {
        let model = CompressionModel::from_code_lengths([4; BUCKET_COUNT]).unwrap();
        assert_eq!(model.code(0), (0, 4));
        assert_eq!(model.code(15), (15, 4));
    }

    #[test]
    fn compile_time_default_matches_validated_build() {
        let built = CompressionModel::from_code_lengths(DEFAULT_CODE_LENGTHS).unwrap();
        assert_eq!(CompressionModel::default(), built);
        // Same-length buckets keep index order.
        assert_eq!(built.sorted, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn build_orders_unsorted_lengths() {
        let mut lengths = [5u8; BUCKET_COUNT];
        lengths[15] = 2;
        lengths[7] = 3;
        let model = CompressionModel::from_code_lengths(lengths).unwrap();
        assert_eq!(model.sorted[0], 15);
        assert_eq!(model.sorted[1], 7);
        assert_eq!(model.code(15), (0b00, 2));
        assert_eq!(model.code(7), (0b010, 3));
        assert_eq!(model.code(0), (0b01100, 5));
    }

    #[test]
    fn zigzag_roundtrip_extremes() {
        for value in [0, 1, -1, 2, -2, i32::MAX, i32::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
    }
}

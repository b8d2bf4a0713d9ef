//! MSB-first bit reader over a borrowed byte slice.

use crate::error::{BitError, BitResult};
use crate::model::{zigzag_decode, CompressionModel};

/// Reads back what a [`BitWriter`](crate::BitWriter) produced.
///
/// Every read checks the remaining length first, so truncated or hostile
/// input yields a [`BitError`] instead of a panic.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Starts reading at bit 0 of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Bits left before the end of the slice.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.data
            .len()
            .saturating_mul(8)
            .saturating_sub(self.bit_pos)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Bits consumed so far.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Reads one bit.
    pub fn read_bool(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let byte = self.data[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads `bits` bits (at most 64), most significant first.
    pub fn read_bits(&mut self, bits: usize) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        self.ensure_bits(bits)?;
        Ok(self.take_bits(bits))
    }

    /// Reads up to 32 bits as written by `write_raw_bits`.
    pub fn read_raw_bits(&mut self, bits: u8) -> BitResult<u32> {
        if bits > 32 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 32,
            });
        }
        self.ensure_bits(bits as usize)?;
        Ok(self.take_bits(bits as usize) as u32)
    }

    /// Reads an unsigned integer packed with `model`.
    pub fn read_packed_uint(&mut self, model: &CompressionModel) -> BitResult<u32> {
        let bucket = model.read_bucket(self)?;
        let size = CompressionModel::bucket_size(bucket);
        let offset = self.read_raw_bits(size)?;
        Ok(CompressionModel::bucket_offset(bucket).wrapping_add(offset))
    }

    /// Reads a zigzag-mapped signed packed integer.
    pub fn read_packed_int(&mut self, model: &CompressionModel) -> BitResult<i32> {
        self.read_packed_uint(model).map(zigzag_decode)
    }

    /// Reads a delta written by `write_packed_uint_delta` and applies it to `baseline`.
    pub fn read_packed_uint_delta(
        &mut self,
        baseline: u32,
        model: &CompressionModel,
    ) -> BitResult<u32> {
        let delta = self.read_packed_int(model)?;
        Ok(baseline.wrapping_add(delta as u32))
    }

    /// Reads a delta written by `write_packed_int_delta` and applies it to `baseline`.
    pub fn read_packed_int_delta(
        &mut self,
        baseline: i32,
        model: &CompressionModel,
    ) -> BitResult<i32> {
        let delta = self.read_packed_int(model)?;
        Ok(baseline.wrapping_add(delta))
    }

    /// Skips to the next multiple of `bits`.
    pub fn align_to(&mut self, bits: usize) -> BitResult<()> {
        if bits == 0 {
            return Ok(());
        }
        let rem = self.bit_pos % bits;
        if rem == 0 {
            return Ok(());
        }
        let skip = bits - rem;
        self.ensure_bits(skip)?;
        self.bit_pos += skip;
        Ok(())
    }

    /// Aligns to the next byte boundary.
    pub fn align_to_byte(&mut self) -> BitResult<()> {
        self.align_to(8)
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::EndOfBuffer {
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    fn take_bits(&mut self, bits: usize) -> u64 {
        let mut value = 0u64;
        let mut remaining = bits;
        while remaining > 0 {
            let used = self.bit_pos % 8;
            let avail = 8 - used;
            let take = avail.min(remaining);
            let byte = u64::from(self.data[self.bit_pos / 8]);
            let chunk = (byte >> (avail - take)) & ((1u64 << take) - 1);
            value = (value << take) | chunk;
            self.bit_pos += take;
            remaining -= take;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitWriter;

    #[test]
    fn empty_reader() {
        let reader = BitReader::new(&[]);
        assert!(reader.is_empty());
        assert_eq!(reader.bits_remaining(), 0);
        assert_eq!(reader.bit_position(), 0);
    }

    #[test]
    fn read_from_empty_fails() {
        let mut reader = BitReader::new(&[]);
        let result = reader.read_bool();
        assert!(matches!(result, Err(BitError::EndOfBuffer { .. })));
    }

    #[test]
    fn read_bits_across_bytes() {
        let mut reader = BitReader::new(&[0b1111_0000, 0b0000_1111]);
        assert_eq!(reader.read_bits(12).unwrap(), 0b1111_0000_0000);
        assert_eq!(reader.bits_remaining(), 4);
    }

    #[test]
    fn read_bits_64() {
        let mut reader = BitReader::new(&[0xFF; 8]);
        assert_eq!(reader.read_bits(64).unwrap(), u64::MAX);
        assert!(reader.is_empty());
    }

    #[test]
    fn read_raw_bits_rejects_wide_reads() {
        let mut reader = BitReader::new(&[0xFF; 8]);
        let err = reader.read_raw_bits(33).unwrap_err();
        assert!(matches!(err, BitError::InvalidBitCount { max_bits: 32, .. }));
    }

    #[test]
    fn read_past_end_reports_available() {
        let mut reader = BitReader::new(&[0xAA]);
        reader.read_bits(5).unwrap();
        let err = reader.read_bits(4).unwrap_err();
        assert_eq!(
            err,
            BitError::EndOfBuffer {
                requested: 4,
                available: 3
            }
        );
    }

    #[test]
    fn align_to_word_skips_padding() {
        let mut reader = BitReader::new(&[0x80, 0, 0, 0, 0xAB]);
        assert!(reader.read_bool().unwrap());
        reader.align_to(32).unwrap();
        assert_eq!(reader.bit_position(), 32);
        assert_eq!(reader.read_raw_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn packed_values_roundtrip() {
        let model = CompressionModel::default();
        let values = [0u32, 1, 2, 3, 31, 32, 95, 96, 5000, 1 << 20, u32::MAX];
        let mut writer = BitWriter::new();
        for &v in &values {
            writer.write_packed_uint(v, &model);
        }
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        for &v in &values {
            assert_eq!(reader.read_packed_uint(&model).unwrap(), v);
        }
    }

    #[test]
    fn packed_deltas_roundtrip() {
        let model = CompressionModel::default();
        let mut writer = BitWriter::new();
        writer.write_packed_int_delta(i32::MIN, i32::MAX, &model);
        writer.write_packed_uint_delta(3, u32::MAX, &model);
        writer.write_packed_int_delta(-5, 10, &model);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_packed_int_delta(i32::MAX, &model).unwrap(), i32::MIN);
        assert_eq!(reader.read_packed_uint_delta(u32::MAX, &model).unwrap(), 3);
        assert_eq!(reader.read_packed_int_delta(10, &model).unwrap(), -5);
    }

    #[test]
    fn truncated_packed_value_fails() {
        let model = CompressionModel::default();
        let mut writer = BitWriter::new();
        writer.write_packed_uint(1 << 20, &model);
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes[..1]);
        assert!(reader.read_packed_uint(&model).is_err());
    }

    #[test]
    fn incomplete_code_reports_invalid_symbol() {
        // Three buckets of length 2 and thirteen of length 15 leave most of
        // the `11` subtree unassigned.
        let mut lengths = [15u8; 16];
        lengths[..3].copy_from_slice(&[2, 2, 2]);
        let model = CompressionModel::from_code_lengths(lengths).unwrap();
        let mut reader = BitReader::new(&[0xFF, 0xFF]);
        let err = reader.read_packed_uint(&model).unwrap_err();
        assert!(matches!(err, BitError::InvalidPackedSymbol { bit_position: 0 }));
    }
}

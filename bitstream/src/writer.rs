//! Bit-level writer for encoding packed binary data.

use crate::error::{BitError, BitResult};
use crate::model::{zigzag_encode, CompressionModel};

/// A bit-level writer with an optional capacity bound.
///
/// Bits are packed MSB-first. When a write would exceed the capacity, nothing
/// is written and the writer is marked failed; every later write is a no-op
/// until [`reset`](Self::reset) or [`restore`](Self::restore) clears the flag.
/// Callers check [`has_failed_writes`](Self::has_failed_writes) after a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitWriter {
    /// Accumulated bytes; bits past `bit_len` are always zero.
    bytes: Vec<u8>,
    /// Number of bits written.
    bit_len: usize,
    /// Maximum number of bits this writer accepts.
    capacity_bits: usize,
    /// Sticky overflow flag.
    failed: bool,
}

/// A checkpoint of a [`BitWriter`], used to roll back partial writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterState {
    bit_len: usize,
    failed: bool,
}

impl WriterState {
    /// Returns the bit length at the checkpoint.
    #[must_use]
    pub const fn length_in_bits(self) -> usize {
        self.bit_len
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    /// Creates an unbounded writer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_len: 0,
            capacity_bits: usize::MAX,
            failed: false,
        }
    }

    /// Creates a writer that holds at most `bytes` bytes.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
            capacity_bits: bytes.saturating_mul(8),
            failed: false,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub const fn length_in_bits(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of bytes needed to hold the written bits.
    #[must_use]
    pub fn length_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the capacity in bits.
    #[must_use]
    pub const fn capacity_bits(&self) -> usize {
        self.capacity_bits
    }

    /// Returns the number of bits that can still be written.
    #[must_use]
    pub const fn remaining_bits(&self) -> usize {
        self.capacity_bits.saturating_sub(self.bit_len)
    }

    /// Returns `true` once a write has exceeded the capacity.
    #[must_use]
    pub const fn has_failed_writes(&self) -> bool {
        self.failed
    }

    /// Returns a checkpoint of the current position and failure flag.
    #[must_use]
    pub const fn state(&self) -> WriterState {
        WriterState {
            bit_len: self.bit_len,
            failed: self.failed,
        }
    }

    /// Rolls the writer back to a checkpoint taken earlier.
    ///
    /// Bits written after the checkpoint are discarded and zeroed, so the
    /// writer compares equal to its state at the checkpoint.
    pub fn restore(&mut self, state: WriterState) {
        debug_assert!(state.bit_len <= self.bit_len, "restore to a later state");
        self.bit_len = state.bit_len.min(self.bit_len);
        self.bytes.truncate(self.bit_len.div_ceil(8));
        let used = self.bit_len % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= !(0xFFu8 >> used);
            }
        }
        self.failed = state.failed;
    }

    /// Clears all written data and the failure flag; capacity is kept.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.bit_len = 0;
        self.failed = false;
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        if self.reserve(1) {
            self.push_bits(u64::from(value), 1);
        }
    }

    /// Writes up to 64 bits from an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: usize) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits < 64 && value >> bits != 0 {
            return Err(BitError::ValueOutOfRange { value, bits });
        }
        if bits > 0 && self.reserve(bits) {
            self.push_bits(value, bits);
        }
        Ok(())
    }

    /// Writes the low `bits` bits of `value` without range checks.
    ///
    /// Bits above `bits` are masked off. `bits` must not exceed 32.
    pub fn write_raw_bits(&mut self, value: u32, bits: u8) {
        debug_assert!(bits <= 32, "raw writes are limited to 32 bits");
        let bits = bits.min(32) as usize;
        if bits > 0 && self.reserve(bits) {
            let mask = (1u64 << bits) - 1;
            self.push_bits(u64::from(value) & mask, bits);
        }
    }

    /// Writes an unsigned integer with the packed encoding of `model`.
    pub fn write_packed_uint(&mut self, value: u32, model: &CompressionModel) {
        let bucket = model.bucket_for(value);
        let (code, code_len) = model.code(bucket);
        let size = CompressionModel::bucket_size(bucket);
        if !self.reserve(code_len as usize + size as usize) {
            return;
        }
        self.push_bits(u64::from(code), code_len as usize);
        if size > 0 {
            let offset = value - CompressionModel::bucket_offset(bucket);
            self.push_bits(u64::from(offset), size as usize);
        }
    }

    /// Writes a signed integer as a zigzag-mapped packed value.
    pub fn write_packed_int(&mut self, value: i32, model: &CompressionModel) {
        self.write_packed_uint(zigzag_encode(value), model);
    }

    /// Writes the wrapping difference `value - baseline` of two unsigned values.
    pub fn write_packed_uint_delta(&mut self, value: u32, baseline: u32, model: &CompressionModel) {
        self.write_packed_int(value.wrapping_sub(baseline) as i32, model);
    }

    /// Writes the wrapping difference `value - baseline` of two signed values.
    pub fn write_packed_int_delta(&mut self, value: i32, baseline: i32, model: &CompressionModel) {
        self.write_packed_int(value.wrapping_sub(baseline), model);
    }

    /// Pads with zero bits up to the next multiple of `bits`.
    pub fn align_to(&mut self, bits: usize) {
        if bits == 0 {
            return;
        }
        let rem = self.bit_len % bits;
        if rem == 0 {
            return;
        }
        let pad = bits - rem;
        if self.reserve(pad) {
            let mut left = pad;
            while left > 0 {
                let chunk = left.min(64);
                self.push_bits(0, chunk);
                left -= chunk;
            }
        }
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        self.align_to(8);
    }

    /// Returns the written bytes; the last byte is zero-padded on the right.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Finishes writing and returns the byte buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Finishes writing and appends to the provided buffer.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        buf.append(&mut self.bytes);
    }

    fn reserve(&mut self, bits: usize) -> bool {
        if self.failed {
            return false;
        }
        if bits > self.remaining_bits() {
            self.failed = true;
            return false;
        }
        true
    }

    fn push_bits(&mut self, value: u64, bits: usize) {
        let mut remaining = bits;
        while remaining > 0 {
            let used = self.bit_len % 8;
            if used == 0 {
                self.bytes.push(0);
            }
            let free = 8 - used;
            let take = free.min(remaining);
            let shift = remaining - take;
            let chunk = ((value >> shift) & ((1u64 << take) - 1)) as u8;
            let idx = self.bytes.len() - 1;
            self.bytes[idx] |= chunk << (free - take);
            self.bit_len += take;
            remaining -= take;
        }
    }
}

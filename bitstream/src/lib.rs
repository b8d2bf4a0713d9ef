//! Bit-level streams for gsnap snapshot packets.
//!
//! [`BitWriter`] packs bits MSB-first into a byte buffer, optionally bounded
//! to a packet size. [`BitReader`] reads them back. Integers that usually sit
//! near zero (deltas, residuals) go through a [`CompressionModel`]: a prefix
//! code selects one of sixteen value buckets and the bucket's offset follows
//! in a fixed number of bits.
//!
//! A bounded writer never returns an error when it runs out of room. It
//! drops the write, raises a sticky flag, and lets the caller roll back to a
//! [`WriterState`] taken before the entity that overflowed. Reads are always
//! bounds-checked.
//!
//! ```
//! use bitstream::{BitReader, BitWriter, CompressionModel};
//!
//! let model = CompressionModel::default();
//! let mut writer = BitWriter::with_capacity(16);
//! writer.write_bool(true);
//! writer.write_packed_int_delta(42, 40, &model);
//! writer.align_to(32);
//! assert!(!writer.has_failed_writes());
//!
//! let bytes = writer.finish();
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bool().unwrap());
//! assert_eq!(reader.read_packed_int_delta(40, &model).unwrap(), 42);
//! ```

mod error;
mod model;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use model::{CompressionModel, BUCKET_COUNT, MAX_CODE_LENGTH};
pub use reader::BitReader;
pub use writer::{BitWriter, WriterState};

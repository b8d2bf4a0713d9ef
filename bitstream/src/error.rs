//! Errors raised by bit readers, writers and compression models.

use std::fmt;

/// Result alias used throughout the bitstream crate.
pub type BitResult<T> = Result<T, BitError>;

/// A malformed stream or an invalid argument.
///
/// A bounded [`BitWriter`](crate::BitWriter) running out of room is not an
/// error: it sets the writer's sticky failure flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A read needed more bits than the stream has left.
    EndOfBuffer { requested: usize, available: usize },

    /// A bit count outside `1..=max_bits` (or `0..=max_bits` for plain reads
    /// and writes).
    InvalidBitCount { bits: usize, max_bits: usize },

    /// `value` has bits set above the low `bits` bits.
    ValueOutOfRange { value: u64, bits: usize },

    /// No bucket code of the model starts at `bit_position`.
    InvalidPackedSymbol { bit_position: usize },

    /// The code lengths over-subscribe the prefix space (Kraft sum, scaled to
    /// the longest code, is above the limit).
    InvalidCodeLengths { kraft_sum: u32, kraft_limit: u32 },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfBuffer {
                requested,
                available,
            } => write!(
                f,
                "end of stream: wanted {requested} bits, {available} left"
            ),
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "bit count {bits} is outside the supported 0..={max_bits}")
            }
            Self::ValueOutOfRange { value, bits } => {
                write!(f, "{value} does not fit in {bits} bits")
            }
            Self::InvalidPackedSymbol { bit_position } => {
                write!(f, "no bucket code matches at bit {bit_position}")
            }
            Self::InvalidCodeLengths {
                kraft_sum,
                kraft_limit,
            } => write!(
                f,
                "bucket code lengths are not a prefix code (kraft sum {kraft_sum} > {kraft_limit})"
            ),
        }
    }
}

impl std::error::Error for BitError {}

//! Error types for history operations.

use std::fmt;

use codec::CodecError;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while recording or restoring backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Codec error while copying client-only state.
    Codec(CodecError),

    /// A slot was requested from a ring with no free space.
    Full { capacity: usize },

    /// A resize would drop stored backups.
    CapacityBelowLength { requested: usize, len: usize },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Full { capacity } => {
                write!(f, "backup ring is full ({capacity} slots)")
            }
            Self::CapacityBelowLength { requested, len } => {
                write!(
                    f,
                    "cannot resize backup ring to {requested} slots while holding {len}"
                )
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for HistoryError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

//! Error types for codec operations.

use std::fmt;

use schema::{ComponentId, GhostTypeId};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while laying out, serializing or deserializing
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// Schema error.
    Schema(schema::SchemaError),

    /// The ghost type is not part of the schema.
    UnknownGhostType { ghost_type: GhostTypeId },

    /// Layout metadata was requested before it was computed.
    MissingMetadata { ghost_type: GhostTypeId },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// An entity belongs to a different ghost type than the chunk.
    GhostTypeMismatch {
        expected: GhostTypeId,
        found: GhostTypeId,
    },

    /// An entity does not carry one data entry per ghost type component.
    ComponentCountMismatch {
        ghost_type: GhostTypeId,
        expected: usize,
        actual: usize,
    },

    /// Component data does not carry one value per field.
    FieldCountMismatch {
        component: ComponentId,
        expected: usize,
        actual: usize,
    },

    /// A field value does not match the field's codec.
    FieldTypeMismatch {
        component: ComponentId,
        field: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// The snapshot buffer stride does not match the ghost type layout.
    StrideMismatch { expected: usize, actual: usize },

    /// A slot or backup region has the wrong size.
    SlotSizeMismatch { expected: usize, actual: usize },

    /// The entity range does not fit the buffers it addresses.
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },

    /// The first entity of a chunk did not fit in the output stream.
    StreamFull {
        entity_index: usize,
        capacity_bits: usize,
    },
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    ComponentsPerGhostType,
    FieldsPerComponent,
    EntitiesPerChunk,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::UnknownGhostType { ghost_type } => {
                write!(f, "unknown ghost type {ghost_type:?}")
            }
            Self::MissingMetadata { ghost_type } => {
                write!(f, "no layout metadata for ghost type {ghost_type:?}")
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::GhostTypeMismatch { expected, found } => {
                write!(
                    f,
                    "ghost type mismatch: expected {expected:?}, found {found:?}"
                )
            }
            Self::ComponentCountMismatch {
                ghost_type,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "ghost type {ghost_type:?} has {expected} components, entity has {actual}"
                )
            }
            Self::FieldCountMismatch {
                component,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "component {component:?} has {expected} fields, data has {actual}"
                )
            }
            Self::FieldTypeMismatch {
                component,
                field,
                expected,
                found,
            } => {
                write!(
                    f,
                    "field {field} of {component:?}: expected {expected}, found {found}"
                )
            }
            Self::StrideMismatch { expected, actual } => {
                write!(f, "snapshot stride mismatch: expected {expected}, found {actual}")
            }
            Self::SlotSizeMismatch { expected, actual } => {
                write!(f, "slot size mismatch: expected {expected}, found {actual}")
            }
            Self::InvalidRange { start, end, len } => {
                write!(f, "entity range {start}..{end} out of bounds for {len} entities")
            }
            Self::StreamFull {
                entity_index,
                capacity_bits,
            } => {
                write!(
                    f,
                    "entity {entity_index} does not fit in a {capacity_bits}-bit stream"
                )
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ComponentsPerGhostType => "components per ghost type",
            Self::FieldsPerComponent => "fields per component",
            Self::EntitiesPerChunk => "entities per chunk",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(e) => Some(e),
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl From<schema::SchemaError> for CodecError {
    fn from(err: schema::SchemaError) -> Self {
        Self::Schema(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn error_display_limits() {
        let err = CodecError::LimitsExceeded {
            kind: LimitKind::EntitiesPerChunk,
            limit: 64,
            actual: 65,
        };
        assert_eq!(err.to_string(), "entities per chunk limit exceeded: 65 > 64");
    }

    #[test]
    fn error_display_stream_full() {
        let err = CodecError::StreamFull {
            entity_index: 3,
            capacity_bits: 256,
        };
        assert!(err.to_string().contains("entity 3"));
        assert!(err.to_string().contains("256-bit"));
    }

    #[test]
    fn bit_error_converts_with_source() {
        let bit = bitstream::BitError::EndOfBuffer {
            requested: 8,
            available: 2,
        };
        let err: CodecError = bit.clone().into();
        assert_eq!(err, CodecError::Bitstream(bit));
        assert!(err.source().is_some());
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<CodecError>();
    }
}

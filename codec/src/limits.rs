//! Bounds checked while computing layouts and before touching a chunk.

/// Upper bounds on ghost shapes and chunk sizes.
///
/// Layout computation rejects ghost types that exceed the component or field
/// bounds; the chunk serializer rejects entity ranges longer than
/// `max_entities_per_chunk` before writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Components across the root entity and all children of one ghost type.
    pub max_components_per_ghost_type: usize,
    pub max_fields_per_component: usize,
    /// Entities in one serialize or deserialize call.
    pub max_entities_per_chunk: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_components_per_ghost_type: 64,
            max_fields_per_component: 64,
            max_entities_per_chunk: 1024,
        }
    }
}

impl CodecLimits {
    /// Tighter bounds, so tests hit the limits with small fixtures.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_components_per_ghost_type: 16,
            max_fields_per_component: 16,
            max_entities_per_chunk: 64,
        }
    }

    /// No bounds at all; only for trusted, pre-validated schemas.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_components_per_ghost_type: usize::MAX,
            max_fields_per_component: usize::MAX,
            max_entities_per_chunk: usize::MAX,
        }
    }
}

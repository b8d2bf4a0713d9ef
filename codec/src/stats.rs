//! Bit-size accounting across serialized chunks.

use crate::chunk::ChunkSerializeResult;

/// Totals for one component position of a ghost type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentStats {
    /// Times the component was eligible and written (changed or not).
    pub samples: usize,
    /// Times the component carried a payload.
    pub changed: usize,
    /// Payload bits, excluding change and enable bits.
    pub payload_bits: usize,
}

/// Running totals for one ghost type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializationStats {
    pub entities: usize,
    /// Total record bits, including headers and padding.
    pub entity_bits: usize,
    pub components: Vec<ComponentStats>,
}

impl SerializationStats {
    /// Creates empty stats for a ghost type with `component_count` components.
    #[must_use]
    pub fn new(component_count: usize) -> Self {
        Self {
            entities: 0,
            entity_bits: 0,
            components: vec![ComponentStats::default(); component_count],
        }
    }

    /// Adds the entities and components of one serialized chunk.
    pub fn record(&mut self, result: &ChunkSerializeResult) {
        self.entities += result.entities.len();
        self.entity_bits += result.entities.iter().map(|e| e.length_bits).sum::<usize>();
        for size in &result.components {
            if size.component_index >= self.components.len() {
                self.components
                    .resize(size.component_index + 1, ComponentStats::default());
            }
            let stats = &mut self.components[size.component_index];
            stats.samples += 1;
            stats.payload_bits += size.length_bits;
            stats.changed += usize::from(size.length_bits > 0);
        }
    }

    /// Merges totals from another run, e.g. another worker.
    pub fn merge(&mut self, other: &Self) {
        self.entities += other.entities;
        self.entity_bits += other.entity_bits;
        if self.components.len() < other.components.len() {
            self.components
                .resize(other.components.len(), ComponentStats::default());
        }
        for (mine, theirs) in self.components.iter_mut().zip(&other.components) {
            mine.samples += theirs.samples;
            mine.changed += theirs.changed;
            mine.payload_bits += theirs.payload_bits;
        }
    }

    /// Mean record size in bits, or zero before anything was recorded.
    #[must_use]
    pub fn mean_entity_bits(&self) -> f64 {
        if self.entities == 0 {
            0.0
        } else {
            self.entity_bits as f64 / self.entities as f64
        }
    }
}

//! Ghost snapshot serialization for the gsnap codec.
//!
//! This is the main codec crate that ties together bitstream and schema to
//! turn live ghost data into compact, per-recipient delta streams.
//!
//! # Features
//!
//! - Per-ghost-type slot layouts computed once and cached
//! - Flat, fixed-stride snapshot buffers with 16-byte aligned component data
//! - Delta encoding against zero, one or three baselines, with linear
//!   prediction in the three-baseline case
//! - Chunk serialization with bit-exact rollback when the stream fills up
//! - Per-component bit-size accounting
//!
//! # Design Principles
//!
//! - **Correctness first** - All invariants are documented and tested.
//! - **No steady-state allocations** - Buffers and scratch space are reused.
//! - **Deterministic** - Same inputs produce same outputs.

mod chunk;
mod delta;
mod error;
mod layout;
mod limits;
mod predictor;
mod scratch;
mod snapshot;
mod stats;
mod types;

pub use chunk::{
    ChunkSerializeResult, ChunkSerializer, ComponentBitSize, EntityBaselines, EntityBitRange,
    OwnershipResolver, Recipient, ENTITY_ALIGNMENT_BITS,
};
pub use delta::{
    deserialize_component_single_baseline, deserialize_component_three_baseline,
    serialize_component_single_baseline, serialize_component_three_baseline, update_change_mask,
};
pub use error::{CodecError, CodecResult, LimitKind};
pub use layout::{
    ComponentLayout, ComponentStorage, PrefabMetadata, PrefabMetadataCache, SNAPSHOT_ALIGNMENT,
};
pub use limits::CodecLimits;
pub use predictor::DeltaPredictor;
pub use scratch::ChunkScratch;
pub use snapshot::{
    apply_snapshot_to_entity, copy_client_only_to_backup, copy_components_to_snapshot,
    dequantize_field, quantize_field, restore_client_only_from_backup, SnapshotBuffer,
    SnapshotSlot, SnapshotSlotMut,
};
pub use stats::{ComponentStats, SerializationStats};
pub use types::{ComponentData, FieldValue, GhostEntity, SnapshotTick};

//! Chunk serialization: many entities of one ghost type into one stream.
//!
//! Each entity record starts on a 32-bit boundary:
//!
//! ```text
//! | change bit per eligible component | enable bit per eligible enableable component |
//! | payload of each changed component ... | zero padding to 32 bits |
//! ```
//!
//! Eligibility depends on the recipient: a component is only written when its
//! send mask matches the recipient's simulation mode for the ghost and its
//! owner mask matches the recipient's ownership.

use std::ops::Range;

use bitstream::{BitReader, BitWriter, CompressionModel};
use schema::{GhostMode, GhostTypeId};
use tracing::{debug, warn};

use crate::delta::{
    clear_change_mask, copy_component_from_baseline, read_component, update_change_mask,
    write_component, DeltaBaselines,
};
use crate::error::{CodecError, CodecResult, LimitKind};
use crate::layout::{ComponentLayout, ComponentStorage, PrefabMetadata, PrefabMetadataCache};
use crate::limits::CodecLimits;
use crate::scratch::ChunkScratch;
use crate::snapshot::{SnapshotBuffer, SnapshotSlot, SnapshotSlotMut};
use crate::types::SnapshotTick;

/// Entity records are padded to this many bits.
pub const ENTITY_ALIGNMENT_BITS: usize = 32;

/// The baselines an entity is encoded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityBaselines<'a> {
    /// Not relevant to the recipient: skipped, contributes no bits.
    Irrelevant,
    /// Never acknowledged: encoded against an all-zero baseline.
    None,
    /// Encoded against one acknowledged snapshot.
    Single(SnapshotSlot<'a>),
    /// Encoded against the prediction from three acknowledged snapshots,
    /// newest first.
    Three([SnapshotSlot<'a>; 3]),
}

impl EntityBaselines<'_> {
    /// Returns `false` for [`EntityBaselines::Irrelevant`].
    #[must_use]
    pub const fn is_relevant(&self) -> bool {
        !matches!(self, Self::Irrelevant)
    }

    /// Number of acknowledged snapshots used.
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Irrelevant | Self::None => 0,
            Self::Single(_) => 1,
            Self::Three(_) => 3,
        }
    }
}

/// The connection a chunk is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient {
    pub network_id: i32,
}

impl Recipient {
    #[must_use]
    pub const fn new(network_id: i32) -> Self {
        Self { network_id }
    }
}

/// Tells the receiving side which entities it owns.
///
/// The sender derives ownership from the owner field in each slot; the
/// receiver needs it before it can tell which components were sent.
pub trait OwnershipResolver {
    fn is_owner(&self, entity_index: usize) -> bool;
}

impl<F> OwnershipResolver for F
where
    F: Fn(usize) -> bool,
{
    fn is_owner(&self, entity_index: usize) -> bool {
        self(entity_index)
    }
}

/// Where one entity record landed in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityBitRange {
    pub entity_index: usize,
    pub start_bit: usize,
    /// Including alignment padding.
    pub length_bits: usize,
}

/// Payload bits written for one component of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentBitSize {
    pub entity_index: usize,
    /// Position of the component within its ghost type.
    pub component_index: usize,
    pub start_bit: usize,
    /// Zero for unchanged components, whose only cost is their change bit.
    pub length_bits: usize,
}

/// Outcome of [`ChunkSerializer::serialize_chunk`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSerializeResult {
    /// Every entity up to and including this index was handled (written or
    /// skipped as irrelevant). `None` for an empty range.
    pub last_serialized_entity: Option<usize>,
    /// `true` if the whole range fit in the stream.
    pub complete: bool,
    pub entities: Vec<EntityBitRange>,
    pub components: Vec<ComponentBitSize>,
}

impl ChunkSerializeResult {
    /// Index to resume from on the next call.
    #[must_use]
    pub fn resume_index(&self, range: &Range<usize>) -> usize {
        self.last_serialized_entity.map_or(range.start, |last| last + 1)
    }
}

/// Serializes and deserializes entity ranges of one ghost type.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSerializer<'a> {
    metadata: &'a PrefabMetadata,
    components: &'a [ComponentLayout],
    limits: &'a CodecLimits,
    model: &'a CompressionModel,
}

impl<'a> ChunkSerializer<'a> {
    /// Creates a serializer for a ghost type whose metadata is in `cache`.
    pub fn new(
        cache: &'a PrefabMetadataCache,
        ghost_type: GhostTypeId,
        model: &'a CompressionModel,
    ) -> CodecResult<Self> {
        let metadata = cache
            .get(ghost_type)
            .ok_or(CodecError::MissingMetadata { ghost_type })?;
        Ok(Self {
            metadata,
            components: cache.components(metadata),
            limits: cache.limits(),
            model,
        })
    }

    #[must_use]
    pub const fn metadata(&self) -> &'a PrefabMetadata {
        self.metadata
    }

    #[must_use]
    pub const fn components(&self) -> &'a [ComponentLayout] {
        self.components
    }

    /// Whether a recipient with the given ownership predicts the ghost.
    const fn predicts(&self, owner: bool) -> bool {
        match self.metadata.mode {
            GhostMode::Interpolated => false,
            GhostMode::Predicted => true,
            GhostMode::OwnerPredicted => owner,
        }
    }

    fn is_owner(&self, slot: SnapshotSlot<'_>, recipient: Recipient) -> bool {
        self.metadata
            .prediction_owner_offset
            .is_some_and(|offset| slot.word(offset) as i32 == recipient.network_id)
    }

    fn check_range(
        &self,
        range: &Range<usize>,
        entities: usize,
        baselines: usize,
    ) -> CodecResult<()> {
        if range.start > range.end || range.end > entities || range.end > baselines {
            return Err(CodecError::InvalidRange {
                start: range.start,
                end: range.end,
                len: entities.min(baselines),
            });
        }
        if range.len() > self.limits.max_entities_per_chunk {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::EntitiesPerChunk,
                limit: self.limits.max_entities_per_chunk,
                actual: range.len(),
            });
        }
        Ok(())
    }

    fn check_buffer(&self, buffer: &SnapshotBuffer) -> CodecResult<()> {
        if buffer.stride() == self.metadata.snapshot_stride {
            Ok(())
        } else {
            Err(CodecError::StrideMismatch {
                expected: self.metadata.snapshot_stride,
                actual: buffer.stride(),
            })
        }
    }

    fn resolve_baselines<'b>(
        &self,
        baselines: EntityBaselines<'b>,
        tick: SnapshotTick,
        zero: SnapshotSlot<'b>,
    ) -> CodecResult<Option<DeltaBaselines<'b>>> {
        let stride = self.metadata.snapshot_stride;
        let check = |slot: &SnapshotSlot<'_>| {
            if slot.len() == stride {
                Ok(())
            } else {
                Err(CodecError::SlotSizeMismatch {
                    expected: stride,
                    actual: slot.len(),
                })
            }
        };
        Ok(match baselines {
            EntityBaselines::Irrelevant => None,
            EntityBaselines::None => Some(DeltaBaselines::Single(zero)),
            EntityBaselines::Single(slot) => {
                check(&slot)?;
                Some(DeltaBaselines::Single(slot))
            }
            EntityBaselines::Three(slots) => {
                for slot in &slots {
                    check(slot)?;
                }
                Some(DeltaBaselines::three(tick, slots))
            }
        })
    }

    /// Serializes `current[range]` into `writer`.
    ///
    /// `baselines` is indexed like `current`. Change masks of the written
    /// slots are updated in place.
    ///
    /// When the stream runs out of room, the entity being written is rolled
    /// back bit for bit, its change masks are cleared, and the result reports
    /// how far the call got. If not
    /// even the first entity fits, its partial write is left in the stream
    /// for the caller to inspect and [`CodecError::StreamFull`] is returned.
    pub fn serialize_chunk(
        &self,
        recipient: Recipient,
        current: &mut SnapshotBuffer,
        baselines: &[EntityBaselines<'_>],
        range: Range<usize>,
        writer: &mut BitWriter,
        scratch: &mut ChunkScratch,
    ) -> CodecResult<ChunkSerializeResult> {
        self.check_buffer(current)?;
        self.check_range(&range, current.len(), baselines.len())?;

        let stride = self.metadata.snapshot_stride;
        scratch.ensure_stride(stride);
        let zero = scratch.zero_slot(stride);

        let mut result = ChunkSerializeResult::default();
        let mut written = 0usize;
        for index in range.clone() {
            let tick = current.slot(index).tick();
            let Some(deltas) = self.resolve_baselines(baselines[index], tick, zero)? else {
                continue;
            };

            let state = writer.state();
            let components_before = result.components.len();
            writer.align_to(ENTITY_ALIGNMENT_BITS);
            let start_bit = writer.length_in_bits();
            self.write_entity(
                index,
                recipient,
                &mut current.slot_mut(index),
                &deltas,
                writer,
                &mut result.components,
            );
            writer.align_to(ENTITY_ALIGNMENT_BITS);

            if writer.has_failed_writes() {
                if written > 0 {
                    writer.restore(state);
                    result.components.truncate(components_before);
                    // The slot must not claim changes that never went out.
                    let mut slot = current.slot_mut(index);
                    for layout in self.components {
                        clear_change_mask(layout, &mut slot);
                    }
                    result.last_serialized_entity = Some(index - 1);
                    debug!(
                        ghost_type = self.metadata.ghost_type.get(),
                        entity = index,
                        written,
                        "stream full, rolled back partial entity"
                    );
                    return Ok(result);
                }
                warn!(
                    ghost_type = self.metadata.ghost_type.get(),
                    entity = index,
                    capacity_bits = writer.capacity_bits(),
                    "first entity of chunk does not fit in stream"
                );
                return Err(CodecError::StreamFull {
                    entity_index: index,
                    capacity_bits: writer.capacity_bits(),
                });
            }

            result.entities.push(EntityBitRange {
                entity_index: index,
                start_bit,
                length_bits: writer.length_in_bits() - start_bit,
            });
            written += 1;
        }

        result.last_serialized_entity = (!range.is_empty()).then(|| range.end - 1);
        result.complete = true;
        Ok(result)
    }

    fn write_entity(
        &self,
        index: usize,
        recipient: Recipient,
        slot: &mut SnapshotSlotMut<'_>,
        deltas: &DeltaBaselines<'_>,
        writer: &mut BitWriter,
        sizes: &mut Vec<ComponentBitSize>,
    ) {
        let owner = self.is_owner(slot.as_slot(), recipient);
        let predicted = self.predicts(owner);
        let primary = deltas.primary();

        for layout in self.components {
            if layout.is_sent_to(predicted, owner) {
                let changed = update_change_mask(layout, slot, primary);
                writer.write_bool(changed);
            } else {
                clear_change_mask(layout, slot);
            }
        }

        for layout in self.components {
            if let ComponentStorage::Snapshot {
                enable_bit: Some(bit),
                ..
            } = layout.storage
            {
                if layout.is_sent_to(predicted, owner) {
                    writer.write_bool(slot.as_slot().enable_bit(self.metadata, bit));
                }
            }
        }

        for (component_index, layout) in self.components.iter().enumerate() {
            if !layout.is_sent_to(predicted, owner) {
                continue;
            }
            let start_bit = writer.length_in_bits();
            let current = slot.as_slot();
            let length_bits = if current.component_changed(layout) {
                write_component(layout, current, deltas, writer, self.model)
            } else {
                0
            };
            sizes.push(ComponentBitSize {
                entity_index: index,
                component_index,
                start_bit,
                length_bits,
            });
        }
    }

    /// Reads entities written by [`serialize_chunk`](Self::serialize_chunk)
    /// into `out[range]`.
    ///
    /// `baselines` must match what the sender used; irrelevant entities are
    /// left untouched. Components not sent to this recipient are carried over
    /// from the newest baseline.
    #[allow(clippy::too_many_arguments)]
    pub fn deserialize_chunk(
        &self,
        owners: &impl OwnershipResolver,
        tick: SnapshotTick,
        baselines: &[EntityBaselines<'_>],
        range: Range<usize>,
        reader: &mut BitReader<'_>,
        out: &mut SnapshotBuffer,
        scratch: &mut ChunkScratch,
    ) -> CodecResult<()> {
        self.check_buffer(out)?;
        self.check_range(&range, out.len(), baselines.len())?;

        let stride = self.metadata.snapshot_stride;
        scratch.ensure_stride(stride);
        let zero = scratch.zero_slot(stride);

        for index in range {
            let Some(deltas) = self.resolve_baselines(baselines[index], tick, zero)? else {
                continue;
            };
            reader.align_to(ENTITY_ALIGNMENT_BITS)?;
            let mut slot = out.slot_mut(index);
            slot.clear();
            slot.set_tick(tick);
            self.read_entity(owners.is_owner(index), &mut slot, &deltas, reader)?;
            reader.align_to(ENTITY_ALIGNMENT_BITS)?;
        }
        Ok(())
    }

    fn read_entity(
        &self,
        owner: bool,
        slot: &mut SnapshotSlotMut<'_>,
        deltas: &DeltaBaselines<'_>,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<()> {
        let predicted = self.predicts(owner);
        let primary = deltas.primary();

        for layout in self.components {
            if let ComponentStorage::Snapshot {
                change_mask_bit, ..
            } = layout.storage
            {
                let changed = layout.is_sent_to(predicted, owner) && reader.read_bool()?;
                for i in 0..layout.field_count() {
                    slot.set_change_bit(change_mask_bit + i, changed);
                }
            }
        }

        for layout in self.components {
            if let ComponentStorage::Snapshot {
                enable_bit: Some(bit),
                ..
            } = layout.storage
            {
                let enabled = if layout.is_sent_to(predicted, owner) {
                    reader.read_bool()?
                } else {
                    primary.enable_bit(self.metadata, bit)
                };
                slot.set_enable_bit(self.metadata, bit, enabled);
            }
        }

        for layout in self.components {
            if !layout.is_serialized() {
                continue;
            }
            if layout.is_sent_to(predicted, owner) && slot.as_slot().component_changed(layout) {
                read_component(layout, slot, deltas, reader, self.model)?;
            } else {
                copy_component_from_baseline(layout, slot, primary);
            }
        }
        Ok(())
    }
}

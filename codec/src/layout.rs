//! Per-ghost-type snapshot layout, computed once and cached.
//!
//! A snapshot slot is laid out as:
//!
//! ```text
//! | tick: u32 | change mask words | enable bit words | pad to 16 |
//! | component 0 payload (align 16) | component 1 payload (align 16) | ...
//! ```
//!
//! Every field occupies one little-endian `u32` word. Client-only components
//! never appear in snapshots; they get their own region in the backup slot
//! used by the history ring, which has the same shape minus tick and change
//! mask.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use schema::{
    ComponentId, FieldCodec, GhostMode, GhostTypeId, Schema, SchemaError, SendMask, SendToOwner,
};
use tracing::debug;

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;

/// Alignment of slot headers and component regions, in bytes.
pub const SNAPSHOT_ALIGNMENT: usize = 16;

/// Size of the tick stored at the start of every snapshot slot.
pub(crate) const TICK_BYTES: usize = 4;

/// Bytes used by a single field in a snapshot.
pub(crate) const FIELD_BYTES: usize = 4;

pub(crate) const fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

pub(crate) const fn words_for_bits(bits: usize) -> usize {
    bits.div_ceil(32)
}

/// Where a component's data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStorage {
    /// Serialized component stored in snapshot slots.
    Snapshot {
        /// Byte offset of the payload within the slot.
        offset: usize,
        /// Index of the component's first change-mask bit.
        change_mask_bit: usize,
        /// Index into the slot's enable bits, for enableable components.
        enable_bit: Option<usize>,
    },
    /// Client-only component stored in backup slots.
    Backup {
        /// Byte offset of the payload within the backup slot.
        offset: usize,
        /// Index into the backup slot's enable bits, for enableable components.
        enable_bit: Option<usize>,
    },
}

/// Resolved layout of one component slot of a ghost type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLayout {
    pub component: ComponentId,
    pub entity_index: u16,
    pub codecs: Box<[FieldCodec]>,
    pub send_mask: SendMask,
    pub send_to_owner: SendToOwner,
    pub storage: ComponentStorage,
    /// Size of the payload region in bytes, rounded up to [`SNAPSHOT_ALIGNMENT`].
    pub size: usize,
}

impl ComponentLayout {
    /// Number of fields (and change-mask bits) of the component.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if the component is part of server snapshots.
    #[must_use]
    pub const fn is_serialized(&self) -> bool {
        matches!(self.storage, ComponentStorage::Snapshot { .. })
    }

    /// Returns `true` if the component carries an enable bit.
    #[must_use]
    pub const fn is_enableable(&self) -> bool {
        match self.storage {
            ComponentStorage::Snapshot { enable_bit, .. }
            | ComponentStorage::Backup { enable_bit, .. } => enable_bit.is_some(),
        }
    }

    /// Returns `true` if the component is serialized for a recipient in the
    /// given simulation mode and ownership.
    #[must_use]
    pub fn is_sent_to(&self, predicted: bool, owner: bool) -> bool {
        if !self.is_serialized() {
            return false;
        }
        let mode = if predicted {
            SendMask::PREDICTED
        } else {
            SendMask::INTERPOLATED
        };
        let ownership = if owner {
            SendToOwner::OWNER
        } else {
            SendToOwner::NON_OWNER
        };
        self.send_mask.contains(mode) && self.send_to_owner.contains(ownership)
    }
}

/// Layout metadata of a ghost type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabMetadata {
    pub ghost_type: GhostTypeId,
    pub mode: GhostMode,
    /// Range of this ghost type's entries in the cache component index.
    pub component_range: Range<usize>,
    pub num_root_components: usize,
    /// Total change-mask bits (one per field of every serialized component).
    pub change_mask_bits: usize,
    /// Enable bits in a snapshot slot.
    pub enable_bits: usize,
    /// Byte offset of the first enable-bit word within a snapshot slot.
    pub enable_bits_offset: usize,
    /// Size of the snapshot slot header, aligned.
    pub header_size: usize,
    /// Size of one snapshot slot in bytes.
    pub snapshot_stride: usize,
    /// Enable bits in a backup slot.
    pub backup_enable_bits: usize,
    /// Size of the backup slot header, aligned.
    pub backup_header_size: usize,
    /// Size of one backup slot in bytes; zero when the ghost type has no
    /// client-only components.
    pub backup_slot_size: usize,
    /// Byte offset of the owning connection id within a snapshot slot.
    pub prediction_owner_offset: Option<usize>,
}

impl PrefabMetadata {
    /// Number of components across all entities of the ghost type.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.component_range.len()
    }

    /// Returns `true` if the ghost type has client-only state to back up.
    #[must_use]
    pub const fn has_client_only_components(&self) -> bool {
        self.backup_slot_size > 0
    }
}

/// Lazily computed layout metadata for every ghost type of a schema.
#[derive(Debug)]
pub struct PrefabMetadataCache {
    schema: Arc<Schema>,
    limits: CodecLimits,
    metadata: HashMap<GhostTypeId, PrefabMetadata>,
    components: Vec<ComponentLayout>,
}

impl PrefabMetadataCache {
    /// Creates an empty cache over a frozen schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>, limits: CodecLimits) -> Self {
        Self {
            schema,
            limits,
            metadata: HashMap::new(),
            components: Vec::new(),
        }
    }

    /// Returns the schema the cache lays out.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the limits the cache enforces.
    #[must_use]
    pub const fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Number of ghost types with computed metadata.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Returns `true` if no metadata has been computed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Computes the metadata of `ghost_type` on first use and returns it.
    pub fn get_or_compute(&mut self, ghost_type: GhostTypeId) -> CodecResult<&PrefabMetadata> {
        if !self.metadata.contains_key(&ghost_type) {
            let metadata = self.compute(ghost_type)?;
            debug!(
                ghost_type = ghost_type.get(),
                components = metadata.component_count(),
                snapshot_stride = metadata.snapshot_stride,
                backup_slot_size = metadata.backup_slot_size,
                "computed prefab metadata"
            );
            self.metadata.insert(ghost_type, metadata);
        }
        self.metadata
            .get(&ghost_type)
            .ok_or(CodecError::MissingMetadata { ghost_type })
    }

    /// Returns previously computed metadata.
    #[must_use]
    pub fn get(&self, ghost_type: GhostTypeId) -> Option<&PrefabMetadata> {
        self.metadata.get(&ghost_type)
    }

    /// Returns the component layouts of a ghost type, in ghost type order.
    #[must_use]
    pub fn components(&self, metadata: &PrefabMetadata) -> &[ComponentLayout] {
        &self.components[metadata.component_range.clone()]
    }

    fn compute(&mut self, ghost_type: GhostTypeId) -> CodecResult<PrefabMetadata> {
        let schema = Arc::clone(&self.schema);
        let ghost = schema
            .ghost_type(ghost_type)
            .ok_or(CodecError::UnknownGhostType { ghost_type })?;
        if ghost.components.len() > self.limits.max_components_per_ghost_type {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::ComponentsPerGhostType,
                limit: self.limits.max_components_per_ghost_type,
                actual: ghost.components.len(),
            });
        }

        let mut defs = Vec::with_capacity(ghost.components.len());
        let mut change_mask_bits = 0;
        let mut enable_bits = 0;
        let mut backup_enable_bits = 0;
        for slot in &ghost.components {
            let def = schema
                .component(slot.component)
                .ok_or(SchemaError::UnknownComponent {
                    ghost_type,
                    component: slot.component,
                })?;
            if def.fields.len() > self.limits.max_fields_per_component {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::FieldsPerComponent,
                    limit: self.limits.max_fields_per_component,
                    actual: def.fields.len(),
                });
            }
            if def.is_serialized() {
                change_mask_bits += def.fields.len();
                enable_bits += usize::from(def.enableable);
            } else {
                backup_enable_bits += usize::from(def.enableable);
            }
            defs.push((slot, def));
        }

        let enable_bits_offset = TICK_BYTES + words_for_bits(change_mask_bits) * 4;
        let header_size = align_up(
            enable_bits_offset + words_for_bits(enable_bits) * 4,
            SNAPSHOT_ALIGNMENT,
        );
        let backup_header_size =
            align_up(words_for_bits(backup_enable_bits) * 4, SNAPSHOT_ALIGNMENT);

        let begin = self.components.len();
        let mut snapshot_offset = header_size;
        let mut backup_offset = backup_header_size;
        let mut next_change_bit = 0;
        let mut next_enable_bit = 0;
        let mut next_backup_enable_bit = 0;
        let mut has_client_only = false;
        let mut prediction_owner_offset = None;

        for (slot, def) in defs {
            let size = align_up(def.fields.len() * FIELD_BYTES, SNAPSHOT_ALIGNMENT);
            let storage = if def.is_serialized() {
                let enable_bit = def.enableable.then_some(next_enable_bit);
                next_enable_bit += usize::from(def.enableable);
                if let Some(owner) = ghost.prediction_owner {
                    if owner.component == slot.component && slot.entity_index == 0 {
                        prediction_owner_offset =
                            Some(snapshot_offset + usize::from(owner.field) * FIELD_BYTES);
                    }
                }
                let storage = ComponentStorage::Snapshot {
                    offset: snapshot_offset,
                    change_mask_bit: next_change_bit,
                    enable_bit,
                };
                snapshot_offset += size;
                next_change_bit += def.fields.len();
                storage
            } else {
                has_client_only = true;
                let enable_bit = def.enableable.then_some(next_backup_enable_bit);
                next_backup_enable_bit += usize::from(def.enableable);
                let storage = ComponentStorage::Backup {
                    offset: backup_offset,
                    enable_bit,
                };
                backup_offset += size;
                storage
            };

            self.components.push(ComponentLayout {
                component: slot.component,
                entity_index: slot.entity_index,
                codecs: def.fields.iter().map(|f| f.codec).collect(),
                send_mask: def.send_mask,
                send_to_owner: def.send_to_owner,
                storage,
                size,
            });
        }

        Ok(PrefabMetadata {
            ghost_type,
            mode: ghost.mode,
            component_range: begin..self.components.len(),
            num_root_components: ghost.root_component_count(),
            change_mask_bits,
            enable_bits,
            enable_bits_offset,
            header_size,
            snapshot_stride: snapshot_offset,
            backup_enable_bits,
            backup_header_size,
            backup_slot_size: if has_client_only { backup_offset } else { 0 },
            prediction_owner_offset,
        })
    }
}

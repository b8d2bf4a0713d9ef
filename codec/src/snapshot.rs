//! Flat snapshot storage and conversion to and from live ghost data.

use schema::{ComponentId, FieldCodec};

use crate::error::{CodecError, CodecResult};
use crate::layout::{ComponentLayout, ComponentStorage, PrefabMetadata, FIELD_BYTES, TICK_BYTES};
use crate::types::{ComponentData, FieldValue, GhostEntity, SnapshotTick};

pub(crate) fn read_word(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

pub(crate) fn write_word(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_bit(bytes: &[u8], base: usize, index: usize) -> bool {
    let word = read_word(bytes, base + (index / 32) * 4);
    (word >> (index % 32)) & 1 == 1
}

pub(crate) fn write_bit(bytes: &mut [u8], base: usize, index: usize, value: bool) {
    let offset = base + (index / 32) * 4;
    let bit = 1u32 << (index % 32);
    let word = read_word(bytes, offset);
    write_word(bytes, offset, if value { word | bit } else { word & !bit });
}

/// Read-only view of one snapshot slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSlot<'a> {
    bytes: &'a [u8],
}

impl<'a> SnapshotSlot<'a> {
    /// Wraps raw slot bytes, e.g. a slot kept in a snapshot history.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Tick the slot was captured at.
    #[must_use]
    pub fn tick(&self) -> SnapshotTick {
        SnapshotTick::new(read_word(self.bytes, 0))
    }

    /// Reads the field word at a byte offset.
    #[must_use]
    pub fn word(&self, offset: usize) -> u32 {
        read_word(self.bytes, offset)
    }

    /// Reads one change-mask bit.
    #[must_use]
    pub fn change_bit(&self, index: usize) -> bool {
        read_bit(self.bytes, TICK_BYTES, index)
    }

    /// Reads one enable bit.
    #[must_use]
    pub fn enable_bit(&self, metadata: &PrefabMetadata, index: usize) -> bool {
        read_bit(self.bytes, metadata.enable_bits_offset, index)
    }

    /// Returns `true` if any field of a serialized component is flagged as
    /// changed.
    #[must_use]
    pub fn component_changed(&self, layout: &ComponentLayout) -> bool {
        match layout.storage {
            ComponentStorage::Snapshot {
                change_mask_bit, ..
            } => (0..layout.field_count()).any(|i| self.change_bit(change_mask_bit + i)),
            ComponentStorage::Backup { .. } => false,
        }
    }
}

/// Mutable view of one snapshot slot.
#[derive(Debug, PartialEq, Eq)]
pub struct SnapshotSlotMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> SnapshotSlotMut<'a> {
    /// Wraps raw slot bytes.
    #[must_use]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Reborrows as a read-only view.
    #[must_use]
    pub fn as_slot(&self) -> SnapshotSlot<'_> {
        SnapshotSlot::new(&*self.bytes)
    }

    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }

    #[must_use]
    pub fn tick(&self) -> SnapshotTick {
        self.as_slot().tick()
    }

    pub fn set_tick(&mut self, tick: SnapshotTick) {
        write_word(self.bytes, 0, tick.raw());
    }

    #[must_use]
    pub fn word(&self, offset: usize) -> u32 {
        read_word(self.bytes, offset)
    }

    pub fn set_word(&mut self, offset: usize, value: u32) {
        write_word(self.bytes, offset, value);
    }

    pub fn set_change_bit(&mut self, index: usize, value: bool) {
        write_bit(self.bytes, TICK_BYTES, index, value);
    }

    pub fn set_enable_bit(&mut self, metadata: &PrefabMetadata, index: usize, value: bool) {
        write_bit(self.bytes, metadata.enable_bits_offset, index, value);
    }

    /// Zeroes the whole slot.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

/// Fixed-stride storage for the snapshot slots of one ghost type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBuffer {
    stride: usize,
    data: Vec<u8>,
}

impl SnapshotBuffer {
    /// Creates a zeroed buffer holding `entities` slots of `stride` bytes.
    #[must_use]
    pub fn new(stride: usize, entities: usize) -> Self {
        Self {
            stride,
            data: vec![0; stride * entities],
        }
    }

    /// Creates a zeroed buffer sized for a ghost type.
    #[must_use]
    pub fn for_metadata(metadata: &PrefabMetadata, entities: usize) -> Self {
        Self::new(metadata.snapshot_stride, entities)
    }

    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.stride).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows or shrinks to `entities` slots; new slots are zeroed.
    pub fn resize(&mut self, entities: usize) {
        self.data.resize(self.stride * entities, 0);
    }

    /// Returns slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn slot(&self, index: usize) -> SnapshotSlot<'_> {
        SnapshotSlot::new(&self.data[index * self.stride..(index + 1) * self.stride])
    }

    /// Returns slot `index` for writing.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn slot_mut(&mut self, index: usize) -> SnapshotSlotMut<'_> {
        SnapshotSlotMut::new(&mut self.data[index * self.stride..(index + 1) * self.stride])
    }

    /// Returns slot `index`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<SnapshotSlot<'_>> {
        (index < self.len()).then(|| self.slot(index))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

const fn codec_name(codec: FieldCodec) -> &'static str {
    match codec {
        FieldCodec::Bool => "bool",
        FieldCodec::Int => "int",
        FieldCodec::UInt => "uint",
        FieldCodec::Float { .. } => "float",
    }
}

/// Converts a live value to its snapshot word.
///
/// Floats are stored as `round(value * quantization)` in two's complement.
pub fn quantize_field(
    component: ComponentId,
    field: usize,
    codec: FieldCodec,
    value: FieldValue,
) -> CodecResult<u32> {
    match (codec, value) {
        (FieldCodec::Bool, FieldValue::Bool(v)) => Ok(u32::from(v)),
        (FieldCodec::Int, FieldValue::Int(v)) => Ok(v as u32),
        (FieldCodec::UInt, FieldValue::UInt(v)) => Ok(v),
        (FieldCodec::Float { quantization }, FieldValue::Float(v)) => {
            Ok((f64::from(v) * f64::from(quantization)).round() as i32 as u32)
        }
        _ => Err(CodecError::FieldTypeMismatch {
            component,
            field,
            expected: codec_name(codec),
            found: value.kind(),
        }),
    }
}

/// Converts a snapshot word back into a live value.
#[must_use]
pub fn dequantize_field(codec: FieldCodec, word: u32) -> FieldValue {
    match codec {
        FieldCodec::Bool => FieldValue::Bool(word != 0),
        FieldCodec::Int => FieldValue::Int(word as i32),
        FieldCodec::UInt => FieldValue::UInt(word),
        FieldCodec::Float { quantization } => {
            FieldValue::Float((f64::from(word as i32) / f64::from(quantization)) as f32)
        }
    }
}

fn check_entity(
    metadata: &PrefabMetadata,
    components: &[ComponentLayout],
    ghost_type: schema::GhostTypeId,
    data_len: usize,
) -> CodecResult<()> {
    if ghost_type != metadata.ghost_type {
        return Err(CodecError::GhostTypeMismatch {
            expected: metadata.ghost_type,
            found: ghost_type,
        });
    }
    if data_len != components.len() {
        return Err(CodecError::ComponentCountMismatch {
            ghost_type,
            expected: components.len(),
            actual: data_len,
        });
    }
    Ok(())
}

fn check_fields(layout: &ComponentLayout, data: &ComponentData) -> CodecResult<()> {
    if data.fields.len() == layout.field_count() {
        Ok(())
    } else {
        Err(CodecError::FieldCountMismatch {
            component: layout.component,
            expected: layout.field_count(),
            actual: data.fields.len(),
        })
    }
}

fn write_fields(
    layout: &ComponentLayout,
    data: &ComponentData,
    bytes: &mut [u8],
    offset: usize,
) -> CodecResult<()> {
    check_fields(layout, data)?;
    for (i, (&codec, &value)) in layout.codecs.iter().zip(&data.fields).enumerate() {
        let word = quantize_field(layout.component, i, codec, value)?;
        write_word(bytes, offset + i * FIELD_BYTES, word);
    }
    Ok(())
}

fn read_fields(
    layout: &ComponentLayout,
    data: &mut ComponentData,
    bytes: &[u8],
    offset: usize,
) -> CodecResult<()> {
    check_fields(layout, data)?;
    for (i, (&codec, value)) in layout.codecs.iter().zip(&mut data.fields).enumerate() {
        *value = dequantize_field(codec, read_word(bytes, offset + i * FIELD_BYTES));
    }
    Ok(())
}

/// Captures the serialized components of a ghost into a snapshot slot.
///
/// The slot is cleared first; change masks are filled in later, when the slot
/// is serialized against its baselines.
pub fn copy_components_to_snapshot(
    metadata: &PrefabMetadata,
    components: &[ComponentLayout],
    entity: &GhostEntity,
    tick: SnapshotTick,
    slot: &mut SnapshotSlotMut<'_>,
) -> CodecResult<()> {
    check_entity(metadata, components, entity.ghost_type, entity.components.len())?;
    if slot.bytes.len() != metadata.snapshot_stride {
        return Err(CodecError::SlotSizeMismatch {
            expected: metadata.snapshot_stride,
            actual: slot.bytes.len(),
        });
    }
    slot.clear();
    slot.set_tick(tick);
    for (layout, data) in components.iter().zip(&entity.components) {
        if let ComponentStorage::Snapshot {
            offset, enable_bit, ..
        } = layout.storage
        {
            if let Some(bit) = enable_bit {
                slot.set_enable_bit(metadata, bit, data.enabled);
            }
            write_fields(layout, data, &mut *slot.bytes, offset)?;
        }
    }
    Ok(())
}

/// Writes the serialized components stored in a snapshot slot back onto a
/// ghost. Client-only components are left untouched.
pub fn apply_snapshot_to_entity(
    metadata: &PrefabMetadata,
    components: &[ComponentLayout],
    slot: SnapshotSlot<'_>,
    entity: &mut GhostEntity,
) -> CodecResult<()> {
    check_entity(metadata, components, entity.ghost_type, entity.components.len())?;
    for (layout, data) in components.iter().zip(&mut entity.components) {
        if let ComponentStorage::Snapshot {
            offset, enable_bit, ..
        } = layout.storage
        {
            if let Some(bit) = enable_bit {
                data.enabled = slot.enable_bit(metadata, bit);
            }
            read_fields(layout, data, slot.bytes, offset)?;
        }
    }
    Ok(())
}

/// Copies the client-only components of a ghost into a backup slot.
pub fn copy_client_only_to_backup(
    metadata: &PrefabMetadata,
    components: &[ComponentLayout],
    entity: &GhostEntity,
    backup: &mut [u8],
) -> CodecResult<()> {
    check_entity(metadata, components, entity.ghost_type, entity.components.len())?;
    if backup.len() != metadata.backup_slot_size {
        return Err(CodecError::SlotSizeMismatch {
            expected: metadata.backup_slot_size,
            actual: backup.len(),
        });
    }
    backup.fill(0);
    for (layout, data) in components.iter().zip(&entity.components) {
        if let ComponentStorage::Backup { offset, enable_bit } = layout.storage {
            if let Some(bit) = enable_bit {
                write_bit(backup, 0, bit, data.enabled);
            }
            write_fields(layout, data, backup, offset)?;
        }
    }
    Ok(())
}

/// Restores the client-only components of a ghost from a backup slot.
pub fn restore_client_only_from_backup(
    metadata: &PrefabMetadata,
    components: &[ComponentLayout],
    backup: &[u8],
    entity: &mut GhostEntity,
) -> CodecResult<()> {
    check_entity(metadata, components, entity.ghost_type, entity.components.len())?;
    if backup.len() != metadata.backup_slot_size {
        return Err(CodecError::SlotSizeMismatch {
            expected: metadata.backup_slot_size,
            actual: backup.len(),
        });
    }
    for (layout, data) in components.iter().zip(&mut entity.components) {
        if let ComponentStorage::Backup { offset, enable_bit } = layout.storage {
            if let Some(bit) = enable_bit {
                data.enabled = read_bit(backup, 0, bit);
            }
            read_fields(layout, data, backup, offset)?;
        }
    }
    Ok(())
}

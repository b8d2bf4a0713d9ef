//! Per-component delta encoding against one or three baselines.
//!
//! A changed component is written as:
//!
//! - a field mask (one bit per field), omitted for single-field components
//! - for each changed field, its value relative to a prediction:
//!   `Bool` fields as one raw bit, `UInt` fields as a wrapping packed delta,
//!   `Int` and `Float` fields as a signed packed delta
//!
//! With one baseline the prediction is the baseline value itself. With three
//! baselines it is the [`DeltaPredictor`] extrapolation. Change masks are
//! always computed against the newest baseline, which is also what unchanged
//! fields are restored from.

use bitstream::{BitReader, BitResult, BitWriter, CompressionModel};
use schema::FieldCodec;

use crate::layout::{ComponentLayout, ComponentStorage, FIELD_BYTES};
use crate::predictor::DeltaPredictor;
use crate::snapshot::{SnapshotSlot, SnapshotSlotMut};
use crate::types::SnapshotTick;

/// The baselines one entity is encoded against.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DeltaBaselines<'a> {
    Single(SnapshotSlot<'a>),
    Three([SnapshotSlot<'a>; 3], DeltaPredictor),
}

impl<'a> DeltaBaselines<'a> {
    pub(crate) fn three(tick: SnapshotTick, baselines: [SnapshotSlot<'a>; 3]) -> Self {
        let predictor = DeltaPredictor::new(
            tick,
            baselines[0].tick(),
            baselines[1].tick(),
            baselines[2].tick(),
        );
        Self::Three(baselines, predictor)
    }

    pub(crate) const fn primary(&self) -> SnapshotSlot<'a> {
        match self {
            Self::Single(baseline) | Self::Three([baseline, _, _], _) => *baseline,
        }
    }

    fn predict(&self, codec: FieldCodec, offset: usize) -> u32 {
        match self {
            Self::Single(baseline) => baseline.word(offset),
            Self::Three([b0, b1, b2], predictor) => match codec {
                FieldCodec::UInt => {
                    predictor.predict_uint(b0.word(offset), b1.word(offset), b2.word(offset))
                }
                FieldCodec::Int | FieldCodec::Float { .. } => predictor.predict_int(
                    b0.word(offset) as i32,
                    b1.word(offset) as i32,
                    b2.word(offset) as i32,
                ) as u32,
                FieldCodec::Bool => b0.word(offset),
            },
        }
    }
}

/// Byte offset and first change-mask bit of a serialized component.
const fn placement(layout: &ComponentLayout) -> Option<(usize, usize)> {
    match layout.storage {
        ComponentStorage::Snapshot {
            offset,
            change_mask_bit,
            ..
        } => Some((offset, change_mask_bit)),
        ComponentStorage::Backup { .. } => None,
    }
}

/// Recomputes the change-mask bits of one component against `baseline` and
/// returns `true` if any field differs.
pub fn update_change_mask(
    layout: &ComponentLayout,
    current: &mut SnapshotSlotMut<'_>,
    baseline: SnapshotSlot<'_>,
) -> bool {
    let Some((offset, change_mask_bit)) = placement(layout) else {
        return false;
    };
    let mut any = false;
    for i in 0..layout.field_count() {
        let field_offset = offset + i * FIELD_BYTES;
        let changed = current.word(field_offset) != baseline.word(field_offset);
        current.set_change_bit(change_mask_bit + i, changed);
        any |= changed;
    }
    any
}

/// Clears the change-mask bits of one component.
pub(crate) fn clear_change_mask(layout: &ComponentLayout, slot: &mut SnapshotSlotMut<'_>) {
    if let Some((_, change_mask_bit)) = placement(layout) {
        for i in 0..layout.field_count() {
            slot.set_change_bit(change_mask_bit + i, false);
        }
    }
}

/// Copies a component's payload from `baseline` and marks it unchanged.
pub(crate) fn copy_component_from_baseline(
    layout: &ComponentLayout,
    out: &mut SnapshotSlotMut<'_>,
    baseline: SnapshotSlot<'_>,
) {
    if let Some((offset, _)) = placement(layout) {
        for i in 0..layout.field_count() {
            let field_offset = offset + i * FIELD_BYTES;
            out.set_word(field_offset, baseline.word(field_offset));
        }
    }
    clear_change_mask(layout, out);
}

pub(crate) fn write_component(
    layout: &ComponentLayout,
    current: SnapshotSlot<'_>,
    baselines: &DeltaBaselines<'_>,
    writer: &mut BitWriter,
    model: &CompressionModel,
) -> usize {
    let Some((offset, change_mask_bit)) = placement(layout) else {
        return 0;
    };
    let start = writer.length_in_bits();
    let fields = layout.field_count();
    if fields > 1 {
        for i in 0..fields {
            writer.write_bool(current.change_bit(change_mask_bit + i));
        }
    }
    for (i, &codec) in layout.codecs.iter().enumerate() {
        if fields > 1 && !current.change_bit(change_mask_bit + i) {
            continue;
        }
        let field_offset = offset + i * FIELD_BYTES;
        let value = current.word(field_offset);
        match codec {
            FieldCodec::Bool => writer.write_raw_bits(value, 1),
            FieldCodec::UInt => {
                let predicted = baselines.predict(codec, field_offset);
                writer.write_packed_uint_delta(value, predicted, model);
            }
            FieldCodec::Int | FieldCodec::Float { .. } => {
                let predicted = baselines.predict(codec, field_offset);
                writer.write_packed_int_delta(value as i32, predicted as i32, model);
            }
        }
    }
    writer.length_in_bits() - start
}

pub(crate) fn read_component(
    layout: &ComponentLayout,
    out: &mut SnapshotSlotMut<'_>,
    baselines: &DeltaBaselines<'_>,
    reader: &mut BitReader<'_>,
    model: &CompressionModel,
) -> BitResult<()> {
    let Some((offset, change_mask_bit)) = placement(layout) else {
        return Ok(());
    };
    let fields = layout.field_count();
    for i in 0..fields {
        let changed = if fields > 1 { reader.read_bool()? } else { true };
        out.set_change_bit(change_mask_bit + i, changed);
    }
    let primary = baselines.primary();
    for (i, &codec) in layout.codecs.iter().enumerate() {
        let field_offset = offset + i * FIELD_BYTES;
        let value = if out.as_slot().change_bit(change_mask_bit + i) {
            match codec {
                FieldCodec::Bool => reader.read_raw_bits(1)?,
                FieldCodec::UInt => {
                    let predicted = baselines.predict(codec, field_offset);
                    reader.read_packed_uint_delta(predicted, model)?
                }
                FieldCodec::Int | FieldCodec::Float { .. } => {
                    let predicted = baselines.predict(codec, field_offset) as i32;
                    reader.read_packed_int_delta(predicted, model)? as u32
                }
            }
        } else {
            primary.word(field_offset)
        };
        out.set_word(field_offset, value);
    }
    Ok(())
}

/// Writes the payload of a changed component relative to one baseline.
///
/// The component's change mask in `current` must already be up to date
/// (see [`update_change_mask`]). Returns the number of bits written.
pub fn serialize_component_single_baseline(
    layout: &ComponentLayout,
    current: SnapshotSlot<'_>,
    baseline: SnapshotSlot<'_>,
    writer: &mut BitWriter,
    model: &CompressionModel,
) -> usize {
    write_component(
        layout,
        current,
        &DeltaBaselines::Single(baseline),
        writer,
        model,
    )
}

/// Writes the payload of a changed component relative to the prediction
/// from three baselines, newest first.
///
/// The change mask must be computed against `baselines[0]`. Returns the
/// number of bits written.
pub fn serialize_component_three_baseline(
    layout: &ComponentLayout,
    current: SnapshotSlot<'_>,
    baselines: [SnapshotSlot<'_>; 3],
    predictor: &DeltaPredictor,
    writer: &mut BitWriter,
    model: &CompressionModel,
) -> usize {
    write_component(
        layout,
        current,
        &DeltaBaselines::Three(baselines, *predictor),
        writer,
        model,
    )
}

/// Reads a payload written by [`serialize_component_single_baseline`] into
/// `out`, restoring unchanged fields from `baseline`.
pub fn deserialize_component_single_baseline(
    layout: &ComponentLayout,
    out: &mut SnapshotSlotMut<'_>,
    baseline: SnapshotSlot<'_>,
    reader: &mut BitReader<'_>,
    model: &CompressionModel,
) -> BitResult<()> {
    read_component(layout, out, &DeltaBaselines::Single(baseline), reader, model)
}

/// Reads a payload written by [`serialize_component_three_baseline`].
pub fn deserialize_component_three_baseline(
    layout: &ComponentLayout,
    out: &mut SnapshotSlotMut<'_>,
    baselines: [SnapshotSlot<'_>; 3],
    predictor: &DeltaPredictor,
    reader: &mut BitReader<'_>,
    model: &CompressionModel,
) -> BitResult<()> {
    read_component(
        layout,
        out,
        &DeltaBaselines::Three(baselines, *predictor),
        reader,
        model,
    )
}

//! Deterministic schema hashing.

use blake3::Hasher;

use crate::{ComponentDef, FieldCodec, GhostMode, GhostTypeDef, Schema};

/// Computes a deterministic hash of everything that affects the wire format.
///
/// Names are included so that two peers with the same layout but different
/// component meanings do not silently agree.
#[must_use]
pub fn schema_hash(schema: &Schema) -> u64 {
    let mut hasher = Hasher::new();
    write_u32(&mut hasher, schema.components.len() as u32);
    for component in &schema.components {
        write_component(&mut hasher, component);
    }

    write_u32(&mut hasher, schema.ghost_types.len() as u32);
    for ghost in &schema.ghost_types {
        write_ghost_type(&mut hasher, ghost);
    }

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn write_component(hasher: &mut Hasher, component: &ComponentDef) {
    write_u16(hasher, component.id.get());
    write_str(hasher, &component.name);
    write_u8(hasher, u8::from(component.enableable));
    write_u8(hasher, u8::from(component.client_only));
    write_u8(hasher, component.send_mask.bits());
    write_u8(hasher, component.send_to_owner.bits());
    write_u32(hasher, component.fields.len() as u32);
    for field in &component.fields {
        write_str(hasher, &field.name);
        write_codec(hasher, field.codec);
    }
}

fn write_ghost_type(hasher: &mut Hasher, ghost: &GhostTypeDef) {
    write_u32(hasher, ghost.id.get());
    write_str(hasher, &ghost.name);
    write_u8(
        hasher,
        match ghost.mode {
            GhostMode::Interpolated => 0,
            GhostMode::Predicted => 1,
            GhostMode::OwnerPredicted => 2,
        },
    );
    write_u32(hasher, ghost.components.len() as u32);
    for slot in &ghost.components {
        write_u16(hasher, slot.component.get());
        write_u16(hasher, slot.entity_index);
    }
    match ghost.prediction_owner {
        Some(owner) => {
            write_u8(hasher, 1);
            write_u16(hasher, owner.component.get());
            write_u16(hasher, owner.field);
        }
        None => write_u8(hasher, 0),
    }
}

fn write_codec(hasher: &mut Hasher, codec: FieldCodec) {
    match codec {
        FieldCodec::Bool => write_u8(hasher, 0),
        FieldCodec::Int => write_u8(hasher, 1),
        FieldCodec::UInt => write_u8(hasher, 2),
        FieldCodec::Float { quantization } => {
            write_u8(hasher, 3);
            write_u32(hasher, quantization);
        }
    }
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u16(hasher: &mut Hasher, value: u16) {
    hasher.update(&value.to_le_bytes());
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}

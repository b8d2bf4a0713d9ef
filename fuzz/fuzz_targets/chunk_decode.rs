#![no_main]

use std::sync::Arc;

use bitstream::{BitReader, CompressionModel};
use codec::{
    ChunkScratch, ChunkSerializer, CodecLimits, EntityBaselines, PrefabMetadataCache,
    SnapshotBuffer, SnapshotTick,
};
use libfuzzer_sys::fuzz_target;
use schema::{
    ComponentDef, ComponentId, FieldCodec, FieldDef, GhostMode, GhostTypeDef, GhostTypeId, Schema,
    SendToOwner,
};

const GHOST: GhostTypeId = GhostTypeId::new(1);
const ENTITIES: usize = 4;

fn cache() -> Option<PrefabMetadataCache> {
    let owner = ComponentDef::new(ComponentId::new(1), "Owner")
        .field(FieldDef::new("id", FieldCodec::int()));
    let body = ComponentDef::new(ComponentId::new(2), "Body")
        .field(FieldDef::new("x", FieldCodec::float(100)))
        .field(FieldDef::new("heading", FieldCodec::uint()))
        .field(FieldDef::new("airborne", FieldCodec::bool()));
    let shield = ComponentDef::new(ComponentId::new(3), "Shield")
        .enableable()
        .send_to_owner(SendToOwner::OWNER)
        .field(FieldDef::new("strength", FieldCodec::int()));
    let ghost = GhostTypeDef::new(GHOST, "Drone", GhostMode::OwnerPredicted)
        .root(ComponentId::new(1))
        .root(ComponentId::new(2))
        .child(1, ComponentId::new(3))
        .owner(ComponentId::new(1), 0);
    let schema = Schema::new(vec![owner, body, shield], vec![ghost]).ok()?;
    let mut cache = PrefabMetadataCache::new(Arc::new(schema), CodecLimits::for_testing());
    cache.get_or_compute(GHOST).ok()?;
    Some(cache)
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let Some(cache) = cache() else {
        return;
    };
    let model = CompressionModel::default();
    let Ok(serializer) = ChunkSerializer::new(&cache, GHOST, &model) else {
        return;
    };

    // Baselines filled from the payload: any bytes are valid baseline state.
    let mut history = SnapshotBuffer::for_metadata(serializer.metadata(), ENTITIES * 3);
    if !payload.is_empty() {
        for slot in 0..ENTITIES * 3 {
            for (j, byte) in history.slot_mut(slot).as_bytes_mut().iter_mut().enumerate() {
                *byte = payload[(slot * 31 + j) % payload.len()];
            }
        }
    }

    let baselines: Vec<_> = (0..ENTITIES)
        .map(|i| match (selector >> (2 * i)) & 3 {
            0 => EntityBaselines::Irrelevant,
            1 => EntityBaselines::None,
            2 => EntityBaselines::Single(history.slot(i)),
            _ => EntityBaselines::Three([
                history.slot(i),
                history.slot(ENTITIES + i),
                history.slot(2 * ENTITIES + i),
            ]),
        })
        .collect();

    let mut out = SnapshotBuffer::for_metadata(serializer.metadata(), ENTITIES);
    let mut scratch = ChunkScratch::new();
    let _ = serializer.deserialize_chunk(
        &|i: usize| i % 2 == 0,
        SnapshotTick::new(u32::from(selector)),
        &baselines,
        0..ENTITIES,
        &mut BitReader::new(payload),
        &mut out,
        &mut scratch,
    );
});

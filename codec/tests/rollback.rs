use std::sync::Arc;

use bitstream::{BitReader, BitWriter, CompressionModel};
use codec::{
    copy_components_to_snapshot, ChunkScratch, ChunkSerializer, CodecLimits, ComponentData,
    EntityBaselines, FieldValue, GhostEntity, PrefabMetadataCache, Recipient, SnapshotBuffer,
    SnapshotTick,
};
use schema::{ComponentDef, ComponentId, FieldCodec, FieldDef, GhostMode, GhostTypeDef, GhostTypeId, Schema};

const GHOST: GhostTypeId = GhostTypeId::new(3);

fn cache() -> PrefabMetadataCache {
    let position = ComponentDef::new(ComponentId::new(1), "Position")
        .field(FieldDef::new("x", FieldCodec::int()))
        .field(FieldDef::new("y", FieldCodec::int()));
    let ghost = GhostTypeDef::new(GHOST, "Projectile", GhostMode::Interpolated)
        .root(ComponentId::new(1));
    let schema = Schema::new(vec![position], vec![ghost]).unwrap();
    let mut cache = PrefabMetadataCache::new(Arc::new(schema), CodecLimits::for_testing());
    cache.get_or_compute(GHOST).unwrap();
    cache
}

fn projectiles(cache: &PrefabMetadataCache, count: usize) -> SnapshotBuffer {
    let meta = cache.get(GHOST).unwrap();
    let mut buffer = SnapshotBuffer::for_metadata(meta, count);
    for i in 0..count {
        let v = 1_000 * (i as i32 + 1);
        let entity = GhostEntity::new(
            GHOST,
            vec![ComponentData::new(vec![
                FieldValue::Int(v),
                FieldValue::Int(-v),
            ])],
        );
        copy_components_to_snapshot(
            meta,
            cache.components(meta),
            &entity,
            SnapshotTick::new(1),
            &mut buffer.slot_mut(i),
        )
        .unwrap();
    }
    buffer
}

#[test]
fn overflow_rolls_back_to_last_complete_entity() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, GHOST, &model).unwrap();
    let mut scratch = ChunkScratch::new();
    let baselines = [EntityBaselines::None; 6];

    // Every record here takes exactly two 32-bit words.
    let mut unbounded = BitWriter::new();
    let full = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut projectiles(&cache, 6),
            &baselines,
            0..6,
            &mut unbounded,
            &mut scratch,
        )
        .unwrap();
    assert!(full.entities.iter().all(|e| e.length_bits == 64));

    // Room for two and a half records.
    let mut writer = BitWriter::with_capacity(20);
    let mut current = projectiles(&cache, 6);
    let partial = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut current,
            &baselines,
            0..6,
            &mut writer,
            &mut scratch,
        )
        .unwrap();
    assert!(!partial.complete);
    assert_eq!(partial.last_serialized_entity, Some(1));
    assert_eq!(partial.resume_index(&(0..6)), 2);
    assert_eq!(partial.entities.len(), 2);
    assert!(partial.components.iter().all(|c| c.entity_index < 2));
    let position = &serializer.components()[0];
    assert!(current.slot(1).component_changed(position));
    assert!(!current.slot(2).component_changed(position));
    assert!(!current.slot(2).change_bit(0));

    // Bit-identical to a stream that stopped before the failed entity.
    let mut expected = BitWriter::with_capacity(20);
    serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut projectiles(&cache, 6),
            &baselines,
            0..2,
            &mut expected,
            &mut scratch,
        )
        .unwrap();
    assert!(!writer.has_failed_writes());
    assert_eq!(writer, expected);
    assert_eq!(writer.as_bytes(), &unbounded.as_bytes()[..16]);
}

#[test]
fn resumed_chunks_decode_to_the_same_slots() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, GHOST, &model).unwrap();
    let mut scratch = ChunkScratch::new();
    let baselines = [EntityBaselines::None; 5];
    let mut current = projectiles(&cache, 5);

    let mut packets = Vec::new();
    let mut start = 0;
    while start < 5 {
        let mut writer = BitWriter::with_capacity(16);
        let range = start..5;
        let result = serializer
            .serialize_chunk(
                Recipient::new(0),
                &mut current,
                &baselines,
                range.clone(),
                &mut writer,
                &mut scratch,
            )
            .unwrap();
        packets.push((range.clone(), result.resume_index(&range), writer.finish()));
        start = result.resume_index(&range);
    }
    assert_eq!(packets.len(), 3);

    let mut out = SnapshotBuffer::for_metadata(serializer.metadata(), 5);
    for (range, end, bytes) in &packets {
        serializer
            .deserialize_chunk(
                &|_: usize| false,
                SnapshotTick::new(1),
                &baselines,
                range.start..*end,
                &mut BitReader::new(bytes),
                &mut out,
                &mut scratch,
            )
            .unwrap();
    }
    assert_eq!(out, current);
}

#[test]
fn irrelevant_entities_are_skipped_when_resuming() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, GHOST, &model).unwrap();
    let mut scratch = ChunkScratch::new();
    let baselines = [
        EntityBaselines::None,
        EntityBaselines::Irrelevant,
        EntityBaselines::None,
    ];

    let mut writer = BitWriter::with_capacity(8);
    let result = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut projectiles(&cache, 3),
            &baselines,
            0..3,
            &mut writer,
            &mut scratch,
        )
        .unwrap();
    assert_eq!(result.last_serialized_entity, Some(1));
    assert_eq!(result.entities.len(), 1);
    assert_eq!(writer.length_in_bits(), 64);
}

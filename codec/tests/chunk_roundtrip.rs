use std::sync::Arc;

use bitstream::{BitReader, BitWriter, CompressionModel};
use codec::{
    apply_snapshot_to_entity, copy_components_to_snapshot, ChunkScratch, ChunkSerializer,
    CodecLimits, ComponentData, EntityBaselines, FieldValue, GhostEntity, PrefabMetadataCache,
    Recipient, SerializationStats, SnapshotBuffer, SnapshotTick,
};
use schema::{
    ComponentDef, ComponentId, FieldCodec, FieldDef, GhostMode, GhostTypeDef, GhostTypeId, Schema,
    SendMask, SendToOwner,
};

const TRIPLE: GhostTypeId = GhostTypeId::new(1);
const PLAYER: GhostTypeId = GhostTypeId::new(2);

fn schema() -> Arc<Schema> {
    let mut components: Vec<ComponentDef> = (1..=3)
        .map(|id| {
            ComponentDef::new(ComponentId::new(id), format!("Value{id}"))
                .field(FieldDef::new("v", FieldCodec::int()))
        })
        .collect();
    components.push(
        ComponentDef::new(ComponentId::new(10), "GhostOwner")
            .field(FieldDef::new("network_id", FieldCodec::int())),
    );
    components.push(
        ComponentDef::new(ComponentId::new(11), "Transform")
            .field(FieldDef::new("x", FieldCodec::float(1000)))
            .field(FieldDef::new("y", FieldCodec::float(1000)))
            .field(FieldDef::new("grounded", FieldCodec::bool())),
    );
    components.push(
        ComponentDef::new(ComponentId::new(12), "Ammo")
            .enableable()
            .send_to_owner(SendToOwner::OWNER)
            .field(FieldDef::new("count", FieldCodec::uint())),
    );
    components.push(
        ComponentDef::new(ComponentId::new(13), "Smoothing")
            .send_mask(SendMask::INTERPOLATED)
            .field(FieldDef::new("alpha", FieldCodec::uint())),
    );

    let triple = GhostTypeDef::new(TRIPLE, "Triple", GhostMode::Interpolated)
        .root(ComponentId::new(1))
        .root(ComponentId::new(2))
        .root(ComponentId::new(3));
    let player = GhostTypeDef::new(PLAYER, "Player", GhostMode::OwnerPredicted)
        .root(ComponentId::new(10))
        .root(ComponentId::new(11))
        .root(ComponentId::new(13))
        .child(1, ComponentId::new(12))
        .owner(ComponentId::new(10), 0);
    Arc::new(Schema::new(components, vec![triple, player]).unwrap())
}

fn cache() -> PrefabMetadataCache {
    let mut cache = PrefabMetadataCache::new(schema(), CodecLimits::for_testing());
    cache.get_or_compute(TRIPLE).unwrap();
    cache.get_or_compute(PLAYER).unwrap();
    cache
}

fn triple(a: i32, b: i32, c: i32) -> GhostEntity {
    GhostEntity::new(
        TRIPLE,
        [a, b, c]
            .into_iter()
            .map(|v| ComponentData::new(vec![FieldValue::Int(v)]))
            .collect(),
    )
}

fn player(owner: i32, x: f32, ammo: u32, alpha: u32) -> GhostEntity {
    GhostEntity::new(
        PLAYER,
        vec![
            ComponentData::new(vec![FieldValue::Int(owner)]),
            ComponentData::new(vec![
                FieldValue::Float(x),
                FieldValue::Float(-x),
                FieldValue::Bool(true),
            ]),
            ComponentData::new(vec![FieldValue::UInt(alpha)]),
            ComponentData::new(vec![FieldValue::UInt(ammo)]),
        ],
    )
}

fn capture(
    cache: &PrefabMetadataCache,
    ghost_type: GhostTypeId,
    entities: &[GhostEntity],
    tick: u32,
) -> SnapshotBuffer {
    let meta = cache.get(ghost_type).unwrap();
    let mut buffer = SnapshotBuffer::for_metadata(meta, entities.len());
    for (i, entity) in entities.iter().enumerate() {
        copy_components_to_snapshot(
            meta,
            cache.components(meta),
            entity,
            SnapshotTick::new(tick),
            &mut buffer.slot_mut(i),
        )
        .unwrap();
    }
    buffer
}

#[test]
fn zero_baseline_roundtrip_restores_values() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, TRIPLE, &model).unwrap();
    let mut scratch = ChunkScratch::new();

    let mut current = capture(&cache, TRIPLE, &[triple(5, 10, 15)], 1);
    let baselines = [EntityBaselines::None];
    let mut writer = BitWriter::new();
    let result = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut current,
            &baselines,
            0..1,
            &mut writer,
            &mut scratch,
        )
        .unwrap();
    assert!(result.complete);
    assert_eq!(result.last_serialized_entity, Some(0));
    assert!(result.components.iter().all(|c| c.length_bits > 0));

    let bytes = writer.finish();
    let mut out = SnapshotBuffer::for_metadata(serializer.metadata(), 1);
    serializer
        .deserialize_chunk(
            &|_: usize| false,
            SnapshotTick::new(1),
            &baselines,
            0..1,
            &mut BitReader::new(&bytes),
            &mut out,
            &mut scratch,
        )
        .unwrap();

    let mut decoded = triple(0, 0, 0);
    apply_snapshot_to_entity(
        serializer.metadata(),
        serializer.components(),
        out.slot(0),
        &mut decoded,
    )
    .unwrap();
    assert_eq!(decoded, triple(5, 10, 15));
}

#[test]
fn identical_baseline_costs_one_bit_per_component() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, TRIPLE, &model).unwrap();
    let mut scratch = ChunkScratch::new();

    let baseline = capture(&cache, TRIPLE, &[triple(5, 10, 15)], 1);
    let mut current = capture(&cache, TRIPLE, &[triple(5, 10, 15)], 2);
    let baselines = [EntityBaselines::Single(baseline.slot(0))];
    let mut writer = BitWriter::new();
    let result = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut current,
            &baselines,
            0..1,
            &mut writer,
            &mut scratch,
        )
        .unwrap();

    assert_eq!(result.components.len(), 3);
    assert!(result.components.iter().all(|c| c.length_bits == 0));
    assert_eq!(result.components[0].start_bit, 3);
    assert!(!current.slot(0).change_bit(0));
    // Three unchanged bits, padded to the record alignment.
    assert_eq!(result.entities[0].length_bits, 32);
    assert_eq!(writer.as_bytes(), &[0, 0, 0, 0]);

    let bytes = writer.finish();
    let mut out = SnapshotBuffer::for_metadata(serializer.metadata(), 1);
    serializer
        .deserialize_chunk(
            &|_: usize| false,
            SnapshotTick::new(2),
            &baselines,
            0..1,
            &mut BitReader::new(&bytes),
            &mut out,
            &mut scratch,
        )
        .unwrap();
    assert_eq!(out.slot(0), current.slot(0));
}

#[test]
fn three_baselines_predict_linear_motion() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, TRIPLE, &model).unwrap();
    let mut scratch = ChunkScratch::new();

    let b2 = capture(&cache, TRIPLE, &[triple(0, 100, 7)], 10);
    let b1 = capture(&cache, TRIPLE, &[triple(10, 90, 7)], 11);
    let b0 = capture(&cache, TRIPLE, &[triple(20, 80, 7)], 12);
    let mut current = capture(&cache, TRIPLE, &[triple(30, 70, 7)], 13);
    let baselines = [EntityBaselines::Three([b0.slot(0), b1.slot(0), b2.slot(0)])];

    let mut writer = BitWriter::new();
    let result = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut current,
            &baselines,
            0..1,
            &mut writer,
            &mut scratch,
        )
        .unwrap();
    // Perfect predictions cost a two-bit zero code each; the constant is unchanged.
    let lengths: Vec<_> = result.components.iter().map(|c| c.length_bits).collect();
    assert_eq!(lengths, vec![2, 2, 0]);

    let bytes = writer.finish();
    let mut out = SnapshotBuffer::for_metadata(serializer.metadata(), 1);
    serializer
        .deserialize_chunk(
            &|_: usize| false,
            SnapshotTick::new(13),
            &baselines,
            0..1,
            &mut BitReader::new(&bytes),
            &mut out,
            &mut scratch,
        )
        .unwrap();
    assert_eq!(out.slot(0), current.slot(0));
}

#[test]
fn send_rules_depend_on_ownership() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, PLAYER, &model).unwrap();
    let mut scratch = ChunkScratch::new();

    let entities = [player(7, 1.5, 30, 4), player(3, -2.25, 12, 9)];
    let mut current = capture(&cache, PLAYER, &entities, 5);
    let baselines = [EntityBaselines::None, EntityBaselines::None];
    let mut writer = BitWriter::new();
    let result = serializer
        .serialize_chunk(
            Recipient::new(7),
            &mut current,
            &baselines,
            0..2,
            &mut writer,
            &mut scratch,
        )
        .unwrap();

    // Owner predicts: owner id, transform, ammo. Non-owner interpolates: owner
    // id, transform, smoothing.
    let sent: Vec<_> = result
        .components
        .iter()
        .map(|c| (c.entity_index, c.component_index))
        .collect();
    assert_eq!(sent, vec![(0, 0), (0, 1), (0, 3), (1, 0), (1, 1), (1, 2)]);

    let bytes = writer.finish();
    let mut out = SnapshotBuffer::for_metadata(serializer.metadata(), 2);
    serializer
        .deserialize_chunk(
            &|index: usize| index == 0,
            SnapshotTick::new(5),
            &baselines,
            0..2,
            &mut BitReader::new(&bytes),
            &mut out,
            &mut scratch,
        )
        .unwrap();

    let mut owned = player(0, 0.0, 0, 0);
    apply_snapshot_to_entity(
        serializer.metadata(),
        serializer.components(),
        out.slot(0),
        &mut owned,
    )
    .unwrap();
    assert_eq!(owned.components[0].fields[0], FieldValue::Int(7));
    assert_eq!(owned.components[1].fields[0], FieldValue::Float(1.5));
    assert_eq!(owned.components[3].fields[0], FieldValue::UInt(30));
    // Not sent to predicting clients; carried over from the zero baseline.
    assert_eq!(owned.components[2].fields[0], FieldValue::UInt(0));

    let mut other = player(0, 0.0, 0, 0);
    apply_snapshot_to_entity(
        serializer.metadata(),
        serializer.components(),
        out.slot(1),
        &mut other,
    )
    .unwrap();
    assert_eq!(other.components[1].fields[1], FieldValue::Float(2.25));
    assert_eq!(other.components[2].fields[0], FieldValue::UInt(9));
    assert_eq!(other.components[3].fields[0], FieldValue::UInt(0));
    assert!(!other.components[3].enabled);
}

#[test]
fn stats_track_every_chunk() {
    let cache = cache();
    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, TRIPLE, &model).unwrap();
    let mut scratch = ChunkScratch::new();
    let mut stats = SerializationStats::new(serializer.metadata().component_count());

    let baseline = capture(&cache, TRIPLE, &[triple(1, 2, 3), triple(1, 2, 3)], 1);
    let mut current = capture(&cache, TRIPLE, &[triple(1, 2, 4), triple(1, 2, 3)], 2);
    let baselines = [
        EntityBaselines::Single(baseline.slot(0)),
        EntityBaselines::Single(baseline.slot(1)),
    ];
    let mut writer = BitWriter::new();
    let result = serializer
        .serialize_chunk(
            Recipient::new(0),
            &mut current,
            &baselines,
            0..2,
            &mut writer,
            &mut scratch,
        )
        .unwrap();
    stats.record(&result);

    assert_eq!(stats.entities, 2);
    assert_eq!(stats.entity_bits, 64);
    assert_eq!(stats.components[2].samples, 2);
    assert_eq!(stats.components[2].changed, 1);
    assert_eq!(stats.components[0].changed, 0);
}

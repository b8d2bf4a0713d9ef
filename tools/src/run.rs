//! Encodes a scenario tick by tick, decodes it back and reports sizes.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use bitstream::{BitReader, BitWriter, CompressionModel};
use codec::{
    copy_components_to_snapshot, ChunkScratch, ChunkSerializer, CodecLimits, ComponentLayout,
    ComponentStorage, EntityBaselines, PrefabMetadata, PrefabMetadataCache, Recipient,
    SerializationStats, SnapshotBuffer, SnapshotSlot, SnapshotTick,
};
use schema::{GhostMode, Schema};
use serde::Serialize;
use tracing::{debug, info};

use crate::scenario::Scenario;

/// How a scenario is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Packet size in bytes; `None` writes every tick into one unbounded
    /// packet.
    pub packet_capacity: Option<usize>,
    pub limits: CodecLimits,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            packet_capacity: None,
            limits: CodecLimits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub ghost_type: u32,
    pub ticks: Vec<TickReport>,
    pub components: Vec<ComponentReport>,
    pub total_bits: usize,
    pub mean_entity_bits: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u32,
    /// Baselines used, per entity (0, 1 or 3).
    pub baselines: Vec<usize>,
    pub packets: Vec<PacketReport>,
    pub entities: Vec<EntityReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketReport {
    pub first_entity: usize,
    pub end_entity: usize,
    pub bits: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub index: usize,
    pub bits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub index: usize,
    pub entity_index: u16,
    pub name: String,
    pub samples: usize,
    pub changed: usize,
    pub payload_bits: usize,
}

/// Runs `scenario` and verifies that every tick decodes to the encoded
/// snapshot.
pub fn run_scenario(
    schema: Arc<Schema>,
    scenario: &Scenario,
    options: RunOptions,
) -> Result<RunReport> {
    ensure!(
        matches!(scenario.baselines, 0 | 1 | 3),
        "baselines must be 0, 1 or 3, got {}",
        scenario.baselines
    );
    let mut cache = PrefabMetadataCache::new(schema, options.limits);
    cache
        .get_or_compute(scenario.ghost_type)
        .with_context(|| format!("layout ghost type {}", scenario.ghost_type.get()))?;

    let model = CompressionModel::default();
    let serializer = ChunkSerializer::new(&cache, scenario.ghost_type, &model)?;
    let metadata = serializer.metadata();
    let mut scratch = ChunkScratch::new();
    let mut stats = SerializationStats::new(metadata.component_count());
    let recipient = Recipient::new(scenario.recipient);

    // Most recent first.
    let mut history: Vec<SnapshotBuffer> = Vec::with_capacity(3);
    let mut ticks = Vec::with_capacity(scenario.ticks.len());

    for step in &scenario.ticks {
        let tick = SnapshotTick::new(step.tick);
        let ghosts = step.ghosts(scenario.ghost_type);
        let mut current = SnapshotBuffer::for_metadata(metadata, ghosts.len());
        for (i, ghost) in ghosts.iter().enumerate() {
            copy_components_to_snapshot(
                metadata,
                serializer.components(),
                ghost,
                tick,
                &mut current.slot_mut(i),
            )
            .with_context(|| format!("capture tick {} entity {i}", step.tick))?;
        }

        let baselines: Vec<EntityBaselines<'_>> = (0..ghosts.len())
            .map(|i| select_baselines(&history, scenario.baselines, i))
            .collect();
        let range = 0..ghosts.len();

        let mut decoded = SnapshotBuffer::for_metadata(metadata, ghosts.len());
        let mut packets = Vec::new();
        let mut entities = Vec::new();
        let mut start = range.start;
        while start < range.end {
            let mut writer = options
                .packet_capacity
                .map_or_else(BitWriter::new, BitWriter::with_capacity);
            let result = serializer
                .serialize_chunk(
                    recipient,
                    &mut current,
                    &baselines,
                    start..range.end,
                    &mut writer,
                    &mut scratch,
                )
                .with_context(|| format!("serialize tick {}", step.tick))?;
            let end = result.resume_index(&(start..range.end));
            stats.record(&result);
            entities.extend(result.entities.iter().map(|e| EntityReport {
                index: e.entity_index,
                bits: e.length_bits,
            }));

            let bits = writer.length_in_bits();
            let bytes = writer.finish();
            let owns = |i: usize| is_owned(metadata, current.slot(i), scenario.recipient);
            serializer
                .deserialize_chunk(
                    &owns,
                    tick,
                    &baselines,
                    start..end,
                    &mut BitReader::new(&bytes),
                    &mut decoded,
                    &mut scratch,
                )
                .with_context(|| {
                    format!("deserialize tick {} entities {start}..{end}", step.tick)
                })?;
            debug!(tick = step.tick, start, end, bits, "packet round-tripped");
            packets.push(PacketReport {
                first_entity: start,
                end_entity: end,
                bits,
                bytes: bytes.len(),
            });
            start = end;
        }

        for (i, baseline) in baselines.iter().enumerate() {
            if !baseline.is_relevant() {
                continue;
            }
            if let Some(component) = first_mismatch(
                metadata,
                serializer.components(),
                is_owned(metadata, current.slot(i), scenario.recipient),
                decoded.slot(i),
                current.slot(i),
            ) {
                bail!(
                    "tick {} entity {i} component {component} did not survive the round trip",
                    step.tick
                );
            }
        }

        ticks.push(TickReport {
            tick: step.tick,
            baselines: baselines.iter().map(EntityBaselines::count).collect(),
            packets,
            entities,
        });
        history.insert(0, current);
        history.truncate(3);
    }

    let components = serializer
        .components()
        .iter()
        .zip(&stats.components)
        .enumerate()
        .map(|(index, (layout, totals))| ComponentReport {
            index,
            entity_index: layout.entity_index,
            name: cache
                .schema()
                .component(layout.component)
                .map_or_else(|| format!("#{}", layout.component.get()), |c| c.name.clone()),
            samples: totals.samples,
            changed: totals.changed,
            payload_bits: totals.payload_bits,
        })
        .collect();

    info!(
        ticks = ticks.len(),
        entities = stats.entities,
        bits = stats.entity_bits,
        "scenario complete"
    );
    Ok(RunReport {
        ghost_type: scenario.ghost_type.get(),
        ticks,
        components,
        total_bits: stats.entity_bits,
        mean_entity_bits: stats.mean_entity_bits(),
    })
}

fn is_owned(metadata: &PrefabMetadata, slot: SnapshotSlot<'_>, network_id: i32) -> bool {
    metadata
        .prediction_owner_offset
        .is_some_and(|offset| slot.word(offset) as i32 == network_id)
}

/// Index of the first component sent to the recipient whose decoded state
/// differs from what was encoded.
fn first_mismatch(
    metadata: &PrefabMetadata,
    components: &[ComponentLayout],
    owner: bool,
    decoded: SnapshotSlot<'_>,
    encoded: SnapshotSlot<'_>,
) -> Option<usize> {
    let predicted = match metadata.mode {
        GhostMode::Interpolated => false,
        GhostMode::Predicted => true,
        GhostMode::OwnerPredicted => owner,
    };
    components.iter().position(|layout| {
        let ComponentStorage::Snapshot {
            offset, enable_bit, ..
        } = layout.storage
        else {
            return false;
        };
        if !layout.is_sent_to(predicted, owner) {
            return false;
        }
        let region = offset..offset + layout.size;
        decoded.as_bytes()[region.clone()] != encoded.as_bytes()[region]
            || enable_bit.is_some_and(|bit| {
                decoded.enable_bit(metadata, bit) != encoded.enable_bit(metadata, bit)
            })
    })
}

fn select_baselines<'a>(
    history: &'a [SnapshotBuffer],
    wanted: usize,
    entity: usize,
) -> EntityBaselines<'a> {
    let slots: Vec<_> = history.iter().map_while(|buffer| buffer.get(entity)).collect();
    match (wanted, slots.as_slice()) {
        (3, [b0, b1, b2, ..]) => EntityBaselines::Three([*b0, *b1, *b2]),
        (1 | 3, [b0, ..]) => EntityBaselines::Single(*b0),
        _ => EntityBaselines::None,
    }
}

/// Renders a report for terminals.
#[must_use]
pub fn format_report_pretty(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "ghost type {}: {} bits total, {:.1} bits per entity",
        report.ghost_type, report.total_bits, report.mean_entity_bits
    );
    for tick in &report.ticks {
        let bits: usize = tick.entities.iter().map(|e| e.bits).sum();
        let _ = writeln!(
            out,
            "tick {}: {} entities, {} packets, {bits} bits",
            tick.tick,
            tick.entities.len(),
            tick.packets.len()
        );
        for packet in &tick.packets {
            let _ = writeln!(
                out,
                "  packet {}..{}: {} bits ({} bytes)",
                packet.first_entity, packet.end_entity, packet.bits, packet.bytes
            );
        }
    }
    let _ = writeln!(out, "components:");
    for c in &report.components {
        let _ = writeln!(
            out,
            "  [{}] {} (entity {}): {}/{} changed, {} payload bits",
            c.index, c.name, c.entity_index, c.changed, c.samples, c.payload_bits
        );
    }
    out
}

//! Backup, restore and prune passes over predicted ghost chunks.
//!
//! Every predicted ghost owns its own [`BackupRing`], so chunks are processed
//! in parallel with no shared mutable state. Ghosts within a chunk are handled
//! in chunk order.

use codec::{
    copy_client_only_to_backup, restore_client_only_from_backup, ComponentLayout, GhostEntity,
    PrefabMetadata, PrefabMetadataCache, SnapshotTick,
};
use rayon::prelude::*;
use schema::GhostTypeId;
use tracing::{debug, error};

use crate::config::BackupConfig;
use crate::error::HistoryResult;
use crate::ring::BackupRing;

/// A predicted ghost and its client-only history.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedGhost {
    pub state: GhostEntity,
    history: Option<BackupRing>,
}

impl PredictedGhost {
    /// Wraps live ghost state; the history ring is created on first backup.
    #[must_use]
    pub fn new(state: GhostEntity) -> Self {
        Self {
            state,
            history: None,
        }
    }

    #[must_use]
    pub fn history(&self) -> Option<&BackupRing> {
        self.history.as_ref()
    }
}

/// Predicted ghosts of a single ghost type.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedChunk {
    ghost_type: GhostTypeId,
    ghosts: Vec<PredictedGhost>,
}

impl PredictedChunk {
    #[must_use]
    pub fn new(ghost_type: GhostTypeId) -> Self {
        Self {
            ghost_type,
            ghosts: Vec::new(),
        }
    }

    #[must_use]
    pub const fn ghost_type(&self) -> GhostTypeId {
        self.ghost_type
    }

    /// Appends a ghost and returns its chunk-local index.
    pub fn push(&mut self, state: GhostEntity) -> usize {
        self.ghosts.push(PredictedGhost::new(state));
        self.ghosts.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    #[must_use]
    pub fn ghosts(&self) -> &[PredictedGhost] {
        &self.ghosts
    }

    pub fn ghosts_mut(&mut self) -> &mut [PredictedGhost] {
        &mut self.ghosts
    }
}

/// Counters from one pass over a set of chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub chunks_processed: usize,
    /// Chunks whose ghost type had no metadata yet.
    pub chunks_skipped: usize,
    /// Ghosts backed up or restored.
    pub ghosts: usize,
    /// Ghosts left with live state because no backup covered the tick.
    pub fallbacks: usize,
    /// Backups dropped by pruning.
    pub removed: usize,
}

impl PassReport {
    const fn skipped() -> Self {
        Self {
            chunks_processed: 0,
            chunks_skipped: 1,
            ghosts: 0,
            fallbacks: 0,
            removed: 0,
        }
    }

    const fn processed() -> Self {
        Self {
            chunks_processed: 1,
            chunks_skipped: 0,
            ghosts: 0,
            fallbacks: 0,
            removed: 0,
        }
    }

    /// Adds the counters of `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            chunks_processed: self.chunks_processed + other.chunks_processed,
            chunks_skipped: self.chunks_skipped + other.chunks_skipped,
            ghosts: self.ghosts + other.ghosts,
            fallbacks: self.fallbacks + other.fallbacks,
            removed: self.removed + other.removed,
        }
    }
}

/// Saves and restores state that the server never sends.
///
/// Before the client re-simulates from an authoritative tick, client-only
/// components must be put back to what they were at that tick. `backup`
/// records them after each predicted tick, `restore` rewinds them, and
/// `prune` forgets ticks the server has acknowledged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientOnlyBackup {
    config: BackupConfig,
}

impl ClientOnlyBackup {
    #[must_use]
    pub const fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Records the client-only state of every ghost at `tick`.
    ///
    /// Backups at or after `tick` are replaced, so re-predicting after a
    /// restore overwrites the stale history from that tick on. A ghost whose
    /// state does not match its layout fails the pass and keeps its history.
    pub fn backup(
        &self,
        cache: &PrefabMetadataCache,
        chunks: &mut [PredictedChunk],
        tick: SnapshotTick,
    ) -> HistoryResult<PassReport> {
        chunks
            .par_iter_mut()
            .map(|chunk| self.backup_chunk(cache, chunk, tick))
            .try_reduce(PassReport::default, |a, b| Ok(a.merge(b)))
    }

    /// Rewinds client-only state to the newest backup at or before `tick`.
    ///
    /// Ghosts with no such backup keep their live state.
    pub fn restore(
        &self,
        cache: &PrefabMetadataCache,
        chunks: &mut [PredictedChunk],
        tick: SnapshotTick,
    ) -> HistoryResult<PassReport> {
        chunks
            .par_iter_mut()
            .map(|chunk| restore_chunk(cache, chunk, tick))
            .try_reduce(PassReport::default, |a, b| Ok(a.merge(b)))
    }

    /// Drops every backup at or before `tick`.
    pub fn prune(&self, chunks: &mut [PredictedChunk], tick: SnapshotTick) -> PassReport {
        chunks
            .par_iter_mut()
            .map(|chunk| {
                let removed = chunk
                    .ghosts
                    .iter_mut()
                    .filter_map(|ghost| ghost.history.as_mut())
                    .map(|ring| ring.remove_backups_older_than(tick))
                    .sum();
                PassReport {
                    removed,
                    ..PassReport::processed()
                }
            })
            .reduce(PassReport::default, PassReport::merge)
    }

    fn backup_chunk(
        &self,
        cache: &PrefabMetadataCache,
        chunk: &mut PredictedChunk,
        tick: SnapshotTick,
    ) -> HistoryResult<PassReport> {
        let Some((metadata, components)) = layout(cache, chunk.ghost_type) else {
            return Ok(PassReport::skipped());
        };
        let mut report = PassReport::processed();
        if !metadata.has_client_only_components() {
            return Ok(report);
        }

        // Copy into scratch first so a ghost that fails validation leaves its
        // ring untouched.
        let mut scratch = vec![0; metadata.backup_slot_size];
        for ghost in &mut chunk.ghosts {
            copy_client_only_to_backup(metadata, components, &ghost.state, &mut scratch)?;
            let ring = ghost.history.get_or_insert_with(|| {
                BackupRing::new(metadata.backup_slot_size, self.config.initial_capacity)
            });
            let dropped = ring.remove_backups_from(tick);
            if dropped > 0 {
                debug!(
                    ghost_type = chunk.ghost_type.get(),
                    tick = tick.raw(),
                    dropped,
                    "backups superseded"
                );
            }
            if ring.grow_buffer_if_full() {
                debug!(
                    ghost_type = chunk.ghost_type.get(),
                    capacity = ring.capacity(),
                    "backup ring grown"
                );
            }
            let index = ring.acquire_backup_slot(tick)?;
            ring.slot_mut(index).copy_from_slice(&scratch);
            report.ghosts += 1;
        }
        Ok(report)
    }
}

fn restore_chunk(
    cache: &PrefabMetadataCache,
    chunk: &mut PredictedChunk,
    tick: SnapshotTick,
) -> HistoryResult<PassReport> {
    let Some((metadata, components)) = layout(cache, chunk.ghost_type) else {
        return Ok(PassReport::skipped());
    };
    let mut report = PassReport::processed();
    if !metadata.has_client_only_components() {
        return Ok(report);
    }

    for ghost in &mut chunk.ghosts {
        let slot = ghost
            .history
            .as_ref()
            .and_then(|ring| Some(ring.slot(ring.get_slot_for_tick(tick)?)));
        match slot {
            Some(bytes) => {
                restore_client_only_from_backup(metadata, components, bytes, &mut ghost.state)?;
                report.ghosts += 1;
            }
            None => report.fallbacks += 1,
        }
    }
    Ok(report)
}

fn layout(
    cache: &PrefabMetadataCache,
    ghost_type: GhostTypeId,
) -> Option<(&PrefabMetadata, &[ComponentLayout])> {
    let Some(metadata) = cache.get(ghost_type) else {
        error!(
            ghost_type = ghost_type.get(),
            "missing backup metadata; skipping chunk this tick"
        );
        return None;
    };
    Some((metadata, cache.components(metadata)))
}

//! Tick-ordered circular storage of fixed-size backup slots.
//!
//! A [`BackupRing`] holds one entity's client-only state for a run of
//! consecutive (or sparse, but strictly increasing) ticks. Slots live in a
//! single byte arena of `capacity * slot_size` bytes. Readers walk from the
//! oldest slot (`rd_ptr`); writers append at `wr_ptr`, first dropping any
//! backups the new tick supersedes.

use codec::SnapshotTick;

use crate::error::{HistoryError, HistoryResult};

/// Growable ring buffer of backup slots indexed by tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRing {
    slot_size: usize,
    data: Vec<u8>,
    ticks: Vec<SnapshotTick>,
    rd_ptr: usize,
    wr_ptr: usize,
    len: usize,
}

impl BackupRing {
    /// Creates an empty ring with room for `capacity` slots of `slot_size`
    /// bytes each.
    #[must_use]
    pub fn new(slot_size: usize, capacity: usize) -> Self {
        Self {
            slot_size,
            data: vec![0; slot_size * capacity],
            ticks: vec![SnapshotTick::default(); capacity],
            rd_ptr: 0,
            wr_ptr: 0,
            len: 0,
        }
    }

    /// Size of a single slot in bytes.
    #[must_use]
    pub const fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of stored backups.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no backups are stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots the ring can hold without growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ticks.len()
    }

    /// Returns `true` if every slot holds a backup.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Tick of the oldest stored backup.
    #[must_use]
    pub fn oldest_tick(&self) -> Option<SnapshotTick> {
        (self.len > 0).then(|| self.ticks[self.rd_ptr])
    }

    /// Tick of the newest stored backup.
    #[must_use]
    pub fn newest_tick(&self) -> Option<SnapshotTick> {
        (self.len > 0).then(|| self.ticks[self.index_of(self.len - 1)])
    }

    /// Stored ticks from oldest to newest.
    pub fn ticks(&self) -> impl Iterator<Item = SnapshotTick> + '_ {
        (0..self.len).map(|logical| self.ticks[self.index_of(logical)])
    }

    /// Tick recorded for the slot at `index`.
    #[must_use]
    pub fn tick_at(&self, index: usize) -> SnapshotTick {
        self.ticks[index]
    }

    /// Bytes of the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity()`.
    #[must_use]
    pub fn slot(&self, index: usize) -> &[u8] {
        let start = index * self.slot_size;
        &self.data[start..start + self.slot_size]
    }

    /// Mutable bytes of the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity()`.
    pub fn slot_mut(&mut self, index: usize) -> &mut [u8] {
        let start = index * self.slot_size;
        &mut self.data[start..start + self.slot_size]
    }

    /// Claims the next write slot for `tick` and returns its index.
    ///
    /// Backups at or after `tick` are dropped first (see
    /// [`remove_backups_from`](Self::remove_backups_from)), so the stored ticks
    /// stay strictly increasing. Fails with [`HistoryError::Full`] when no slot
    /// is free; call [`grow_buffer_if_full`](Self::grow_buffer_if_full) first.
    pub fn acquire_backup_slot(&mut self, tick: SnapshotTick) -> HistoryResult<usize> {
        self.remove_backups_from(tick);
        if self.is_full() {
            return Err(HistoryError::Full {
                capacity: self.capacity(),
            });
        }
        let index = self.wr_ptr;
        self.ticks[index] = tick;
        self.wr_ptr = (index + 1) % self.capacity();
        self.len += 1;
        Ok(index)
    }

    /// Drops every backup whose tick is at or after `tick`, newest first.
    /// Only the write pointer moves. Returns the number removed.
    ///
    /// Re-predicting from a restored tick overwrites history from that tick on.
    pub fn remove_backups_from(&mut self, tick: SnapshotTick) -> usize {
        let mut removed = 0;
        while let Some(newest) = self.newest_tick() {
            if tick.is_newer_than(newest) {
                break;
            }
            self.wr_ptr = (self.wr_ptr + self.capacity() - 1) % self.capacity();
            self.len -= 1;
            removed += 1;
        }
        removed
    }

    /// Doubles the capacity (or allocates one slot) if the ring is full.
    /// Returns `true` if it grew.
    pub fn grow_buffer_if_full(&mut self) -> bool {
        if !self.is_full() {
            return false;
        }
        let old = self.capacity();
        self.grow(old, if old == 0 { 1 } else { old * 2 });
        true
    }

    /// Changes the capacity, keeping every stored backup in tick order.
    ///
    /// Growing moves whichever side of the wrap point is smaller (and fits);
    /// shrinking compacts the stored slots to the start of new storage.
    pub fn resize(&mut self, capacity: usize) -> HistoryResult<()> {
        if capacity < self.len {
            return Err(HistoryError::CapacityBelowLength {
                requested: capacity,
                len: self.len,
            });
        }
        let old = self.capacity();
        if capacity > old {
            self.grow(old, capacity);
        } else if capacity < old {
            self.compact(capacity);
        }
        Ok(())
    }

    /// Returns the slot holding the newest backup at or before `tick`.
    ///
    /// `None` means there is nothing to restore: the ring is empty, `tick` is
    /// newer than every backup, or older than all of them.
    #[must_use]
    pub fn get_slot_for_tick(&self, tick: SnapshotTick) -> Option<usize> {
        let oldest = self.oldest_tick()?;
        let newest = self.newest_tick()?;
        if tick.is_newer_than(newest) || oldest.is_newer_than(tick) {
            return None;
        }
        // Ticks strictly increase, so the target is never past `delta`.
        let delta = tick.ticks_since(oldest) as usize;
        (0..=delta.min(self.len - 1))
            .rev()
            .map(|logical| self.index_of(logical))
            .find(|&index| !self.ticks[index].is_newer_than(tick))
    }

    /// Drops every backup whose tick is at or before `tick`. Only the read
    /// pointer moves. Returns the number removed.
    pub fn remove_backups_older_than(&mut self, tick: SnapshotTick) -> usize {
        let mut removed = 0;
        while let Some(oldest) = self.oldest_tick() {
            if oldest.is_newer_than(tick) {
                break;
            }
            self.rd_ptr = (self.rd_ptr + 1) % self.capacity();
            self.len -= 1;
            removed += 1;
        }
        removed
    }

    /// Forgets every stored backup.
    pub fn clear(&mut self) {
        self.rd_ptr = 0;
        self.wr_ptr = 0;
        self.len = 0;
    }

    fn index_of(&self, logical: usize) -> usize {
        (self.rd_ptr + logical) % self.capacity()
    }

    fn grow(&mut self, old: usize, new: usize) {
        self.data.resize(new * self.slot_size, 0);
        self.ticks.resize(new, SnapshotTick::default());

        let wrapped = (self.rd_ptr + self.len).saturating_sub(old);
        if wrapped > 0 {
            let head = old - self.rd_ptr;
            if wrapped <= new - old && wrapped <= head {
                self.move_slots(0, old, wrapped);
            } else {
                let dst = new - head;
                self.move_slots(self.rd_ptr, dst, head);
                self.rd_ptr = dst;
            }
        }
        self.wr_ptr = (self.rd_ptr + self.len) % new;
    }

    fn compact(&mut self, new: usize) {
        let size = self.slot_size;
        let mut data = vec![0; new * size];
        let mut ticks = vec![SnapshotTick::default(); new];
        for logical in 0..self.len {
            let index = self.index_of(logical);
            ticks[logical] = self.ticks[index];
            data[logical * size..(logical + 1) * size].copy_from_slice(self.slot(index));
        }
        self.data = data;
        self.ticks = ticks;
        self.rd_ptr = 0;
        self.wr_ptr = if new == 0 { 0 } else { self.len % new };
    }

    fn move_slots(&mut self, src: usize, dst: usize, count: usize) {
        let size = self.slot_size;
        self.ticks.copy_within(src..src + count, dst);
        self.data
            .copy_within(src * size..(src + count) * size, dst * size);
    }
}

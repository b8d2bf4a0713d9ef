//! Reusable scratch buffers for chunk serialization.

use crate::snapshot::SnapshotSlot;

/// Scratch state reused across chunk calls.
///
/// Holds the all-zero baseline used for entities that have never been
/// acknowledged, so encoding them does not allocate per call.
#[derive(Debug, Default)]
pub struct ChunkScratch {
    zero: Vec<u8>,
}

impl ChunkScratch {
    /// Creates a new scratch buffer with no pre-allocated capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ensure_stride(&mut self, stride: usize) {
        if self.zero.len() < stride {
            self.zero.resize(stride, 0);
        }
    }

    /// Returns an all-zero slot of `stride` bytes.
    ///
    /// [`ensure_stride`](Self::ensure_stride) must have been called with at
    /// least `stride` first.
    pub(crate) fn zero_slot(&self, stride: usize) -> SnapshotSlot<'_> {
        SnapshotSlot::new(&self.zero[..stride])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_slot_grows_and_stays_zero() {
        let mut scratch = ChunkScratch::new();
        scratch.ensure_stride(16);
        scratch.ensure_stride(48);
        scratch.ensure_stride(32);
        let slot = scratch.zero_slot(48);
        assert_eq!(slot.len(), 48);
        assert!(slot.as_bytes().iter().all(|&b| b == 0));
    }
}

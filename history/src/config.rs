//! Backup configuration.

/// Settings for per-entity backup rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupConfig {
    /// Slots allocated when an entity's ring is created. Rings double when
    /// they fill up, so this only sets the starting point.
    pub initial_capacity: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 32,
        }
    }
}

impl BackupConfig {
    /// Small rings that grow early, for exercising the growth path in tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            initial_capacity: 1,
        }
    }
}

//! Core value types: ticks and source-side ghost data.

use schema::GhostTypeId;

/// A simulation tick number.
///
/// Ticks wrap around `u32::MAX`; ordering is only meaningful between ticks
/// less than half the range apart, so the type deliberately has no `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnapshotTick(u32);

impl SnapshotTick {
    /// Creates a new tick.
    #[must_use]
    pub const fn new(tick: u32) -> Self {
        Self(tick)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Signed distance from `older` to `self`, wrap-aware.
    #[must_use]
    pub const fn ticks_since(self, older: Self) -> i32 {
        self.0.wrapping_sub(older.0) as i32
    }

    /// Returns `true` if `self` is strictly after `other`.
    #[must_use]
    pub const fn is_newer_than(self, other: Self) -> bool {
        self.ticks_since(other) > 0
    }

    /// Returns the following tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u32> for SnapshotTick {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A single field value on the simulation side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    /// Stored quantized in snapshots; see [`FieldCodec::Float`](schema::FieldCodec::Float).
    Float(f32),
}

impl FieldValue {
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
        }
    }
}

/// Live data of one component instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentData {
    /// Ignored unless the component is enableable.
    pub enabled: bool,
    pub fields: Vec<FieldValue>,
}

impl ComponentData {
    /// Creates enabled component data.
    #[must_use]
    pub fn new(fields: Vec<FieldValue>) -> Self {
        Self {
            enabled: true,
            fields,
        }
    }

    /// Returns the same data with the enable bit cleared.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A ghost instance: component data in the ghost type's component order,
/// root entity first, then each child.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostEntity {
    pub ghost_type: GhostTypeId,
    pub components: Vec<ComponentData>,
}

impl GhostEntity {
    /// Creates a ghost instance.
    #[must_use]
    pub fn new(ghost_type: GhostTypeId, components: Vec<ComponentData>) -> Self {
        Self {
            ghost_type,
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_distance_wraps() {
        let before = SnapshotTick::new(u32::MAX - 1);
        let after = SnapshotTick::new(2);
        assert_eq!(after.ticks_since(before), 4);
        assert_eq!(before.ticks_since(after), -4);
        assert!(after.is_newer_than(before));
        assert!(!before.is_newer_than(after));
        assert!(!after.is_newer_than(after));
    }

    #[test]
    fn tick_next_wraps() {
        assert_eq!(SnapshotTick::new(u32::MAX).next(), SnapshotTick::new(0));
        assert_eq!(SnapshotTick::from(7).next().raw(), 8);
    }

    #[test]
    fn component_data_builders() {
        let data = ComponentData::new(vec![FieldValue::Int(3)]).disabled();
        assert!(!data.enabled);
        assert_eq!(data.fields, vec![FieldValue::Int(3)]);
        assert_eq!(FieldValue::Float(1.0).kind(), "float");
    }
}

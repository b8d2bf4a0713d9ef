//! Ghost type (prefab) definitions.

use crate::{ComponentId, GhostTypeId};

/// How clients simulate a ghost type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GhostMode {
    /// Every client interpolates.
    Interpolated,
    /// Every client predicts.
    Predicted,
    /// The owning client predicts, everyone else interpolates.
    OwnerPredicted,
}

/// One component slot of a ghost type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GhostComponent {
    pub component: ComponentId,
    /// 0 for the root entity, `n` for the n-th child entity.
    #[cfg_attr(feature = "serde", serde(default))]
    pub entity_index: u16,
}

/// Locates the field holding the owning connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OwnerField {
    pub component: ComponentId,
    pub field: u16,
}

/// A ghost type: an ordered component list across a root entity and its
/// children.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GhostTypeDef {
    pub id: GhostTypeId,
    pub name: String,
    pub mode: GhostMode,
    pub components: Vec<GhostComponent>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub prediction_owner: Option<OwnerField>,
}

impl GhostTypeDef {
    /// Creates a ghost type with no components.
    #[must_use]
    pub fn new(id: GhostTypeId, name: impl Into<String>, mode: GhostMode) -> Self {
        Self {
            id,
            name: name.into(),
            mode,
            components: Vec::new(),
            prediction_owner: None,
        }
    }

    /// Adds a component on the root entity.
    #[must_use]
    pub fn root(self, component: ComponentId) -> Self {
        self.child(0, component)
    }

    /// Adds a component on child entity `entity_index` (0 is the root).
    #[must_use]
    pub fn child(mut self, entity_index: u16, component: ComponentId) -> Self {
        self.components.push(GhostComponent {
            component,
            entity_index,
        });
        self
    }

    /// Sets the field holding the owning connection id.
    #[must_use]
    pub const fn owner(mut self, component: ComponentId, field: u16) -> Self {
        self.prediction_owner = Some(OwnerField { component, field });
        self
    }

    /// Returns the number of components on the root entity.
    #[must_use]
    pub fn root_component_count(&self) -> usize {
        self.components
            .iter()
            .take_while(|c| c.entity_index == 0)
            .count()
    }
}

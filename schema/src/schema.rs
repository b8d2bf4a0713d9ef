//! Schema definitions and validation.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::{ComponentDef, ComponentId, FieldCodec, GhostMode, GhostTypeDef, GhostTypeId};

/// An immutable set of component definitions and the ghost types built from
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    pub components: Vec<ComponentDef>,
    pub ghost_types: Vec<GhostTypeDef>,
}

impl Schema {
    /// Creates a schema after validation.
    pub fn new(components: Vec<ComponentDef>, ghost_types: Vec<GhostTypeDef>) -> SchemaResult<Self> {
        let schema = Self {
            components,
            ghost_types,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Returns the component with the given id.
    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&ComponentDef> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Returns the ghost type with the given id.
    #[must_use]
    pub fn ghost_type(&self, id: GhostTypeId) -> Option<&GhostTypeDef> {
        self.ghost_types.iter().find(|g| g.id == id)
    }

    /// Validates schema invariants.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut component_ids = HashSet::new();
        for component in &self.components {
            if !component_ids.insert(component.id) {
                return Err(SchemaError::DuplicateComponentId { id: component.id });
            }
            validate_component(component)?;
        }

        let mut ghost_ids = HashSet::new();
        for ghost in &self.ghost_types {
            if !ghost_ids.insert(ghost.id) {
                return Err(SchemaError::DuplicateGhostTypeId { id: ghost.id });
            }
            self.validate_ghost_type(ghost)?;
        }
        Ok(())
    }

    fn validate_ghost_type(&self, ghost: &GhostTypeDef) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        let mut prev_entity = 0u16;
        for (position, slot) in ghost.components.iter().enumerate() {
            if self.component(slot.component).is_none() {
                return Err(SchemaError::UnknownComponent {
                    ghost_type: ghost.id,
                    component: slot.component,
                });
            }
            if slot.entity_index < prev_entity || (position == 0 && slot.entity_index != 0) {
                return Err(SchemaError::ComponentOrder {
                    ghost_type: ghost.id,
                    position,
                });
            }
            prev_entity = slot.entity_index;
            if !seen.insert((slot.entity_index, slot.component)) {
                return Err(SchemaError::DuplicateGhostComponent {
                    ghost_type: ghost.id,
                    component: slot.component,
                    entity_index: slot.entity_index,
                });
            }
        }

        match ghost.prediction_owner {
            Some(owner) => {
                let on_root = ghost
                    .components
                    .iter()
                    .any(|c| c.entity_index == 0 && c.component == owner.component);
                let is_int = self
                    .component(owner.component)
                    .and_then(|c| c.fields.get(owner.field as usize))
                    .is_some_and(|f| f.codec == FieldCodec::Int);
                let serialized = self
                    .component(owner.component)
                    .is_some_and(ComponentDef::is_serialized);
                if !(on_root && is_int && serialized) {
                    return Err(SchemaError::InvalidOwnerField {
                        ghost_type: ghost.id,
                    });
                }
            }
            None if ghost.mode == GhostMode::OwnerPredicted => {
                return Err(SchemaError::MissingOwnerField {
                    ghost_type: ghost.id,
                });
            }
            None => {}
        }
        Ok(())
    }
}

fn validate_component(component: &ComponentDef) -> SchemaResult<()> {
    let mut names = HashSet::new();
    for (index, field) in component.fields.iter().enumerate() {
        if !names.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateFieldName {
                component: component.id,
                name: field.name.clone(),
            });
        }
        if let FieldCodec::Float { quantization: 0 } = field.codec {
            return Err(SchemaError::InvalidQuantization {
                component: component.id,
                field: index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldDef;

    fn cid(value: u16) -> ComponentId {
        ComponentId::new(value)
    }

    fn gid(value: u32) -> GhostTypeId {
        GhostTypeId::new(value)
    }

    fn owner_component() -> ComponentDef {
        ComponentDef::new(cid(1), "GhostOwner").field(FieldDef::new("network_id", FieldCodec::int()))
    }

    fn position_component() -> ComponentDef {
        ComponentDef::new(cid(2), "Position")
            .field(FieldDef::new("x", FieldCodec::float(1000)))
            .field(FieldDef::new("y", FieldCodec::float(1000)))
    }

    #[test]
    fn schema_roundtrip() {
        let ghost = GhostTypeDef::new(gid(1), "Player", GhostMode::OwnerPredicted)
            .root(cid(1))
            .root(cid(2))
            .child(1, cid(2))
            .owner(cid(1), 0);
        let schema = Schema::new(vec![owner_component(), position_component()], vec![ghost]).unwrap();
        assert_eq!(schema.components.len(), 2);
        assert!(schema.ghost_type(gid(1)).is_some());
        assert_eq!(schema.component(cid(2)).unwrap().name, "Position");
    }

    #[test]
    fn rejects_duplicate_component_ids() {
        let err = Schema::new(vec![owner_component(), owner_component()], vec![]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateComponentId { .. }));
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let component = ComponentDef::new(cid(1), "Bad")
            .field(FieldDef::new("a", FieldCodec::int()))
            .field(FieldDef::new("a", FieldCodec::uint()));
        let err = Schema::new(vec![component], vec![]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldName { .. }));
    }

    #[test]
    fn rejects_zero_quantization() {
        let component =
            ComponentDef::new(cid(1), "Bad").field(FieldDef::new("x", FieldCodec::float(0)));
        let err = Schema::new(vec![component], vec![]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidQuantization { field: 0, .. }));
    }

    #[test]
    fn rejects_unknown_component() {
        let ghost = GhostTypeDef::new(gid(1), "Ghost", GhostMode::Interpolated).root(cid(9));
        let err = Schema::new(vec![owner_component()], vec![ghost]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownComponent { .. }));
    }

    #[test]
    fn rejects_child_before_root() {
        let ghost = GhostTypeDef::new(gid(1), "Ghost", GhostMode::Interpolated)
            .child(1, cid(2))
            .root(cid(1));
        let err = Schema::new(vec![owner_component(), position_component()], vec![ghost])
            .unwrap_err();
        assert!(matches!(err, SchemaError::ComponentOrder { position: 0, .. }));
    }

    #[test]
    fn rejects_duplicate_component_on_entity() {
        let ghost = GhostTypeDef::new(gid(1), "Ghost", GhostMode::Interpolated)
            .root(cid(2))
            .root(cid(2));
        let err = Schema::new(vec![position_component()], vec![ghost]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateGhostComponent { .. }));
    }

    #[test]
    fn rejects_non_int_owner_field() {
        let ghost = GhostTypeDef::new(gid(1), "Ghost", GhostMode::OwnerPredicted)
            .root(cid(2))
            .owner(cid(2), 0);
        let err = Schema::new(vec![position_component()], vec![ghost]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidOwnerField { .. }));
    }

    #[test]
    fn rejects_owner_on_child_entity() {
        let ghost = GhostTypeDef::new(gid(1), "Ghost", GhostMode::OwnerPredicted)
            .root(cid(2))
            .child(1, cid(1))
            .owner(cid(1), 0);
        let err = Schema::new(vec![owner_component(), position_component()], vec![ghost])
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidOwnerField { .. }));
    }

    #[test]
    fn owner_predicted_requires_owner() {
        let ghost = GhostTypeDef::new(gid(1), "Ghost", GhostMode::OwnerPredicted).root(cid(1));
        let err = Schema::new(vec![owner_component()], vec![ghost]).unwrap_err();
        assert!(matches!(err, SchemaError::MissingOwnerField { .. }));
    }
}

//! Schema validation errors.

use std::fmt;

use crate::{ComponentId, GhostTypeId};

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building or validating a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Duplicate component ID in a schema.
    DuplicateComponentId { id: ComponentId },

    /// Duplicate ghost type ID in a schema.
    DuplicateGhostTypeId { id: GhostTypeId },

    /// Two fields of one component share a name.
    DuplicateFieldName { component: ComponentId, name: String },

    /// Float quantization factor must be non-zero.
    InvalidQuantization { component: ComponentId, field: usize },

    /// A ghost type references a component that is not registered.
    UnknownComponent {
        ghost_type: GhostTypeId,
        component: ComponentId,
    },

    /// Ghost components must list the root entity first, then children in
    /// ascending entity index order.
    ComponentOrder {
        ghost_type: GhostTypeId,
        position: usize,
    },

    /// The same component appears twice on one entity of a ghost type.
    DuplicateGhostComponent {
        ghost_type: GhostTypeId,
        component: ComponentId,
        entity_index: u16,
    },

    /// The prediction owner must be an `Int` field of a root component.
    InvalidOwnerField { ghost_type: GhostTypeId },

    /// Owner-predicted ghost types need a prediction owner field.
    MissingOwnerField { ghost_type: GhostTypeId },

    /// Registration attempted after the registry was frozen.
    RegistrationClosed { name: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateComponentId { id } => {
                write!(f, "duplicate component id {}", id.get())
            }
            Self::DuplicateGhostTypeId { id } => {
                write!(f, "duplicate ghost type id {}", id.get())
            }
            Self::DuplicateFieldName { component, name } => {
                write!(
                    f,
                    "duplicate field name {name:?} in component {}",
                    component.get()
                )
            }
            Self::InvalidQuantization { component, field } => {
                write!(
                    f,
                    "field {field} of component {} has zero quantization",
                    component.get()
                )
            }
            Self::UnknownComponent {
                ghost_type,
                component,
            } => {
                write!(
                    f,
                    "ghost type {} references unknown component {}",
                    ghost_type.get(),
                    component.get()
                )
            }
            Self::ComponentOrder {
                ghost_type,
                position,
            } => {
                write!(
                    f,
                    "ghost type {} lists components out of entity order at position {position}",
                    ghost_type.get()
                )
            }
            Self::DuplicateGhostComponent {
                ghost_type,
                component,
                entity_index,
            } => {
                write!(
                    f,
                    "ghost type {} lists component {} twice on entity {entity_index}",
                    ghost_type.get(),
                    component.get()
                )
            }
            Self::InvalidOwnerField { ghost_type } => {
                write!(
                    f,
                    "ghost type {} prediction owner is not an int field of a root component",
                    ghost_type.get()
                )
            }
            Self::MissingOwnerField { ghost_type } => {
                write!(
                    f,
                    "ghost type {} is owner predicted but has no prediction owner",
                    ghost_type.get()
                )
            }
            Self::RegistrationClosed { name } => {
                write!(
                    f,
                    "cannot register {name:?}: ghost types have already been processed"
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

//! Component registry with a one-way freeze.

use std::sync::Arc;

use crate::error::{SchemaError, SchemaResult};
use crate::{ComponentDef, GhostTypeDef, Schema};

/// Collects component and ghost type definitions during setup.
///
/// The first call to [`freeze`](Self::freeze) validates the definitions and
/// hands out a shared, immutable [`Schema`]. From then on component order is
/// fixed: any further registration fails with
/// [`SchemaError::RegistrationClosed`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: Vec<ComponentDef>,
    ghost_types: Vec<GhostTypeDef>,
    frozen: Option<Arc<Schema>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a serializable (or client-only) component.
    pub fn register_component(&mut self, component: ComponentDef) -> SchemaResult<()> {
        if self.frozen.is_some() {
            return Err(SchemaError::RegistrationClosed {
                name: component.name,
            });
        }
        if self.components.iter().any(|c| c.id == component.id) {
            return Err(SchemaError::DuplicateComponentId { id: component.id });
        }
        self.components.push(component);
        Ok(())
    }

    /// Registers a ghost type.
    pub fn register_ghost_type(&mut self, ghost: GhostTypeDef) -> SchemaResult<()> {
        if self.frozen.is_some() {
            return Err(SchemaError::RegistrationClosed { name: ghost.name });
        }
        if self.ghost_types.iter().any(|g| g.id == ghost.id) {
            return Err(SchemaError::DuplicateGhostTypeId { id: ghost.id });
        }
        self.ghost_types.push(ghost);
        Ok(())
    }

    /// Returns `true` once the schema has been handed out.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Validates and freezes the registry, returning the shared schema.
    ///
    /// Repeated calls return the same schema.
    pub fn freeze(&mut self) -> SchemaResult<Arc<Schema>> {
        if let Some(schema) = &self.frozen {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(Schema::new(
            self.components.clone(),
            self.ghost_types.clone(),
        )?);
        self.frozen = Some(Arc::clone(&schema));
        Ok(schema)
    }
}

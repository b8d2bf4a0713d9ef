//! Component and ghost type definitions for the gsnap codec.
//!
//! This crate defines what gets replicated:
//! - Components with ordered, typed fields and send rules
//! - Ghost types (prefabs): ordered component lists over a root entity and
//!   its children
//! - A registry that freezes into an immutable, shared [`Schema`]
//! - Deterministic schema hashing
//!
//! # Design Principles
//!
//! - **Explicit schemas** - No reflection on arbitrary Rust types.
//! - **Frozen after setup** - Component order never changes once a schema is
//!   handed out; late registration is a configuration error.
//! - **Deterministic hashing** - Schema hash is stable given the same definition.

mod component;
mod error;
mod field;
mod ghost;
mod hash;
mod registry;
mod schema;

pub use component::{ComponentDef, SendMask, SendToOwner};
pub use error::{SchemaError, SchemaResult};
pub use field::{FieldCodec, FieldDef};
pub use ghost::{GhostComponent, GhostMode, GhostTypeDef, OwnerField};
pub use hash::schema_hash;
pub use registry::ComponentRegistry;
pub use schema::Schema;

/// Identifies a component type within a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct ComponentId(u16);

impl ComponentId {
    /// Creates a component id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

/// Identifies a ghost type (prefab) within a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct GhostTypeId(u32);

impl GhostTypeId {
    /// Creates a ghost type id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

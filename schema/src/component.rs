//! Component definitions and per-recipient send rules.

use bitflags::bitflags;

use crate::{ComponentId, FieldDef};

bitflags! {
    /// Which client simulation modes receive a component.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
    pub struct SendMask: u8 {
        /// Sent to clients that interpolate the ghost.
        const INTERPOLATED = 0b01;
        /// Sent to clients that predict the ghost.
        const PREDICTED = 0b10;
    }
}

bitflags! {
    /// Whether a component is sent to the owning connection, the others, or both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
    pub struct SendToOwner: u8 {
        /// Sent to the connection that owns the ghost.
        const OWNER = 0b01;
        /// Sent to every other connection.
        const NON_OWNER = 0b10;
    }
}

/// A component definition.
///
/// The field list is fixed once the component is registered; its order is the
/// order fields take in snapshots and on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentDef {
    pub id: ComponentId,
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Carries an enable bit alongside its payload.
    #[cfg_attr(feature = "serde", serde(default))]
    pub enableable: bool,
    /// Lives only on the client; never serialized, covered by the backup ring.
    #[cfg_attr(feature = "serde", serde(default))]
    pub client_only: bool,
    #[cfg_attr(feature = "serde", serde(default = "SendMask::all"))]
    pub send_mask: SendMask,
    #[cfg_attr(feature = "serde", serde(default = "SendToOwner::all"))]
    pub send_to_owner: SendToOwner,
}

impl ComponentDef {
    /// Creates a component with no fields that is sent to everyone.
    #[must_use]
    pub fn new(id: ComponentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            fields: Vec::new(),
            enableable: false,
            client_only: false,
            send_mask: SendMask::all(),
            send_to_owner: SendToOwner::all(),
        }
    }

    /// Adds a field to the component.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Marks the component as enableable.
    #[must_use]
    pub const fn enableable(mut self) -> Self {
        self.enableable = true;
        self
    }

    /// Marks the component as client-only.
    #[must_use]
    pub const fn client_only(mut self) -> Self {
        self.client_only = true;
        self
    }

    /// Restricts the simulation modes that receive the component.
    #[must_use]
    pub const fn send_mask(mut self, mask: SendMask) -> Self {
        self.send_mask = mask;
        self
    }

    /// Restricts delivery by ownership.
    #[must_use]
    pub const fn send_to_owner(mut self, owner: SendToOwner) -> Self {
        self.send_to_owner = owner;
        self
    }

    /// Returns `true` if the component is part of server snapshots.
    #[must_use]
    pub const fn is_serialized(&self) -> bool {
        !self.client_only
    }

    /// Returns `true` if a recipient in the given mode and ownership receives
    /// this component.
    #[must_use]
    pub const fn is_sent_to(&self, predicted: bool, owner: bool) -> bool {
        let mode = if predicted {
            SendMask::PREDICTED
        } else {
            SendMask::INTERPOLATED
        };
        let ownership = if owner {
            SendToOwner::OWNER
        } else {
            SendToOwner::NON_OWNER
        };
        self.is_serialized()
            && self.send_mask.contains(mode)
            && self.send_to_owner.contains(ownership)
    }
}

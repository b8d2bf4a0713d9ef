//! Field codec definitions.

/// The encoding for a field.
///
/// Every field occupies one 32-bit word in a snapshot slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum FieldCodec {
    /// Boolean (1 bit on the wire).
    Bool,

    /// Signed 32-bit integer, delta coded.
    Int,

    /// Unsigned 32-bit integer, delta coded.
    UInt,

    /// Float stored as `round(value * quantization)` in a signed word.
    Float { quantization: u32 },
}

impl FieldCodec {
    /// Creates a boolean field codec.
    #[must_use]
    pub const fn bool() -> Self {
        Self::Bool
    }

    /// Creates a signed integer field codec.
    #[must_use]
    pub const fn int() -> Self {
        Self::Int
    }

    /// Creates an unsigned integer field codec.
    #[must_use]
    pub const fn uint() -> Self {
        Self::UInt
    }

    /// Creates a quantized float field codec.
    ///
    /// `quantization` is the number of units per 1.0 (1000 gives a
    /// resolution of 0.001).
    #[must_use]
    pub const fn float(quantization: u32) -> Self {
        Self::Float { quantization }
    }

    /// Returns `true` if the stored word is interpreted as signed.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int | Self::Float { .. })
    }
}

/// Field definition within a component.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    pub name: String,
    pub codec: FieldCodec,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, codec: FieldCodec) -> Self {
        Self {
            name: name.into(),
            codec,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage kind of a field variable.
///
/// Every kind has a fixed byte width, matching the vendor SDK's C layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Enum8,
    Enum16,
    Enum32,
}

impl VariableType {
    /// Size of the variable in bytes.
    pub const fn width(&self) -> usize {
        match self {
            VariableType::Bool | VariableType::Uint8 | VariableType::Int8 | VariableType::Enum8 => 1,
            VariableType::Uint16 | VariableType::Int16 | VariableType::Enum16 => 2,
            VariableType::Uint32
            | VariableType::Int32
            | VariableType::Enum32
            | VariableType::Float => 4,
            VariableType::Uint64 | VariableType::Int64 | VariableType::Double => 8,
        }
    }

    /// Any signed, unsigned or enum integer kind.
    pub const fn is_integer(&self) -> bool {
        !matches!(
            self,
            VariableType::Bool | VariableType::Float | VariableType::Double
        )
    }

    pub const fn is_enum(&self) -> bool {
        matches!(
            self,
            VariableType::Enum8 | VariableType::Enum16 | VariableType::Enum32
        )
    }

    pub const fn is_double(&self) -> bool {
        matches!(self, VariableType::Float | VariableType::Double)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, VariableType::Bool)
    }

    /// Inclusive value range of integer and enum kinds, `None` for the rest.
    ///
    /// Uint64 is capped at `i64::MAX` because integer values travel as `i64`.
    pub const fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            VariableType::Uint8 | VariableType::Enum8 => Some((0, u8::MAX as i64)),
            VariableType::Uint16 | VariableType::Enum16 => Some((0, u16::MAX as i64)),
            VariableType::Uint32 | VariableType::Enum32 => Some((0, u32::MAX as i64)),
            VariableType::Uint64 => Some((0, i64::MAX)),
            VariableType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            VariableType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            VariableType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            VariableType::Int64 => Some((i64::MIN, i64::MAX)),
            VariableType::Bool | VariableType::Float | VariableType::Double => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            VariableType::Bool => "Bool",
            VariableType::Uint8 => "Uint8",
            VariableType::Uint16 => "Uint16",
            VariableType::Uint32 => "Uint32",
            VariableType::Uint64 => "Uint64",
            VariableType::Int8 => "Int8",
            VariableType::Int16 => "Int16",
            VariableType::Int32 => "Int32",
            VariableType::Int64 => "Int64",
            VariableType::Float => "Float",
            VariableType::Double => "Double",
            VariableType::Enum8 => "Enum8",
            VariableType::Enum16 => "Enum16",
            VariableType::Enum32 => "Enum32",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed slot inside a field buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    name: String,
    offset: usize,
    variable_type: VariableType,
}

impl VariableDescriptor {
    pub(crate) fn new(name: String, offset: usize, variable_type: VariableType) -> Self {
        Self {
            name,
            offset,
            variable_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn variable_type(&self) -> VariableType {
        self.variable_type
    }

    /// Byte range occupied by the variable.
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.variable_type.width()
    }

    pub fn is_integer(&self) -> bool {
        self.variable_type.is_integer()
    }

    pub fn is_double(&self) -> bool {
        self.variable_type.is_double()
    }

    pub fn is_bool(&self) -> bool {
        self.variable_type.is_bool()
    }
}

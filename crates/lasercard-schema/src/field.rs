//! Typed, offset-addressed view over a fixed-size byte buffer.
//!
//! The vendor SDK exchanges configuration records as raw C structures.
//! Instead of mirroring those structures in Rust, a [`TypedFieldBuffer`]
//! owns the raw bytes and a schema of named variables, each pinned to a byte
//! offset and a [`VariableType`]. Reads and writes go through explicit
//! little-endian encoding; the byte range is checked once when a variable is
//! registered and again on every access.
//!
//! Schemas are declared through [`FieldSchemaBuilder`]. Once built, the set of
//! variables is frozen and only their values can change.
//!
//! # Examples
//!
//! ```
//! use lasercard_schema::{TypedFieldBuffer, VariableType};
//!
//! let mut field = TypedFieldBuffer::builder("rlDemoConfig", 1, 16)?
//!     .register_variable("Enabled", 0, VariableType::Bool)?
//!     .register_variable("Count", 4, VariableType::Uint32)?
//!     .register_variable("Scale", 8, VariableType::Double)?
//!     .build();
//!
//! field.set_integer("Count", 42)?;
//! field.set_double("Scale", 0.5)?;
//! assert_eq!(field.get_integer("Count")?, 42);
//! assert_eq!(&field.data()[4..8], &[42, 0, 0, 0]);
//!
//! // Values outside the declared width are rejected
//! assert!(field.set_integer("Count", -1).is_err());
//! # Ok::<(), lasercard_core::Error>(())
//! ```

use std::collections::HashMap;

use lasercard_core::{Error, Result};

use crate::validation::{validate_data_size, validate_field_name, validate_variable_name};
use crate::variable::{VariableDescriptor, VariableType};

/// Named configuration record backed by a zero-initialized byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedFieldBuffer {
    field_name: String,
    schema_version: u32,
    data: Vec<u8>,
    variables: HashMap<String, VariableDescriptor>,
    variable_names: Vec<String>,
}

impl TypedFieldBuffer {
    /// Create an empty, zero-filled buffer without any variables.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFieldName` if the name breaks the naming rule
    /// - `Error::InvalidFieldDataSize` if the size is outside 4 bytes to 1 MiB
    pub fn new(field_name: &str, schema_version: u32, size_in_bytes: usize) -> Result<Self> {
        validate_field_name(field_name)?;
        validate_data_size(size_in_bytes)?;

        Ok(Self {
            field_name: field_name.to_string(),
            schema_version,
            data: vec![0; size_in_bytes],
            variables: HashMap::new(),
            variable_names: Vec::new(),
        })
    }

    /// Start declaring a schema for a new buffer.
    pub fn builder(
        field_name: &str,
        schema_version: u32,
        size_in_bytes: usize,
    ) -> Result<FieldSchemaBuilder> {
        Ok(FieldSchemaBuilder {
            buffer: Self::new(field_name, schema_version, size_in_bytes)?,
        })
    }

    fn register_variable(
        &mut self,
        name: &str,
        offset: usize,
        variable_type: VariableType,
    ) -> Result<()> {
        validate_variable_name(name)?;

        if self.variables.contains_key(name) {
            return Err(Error::DuplicateVariableName(name.to_string()));
        }

        if offset >= self.data.len() {
            return Err(Error::InvalidVariableOffset {
                name: name.to_string(),
                offset,
            });
        }

        if offset + variable_type.width() > self.data.len() {
            return Err(Error::VariableExceedsBuffer {
                name: name.to_string(),
                offset,
            });
        }

        self.variables.insert(
            name.to_string(),
            VariableDescriptor::new(name.to_string(), offset, variable_type),
        );
        self.variable_names.push(name.to_string());
        Ok(())
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Raw bytes in the vendor layout.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes, for SDK calls that fill the record in place.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Write an integer to a signed or unsigned integer variable.
    ///
    /// # Errors
    ///
    /// - `Error::VariableNotFound` if no variable has this name
    /// - `Error::VariableIsNotOfTypeInteger` for bool, float, double and enum variables
    /// - `Error::IntegerValueOutOfRange` if the value does not fit the variable's width
    pub fn set_integer(&mut self, name: &str, value: i64) -> Result<()> {
        let (offset, variable_type) = self.lookup(name)?;
        let range = match variable_type.integer_range() {
            Some(range) if !variable_type.is_enum() => range,
            _ => return Err(Error::VariableIsNotOfTypeInteger(name.to_string())),
        };

        if value < range.0 || value > range.1 {
            return Err(Error::IntegerValueOutOfRange {
                kind: variable_type.name(),
                value,
            });
        }

        // Two's complement truncation is the narrowed encoding for both signednesses
        let bytes = value.to_le_bytes();
        self.write(name, offset, &bytes[..variable_type.width()])
    }

    /// Write a floating point value to a float or double variable.
    pub fn set_double(&mut self, name: &str, value: f64) -> Result<()> {
        let (offset, variable_type) = self.lookup(name)?;
        match variable_type {
            VariableType::Float => self.write(name, offset, &(value as f32).to_le_bytes()),
            VariableType::Double => self.write(name, offset, &value.to_le_bytes()),
            _ => Err(Error::VariableIsNotOfTypeDouble(name.to_string())),
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        let (offset, variable_type) = self.lookup(name)?;
        if !variable_type.is_bool() {
            return Err(Error::VariableIsNotOfTypeBool(name.to_string()));
        }
        self.write(name, offset, &[u8::from(value)])
    }

    /// Write an enum value to an Enum8/16/32 variable.
    ///
    /// # Errors
    ///
    /// - `Error::VariableIsNotOfTypeEnum` for non-enum variables
    /// - `Error::EnumValueOutOfRange` if the value does not fit the enum width
    pub fn set_enum(&mut self, name: &str, value: u32) -> Result<()> {
        let (offset, variable_type) = self.lookup(name)?;
        let range = match variable_type.integer_range() {
            Some(range) if variable_type.is_enum() => range,
            _ => return Err(Error::VariableIsNotOfTypeEnum(name.to_string())),
        };

        if i64::from(value) > range.1 {
            return Err(Error::EnumValueOutOfRange {
                kind: variable_type.name(),
                value,
            });
        }

        let bytes = value.to_le_bytes();
        self.write(name, offset, &bytes[..variable_type.width()])
    }

    /// Read an integer or enum variable, sign- or zero-extended to 64 bits.
    ///
    /// Uint64 values above `i64::MAX` come back reinterpreted as negative.
    pub fn get_integer(&self, name: &str) -> Result<i64> {
        let (offset, variable_type) = self.lookup(name)?;
        if !variable_type.is_integer() {
            return Err(Error::VariableIsNotOfTypeInteger(name.to_string()));
        }

        let width = variable_type.width();
        let raw = self.read_u64(name, offset, width)?;
        let signed = matches!(
            variable_type,
            VariableType::Int8 | VariableType::Int16 | VariableType::Int32 | VariableType::Int64
        );

        if signed {
            let shift = 64 - 8 * width as u32;
            Ok(((raw << shift) as i64) >> shift)
        } else {
            Ok(raw as i64)
        }
    }

    pub fn get_double(&self, name: &str) -> Result<f64> {
        let (offset, variable_type) = self.lookup(name)?;
        match variable_type {
            VariableType::Float => {
                Ok(f32::from_le_bytes(self.read::<4>(name, offset)?) as f64)
            }
            VariableType::Double => Ok(f64::from_le_bytes(self.read::<8>(name, offset)?)),
            _ => Err(Error::VariableIsNotOfTypeDouble(name.to_string())),
        }
    }

    /// Read a bool variable; any nonzero byte is `true`.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let (offset, variable_type) = self.lookup(name)?;
        if !variable_type.is_bool() {
            return Err(Error::VariableIsNotOfTypeBool(name.to_string()));
        }
        let [byte] = self.read::<1>(name, offset)?;
        Ok(byte != 0)
    }

    pub fn get_enum(&self, name: &str) -> Result<u32> {
        let (offset, variable_type) = self.lookup(name)?;
        if !variable_type.is_enum() {
            return Err(Error::VariableIsNotOfTypeEnum(name.to_string()));
        }
        let raw = self.read_u64(name, offset, variable_type.width())?;
        Ok(raw as u32)
    }

    pub fn reset_to_zero(&mut self) {
        self.data.fill(0);
    }

    pub fn variable_count(&self) -> usize {
        self.variable_names.len()
    }

    /// Name of the variable at `index` in registration order.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidVariableIndex` if `index` is out of range.
    pub fn variable_name(&self, index: usize) -> Result<&str> {
        self.variable_names
            .get(index)
            .map(String::as_str)
            .ok_or(Error::InvalidVariableIndex(index))
    }

    pub fn variable(&self, index: usize) -> Result<&VariableDescriptor> {
        let name = self.variable_name(index)?;
        self.find_variable(name)
    }

    /// Iterate over all variables in registration order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variable_names
            .iter()
            .filter_map(|name| self.variables.get(name))
    }

    pub fn find_variable(&self, name: &str) -> Result<&VariableDescriptor> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Format a variable's current value for diagnostics.
    pub fn variable_value_as_string(&self, name: &str) -> Result<String> {
        let descriptor = self.find_variable(name)?;
        if descriptor.is_integer() {
            Ok(self.get_integer(name)?.to_string())
        } else if descriptor.is_bool() {
            Ok(u8::from(self.get_bool(name)?).to_string())
        } else {
            Ok(self.get_double(name)?.to_string())
        }
    }

    fn lookup(&self, name: &str) -> Result<(usize, VariableType)> {
        let descriptor = self.find_variable(name)?;
        Ok((descriptor.offset(), descriptor.variable_type()))
    }

    fn write(&mut self, name: &str, offset: usize, bytes: &[u8]) -> Result<()> {
        let target = self
            .data
            .get_mut(offset..offset + bytes.len())
            .ok_or_else(|| Error::VariableExceedsBuffer {
                name: name.to_string(),
                offset,
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    fn read<const N: usize>(&self, name: &str, offset: usize) -> Result<[u8; N]> {
        self.data
            .get(offset..offset + N)
            .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
            .ok_or_else(|| Error::VariableExceedsBuffer {
                name: name.to_string(),
                offset,
            })
    }

    fn read_u64(&self, name: &str, offset: usize, width: usize) -> Result<u64> {
        let bytes = self
            .data
            .get(offset..offset + width)
            .ok_or_else(|| Error::VariableExceedsBuffer {
                name: name.to_string(),
                offset,
            })?;
        let mut buffer = [0u8; 8];
        buffer[..width].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buffer))
    }
}

/// Declares the variables of a [`TypedFieldBuffer`].
///
/// Registration is only possible through the builder, so a built buffer
/// always has a frozen schema.
#[derive(Debug)]
pub struct FieldSchemaBuilder {
    buffer: TypedFieldBuffer,
}

impl FieldSchemaBuilder {
    /// Register one variable.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidVariableName` if the name breaks the naming rule
    /// - `Error::DuplicateVariableName` if the name is already registered
    /// - `Error::InvalidVariableOffset` if the offset lies outside the buffer
    /// - `Error::VariableExceedsBuffer` if the variable runs past the end of the buffer
    pub fn register_variable(
        mut self,
        name: &str,
        offset: usize,
        variable_type: VariableType,
    ) -> Result<Self> {
        self.buffer.register_variable(name, offset, variable_type)?;
        Ok(self)
    }

    /// Register a table of `(name, offset, type)` entries in order.
    pub fn register_variables(
        mut self,
        variables: &[(&str, usize, VariableType)],
    ) -> Result<Self> {
        for &(name, offset, variable_type) in variables {
            self.buffer.register_variable(name, offset, variable_type)?;
        }
        Ok(self)
    }

    pub fn build(self) -> TypedFieldBuffer {
        self.buffer
    }
}

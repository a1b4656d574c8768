use std::ops::{Deref, DerefMut};

use lasercard_core::Result;

use crate::field::TypedFieldBuffer;
use crate::variable::VariableType;

/// Number of SPI modules described by one record.
pub const SPI_MODULE_COUNT: usize = 4;

const MODULE_BASE_OFFSET: usize = 12;
const MODULE_STRIDE: usize = 56;

const MODULE_VARIABLES: &[(&str, usize, VariableType)] = &[
    ("Enabled", 0, VariableType::Bool),
    ("SpiSyncMode", 4, VariableType::Enum32),
    ("BitsPerWord", 8, VariableType::Uint16),
    ("PreDelay", 12, VariableType::Double),
    ("PostDelay", 20, VariableType::Double),
    ("FrameDelay", 28, VariableType::Double),
    ("OutputSource", 36, VariableType::Enum32),
    ("BitOrder", 40, VariableType::Enum32),
    ("ClockPeriod", 44, VariableType::Double),
];

/// SPI output module configuration (`rlSpiConfig`, version 3).
///
/// Module variables are flattened as `Module<N>.<Name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpiConfig(TypedFieldBuffer);

impl SpiConfig {
    pub const FIELD_NAME: &'static str = "rlSpiConfig";
    pub const SCHEMA_VERSION: u32 = 3;
    pub const SIZE_IN_BYTES: usize = 232;

    pub fn new() -> Result<Self> {
        let mut builder =
            TypedFieldBuffer::builder(Self::FIELD_NAME, Self::SCHEMA_VERSION, Self::SIZE_IN_BYTES)?;

        for module in 0..SPI_MODULE_COUNT {
            let base = MODULE_BASE_OFFSET + module * MODULE_STRIDE;
            for &(name, offset, variable_type) in MODULE_VARIABLES {
                builder = builder.register_variable(
                    &Self::module_variable_name(module, name),
                    base + offset,
                    variable_type,
                )?;
            }
        }

        Ok(Self(builder.build()))
    }

    /// Flattened name of a per-module variable, e.g. `Module2.ClockPeriod`.
    pub fn module_variable_name(module: usize, name: &str) -> String {
        format!("Module{}.{}", module, name)
    }

    pub fn into_inner(self) -> TypedFieldBuffer {
        self.0
    }
}

impl Deref for SpiConfig {
    type Target = TypedFieldBuffer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SpiConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

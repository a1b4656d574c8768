use std::ops::{Deref, DerefMut};

use lasercard_core::Result;

use crate::field::TypedFieldBuffer;
use crate::variable::VariableType;

const VARIABLES: &[(&str, usize, VariableType)] = &[
    ("FpsPolarity", 4, VariableType::Enum32),
    ("GatePolarity", 8, VariableType::Enum32),
    ("LMPolarity", 12, VariableType::Enum32),
    ("FpsStart", 16, VariableType::Double),
    ("FpsWidth", 24, VariableType::Double),
    ("GateSetup", 32, VariableType::Double),
    ("GateHold", 40, VariableType::Double),
    ("LaserTriggerDelay", 48, VariableType::Double),
    ("PowerScale", 56, VariableType::Double),
    ("PowerScale1", 64, VariableType::Double),
    ("PowerChangeSetup", 72, VariableType::Double),
    ("PowerWriteDelay", 80, VariableType::Double),
    ("PowerWriteWidth", 88, VariableType::Double),
    ("HotPowerTarget", 96, VariableType::Enum32),
    ("HotPowerTarget1", 100, VariableType::Enum32),
    ("SimmerPower", 108, VariableType::Uint16),
    ("EnableTickle", 110, VariableType::Bool),
    ("TickleFrequency", 112, VariableType::Double),
    ("TickleWidth", 120, VariableType::Double),
    ("EnableLaserSync", 128, VariableType::Bool),
    ("EnableGateModulatesLm", 129, VariableType::Bool),
    ("EnablePowerCorrection", 130, VariableType::Bool),
    ("EnablePowerCorrection1", 131, VariableType::Bool),
    ("EnableVelocityCorrection", 132, VariableType::Bool),
    ("EnableVelocityCorrection1", 133, VariableType::Bool),
    ("EnablePowerCalibration", 134, VariableType::Bool),
    ("EnablePowerCalibration1", 135, VariableType::Bool),
    ("EnableEquallySpacedPulses", 136, VariableType::Bool),
];

/// Laser timing and power configuration (`rlLaserConfig`, version 8).
#[derive(Debug, Clone, PartialEq)]
pub struct LaserConfig(TypedFieldBuffer);

impl LaserConfig {
    pub const FIELD_NAME: &'static str = "rlLaserConfig";
    pub const SCHEMA_VERSION: u32 = 8;
    pub const SIZE_IN_BYTES: usize = 144;

    pub fn new() -> Result<Self> {
        let field = TypedFieldBuffer::builder(Self::FIELD_NAME, Self::SCHEMA_VERSION, Self::SIZE_IN_BYTES)?
            .register_variables(VARIABLES)?
            .build();
        Ok(Self(field))
    }

    pub fn into_inner(self) -> TypedFieldBuffer {
        self.0
    }
}

impl Deref for LaserConfig {
    type Target = TypedFieldBuffer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for LaserConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let config = LaserConfig::new().unwrap();
        assert_eq!(config.field_name(), "rlLaserConfig");
        assert_eq!(config.schema_version(), 8);
        assert_eq!(config.data_size(), 144);
        assert_eq!(config.variable_count(), VARIABLES.len());
        assert_eq!(config.variable_name(0).unwrap(), "FpsPolarity");
    }

    #[test]
    fn test_simmer_power_offset() {
        let mut config = LaserConfig::new().unwrap();
        config.set_integer("SimmerPower", 0x1234).unwrap();
        assert_eq!(&config.data()[108..110], &[0x34, 0x12]);
        assert!(config.set_integer("SimmerPower", 70_000).is_err());
    }

    #[test]
    fn test_polarity_is_enum() {
        let mut config = LaserConfig::new().unwrap();
        config.set_enum("GatePolarity", 1).unwrap();
        assert_eq!(config.get_enum("GatePolarity").unwrap(), 1);
        assert!(config.set_integer("GatePolarity", 1).is_err());
    }
}

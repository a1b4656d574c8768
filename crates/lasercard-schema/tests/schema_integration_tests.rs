//! Integration tests for the vendor configuration schemas.

mod common;

use lasercard_core::Error;
use lasercard_schema::{LaserConfig, SpiConfig, TypedFieldBuffer, VariableType};
use rstest::rstest;

#[test]
fn test_laser_config_full_round_trip() {
    let mut config = LaserConfig::new().unwrap();

    config.set_enum("FpsPolarity", 1).unwrap();
    config.set_double("FpsStart", 12.5).unwrap();
    config.set_double("PowerScale", 0.75).unwrap();
    config.set_integer("SimmerPower", 1200).unwrap();
    config.set_bool("EnableEquallySpacedPulses", true).unwrap();

    assert_eq!(config.get_enum("FpsPolarity").unwrap(), 1);
    assert_eq!(config.get_double("FpsStart").unwrap(), 12.5);
    assert_eq!(config.get_double("PowerScale").unwrap(), 0.75);
    assert_eq!(config.get_integer("SimmerPower").unwrap(), 1200);
    assert!(config.get_bool("EnableEquallySpacedPulses").unwrap());
    assert_eq!(config.data()[136], 1);

    config.reset_to_zero();
    assert!(!config.get_bool("EnableEquallySpacedPulses").unwrap());
    assert_eq!(config.get_double("PowerScale").unwrap(), 0.0);
}

#[test]
fn test_laser_config_accepts_raw_bytes() {
    let mut config = LaserConfig::new().unwrap();
    config.data_mut()[16..24].copy_from_slice(&3.5f64.to_le_bytes());
    assert_eq!(config.get_double("FpsStart").unwrap(), 3.5);
    assert_eq!(config.variable_value_as_string("FpsStart").unwrap(), "3.5");
}

#[rstest]
#[case(0, "Module0.ClockPeriod", 56)]
#[case(1, "Module1.ClockPeriod", 112)]
#[case(3, "Module3.BitsPerWord", 188)]
fn test_spi_module_offsets(#[case] _module: usize, #[case] name: &str, #[case] offset: usize) {
    let config = SpiConfig::new().unwrap();
    assert_eq!(config.find_variable(name).unwrap().offset(), offset);
}

#[test]
fn test_spi_modules_are_independent() {
    let mut config = SpiConfig::new().unwrap();
    config.set_bool("Module2.Enabled", true).unwrap();
    config.set_integer("Module2.BitsPerWord", 16).unwrap();

    assert!(!config.get_bool("Module1.Enabled").unwrap());
    assert!(config.get_bool("Module2.Enabled").unwrap());
    assert_eq!(config.get_integer("Module3.BitsPerWord").unwrap(), 0);
}

#[test]
fn test_variables_listed_in_registration_order() {
    let field = common::create_all_types_field();
    let names: Vec<&str> = (0..field.variable_count())
        .map(|index| field.variable_name(index).unwrap())
        .collect();
    let expected: Vec<&str> = common::ALL_TYPES_VARIABLES
        .iter()
        .map(|(name, _, _)| *name)
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn test_failed_write_leaves_buffer_unmodified() {
    let mut field = common::create_all_types_field();
    field.set_integer("i8var", -5).unwrap();
    let before = field.data().to_vec();

    assert!(matches!(
        field.set_integer("i8var", 200),
        Err(Error::IntegerValueOutOfRange { .. })
    ));
    assert!(matches!(
        field.set_bool("i8var", true),
        Err(Error::VariableIsNotOfTypeBool(_))
    ));
    assert_eq!(field.data(), before.as_slice());
}

#[test]
fn test_variable_exactly_at_end() {
    let field = TypedFieldBuffer::builder("rlTail", 1, 12)
        .unwrap()
        .register_variable("tail", 4, VariableType::Double)
        .unwrap()
        .build();
    assert_eq!(field.find_variable("tail").unwrap().byte_range(), 4..12);
}

//! Name and size validation for field buffers.
//!
//! Field names and variable names share one rule: 1 to 256 characters, each
//! an ASCII letter, digit, `.` or `_`. Dots are allowed so that nested vendor
//! structures can be flattened into names such as `Module0.ClockPeriod`.
//!
//! # Examples
//!
//! ```
//! use lasercard_schema::check_name;
//!
//! assert!(check_name("rlLaserConfig"));
//! assert!(check_name("Module0.ClockPeriod"));
//!
//! assert!(!check_name(""));
//! assert!(!check_name("has space"));
//! assert!(!check_name("minus-sign"));
//! ```

use lasercard_core::{Error, Result, constants::*};

/// Check a field or variable name against the naming rule.
pub fn check_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FIELD_NAME_LENGTH {
        return false;
    }

    name.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_')
}

/// Validate a field name.
///
/// # Errors
///
/// Returns `Error::InvalidFieldName` if the name breaks the naming rule.
pub fn validate_field_name(name: &str) -> Result<()> {
    if !check_name(name) {
        return Err(Error::InvalidFieldName(name.to_string()));
    }
    Ok(())
}

/// Validate a variable name.
///
/// # Errors
///
/// Returns `Error::InvalidVariableName` if the name breaks the naming rule.
pub fn validate_variable_name(name: &str) -> Result<()> {
    if !check_name(name) {
        return Err(Error::InvalidVariableName(name.to_string()));
    }
    Ok(())
}

/// Validate the byte size of a field buffer.
///
/// # Errors
///
/// Returns `Error::InvalidFieldDataSize` if the size is outside 4 bytes to 1 MiB.
pub fn validate_data_size(size: usize) -> Result<()> {
    if !(MIN_FIELD_DATA_SIZE..=MAX_FIELD_DATA_SIZE).contains(&size) {
        return Err(Error::InvalidFieldDataSize(size));
    }
    Ok(())
}
